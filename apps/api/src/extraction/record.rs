use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::generation::tone::soften;

/// Normalized key → value-list mapping produced by one extraction stage.
///
/// Keys keep insertion (schema) order. A key is never stored with an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractRecord {
    fields: Vec<(String, Vec<String>)>,
}

impl ExtractRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key; an empty list is dropped rather than stored.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        if values.is_empty() {
            return;
        }
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = values,
            None => self.fields.push((key, values)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Line-oriented rendering: one `key: v1; v2` line per key, values passed
    /// through the lexical substitution filter.
    pub fn to_readable(&self) -> String {
        self.fields
            .iter()
            .map(|(key, values)| format!("{key}: {}", soften(&values.join("; "))))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parses a rendering produced by `to_readable` (or a hand-written one in the
    /// same shape). Lines without a `key:` marker are ignored.
    pub fn from_readable(text: &str) -> Self {
        let mut record = Self::new();
        for line in text.lines() {
            let Some((key, rest)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let is_key = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !is_key {
                continue;
            }
            let values: Vec<String> = rest
                .split(';')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
            record.insert(key, values);
        }
        record
    }
}

impl Serialize for ExtractRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (key, values) in &self.fields {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ExtractRecord {
        let mut r = ExtractRecord::new();
        r.insert("job_title", vec!["Backend Engineer".to_string()]);
        r.insert("certifications", vec![]);
        r.insert(
            "technical_requirements",
            vec!["Go".to_string(), "Postgresql".to_string()],
        );
        r
    }

    #[test]
    fn test_empty_lists_are_never_stored() {
        let r = record();
        assert_eq!(r.len(), 2);
        assert!(r.get("certifications").is_none());
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let json = serde_json::to_string(&record()).unwrap();
        assert_eq!(
            json,
            r#"{"job_title":["Backend Engineer"],"technical_requirements":["Go","Postgresql"]}"#
        );
    }

    #[test]
    fn test_readable_joins_and_filters_values() {
        assert_eq!(
            record().to_readable(),
            "job_title: Backend Engineer\ntechnical_requirements: Go; PostgreSQL"
        );
    }

    #[test]
    fn test_from_readable_recovers_fields() {
        let parsed = ExtractRecord::from_readable(
            "applicant_name: Ada Lovelace\nnot a field line\ntechnical_skills: Rust; Go;\nEmpty: x",
        );
        assert_eq!(parsed.first("applicant_name"), Some("Ada Lovelace"));
        assert_eq!(
            parsed.get("technical_skills"),
            Some(&["Rust".to_string(), "Go".to_string()][..])
        );
        assert_eq!(parsed.len(), 2);
    }
}
