//! Key schemas — the ordered field lists each extraction stage asks for.
//!
//! The job and applicant schemas share `soft_skills`, `experience_years`,
//! `education`, `certifications` and `location` so synthesis can compare them.
//! Order is significant: prompts, canonical records and renderings all follow it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySchema {
    pub name: &'static str,
    pub keys: &'static [&'static str],
}

pub const JOB_SCHEMA: KeySchema = KeySchema {
    name: "job requirements",
    keys: &[
        "company_name",
        "job_title",
        "hiring_manager",
        "technical_requirements",
        "soft_skills",
        "responsibilities",
        "experience_years",
        "education",
        "certifications",
        "company_values",
        "location",
    ],
};

pub const APPLICANT_SCHEMA: KeySchema = KeySchema {
    name: "applicant qualifications",
    keys: &[
        "applicant_name",
        "contact",
        "technical_skills",
        "soft_skills",
        "experience_years",
        "education",
        "certifications",
        "achievements",
        "projects",
        "location",
    ],
};

impl KeySchema {
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(&key)
    }

    /// The JSON object the model must return: every key, in order, with an empty list.
    pub fn json_skeleton(&self) -> String {
        let body = self
            .keys
            .iter()
            .map(|k| format!("  \"{k}\": []"))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("{{\n{body}\n}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_preserves_key_order() {
        let skeleton = JOB_SCHEMA.json_skeleton();
        let positions: Vec<usize> = JOB_SCHEMA
            .keys
            .iter()
            .map(|k| skeleton.find(&format!("\"{k}\"")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_skeleton_is_valid_json() {
        let value: serde_json::Value =
            serde_json::from_str(&APPLICANT_SCHEMA.json_skeleton()).unwrap();
        assert_eq!(value.as_object().unwrap().len(), APPLICANT_SCHEMA.keys.len());
    }

    #[test]
    fn test_schemas_share_comparison_keys() {
        for key in ["soft_skills", "experience_years", "education", "certifications", "location"] {
            assert!(JOB_SCHEMA.contains(key), "job schema missing {key}");
            assert!(APPLICANT_SCHEMA.contains(key), "applicant schema missing {key}");
        }
    }
}
