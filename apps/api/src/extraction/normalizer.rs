//! Extraction Normalizer — tolerant parsing of the model's structured response.
//!
//! Flow: locate the JSON object span → sanitize → parse → flatten each schema
//! key to trimmed string leaves → drop empty keys.
//!
//! Sanitize steps, in order:
//! 1. drop comment-only lines (`//` or `#`)
//! 2. strip trailing `//` comments outside strings
//! 3. un-escape over-escaped punctuation (`\_`, `\[`, `\-`, ...)
//! 4. strip trailing backslash continuation markers
//! 5. drop trailing commas before `]` / `}`

use serde_json::Value;
use tracing::{debug, info};

use crate::context::store::StageFiles;
use crate::errors::AppError;
use crate::extraction::record::ExtractRecord;
use crate::extraction::schema::KeySchema;

/// Escapes JSON accepts after a backslash.
const JSON_ESCAPES: &[char] = &['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// Parses `response` against `schema`.
/// Fails with `AppError::Parse` when no object span exists or it is not valid JSON.
pub fn normalize(response: &str, schema: &KeySchema) -> Result<ExtractRecord, AppError> {
    let span = locate_object_span(response)
        .ok_or_else(|| AppError::Parse(format!("no JSON object found for {}", schema.name)))?;
    let cleaned = sanitize(span);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| {
        AppError::Parse(format!("{} response is not valid JSON after cleanup: {e}", schema.name))
    })?;
    let Value::Object(object) = value else {
        return Err(AppError::Parse(format!("{} response is not a JSON object", schema.name)));
    };

    let mut record = ExtractRecord::new();
    for &key in schema.keys {
        let Some(value) = object.get(key) else {
            continue;
        };
        let mut leaves = Vec::new();
        flatten(value, &mut leaves);
        record.insert(key, leaves);
    }

    let ignored: Vec<&String> = object.keys().filter(|k| !schema.contains(k)).collect();
    if !ignored.is_empty() {
        debug!("Ignoring keys outside the {} schema: {:?}", schema.name, ignored);
    }

    Ok(record)
}

/// Writes the canonical record and its readable rendering; returns the rendering.
pub async fn persist(record: &ExtractRecord, files: &StageFiles) -> Result<String, AppError> {
    let canonical = serde_json::to_string_pretty(record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serializing extract record: {e}")))?;
    tokio::fs::write(&files.record, canonical).await?;

    let readable = record.to_readable();
    tokio::fs::write(&files.readable, &readable).await?;
    info!(
        stage = %files.stage,
        keys = record.len(),
        path = %files.readable.display(),
        "Extract record persisted"
    );
    Ok(readable)
}

/// Returns the lines from the first one opening a JSON object through the line
/// where that object closes. Commentary before and after is discarded.
pub fn locate_object_span(text: &str) -> Option<&str> {
    let mut offset = 0;
    let mut start = None;
    for line in text.split_inclusive('\n') {
        if line.trim_start().starts_with('{') {
            start = Some(offset);
            break;
        }
        offset += line.len();
    }
    let start = start?;

    let mut depth = 0usize;
    let mut scanner = StringScanner::default();
    let mut line_end = start;
    for line in text[start..].split_inclusive('\n') {
        line_end += line.len();
        if is_comment_only(line) {
            continue;
        }
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if scanner.step(c) {
                continue;
            }
            match c {
                '/' if chars.peek() == Some(&'/') => break,
                '{' | '[' => depth += 1,
                '}' | ']' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(text[start..line_end].trim_end());
                    }
                }
                _ => {}
            }
        }
        // Line comments end at the newline; strings never span lines in valid output.
        scanner = StringScanner::default();
    }
    None
}

/// Applies the ordered defensive cleanup to a located span.
pub fn sanitize(span: &str) -> String {
    let lines: Vec<String> = span
        .lines()
        .filter(|line| !is_comment_only(line))
        .map(strip_trailing_comment)
        .map(|line| unescape_punctuation(&line))
        .map(|line| strip_continuation(&line))
        .collect();
    drop_trailing_commas(&lines.join("\n"))
}

fn is_comment_only(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("//") || trimmed.starts_with('#')
}

fn strip_trailing_comment(line: &str) -> String {
    let mut scanner = StringScanner::default();
    let mut chars = line.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if scanner.step(c) {
            continue;
        }
        if c == '/' && matches!(chars.peek(), Some((_, '/'))) {
            return line[..i].trim_end().to_string();
        }
    }
    line.to_string()
}

/// Drops a backslash in front of any character JSON does not accept as an escape.
/// A lone backslash at end of line is left for `strip_continuation`.
fn unescape_punctuation(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some(next) if JSON_ESCAPES.contains(&next) => {
                out.push(c);
                out.push(next);
                chars.next();
            }
            Some(_) => {}
            None => out.push(c),
        }
    }
    out
}

fn strip_continuation(line: &str) -> String {
    let trimmed = line.trim_end();
    let trailing = trimmed.chars().rev().take_while(|&c| c == '\\').count();
    if trailing % 2 == 1 {
        trimmed[..trimmed.len() - 1].trim_end().to_string()
    } else {
        line.to_string()
    }
}

fn drop_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut scanner = StringScanner::default();
    for (i, &c) in chars.iter().enumerate() {
        if scanner.step(c) {
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some(']') | Some('}')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Collects every string leaf under `value`, in document order.
fn flatten(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            if let Some(leaf) = clean_leaf(s) {
                out.push(leaf);
            }
        }
        Value::Bool(_) | Value::Number(_) => {
            if let Some(leaf) = clean_leaf(&value.to_string()) {
                out.push(leaf);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| flatten(item, out)),
        Value::Object(map) => map.values().for_each(|item| flatten(item, out)),
    }
}

fn clean_leaf(raw: &str) -> Option<String> {
    let leaf = raw
        .trim_start()
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());
    if leaf.is_empty() {
        None
    } else {
        Some(leaf.to_string())
    }
}

/// Tracks whether the scan position is inside a JSON string literal.
#[derive(Debug, Default)]
struct StringScanner {
    in_string: bool,
    escaped: bool,
}

impl StringScanner {
    /// Consumes `c`; returns `true` when `c` belongs to a string literal
    /// (including its quotes) and must not be treated as structure.
    fn step(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            return true;
        }
        if c == '"' {
            self.in_string = true;
            return true;
        }
        false
    }
}
