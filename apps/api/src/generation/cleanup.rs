//! Letter cleanup — an explicit, ordered list of pure text-to-text passes run over
//! the raw synthesis stream. Each pass is independently testable; `clean_letter`
//! folds them in order.
//!
//! Placeholder resolution runs first (it needs the extract records) and once
//! more over the final text, so no template token reaches the persisted letter.
//!
//! Best effort: when the salutation or signature cannot be located, the affected
//! passes leave the text as it is instead of failing.

use tracing::trace;

use crate::generation::prompts::{PLACEHOLDER_TOKENS, SALUTATION_KEYWORD};
use crate::generation::tone::soften;

pub type Pass = fn(&str) -> String;

pub const REASONING_START: &str = "<think>";
pub const REASONING_END: &str = "</think>";

/// Longest first so `Inc.` wins over `Inc`.
const CORPORATE_SUFFIXES: &[&str] = &[
    "L.L.C.", "Inc.", "Inc", "LLC", "Ltd.", "Ltd", "Corp.", "Corp", "Co.", "GmbH", "PLC",
];

/// The cleanup pipeline, in execution order.
pub const CLEANUP_PASSES: &[(&str, Pass)] = &[
    ("lexical substitution", soften),
    ("collapse whitespace", collapse_whitespace),
    ("trim lines", trim_lines),
    ("strip emphasis", strip_emphasis),
    ("strip reasoning", strip_reasoning),
    ("retain letter span", retain_letter_span),
    ("strip corporate suffix", strip_corporate_suffix),
    ("promote salutation", promote_salutation),
    ("promote signature", promote_signature),
    ("normalize paragraphs", normalize_paragraphs),
];

/// Values substituted for template tokens the model left behind.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderBindings {
    pub hiring_manager: Option<String>,
    pub company_name: Option<String>,
    pub job_title: Option<String>,
    pub applicant_name: Option<String>,
}

impl PlaceholderBindings {
    fn value_for(&self, token: &str) -> &str {
        let bound = match token {
            "{HIRING_MANAGER}" => Some(self.hiring_manager.as_deref().unwrap_or("Hiring Manager")),
            "{COMPANY_NAME}" => self.company_name.as_deref(),
            "{JOB_TITLE}" => self.job_title.as_deref(),
            "{APPLICANT_NAME}" => self.applicant_name.as_deref(),
            _ => None,
        };
        bound.unwrap_or("")
    }
}

pub fn clean_letter(raw: &str, bindings: &PlaceholderBindings) -> String {
    let resolved = resolve_placeholders(raw, bindings);
    let cleaned = CLEANUP_PASSES
        .iter()
        .fold(resolved, |text, (name, pass)| {
            let next = pass(&text);
            trace!(pass = name, before = text.len(), after = next.len(), "Cleanup pass");
            next
        });
    resolve_placeholders(&cleaned, bindings)
}

/// Replaces every template token with its binding; unbound tokens are removed.
pub fn resolve_placeholders(text: &str, bindings: &PlaceholderBindings) -> String {
    PLACEHOLDER_TOKENS
        .iter()
        .fold(text.to_string(), |acc, token| acc.replace(token, bindings.value_for(token)))
}

/// Runs of spaces/tabs become one space; runs of blank lines become one blank line.
pub fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() && lines.last().is_some_and(|l| l.is_empty()) {
            continue;
        }
        lines.push(collapsed);
    }
    lines.join("\n")
}

pub fn trim_lines(text: &str) -> String {
    text.lines().map(str::trim).collect::<Vec<_>>().join("\n")
}

/// Removes `*` and `__` emphasis plus leading `#` heading marks. Rule lines
/// (`***`, `___`) are left for `retain_letter_span`.
pub fn strip_emphasis(text: &str) -> String {
    text.lines()
        .map(|line| {
            if is_rule_or_fence(line) {
                return line.to_string();
            }
            let line = line.replace('*', "").replace("__", "");
            let unheaded = line.trim_start_matches('#');
            if unheaded.len() != line.len() && (unheaded.is_empty() || unheaded.starts_with(' ')) {
                unheaded.trim_start().to_string()
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Deletes every `<think>…</think>` block. An unterminated block runs to the end of
/// the text; a stray end marker drops everything before it.
pub fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let start = rest.find(REASONING_START);
        let end = rest.find(REASONING_END);
        match (start, end) {
            (Some(s), Some(e)) if e < s => {
                out.clear();
                rest = &rest[e + REASONING_END.len()..];
            }
            (Some(s), _) => {
                out.push_str(&rest[..s]);
                let after_start = &rest[s + REASONING_START.len()..];
                match after_start.find(REASONING_END) {
                    Some(e) => rest = &after_start[e + REASONING_END.len()..],
                    None => break,
                }
            }
            (None, Some(e)) => {
                out.clear();
                rest = &rest[e + REASONING_END.len()..];
            }
            (None, None) => {
                out.push_str(rest);
                break;
            }
        }
    }
    out
}

fn is_salutation(line: &str) -> bool {
    line.strip_prefix(SALUTATION_KEYWORD)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
}

fn is_rule_or_fence(line: &str) -> bool {
    let trimmed = line.trim();
    if trimmed.starts_with("```") {
        return true;
    }
    let marks: Vec<char> = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    marks.len() >= 3
        && ['-', '=', '_', '*']
            .iter()
            .any(|&c| marks.iter().all(|&x| x == c))
}

/// Keeps the lines from the first salutation up to (not including) the next
/// heading rule or code fence.
pub fn retain_letter_span(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| is_salutation(l)) else {
        return text.to_string();
    };
    let end = lines[start + 1..]
        .iter()
        .position(|l| is_rule_or_fence(l))
        .map_or(lines.len(), |offset| start + 1 + offset);
    lines[start..end].join("\n")
}

/// `Dear Hiring Team at Acme Inc.,` → `Dear Hiring Team at Acme,`
pub fn strip_corporate_suffix(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    let Some(line) = lines.iter_mut().find(|l| is_salutation(l)) else {
        return text.to_string();
    };
    let Some(comma) = line.find(',') else {
        return text.to_string();
    };
    let head = line[..comma].trim_end();
    for suffix in CORPORATE_SUFFIXES {
        let Some(stem) = head.strip_suffix(suffix) else {
            continue;
        };
        if stem.ends_with(char::is_whitespace) {
            *line = format!("{}{}", stem.trim_end(), &line[comma..]);
            break;
        }
    }
    lines.join("\n")
}

pub fn promote_salutation(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    if let Some(first) = lines.first_mut() {
        if !first.trim().is_empty() && !first.starts_with('#') {
            *first = format!("# {first}");
        }
    }
    lines.join("\n")
}

pub fn promote_signature(text: &str) -> String {
    let mut lines: Vec<String> = text.lines().map(String::from).collect();
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    if let Some(idx) = last.filter(|&idx| idx > 0) {
        let line = &mut lines[idx];
        if !line.starts_with('#') {
            *line = format!("### {line}");
        }
    }
    lines.join("\n")
}

/// Exactly one blank line between paragraphs, none trailing. Headings stand alone.
pub fn normalize_paragraphs(text: &str) -> String {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else if line.starts_with('#') {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            paragraphs.push(vec![line]);
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
        .iter()
        .map(|p| p.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
