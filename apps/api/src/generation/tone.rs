//! Lexical substitution filter — terminology normalization and tone softening.
//!
//! Rules apply in table order, each to the previous rule's output, and only match
//! whole words (no ASCII alphanumeric directly before or after). The filter is
//! idempotent: a replacement never contains a pattern, and word-bounded matching
//! keeps a replacement from fusing with its neighbours into a new match.

/// Ordered (pattern, replacement) table. Terminology first, then tone.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    // Terminology
    ("Javascript", "JavaScript"),
    ("Typescript", "TypeScript"),
    ("Github", "GitHub"),
    ("Gitlab", "GitLab"),
    ("Postgresql", "PostgreSQL"),
    ("Mysql", "MySQL"),
    ("NodeJS", "Node.js"),
    ("Nodejs", "Node.js"),
    // Tone: replace overclaiming with modest synonyms
    ("I am confident that", "I believe that"),
    ("I am certain that", "I believe that"),
    ("expert in", "experienced in"),
    ("Expert in", "Experienced in"),
    ("mastery of", "strong command of"),
    ("extensive experience", "solid experience"),
    ("Extensive experience", "Solid experience"),
    ("world-class", "high-caliber"),
    ("World-class", "High-caliber"),
    ("perfect fit", "strong fit"),
    ("passionate about", "enthusiastic about"),
    ("Passionate about", "Enthusiastic about"),
    ("guru", "specialist"),
    ("ninja", "specialist"),
    ("rockstar", "standout contributor"),
    ("unparalleled", "strong"),
    ("flawless", "careful"),
];

/// Applies every substitution in order.
pub fn soften(text: &str) -> String {
    SUBSTITUTIONS
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| {
            replace_word(&acc, pattern, replacement)
        })
}

/// Replaces whole-word occurrences of `pattern`.
fn replace_word(text: &str, pattern: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(pattern) {
        let end = pos + pattern.len();
        let before_ok = !text_before(text, rest, pos).is_some_and(|c| c.is_ascii_alphanumeric());
        let after_ok = !rest[end..].chars().next().is_some_and(|c| c.is_ascii_alphanumeric());

        if before_ok && after_ok {
            out.push_str(&rest[..pos]);
            out.push_str(replacement);
            rest = &rest[end..];
        } else {
            // Skip one character and keep scanning.
            let step = rest[pos..].chars().next().map_or(1, char::len_utf8);
            out.push_str(&rest[..pos + step]);
            rest = &rest[pos + step..];
        }
    }
    out.push_str(rest);
    out
}

/// The character preceding `rest[pos]` in the original `text`.
fn text_before(text: &str, rest: &str, pos: usize) -> Option<char> {
    let absolute = text.len() - rest.len() + pos;
    text[..absolute].chars().next_back()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminology_is_normalized() {
        assert_eq!(
            soften("Built Javascript services on Postgresql and Nodejs."),
            "Built JavaScript services on PostgreSQL and Node.js."
        );
    }

    #[test]
    fn test_tone_is_softened() {
        assert_eq!(
            soften("I am confident that my extensive experience makes me a perfect fit."),
            "I believe that my solid experience makes me a strong fit."
        );
    }

    #[test]
    fn test_only_whole_words_match() {
        assert_eq!(soften("gurus and Githubber"), "gurus and Githubber");
        assert_eq!(soften("see Github.com/ada"), "see GitHub.com/ada");
    }

    #[test]
    fn test_no_replacement_contains_a_pattern() {
        for (_, replacement) in SUBSTITUTIONS {
            for (pattern, _) in SUBSTITUTIONS {
                assert!(
                    !replacement.contains(pattern),
                    "replacement '{replacement}' contains pattern '{pattern}'"
                );
            }
        }
    }

    #[test]
    fn test_idempotent_on_sample_text() {
        let text = "A world-class ninja, expert in Typescript and Mysql, \
                    passionate about Gitlab pipelines and flawless delivery.";
        let once = soften(text);
        assert_eq!(soften(&once), once);
    }

    #[test]
    fn test_idempotent_on_adjacent_rule_tokens() {
        let mut tokens: Vec<&str> = Vec::new();
        for (pattern, replacement) in SUBSTITUTIONS {
            tokens.push(pattern);
            tokens.push(replacement);
        }
        for a in &tokens {
            for b in &tokens {
                for sep in ["", " ", "-", "."] {
                    let input = format!("{a}{sep}{b}");
                    let once = soften(&input);
                    assert_eq!(soften(&once), once, "not idempotent on '{input}'");
                }
            }
        }
    }

    #[test]
    fn test_handles_multibyte_text() {
        assert_eq!(soften("café guru — naïve"), "café specialist — naïve");
    }
}
