//! Prompt Composer — builds self-contained prompt strings.
//!
//! Source hierarchy is explicit: a list of `SourceBlock { label, text, depth }`.
//! Each block is quoted with `depth` repetitions of `>`; the deepest block is the
//! primary subject, shallower blocks are background. Every prompt starts with the
//! metacognitive preamble and ends with its contract (extraction schema or the
//! synthesis rules plus letter template).

use crate::extraction::schema::KeySchema;
use crate::generation::prompts::{AUTHORING_RULES, LETTER_TEMPLATE, TEMPLATE_INSTRUCTION};
use crate::llm_client::prompts::{
    EXTRACTION_RULES, METACOGNITIVE_PREAMBLE, NESTED_SOURCE_SCOPE, SINGLE_SOURCE_SCOPE,
};

const QUOTE_MARKER: char = '>';

/// One quoted source in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBlock {
    pub label: String,
    pub text: String,
    /// Quote depth, at least 1. Higher is more central to the task.
    pub depth: usize,
}

impl SourceBlock {
    pub fn new(label: impl Into<String>, text: impl Into<String>, depth: usize) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            depth: depth.max(1),
        }
    }
}

/// What the prompt asks the model to produce.
#[derive(Debug, Clone, Copy)]
pub enum Contract<'a> {
    Extraction(&'a KeySchema),
    Synthesis,
}

/// Single-source prompt: flat one-level quoting, scoped strictly to the block.
pub fn compose_single(label: &str, text: &str, contract: Contract<'_>) -> String {
    let block = SourceBlock::new(label, text, 1);
    assemble(SINGLE_SOURCE_SCOPE, &render_blocks(&[block]), contract)
}

/// Multi-source prompt: blocks are ordered outermost first and nested by depth.
pub fn compose_nested(blocks: &[SourceBlock], contract: Contract<'_>) -> String {
    let mut ordered = blocks.to_vec();
    ordered.sort_by_key(|b| b.depth);
    assemble(NESTED_SOURCE_SCOPE, &render_blocks(&ordered), contract)
}

fn assemble(scope: &str, quoted: &str, contract: Contract<'_>) -> String {
    format!(
        "{METACOGNITIVE_PREAMBLE}\n\n{scope}\n\n{quoted}\n\n{}",
        render_contract(contract)
    )
}

/// Renders the head block, then recurses into the remaining (deeper or equal) ones.
/// A separator line quoted at the shallower depth keeps the nesting continuous.
fn render_blocks(blocks: &[SourceBlock]) -> String {
    let Some((head, tail)) = blocks.split_first() else {
        return String::new();
    };
    let mut out = quote(&format!("{}:\n{}", head.label, head.text.trim()), head.depth);
    if !tail.is_empty() {
        out.push('\n');
        out.push_str(&marker(head.depth.min(tail[0].depth)));
        out.push('\n');
        out.push_str(&render_blocks(tail));
    }
    out
}

fn marker(depth: usize) -> String {
    std::iter::repeat(QUOTE_MARKER).take(depth).collect()
}

fn quote(text: &str, depth: usize) -> String {
    let prefix = marker(depth);
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                prefix.clone()
            } else {
                format!("{prefix} {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_contract(contract: Contract<'_>) -> String {
    match contract {
        Contract::Extraction(schema) => format!(
            "Task: extract the {} from the quoted text.\n{EXTRACTION_RULES}\n\n{}",
            schema.name,
            schema.json_skeleton()
        ),
        Contract::Synthesis => {
            format!("{AUTHORING_RULES}\n\n{TEMPLATE_INSTRUCTION}\n\n{LETTER_TEMPLATE}")
        }
    }
}
