// Shared prompt fragments appended by the Prompt Composer.
// Stage-specific wording (authoring rules, the letter template) lives in generation::prompts.

/// Appended to every prompt. The model reasons privately and emits only the refined answer.
pub const METACOGNITIVE_PREAMBLE: &str = "\
Before answering, work through the task privately: derive what is being asked, \
draft an answer, critique the draft against the source text, and refine it. \
Do NOT reveal any of that reasoning. Output only the final, refined, concise answer. \
If the task as derived from the text is incoherent or cannot be done, stop early \
and say so in one sentence instead of guessing.";

/// Instruction used when a single source block is supplied.
pub const SINGLE_SOURCE_SCOPE: &str = "\
Use ONLY the text inside the quoted block below (every line prefixed with `>`). \
Ignore anything you know from elsewhere.";

/// Instruction used when several nested source blocks are supplied.
pub const NESTED_SOURCE_SCOPE: &str = "\
The material below is quoted with `>` markers. More markers mean more central: \
the most deeply quoted block is the primary subject, shallower blocks are \
background and supporting context only.";

/// Rules attached to every extraction contract.
pub const EXTRACTION_RULES: &str = "\
Respond with a single JSON object and nothing else. \
Its keys must be exactly the keys shown below, in the same order, and each value must be a list of strings. \
Extract only facts directly supported by the quoted text. \
Do NOT fabricate, infer, or generalize beyond what is written. \
If the text does not state something, leave that key's list empty rather than guess.";
