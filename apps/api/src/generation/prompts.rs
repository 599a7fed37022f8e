// Synthesis prompt constants.
// Cross-cutting fragments (preamble, extraction rules) live in llm_client::prompts.

/// Salutation keyword the letter must open with.
pub const SALUTATION_KEYWORD: &str = "Dear";

/// Authoring rules appended to the synthesis prompt.
pub const AUTHORING_RULES: &str = "\
Write a cover letter for the applicant (innermost quoted material) applying to the job \
(outer quoted material). Rules:
- Frame the applicant truthfully but favorably; never claim anything the applicant material does not support.
- Balance technical qualifications with interpersonal and collaborative strengths.
- No filler, no clichés, no self-praise adjectives.
- Anchor every claim to concrete evidence from the applicant material (roles, projects, results).
- Where the applicant has no exact match for a requirement, point to the closest transferable skill instead.
- Keep it to one page.";

/// Output template. Every `{TOKEN}` must be replaced; none may remain in the answer.
pub const LETTER_TEMPLATE: &str = "\
Dear {HIRING_MANAGER},

{OPENING_PARAGRAPH}

{TECHNICAL_PARAGRAPH}

{INTERPERSONAL_PARAGRAPH}

{CLOSING_PARAGRAPH}

Sincerely,
{APPLICANT_NAME}";

/// Every placeholder token that may appear in `LETTER_TEMPLATE` or the instructions.
pub const PLACEHOLDER_TOKENS: &[&str] = &[
    "{HIRING_MANAGER}",
    "{COMPANY_NAME}",
    "{JOB_TITLE}",
    "{OPENING_PARAGRAPH}",
    "{TECHNICAL_PARAGRAPH}",
    "{INTERPERSONAL_PARAGRAPH}",
    "{CLOSING_PARAGRAPH}",
    "{APPLICANT_NAME}",
];

/// Instruction wrapping the template.
pub const TEMPLATE_INSTRUCTION: &str = "\
Answer using exactly this template. Replace every token in braces with real content \
({COMPANY_NAME} and {JOB_TITLE} may be used inside paragraphs). \
Leave no token in braces in your answer and add nothing after the signature.";
