// Extraction: key schemas, the tolerant normalizer for model output, and extract records.
// Model calls go through llm_client; this module only turns response text into records.

pub mod normalizer;
pub mod record;
pub mod schema;
