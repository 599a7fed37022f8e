// Letter generation: prompt composition, lexical filtering, synthesis and cleanup.
// All model calls go through llm_client::Completion — no direct HTTP here.

pub mod cleanup;
pub mod composer;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod synthesis;
pub mod tone;
