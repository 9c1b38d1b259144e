//! Generation domain - the language model boundary

mod prompt;
mod provider;

pub use prompt::build_prompt;
pub use provider::GenerationProvider;

#[cfg(test)]
pub use provider::mock::MockGenerationProvider;
