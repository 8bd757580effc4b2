//! The agent orchestration core for Majordome.
//!
//! One run of the [`AgentLoop`] goes:
//!
//! 1. **Seed** a transcript with the system prompt, tool catalogue and the user message
//! 2. **Call** the provider chain with the transcript and the tool schemas
//! 3. **Extract** tool calls from the reply, structured or buried in text
//! 4. **Dispatch** each call in order, appending its result
//! 5. **Synthesize**: ask once more, without tools, for a plain answer
//!
//! The loop stops on a plain answer, a finish signal, an exhausted chain or
//! the iteration ceiling, and reports which one through [`RunStatus`].

pub mod extract;
pub mod loop_runner;
pub mod normalize;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use extract::{Extraction, ToolCallExtractor};
pub use loop_runner::{AgentLoop, RunOptions, RunOutcome, RunStatus};
pub use normalize::{normalize_arguments, normalize_path};
pub use prompt::build_system_message;
