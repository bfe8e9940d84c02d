//! Compose — turn retrieved memories and a persona into one prompt.
//!
//! # Flow
//!
//! 1. Build a query from the tags and the input
//! 2. Search memories with it
//! 3. Render the hits as a bulleted context block (or a placeholder)
//! 4. Assemble persona, input, context, and trailing instruction
//! 5. Optionally ask a generator for an answer; its failure is discarded
//!
//! Nothing here writes to the store.

pub mod composer;
pub mod template;

#[cfg(test)]
mod test_helpers;

pub use composer::{ComposeOutcome, Composer};
pub use template::PromptTemplate;
