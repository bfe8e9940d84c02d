//! # OathLink Core
//!
//! Domain types, traits, and error definitions for the OathLink memory
//! backend. This crate has **no framework dependencies** — storage, HTTP and
//! LLM crates all implement against the traits defined here.
//!
//! ## Layout
//!
//! - [`memory`] — the memory record, the `MemoryStore` / `MemorySearch`
//!   capabilities and the text normalization they share
//! - [`settings`] — the small key-value store for deployment settings
//! - [`generation`] — the optional text-generation collaborator
//! - [`error`] — the caller-visible error kinds

pub mod error;
pub mod generation;
pub mod memory;
pub mod settings;

// Re-export key types at crate root for ergonomics
pub use error::{GenerationError, OathError, Result, StorageError};
pub use generation::{GenerationRequest, Generator};
pub use memory::{MemoryRecord, MemorySearch, MemoryStore, SearchQuery};
pub use settings::SettingsStore;
