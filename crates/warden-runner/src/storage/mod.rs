//! Storage collaborator implementations.
//!
//! Both backends implement the [`warden_core::ResultStorage`] contract; the
//! reporter treats them as optional and best-effort.

/// File-per-record JSON persistence.
pub mod json_file;
/// In-memory persistence for tests and ephemeral runs.
pub mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;
