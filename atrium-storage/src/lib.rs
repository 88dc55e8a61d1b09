//! Atrium Storage - Backend Trait and In-Memory Implementation
//!
//! The [`Backend`] trait is the seam between the query engine and whatever
//! actually holds rows. It consumes structured queries, never SQL text, so
//! the in-memory backend used by tests evaluates the same predicates the
//! SQL collaborator renders.

pub mod backend;
pub mod cache;
pub mod memory;

pub use backend::{Backend, SharedBackend};
pub use cache::{KeyValueCache, MemoryCache, SharedCache};
pub use memory::MemoryBackend;
