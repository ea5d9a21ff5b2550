//! Content-addressed value storage for weft.
//!
//! Every record payload in weft is stored as an immutable value identified
//! by its domain-separated BLAKE3 hash. The store is a pure key-value map
//! from hash to bytes; it never interprets contents.
//!
//! # Design Rules
//!
//! 1. Values are immutable once written (content-addressing guarantees this).
//! 2. Writes are idempotent: identical bytes always yield the same hash and
//!    are stored once.
//! 3. No deletion on the transactional path: records are superseded in the
//!    repository log, not erased, so commit chains stay replayable. Garbage
//!    collection of unreferenced hashes is an explicit maintenance call.
//! 4. Concurrent reads are always safe and never block writers of other
//!    values.
//! 5. All errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
