//! Foundation types for weft.
//!
//! This crate provides the core identity and addressing types used
//! throughout the weft system. Every other weft crate depends on
//! `weft-types`.
//!
//! # Key Types
//!
//! - [`ContentHash`] — Content-addressed identifier (BLAKE3 hash)
//! - [`Did`] — Decentralized identifier for an account
//! - [`Handle`] — Human-readable hostname-shaped account name
//! - [`RecordPath`] — `(collection, rkey)` address of a record within a repo
//! - [`AtUri`] — `at://did/collection/rkey` display form for records
//! - [`Clock`] — Time source abstraction (unix-epoch milliseconds)

pub mod did;
pub mod error;
pub mod hash;
pub mod record;
pub mod time;

pub use did::{Did, Handle};
pub use error::TypeError;
pub use hash::ContentHash;
pub use record::{AtUri, RecordPath};
pub use time::{Clock, ManualClock, SystemClock};
