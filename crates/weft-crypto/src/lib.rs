//! Cryptographic primitives for weft.
//!
//! Provides domain-separated BLAKE3 hashing, Ed25519 signing/verification,
//! the deterministic repository Merkle tree with inclusion proofs, and
//! incremental hash chain verification.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod chain;
pub mod hasher;
pub mod merkle;
pub mod signer;

pub use chain::{ChainEntry, ChainError, LinkVerifier};
pub use hasher::ContentHasher;
pub use merkle::{leaf_for_record, root_for_records, MerkleProof, MerkleTree, Side};
pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
