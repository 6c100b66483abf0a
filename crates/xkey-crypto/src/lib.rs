//! Digest primitive for xkey.
//!
//! Tagging and purging must hash keys with the same algorithm, so both go
//! through [`KeyHasher`]. It wraps BLAKE3; no custom cryptography.

pub mod hasher;

pub use hasher::KeyHasher;
