//! Serialization primitives shared by the program store.
//!
//! - `encoding`: `Encode`/`Decode` traits with fixed-width little-endian integers

pub mod encoding;
