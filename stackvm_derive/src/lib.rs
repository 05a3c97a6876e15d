//! Derive macros for the stackvm crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - fixed-width binary serialization for record structs
//! - `#[derive(Error)]` - `Display` + `std::error::Error` for error enums

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements `Encode` and `Decode` for a struct with named fields.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` and `Error` for an enum whose variants carry `#[error("...")]`.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
