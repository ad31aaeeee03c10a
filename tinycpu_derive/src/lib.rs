//! Derive macros for the tinycpu crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - little-endian `Encode`/`Decode` for programs and device images
//! - `#[derive(Error)]` - `Display` + `std::error::Error` for assembler and processor errors

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements `crate::types::encoding::{Encode, Decode}` field by field.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` from `#[error("...")]` messages, plus `std::error::Error`.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
