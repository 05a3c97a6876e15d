//! Derive macro for fixed-width binary records.
//!
//! Generates `Encode` and `Decode` implementations that serialize each named
//! field in declaration order with no framing of any kind. The field types
//! decide the width; the struct adds nothing, so a record of `u32` + `i64`
//! occupies exactly 12 bytes.
//!
//! Tuple structs, unit structs, enums and unions are rejected at compile time:
//! the on-disk program format only needs flat records.

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `Encode` and `Decode` for a named-field struct.
///
/// ```ignore
/// use stackvm_derive::BinaryCodec;
///
/// #[derive(BinaryCodec)]
/// pub struct Instruction {
///     tag: u32,
///     operand: i64,
/// }
/// ```
///
/// expands to
///
/// ```ignore
/// impl Encode for Instruction {
///     fn encode<S: EncodeSink>(&self, out: &mut S) {
///         Encode::encode(&self.tag, out);
///         Encode::encode(&self.operand, out);
///     }
/// }
///
/// impl Decode for Instruction {
///     fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
///         Ok(Self {
///             tag: Decode::decode(input)?,
///             operand: Decode::decode(input)?,
///         })
///     }
/// }
/// ```
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_binary_codec(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_binary_codec(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "BinaryCodec only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "BinaryCodec only supports structs; records are flat field sequences",
            ));
        }
    };

    let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #( crate::types::encoding::Encode::encode(&self.#names, out); )*
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                Ok(Self {
                    #( #names: crate::types::encoding::Decode::decode(input)?, )*
                })
            }
        }
    })
}
