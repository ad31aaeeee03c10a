//! `#[derive(BinaryCodec)]` for structs and enums.
//!
//! Fields are written in declaration order through `crate::types::encoding::Encode` and read back
//! in the same order through `crate::types::encoding::Decode`. Enum variants are prefixed with a
//! `u8` tag: the explicit discriminant when one is written, otherwise the previous tag + 1.
//!
//! ```ignore
//! #[derive(BinaryCodec)]
//! pub struct DeviceAddress {
//!     pub slot: u16,
//!     pub register: u16,
//! }
//!
//! #[derive(BinaryCodec)]
//! pub enum Operand {
//!     Literal(f32),
//!     StackPointer,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{Data, DataEnum, DeriveInput, Fields, parse_macro_input};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (encode_body, decode_body) = match &input.data {
        Data::Struct(data) => {
            let (pattern, writes) = destructure(&data.fields);
            let construct = construct(&data.fields);
            (
                quote! {
                    let Self #pattern = self;
                    #(#writes)*
                },
                quote! { Ok(Self #construct) },
            )
        }
        Data::Enum(data) => expand_enum(data)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "BinaryCodec derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #decode_body
            }
        }
    })
}

fn expand_enum(data: &DataEnum) -> syn::Result<(TokenStream2, TokenStream2)> {
    let tags = tags(data)?;

    let encode_arms = data.variants.iter().zip(&tags).map(|(variant, tag)| {
        let ident = &variant.ident;
        let (pattern, writes) = destructure(&variant.fields);
        quote! {
            Self::#ident #pattern => {
                crate::types::encoding::Encode::encode(&#tag, out);
                #(#writes)*
            }
        }
    });

    let decode_arms = data.variants.iter().zip(&tags).map(|(variant, tag)| {
        let ident = &variant.ident;
        let construct = construct(&variant.fields);
        quote! {
            #tag => Ok(Self::#ident #construct),
        }
    });

    Ok((
        quote! {
            match self {
                #(#encode_arms)*
            }
        },
        quote! {
            let tag: u8 = crate::types::encoding::Decode::decode(input)?;
            match tag {
                #(#decode_arms)*
                _ => Err(crate::types::encoding::DecodeError::InvalidValue),
            }
        },
    ))
}

/// Pattern binding every field plus the `encode` call for each binding.
fn destructure(fields: &Fields) -> (TokenStream2, Vec<TokenStream2>) {
    let idents: Vec<_> = match fields {
        Fields::Unit => return (TokenStream2::new(), Vec::new()),
        Fields::Named(named) => named.named.iter().filter_map(|f| f.ident.clone()).collect(),
        Fields::Unnamed(unnamed) => (0..unnamed.unnamed.len())
            .map(|i| format_ident!("f{}", i))
            .collect(),
    };

    let writes = idents
        .iter()
        .map(|ident| quote! { crate::types::encoding::Encode::encode(#ident, out); })
        .collect();

    let pattern = match fields {
        Fields::Named(_) => quote! { { #(#idents),* } },
        _ => quote! { ( #(#idents),* ) },
    };
    (pattern, writes)
}

/// Constructor expression reading each field in declaration order.
fn construct(fields: &Fields) -> TokenStream2 {
    match fields {
        Fields::Unit => TokenStream2::new(),
        Fields::Named(named) => {
            let reads = named.named.iter().map(|f| {
                let ident = &f.ident;
                quote! { #ident: crate::types::encoding::Decode::decode(input)?, }
            });
            quote! { { #(#reads)* } }
        }
        Fields::Unnamed(unnamed) => {
            let reads = unnamed
                .unnamed
                .iter()
                .map(|_| quote! { crate::types::encoding::Decode::decode(input)?, });
            quote! { ( #(#reads)* ) }
        }
    }
}

/// Wire tag of each variant, honouring explicit integer discriminants.
fn tags(data: &DataEnum) -> syn::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.variants.len());
    let mut next: u16 = 0;

    for variant in &data.variants {
        let tag = match &variant.discriminant {
            Some((_, syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Int(int),
                ..
            }))) => int.base10_parse::<u8>()?,
            Some((_, expr)) => {
                return Err(syn::Error::new_spanned(
                    expr,
                    "BinaryCodec discriminants must be integer literals",
                ));
            }
            None => u8::try_from(next).map_err(|_| {
                syn::Error::new_spanned(variant, "BinaryCodec supports at most 256 variants")
            })?,
        };
        out.push(tag);
        next = u16::from(tag) + 1;
    }

    Ok(out)
}
