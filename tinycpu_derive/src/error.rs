//! `#[derive(Error)]` for enums and structs.
//!
//! ```ignore
//! use tinycpu_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum FaultKind {
//!     #[error("division by zero")]
//!     DivisionByZero,
//! }
//!
//! #[derive(Debug, Error)]
//! #[error("{kind} at line {line}")]
//! pub struct ExecutionError {
//!     pub kind: FaultKind,
//!     pub line: usize,
//!     pub text: String,
//! }
//! ```
//!
//! Only the fields a message mentions are passed to `write!`, so a message is free to leave
//! diagnostic fields (such as the raw source text above) out of the rendered string.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = message_of(&variant.attrs, &variant.ident)?;
                    let ident = &variant.ident;
                    let (pattern, args) = bind_fields(&variant.fields, &message);
                    let message = positional_to_named(&message, &variant.fields);
                    Ok(quote! {
                        Self::#ident #pattern => write!(f, #message #(, #args)*),
                    })
                })
                .collect::<syn::Result<Vec<_>>>()?;
            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message = message_of(&input.attrs, &input.ident)?;
            let (pattern, args) = bind_fields(&data.fields, &message);
            let message = positional_to_named(&message, &data.fields);
            quote! {
                let Self #pattern = self;
                write!(f, #message #(, #args)*)
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Reads the string literal out of `#[error("...")]`.
fn message_of<T: ToTokens>(attrs: &[Attribute], target: &T) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            "missing #[error(\"...\")] attribute; every error must declare a display message",
        ));
    };

    let Meta::List(list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(list.tokens.clone()) {
        Ok(Lit::Str(s)) => Ok(s.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] message must be a string literal, e.g. #[error(\"stack overflow\")]",
        )),
    }
}

/// True when `message` interpolates `name` as `{name}` or `{name:...}`.
fn mentions(message: &str, name: &str) -> bool {
    message.contains(&format!("{{{name}}}")) || message.contains(&format!("{{{name}:"))
}

/// Builds the destructuring pattern and the named `write!` arguments for a set of fields.
///
/// Unused fields are skipped in the pattern with `..` so they never trip `write!`'s
/// unused-argument check.
fn bind_fields(fields: &Fields, message: &str) -> (TokenStream2, Vec<TokenStream2>) {
    match fields {
        Fields::Unit => (TokenStream2::new(), Vec::new()),
        Fields::Named(named) => {
            let used: Vec<_> = named
                .named
                .iter()
                .filter_map(|f| f.ident.as_ref())
                .filter(|ident| mentions(message, &ident.to_string()))
                .collect();
            let args = used.iter().map(|ident| quote! { #ident = #ident }).collect();
            (quote! { { #(#used,)* .. } }, args)
        }
        Fields::Unnamed(unnamed) => {
            let mut pattern = Vec::new();
            let mut args = Vec::new();
            for i in 0..unnamed.unnamed.len() {
                if mentions(message, &i.to_string()) {
                    let ident = format_ident!("f{}", i);
                    pattern.push(quote! { #ident });
                    args.push(quote! { #ident = #ident });
                } else {
                    pattern.push(quote! { _ });
                }
            }
            (quote! { ( #(#pattern),* ) }, args)
        }
    }
}

/// Rewrites `{0}`/`{0:?}` into `{f0}`/`{f0:?}` for tuple fields.
fn positional_to_named(message: &str, fields: &Fields) -> String {
    let Fields::Unnamed(unnamed) = fields else {
        return message.to_string();
    };
    let mut out = message.to_string();
    for i in (0..unnamed.unnamed.len()).rev() {
        out = out
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    out
}
