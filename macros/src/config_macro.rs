//! class_config! macro: parse `name: value` entries and generate a `ConfigMap` builder chain.

use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Error, Expr, Ident, Result, Token};

// ---------------------------------------------------------------------------
// AST types
// ---------------------------------------------------------------------------

/// One `name: value` entry.
#[derive(Debug)]
pub(crate) struct ConfigEntry {
    /// Declared name, reactive marker included.
    pub name: Ident,
    pub value: Expr,
}

/// The top-level input to the class_config! macro.
#[derive(Debug)]
struct ConfigInput {
    entries: Vec<ConfigEntry>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Parse for ConfigEntry {
    fn parse(input: ParseStream) -> Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<Token![:]>()?;
        let value: Expr = input.parse()?;
        Ok(ConfigEntry { name, value })
    }
}

impl Parse for ConfigInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let parsed = Punctuated::<ConfigEntry, Token![,]>::parse_terminated(input)?;
        let entries: Vec<ConfigEntry> = parsed.into_iter().collect();

        let mut seen = HashSet::new();
        for entry in &entries {
            let raw = entry.name.to_string();
            let public = raw.strip_suffix('_').unwrap_or(&raw).to_owned();
            if public.is_empty() {
                return Err(Error::new(entry.name.span(), "config name cannot be empty"));
            }
            if !seen.insert(public.clone()) {
                return Err(Error::new(
                    entry.name.span(),
                    format!("config `{public}` is declared twice"),
                ));
            }
        }

        Ok(ConfigInput { entries })
    }
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

fn is_null(expr: &Expr) -> bool {
    matches!(expr, Expr::Path(p) if p.qself.is_none() && p.path.is_ident("null"))
}

/// Tokens producing a `::reclass::value::Value` for `expr`.
fn value_tokens(expr: &Expr) -> TokenStream {
    if is_null(expr) {
        return quote! { ::reclass::value::Value::Null };
    }
    if let Expr::Array(array) = expr {
        let items = array.elems.iter().map(value_tokens);
        return quote! { ::reclass::value::Value::List(::std::vec![#(#items),*]) };
    }
    quote! { ::reclass::value::Value::from(#expr) }
}

pub(crate) fn class_config_impl(tokens: TokenStream) -> Result<TokenStream> {
    let input: ConfigInput = syn::parse2(tokens)?;
    let calls = input.entries.iter().map(|entry| {
        let name = entry.name.to_string();
        let value = value_tokens(&entry.value);
        quote! { .declare(#name, #value) }
    });
    Ok(quote! {
        ::reclass::config::ConfigMap::new() #(#calls)*
    })
}
