//! Proc macros for reclass: `class_config!` config declarations.
//!
//! This crate is not meant to be used directly; enable the `macros` feature on `reclass`.

use proc_macro::TokenStream;

mod config_macro;

/// Declare a class's configs as a `ConfigMap`.
///
/// Each entry is `name: value`. A trailing `_` on the name marks the config
/// reactive. `null` stands for `Value::Null` and `[..]` builds a list; any
/// other expression is converted with `Value::from`.
///
/// # Example
///
/// ```ignore
/// let configs = class_config! {
///     floating_: false,
///     items_: [],
///     sub_menu_gap: 4,
///     active_sub_menu: null,
/// };
/// ```
#[proc_macro]
pub fn class_config(input: TokenStream) -> TokenStream {
    config_macro::class_config_impl(input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
