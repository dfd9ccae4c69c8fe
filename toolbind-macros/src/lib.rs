//! Procedural macros for toolbind.
//!
//! `#[derive(ToolArg)]` describes structs, newtypes and fieldless enums as
//! tool parameter types. `#[tool]` records a function's doc comment and
//! parameter names so a registry can publish it without hand-written
//! documentation.

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, parse_macro_input};

mod attrs;
mod derive;
mod tool;

/// Derives `toolbind::ToolArg`.
///
/// - Structs with named fields become struct descriptors. Field doc comments
///   become schema descriptions. `#[serde(rename)]`, `#[serde(skip)]` and
///   container `#[serde(rename_all)]` are honoured, and
///   `#[tool_arg(rename = "...")]` / `#[tool_arg(skip)]` override them for
///   callers. The struct must implement `serde::Deserialize`.
/// - Single-field tuple structs take the descriptor of the wrapped type.
/// - Enums without fields become string enumerations. Variant renames follow
///   the same rules; callers use the override name while canonical values
///   carry the serde name.
/// - `#[tool_arg(opaque)]` marks a type that can only be injected.
///
/// A type that contains itself, directly or through collections, derives but
/// fails registration as unsupported.
#[proc_macro_derive(ToolArg, attributes(tool_arg))]
pub fn derive_tool_arg(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Records a function's documentation for registration.
///
/// The doc comment becomes the tool description; lines of the form
/// `name: text` describe parameters. The function itself is unchanged.
#[proc_macro_attribute]
pub fn tool(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = proc_macro2::TokenStream::from(attr);
    let item = parse_macro_input!(item as ItemFn);
    tool::expand(&attr, item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
