use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, Pat};

use crate::attrs::{doc_text, unraw};

pub(crate) fn expand(attr: &TokenStream, item: ItemFn) -> syn::Result<TokenStream> {
    if !attr.is_empty() {
        return Err(syn::Error::new_spanned(attr, "#[tool] takes no arguments"));
    }
    let sig = &item.sig;
    if let Some(variadic) = &sig.variadic {
        return Err(syn::Error::new_spanned(
            variadic,
            "variadic functions cannot be tools",
        ));
    }
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(asyncness, "tools must be synchronous"));
    }

    let mut params = Vec::with_capacity(sig.inputs.len());
    for (position, input) in sig.inputs.iter().enumerate() {
        match input {
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(
                    receiver,
                    "methods cannot be tools; wrap the call in a free function",
                ));
            }
            FnArg::Typed(typed) => params.push(match typed.pat.as_ref() {
                Pat::Ident(pat) => unraw(&pat.ident),
                _ => format!("arg{position}"),
            }),
        }
    }

    let name = &sig.ident;
    let doc = doc_text(&item.attrs);
    Ok(quote! {
        #item

        ::toolbind::__private::inventory::submit! {
            ::toolbind::FunctionDocEntry::new(
                concat!(module_path!(), "::", stringify!(#name)),
                #doc,
                &[#(#params),*],
            )
        }
    })
}
