use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DeriveInput, Fields, FieldsNamed, parse_quote};

use crate::attrs::{ContainerAttrs, Tag, doc_text, member_tags, unraw};

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let container = ContainerAttrs::parse(&input.attrs)?;
    let name = &input.ident;
    let owner = quote!(concat!(module_path!(), "::", stringify!(#name)));

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(::toolbind::ToolArg));
    }

    let (body, extra) = if container.opaque {
        (opaque(name), TokenStream::new())
    } else {
        match &input.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(fields) => {
                    generics
                        .make_where_clause()
                        .predicates
                        .push(parse_quote!(Self: ::toolbind::__private::DeserializeOwned));
                    named_struct(&owner, &container, fields)?
                }
                Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                    let inner = &fields.unnamed[0].ty;
                    (newtype(&owner, inner), TokenStream::new())
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        name,
                        "ToolArg needs named fields or a single wrapped value; use #[tool_arg(opaque)] for injected types",
                    ));
                }
            },
            Data::Enum(data) => (enumeration(&owner, &container, data)?, TokenStream::new()),
            Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "ToolArg cannot be derived for unions",
                ));
            }
        }
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::toolbind::ToolArg for #name #ty_generics #where_clause {
            #body
        }

        #extra
    })
}

fn opaque(name: &syn::Ident) -> TokenStream {
    quote! {
        fn descriptor() -> ::toolbind::schema::TypeDescriptor {
            ::toolbind::schema::TypeDescriptor::Opaque(stringify!(#name))
        }

        fn from_canonical(
            value: ::toolbind::__private::Value,
        ) -> ::core::result::Result<Self, ::toolbind::ConvertError> {
            ::toolbind::opaque_canonical(stringify!(#name), &value)
        }
    }
}

fn newtype(owner: &TokenStream, inner: &syn::Type) -> TokenStream {
    quote! {
        fn descriptor() -> ::toolbind::schema::TypeDescriptor {
            ::toolbind::__private::guard_descriptor::<Self>(#owner, || {
                <#inner as ::toolbind::ToolArg>::descriptor()
            })
        }

        fn from_canonical(
            value: ::toolbind::__private::Value,
        ) -> ::core::result::Result<Self, ::toolbind::ConvertError> {
            <#inner as ::toolbind::ToolArg>::from_canonical(value).map(Self)
        }
    }
}

fn tag_tokens(tag: Option<Tag>, method: &str) -> TokenStream {
    let method = syn::Ident::new(method, proc_macro2::Span::call_site());
    match tag {
        Some(Tag::Rename(name)) => quote! {
            .#method(::toolbind::schema::FieldTag::Rename(::std::string::String::from(#name)))
        },
        Some(Tag::Skip) => quote!(.#method(::toolbind::schema::FieldTag::Skip)),
        None => TokenStream::new(),
    }
}

fn named_struct(
    owner: &TokenStream,
    container: &ContainerAttrs,
    fields: &FieldsNamed,
) -> syn::Result<(TokenStream, TokenStream)> {
    let mut descriptors = Vec::with_capacity(fields.named.len());
    let mut docs = Vec::new();

    for field in &fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ident = unraw(ident);
        let ty = &field.ty;
        let (tag, mut wire) = member_tags(&field.attrs)?;
        if wire.is_none() {
            if let Some(rule) = container.rename_all {
                wire = Some(Tag::Rename(rule.apply_to_field(&ident)));
            }
        }

        // Fields the wire format never reads need no descriptor of their own.
        let ty_descriptor = if matches!(wire, Some(Tag::Skip)) {
            quote!(::toolbind::schema::TypeDescriptor::Opaque(stringify!(#ty)))
        } else {
            quote!(<#ty as ::toolbind::ToolArg>::descriptor())
        };
        let tag = tag_tokens(tag, "with_tag");
        let wire = tag_tokens(wire, "with_wire_tag");
        descriptors.push(quote! {
            ::toolbind::schema::FieldDescriptor::new(#ident, #ty_descriptor) #tag #wire
        });

        let doc = doc_text(&field.attrs);
        if !doc.is_empty() {
            docs.push(quote!((#ident, #doc)));
        }
    }

    let body = quote! {
        fn descriptor() -> ::toolbind::schema::TypeDescriptor {
            ::toolbind::__private::guard_descriptor::<Self>(#owner, || {
                ::toolbind::schema::TypeDescriptor::Struct(::toolbind::schema::StructDescriptor::new(
                    #owner,
                    ::std::vec![#(#descriptors),*],
                ))
            })
        }

        fn from_canonical(
            value: ::toolbind::__private::Value,
        ) -> ::core::result::Result<Self, ::toolbind::ConvertError> {
            ::toolbind::deserialize_canonical(value)
        }
    };

    let extra = if docs.is_empty() {
        TokenStream::new()
    } else {
        quote! {
            ::toolbind::__private::inventory::submit! {
                ::toolbind::StructDocEntry::new(#owner, &[#(#docs),*])
            }
        }
    };
    Ok((body, extra))
}

fn enumeration(
    owner: &TokenStream,
    container: &ContainerAttrs,
    data: &DataEnum,
) -> syn::Result<TokenStream> {
    let mut names = Vec::with_capacity(data.variants.len());
    let mut wire_names = Vec::with_capacity(data.variants.len());
    let mut variants = Vec::with_capacity(data.variants.len());

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "ToolArg enums cannot carry data",
            ));
        }
        let ident = &variant.ident;
        let (tag, wire) = member_tags(&variant.attrs)?;
        let wire = match wire {
            Some(Tag::Skip) => continue,
            Some(Tag::Rename(name)) => name,
            None => {
                let raw = unraw(ident);
                container
                    .rename_all
                    .map_or_else(|| raw.clone(), |rule| rule.apply_to_variant(&raw))
            }
        };
        let text = match tag {
            Some(Tag::Skip) => continue,
            Some(Tag::Rename(name)) => name,
            None => wire.clone(),
        };
        names.push(text);
        wire_names.push(wire);
        variants.push(ident);
    }

    // Canonical values carry the wire name. Accepted names still decode for
    // values built without the converter.
    let mut seen = std::collections::HashSet::new();
    let mut arms = Vec::with_capacity(variants.len() * 2);
    for (text, ident) in wire_names.iter().zip(&variants).chain(names.iter().zip(&variants)) {
        if seen.insert(text.clone()) {
            arms.push(quote! {
                ::core::option::Option::Some(#text) => ::core::result::Result::Ok(Self::#ident),
            });
        }
    }

    Ok(quote! {
        fn descriptor() -> ::toolbind::schema::TypeDescriptor {
            ::toolbind::schema::TypeDescriptor::Enumeration(
                ::toolbind::schema::EnumDescriptor::new(
                    #owner,
                    ::std::vec![#(::std::string::String::from(#names)),*],
                )
                .with_wire_names(::std::vec![#(::std::string::String::from(#wire_names)),*]),
            )
        }

        fn from_canonical(
            value: ::toolbind::__private::Value,
        ) -> ::core::result::Result<Self, ::toolbind::ConvertError> {
            match value.as_str() {
                #(#arms)*
                _ => ::core::result::Result::Err(::toolbind::ConvertError::type_mismatch(#owner, &value)),
            }
        }
    })
}
