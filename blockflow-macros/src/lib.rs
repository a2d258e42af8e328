//! Derive macros for blockflow event types.
//!
//! `#[derive(Event)]` and `#[derive(EventUnion)]` are the compile-time half
//! of the type introspector (C3): they generate the metadata the graph
//! builder and dispatch table need (ancestor chains for supertype dispatch,
//! member-type flattening for sum-type inputs/outputs) from a plain
//! struct/enum definition, so routing stays 100% derived from declared
//! types rather than user-written wiring.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident};

/// Derives [`blockflow::events::Event`] for a struct or enum.
///
/// `type_name()` returns the item's own name. `ancestors()` defaults to an
/// empty slice; a `#[event(supertype(Base, ...))]` attribute records each
/// named supertype, most-specific first, followed by each supertype's own
/// ancestor chain — so a processor registered on `Base` also matches
/// anything declaring `Base` (directly or transitively) as a supertype.
///
/// ```ignore
/// #[derive(Event, Clone, Debug)]
/// struct OrderPlaced { id: u64 }
///
/// #[derive(Event, Clone, Debug)]
/// #[event(supertype(OrderPlaced))]
/// struct OrderPlacedVip { id: u64, tier: u8 }
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_event(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_event(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let supertypes = parse_supertypes(&input.attrs)?;

    let ancestors_body = if supertypes.is_empty() {
        quote! { &[] }
    } else {
        quote! {
            static CHAIN: ::std::sync::OnceLock<::std::vec::Vec<::std::any::TypeId>> = ::std::sync::OnceLock::new();
            CHAIN.get_or_init(|| {
                let mut chain = ::std::vec::Vec::new();
                #(
                    chain.push(::std::any::TypeId::of::<#supertypes>());
                    chain.extend_from_slice(<#supertypes as ::blockflow::events::Event>::ancestors());
                )*
                chain
            })
        }
    };

    Ok(quote! {
        impl ::blockflow::events::Event for #name {
            fn type_name() -> &'static str {
                #name_str
            }

            fn ancestors() -> &'static [::std::any::TypeId] {
                #ancestors_body
            }
        }
    })
}

fn parse_supertypes(attrs: &[syn::Attribute]) -> syn::Result<Vec<syn::Path>> {
    let mut supertypes = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("event") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("supertype") {
                meta.parse_nested_meta(|inner| {
                    supertypes.push(inner.path);
                    Ok(())
                })
            } else {
                Err(meta.error("unsupported `event` attribute, expected `supertype(...)`"))
            }
        })?;
    }
    Ok(supertypes)
}

/// Derives [`blockflow::emission::Emission`] and
/// [`blockflow::input::FromEnvelope`] for an enum whose every variant is a
/// single-field tuple wrapping an [`blockflow::events::Event`] — the
/// Rust-native shape for "a processor's input/output is one of `{A, B, ...}`"
/// (spec.md §4.2's sum-type flattening rule): the declared type set is the
/// union of member types, not the enum's own type.
///
/// ```ignore
/// #[derive(EventUnion)]
/// enum PaymentEvent {
///     Placed(OrderPlaced),
///     Cancelled(OrderCancelled),
/// }
/// ```
#[proc_macro_derive(EventUnion)]
pub fn derive_event_union(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand_event_union(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_event_union(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let Data::Enum(data) = input.data else {
        return Err(syn::Error::new_spanned(&input, "EventUnion can only be derived for an enum"));
    };
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(name, "EventUnion enum must declare at least one variant"));
    }

    let mut variant_idents: Vec<Ident> = Vec::new();
    let mut member_types: Vec<syn::Type> = Vec::new();
    for variant in &data.variants {
        let Fields::Unnamed(fields) = &variant.fields else {
            return Err(syn::Error::new_spanned(
                variant,
                "EventUnion variants must be a single-field tuple variant wrapping the member event type",
            ));
        };
        if fields.unnamed.len() != 1 {
            return Err(syn::Error::new_spanned(
                variant,
                "EventUnion variants must wrap exactly one member event type",
            ));
        }
        variant_idents.push(variant.ident.clone());
        member_types.push(fields.unnamed.first().unwrap().ty.clone());
    }

    let into_envelopes_arms = variant_idents.iter().map(|ident| {
        quote! { #name::#ident(event) => ::blockflow::emission::Emission::into_envelopes(event) }
    });

    let try_from_arms = variant_idents.iter().zip(member_types.iter()).map(|(ident, ty)| {
        quote! {
            let envelope = match <#ty as ::blockflow::input::FromEnvelope>::try_from_envelope(envelope) {
                Ok(event) => return Ok(#name::#ident(event)),
                Err(envelope) => envelope,
            };
        }
    });

    Ok(quote! {
        impl ::blockflow::emission::Emission for #name {
            fn declared_types() -> ::std::vec::Vec<::std::any::TypeId> {
                let mut types = ::std::vec::Vec::new();
                #(types.extend(<#member_types as ::blockflow::emission::Emission>::declared_types());)*
                types
            }

            fn into_envelopes(self) -> ::std::vec::Vec<::blockflow::events::Envelope> {
                match self {
                    #(#into_envelopes_arms,)*
                }
            }
        }

        impl ::blockflow::input::FromEnvelope for #name {
            fn declared_types() -> ::std::vec::Vec<::std::any::TypeId> {
                let mut types = ::std::vec::Vec::new();
                #(types.extend(<#member_types as ::blockflow::input::FromEnvelope>::declared_types());)*
                types
            }

            fn try_from_envelope(
                envelope: ::blockflow::events::Envelope,
            ) -> ::std::result::Result<Self, ::blockflow::events::Envelope> {
                #(#try_from_arms)*
                Err(envelope)
            }
        }
    })
}
