//! Procedural macros for the `datamap` entity/repository layer.
//!
//! `#[derive(EntityKind)]` turns a marker type into an entity kind: it fixes the
//! validator and adaptor its entities use and the table its repositories default to.
//!
//! ```ignore
//! #[derive(EntityKind)]
//! #[entity(table = "creams", validator = CreamValidator)]
//! pub struct Cream;
//! ```
//!
//! Without `table`, the table is the pluralized snake_case type name (`Cream` -> `creams`).
//! `validator` defaults to `AlwaysValid` and `adaptor` to `CaseAdaptor`; both must
//! implement `Default`.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, LitStr, Path};

use inflections::Inflect;

/// Parsed `#[entity(...)]` options.
#[derive(Default)]
struct EntityOptions {
    table: Option<LitStr>,
    validator: Option<Path>,
    adaptor: Option<Path>,
}

fn parse_entity_options(input: &DeriveInput) -> syn::Result<EntityOptions> {
    let mut opts = EntityOptions::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("entity") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                opts.table = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("validator") {
                opts.validator = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("adaptor") {
                opts.adaptor = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unknown #[entity] option; expected `table`, `validator` or `adaptor`"));
            }
            Ok(())
        })?;
    }
    Ok(opts)
}

/// `Cream` -> `creams`, `IceCream` -> `ice_creams`.
fn default_table_name(type_name: &str) -> String {
    format!("{}s", type_name.to_snake_case())
}

/// ASCII letters, digits, or `_`, not starting with a digit.
fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

fn expand_entity_kind(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let opts = parse_entity_options(input)?;
    let name = &input.ident;

    let table = match &opts.table {
        Some(lit) => {
            let value = lit.value();
            if !is_valid_ident(&value) {
                return Err(syn::Error::new(
                    lit.span(),
                    format!("invalid table name `{value}`; use ASCII letters, digits, or `_`, starting with a letter or `_`"),
                ));
            }
            value
        }
        None => default_table_name(&name.to_string()),
    };

    let validator = opts
        .validator
        .map(|p| quote! { #p })
        .unwrap_or_else(|| quote! { ::datamap_core::AlwaysValid });
    let adaptor = opts
        .adaptor
        .map(|p| quote! { #p })
        .unwrap_or_else(|| quote! { ::datamap_core::CaseAdaptor });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::datamap_core::EntityKind for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            type Validator = #validator;
            type Adaptor = #adaptor;

            fn validator() -> Self::Validator {
                <#validator as ::core::default::Default>::default()
            }

            fn adaptor() -> Self::Adaptor {
                <#adaptor as ::core::default::Default>::default()
            }
        }
    })
}

#[proc_macro_derive(EntityKind, attributes(entity))]
pub fn derive_entity_kind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity_kind(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
