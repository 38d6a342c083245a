//! Derive macro implementation for `PdxSerializable`.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

#[derive(Default)]
struct FieldAttrs {
    field_name: Option<String>,
    identity: bool,
    skip: bool,
    unread: bool,
}

pub fn derive_pdx_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_name = parse_type_name(&input.attrs)?.unwrap_or_else(|| name.to_string());

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "PdxSerializable only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "PdxSerializable can only be derived for structs",
            ))
        }
    };

    let mut unread_stmt = None;
    let mut unread_read = None;
    let mut write_stmts = Vec::new();
    let mut read_stmts = Vec::new();
    let mut field_inits = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        let binding = format_ident!("__pdx_{}", field_ident.unraw());

        if attrs.unread {
            if unread_stmt.is_some() {
                return Err(syn::Error::new_spanned(
                    field_ident,
                    "only one field may be marked #[pdx(unread)]",
                ));
            }
            unread_stmt = Some(quote! { writer.write_unread_fields(&self.#field_ident)?; });
            unread_read = Some(quote! { let #binding = reader.read_unread_fields(); });
            field_inits.push(quote! { #field_ident: #binding });
            continue;
        }

        if attrs.skip {
            field_inits.push(quote! { #field_ident: ::core::default::Default::default() });
            continue;
        }

        let wire_name = attrs
            .field_name
            .unwrap_or_else(|| field_ident.unraw().to_string());

        write_stmts.push(quote! { writer.write(#wire_name, &self.#field_ident)?; });
        if attrs.identity {
            write_stmts.push(quote! { writer.mark_identity_field(#wire_name)?; });
        }
        read_stmts.push(quote! { let #binding = reader.read_or_default(#wire_name)?; });
        field_inits.push(quote! { #field_ident: #binding });
    }

    let pdx = quote! { ::gridcache_core::serialization::pdx };

    Ok(quote! {
        impl #impl_generics #pdx::PdxSerializable for #name #ty_generics #where_clause {
            fn type_name(&self) -> &str {
                #type_name
            }

            fn to_pdx(&self, writer: &mut #pdx::PdxWriter) -> ::gridcache_core::Result<()> {
                #unread_stmt
                #(#write_stmts)*
                Ok(())
            }
        }

        impl #impl_generics #pdx::PdxDeserializable for #name #ty_generics #where_clause {
            fn from_pdx(reader: &mut #pdx::PdxReader) -> ::gridcache_core::Result<Self> {
                #(#read_stmts)*
                #unread_read
                Ok(Self {
                    #(#field_inits,)*
                })
            }
        }
    })
}

fn parse_type_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut result = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("pdx")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type_name") {
                let lit: LitStr = meta.value()?.parse()?;
                result = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error("unsupported pdx struct attribute"))
            }
        })?;
    }
    if let Some(name) = &result {
        if name.is_empty() {
            return Err(syn::Error::new(Span::call_site(), "type_name must not be empty"));
        }
    }
    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("pdx")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("field_name") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.field_name = Some(lit.value());
            } else if meta.path.is_ident("identity") {
                parsed.identity = true;
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else if meta.path.is_ident("unread") {
                parsed.unread = true;
            } else {
                return Err(meta.error("unsupported pdx field attribute"));
            }
            Ok(())
        })?;
    }
    if parsed.skip && parsed.identity {
        return Err(syn::Error::new(
            Span::call_site(),
            "a skipped field cannot be an identity field",
        ));
    }
    Ok(parsed)
}
