use proc_macro2::TokenStream;
use quote::quote;
use syn::{DeriveInput, Type};

use crate::{Role, TypeAttrs, parse_field_attrs};

/// Generates the Bind methods of a struct with named fields.
pub fn generate_record(
    class_name: &str,
    attrs: &TypeAttrs,
    data: &syn::DataStruct,
    input: &DeriveInput,
) -> syn::Result<TokenStream> {
    let syn::Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            input,
            "Bind can only be derived for structs with named fields",
        ));
    };

    let mut descriptors = Vec::new();
    let mut sets = Vec::new();
    let mut gets = Vec::new();

    for field in &fields.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        if attrs.skip {
            gets.push(quote! { #ident: ::std::default::Default::default() });
            continue;
        }

        let name = attrs.rename.clone().unwrap_or_else(|| ident.to_string());
        let ty = &field.ty;
        let role = match attrs.role {
            Role::Attribute => quote! { Attribute },
            Role::Element => quote! { Element },
            Role::Text => quote! { Text },
            Role::Collection => quote! { Collection },
        };
        let option = is_option(ty);
        let optional = (attrs.optional || option).then(|| quote! { .optional() });
        let entry = attrs.entry.as_ref().map(|entry| quote! { .entry(#entry) });

        descriptors.push(quote! {
            ::lattice_core::Field::new(
                #name,
                ::lattice_core::Role::#role,
                ::lattice_core::ClassSource::Deferred(<#ty as ::lattice_core::Bind>::class),
            )
            #optional
            #entry
        });
        sets.push(quote! {
            object.set(#name, ::lattice_core::Bind::to_value(&self.#ident));
        });
        if attrs.optional && !option {
            gets.push(quote! {
                #ident: match object.value(#name) {
                    ::lattice_core::Value::Null => ::std::default::Default::default(),
                    value => <#ty as ::lattice_core::Bind>::from_value(&value)?,
                }
            });
        } else {
            gets.push(quote! {
                #ident: <#ty as ::lattice_core::Bind>::from_value(&object.value(#name))?
            });
        }
    }

    let root = attrs.root.as_ref().map(|root| quote! { .root(#root) });

    Ok(quote! {
        fn class() -> ::lattice_core::ClassRef {
            static CLASS: ::std::sync::OnceLock<::lattice_core::ClassRef> = ::std::sync::OnceLock::new();
            CLASS
                .get_or_init(|| {
                    ::lattice_core::Class::record(#class_name)
                        #root
                        #(.field(#descriptors))*
                        .build()
                })
                .clone()
        }

        fn to_value(&self) -> ::lattice_core::Value {
            let mut object = ::lattice_core::Object::new(<Self as ::lattice_core::Bind>::class());
            #(#sets)*
            ::lattice_core::Value::Object(object.into_shared())
        }

        fn from_value(value: &::lattice_core::Value) -> ::lattice_core::Result<Self> {
            let object = value.as_object().ok_or_else(|| {
                ::lattice_core::Error::invalid(#class_name, ::std::format!("{value:?}"), "expected an object")
            })?;
            let object = object.borrow();
            Ok(Self {
                #(#gets),*
            })
        }
    })
}

/// Generates the Bind methods of an enum whose variants are all unit.
pub fn generate_enumeration(class_name: &str, data: &syn::DataEnum, input: &DeriveInput) -> syn::Result<TokenStream> {
    let mut idents = Vec::new();
    let mut names = Vec::new();

    for variant in &data.variants {
        if !matches!(variant.fields, syn::Fields::Unit) {
            return Err(syn::Error::new_spanned(
                input,
                "Bind can only be derived for enums whose variants are all unit",
            ));
        }
        let attrs = parse_field_attrs(&variant.attrs)?;
        idents.push(&variant.ident);
        names.push(attrs.rename.unwrap_or_else(|| variant.ident.to_string()));
    }

    Ok(quote! {
        fn class() -> ::lattice_core::ClassRef {
            static CLASS: ::std::sync::OnceLock<::lattice_core::ClassRef> = ::std::sync::OnceLock::new();
            CLASS
                .get_or_init(|| ::lattice_core::Class::enumeration(#class_name, [#(#names),*]))
                .clone()
        }

        fn to_value(&self) -> ::lattice_core::Value {
            let name = match self {
                #(Self::#idents => #names,)*
            };
            ::lattice_core::Value::Enum(name.to_string())
        }

        fn from_value(value: &::lattice_core::Value) -> ::lattice_core::Result<Self> {
            match value.as_str() {
                #(Some(#names) => Ok(Self::#idents),)*
                _ => Err(::lattice_core::Error::invalid(
                    #class_name,
                    ::std::format!("{value:?}"),
                    "not a variant",
                )),
            }
        }
    })
}

/// Returns true for `Option<T>`, which is optional without an attribute.
fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
