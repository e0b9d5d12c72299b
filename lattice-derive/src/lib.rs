use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

mod class;

/// Derive macro for the Bind trait.
///
/// Generates `class()`, `to_value()` and `from_value()`. Structs with named
/// fields become record classes; enums whose variants are all unit become
/// enumeration classes.
///
/// # Example
///
/// ```ignore
/// use lattice_core::Bind;
///
/// #[derive(Bind)]
/// #[bind(root = "person")]
/// struct Person {
///     #[bind(attribute)]
///     name: String,
///     #[bind(collection, rename = "friend")]
///     friends: Vec<Person>,
///     email: Option<String>,
/// }
/// ```
///
/// # Attributes
///
/// On the type:
/// - `#[bind(rename = "Name")]` - Class name, used in type labels
/// - `#[bind(root = "name")]` - Element name when the type is the document root
///
/// On fields:
/// - `#[bind(attribute)]`, `#[bind(element)]`, `#[bind(text)]`, `#[bind(collection)]` -
///   How the field is laid out; `element` is the default
/// - `#[bind(rename = "name")]` - Attribute or element name
/// - `#[bind(optional)]` - May be absent; implied for `Option<T>`. Other
///   types read an absent field as `Default::default()`
/// - `#[bind(entry = "item")]` - Element name of array entries
/// - `#[bind(skip)]` - Not bound (field must impl Default)
///
/// On variants:
/// - `#[bind(rename = "NAME")]` - Variant name in the document
#[proc_macro_derive(Bind, attributes(bind))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_bind_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_bind_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Bind cannot be derived for generic types",
        ));
    }

    let name = &input.ident;
    let attrs = parse_type_attrs(&input.attrs)?;
    let class_name = attrs.rename.clone().unwrap_or_else(|| name.to_string());

    let body = match &input.data {
        syn::Data::Struct(data) => class::generate_record(&class_name, &attrs, data, input)?,
        syn::Data::Enum(data) => class::generate_enumeration(&class_name, data, input)?,
        syn::Data::Union(_) => {
            return Err(syn::Error::new_spanned(input, "Bind cannot be derived for unions"));
        }
    };

    Ok(quote! {
        impl ::lattice_core::Bind for #name {
            #body
        }
    })
}

#[derive(Default)]
pub(crate) struct TypeAttrs {
    pub rename: Option<String>,
    pub root: Option<String>,
}

fn parse_type_attrs(attrs: &[syn::Attribute]) -> syn::Result<TypeAttrs> {
    let mut result = TypeAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("root") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.root = Some(value.value());
            } else {
                return Err(meta.error("unsupported bind attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}

#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Role {
    Attribute,
    #[default]
    Element,
    Text,
    Collection,
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
    pub role: Role,
    pub optional: bool,
    pub entry: Option<String>,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("bind") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("entry") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.entry = Some(value.value());
            } else if meta.path.is_ident("optional") {
                result.optional = true;
            } else if meta.path.is_ident("attribute") {
                result.role = Role::Attribute;
            } else if meta.path.is_ident("element") {
                result.role = Role::Element;
            } else if meta.path.is_ident("text") {
                result.role = Role::Text;
            } else if meta.path.is_ident("collection") {
                result.role = Role::Collection;
            } else {
                return Err(meta.error("unsupported bind attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
