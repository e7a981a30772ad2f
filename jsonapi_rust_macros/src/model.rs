use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr};

enum BindingKind {
    Attribute,
    ToOne,
    ToMany,
}

impl BindingKind {
    fn registry_method(&self) -> Ident {
        match self {
            BindingKind::Attribute => format_ident!("attribute"),
            BindingKind::ToOne => format_ident!("to_one"),
            BindingKind::ToMany => format_ident!("to_many"),
        }
    }
}

struct FieldBinding {
    field: Ident,
    key: String,
    kind: BindingKind,
}

#[derive(Default)]
struct FieldOptions {
    id: bool,
    blank: bool,
    binding: Option<(BindingKind, Option<String>)>,
}

pub fn derive_json_api_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let model_name = extract_model_name(input)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "JsonApiModel derive requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "JsonApiModel derive only supports structs",
            ))
        }
    };

    let mut id_field = None;
    let mut blank_field = None;
    let mut bindings = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let options = field_options(field)?;
        if options.id {
            id_field = Some(ident.clone());
        }
        if options.blank {
            blank_field = Some(ident.clone());
        }
        if let Some((kind, key)) = options.binding {
            bindings.push(FieldBinding {
                key: key.unwrap_or_else(|| ident.to_string()),
                field: ident,
                kind,
            });
        }
    }

    let id_field = id_field
        .or_else(|| find_named(fields, "id"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                name,
                "JsonApiModel derive: no field marked with #[jsonapi(id)] and no field named `id`",
            )
        })?;
    let blank_field = blank_field
        .or_else(|| find_named(fields, "is_blank"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                name,
                "JsonApiModel derive: no field marked with #[jsonapi(blank)] and no field named `is_blank`",
            )
        })?;

    for (i, binding) in bindings.iter().enumerate() {
        if bindings[..i].iter().any(|b| b.key == binding.key) {
            return Err(syn::Error::new(
                binding.field.span(),
                format!("JsonApiModel derive: JSON key `{}` is bound twice", binding.key),
            ));
        }
    }

    let registrations = bindings.iter().map(|binding| {
        let method = binding.kind.registry_method();
        let field = &binding.field;
        let key = LitStr::new(&binding.key, Span::call_site());
        quote! {
            registry.#method(#key, |m| &m.#field, |m| &mut m.#field);
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::jsonapi_rust::Model for #name #ty_generics #where_clause {
            const MODEL_NAME: &'static str = #model_name;

            fn id(&self) -> &str {
                &self.#id_field
            }

            fn set_id(&mut self, id: &str) {
                self.#id_field = ::std::string::String::from(id);
            }

            fn is_blank(&self) -> bool {
                self.#blank_field
            }

            fn set_blank(&mut self, blank: bool) {
                self.#blank_field = blank;
            }

            #[allow(unused_variables)]
            fn register(registry: &mut ::jsonapi_rust::Registry<Self>) {
                #(#registrations)*
            }
        }
    })
}

fn extract_model_name(input: &DeriveInput) -> syn::Result<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("jsonapi") {
            continue;
        }

        let mut model_name = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("type") {
                let value: LitStr = meta.value()?.parse()?;
                model_name = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("expected `type = \"...\"`"))
            }
        })?;

        if let Some(name) = model_name {
            return Ok(name);
        }
    }

    // Default: snake_case struct name + "s"
    let name = input.ident.to_string();
    Ok(format!("{}s", to_snake_case(&name)))
}

fn field_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("jsonapi") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            let kind = if meta.path.is_ident("id") {
                options.id = true;
                return Ok(());
            } else if meta.path.is_ident("blank") {
                options.blank = true;
                return Ok(());
            } else if meta.path.is_ident("attribute") {
                BindingKind::Attribute
            } else if meta.path.is_ident("to_one") {
                BindingKind::ToOne
            } else if meta.path.is_ident("to_many") {
                BindingKind::ToMany
            } else {
                return Err(meta.error(
                    "expected one of `id`, `blank`, `attribute`, `to_one`, `to_many`",
                ));
            };

            if options.binding.is_some() {
                return Err(meta.error("a field can only have one binding"));
            }
            let key = if meta.input.peek(syn::Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                Some(value.value())
            } else {
                None
            };
            options.binding = Some((kind, key));
            Ok(())
        })?;
    }
    Ok(options)
}

fn find_named(fields: &syn::punctuated::Punctuated<Field, syn::token::Comma>, name: &str) -> Option<Ident> {
    fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .find(|ident| *ident == name)
        .cloned()
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
