mod model;

use proc_macro::TokenStream;

/// Derive macro that implements `jsonapi_rust::Model` for a struct.
///
/// # Usage
///
/// ```ignore
/// #[derive(Default, JsonApiModel)]
/// #[jsonapi(type = "articles")]
/// struct Article {
///     id: String,
///     is_blank: bool,
///     #[jsonapi(attribute)]
///     title: String,
///     #[jsonapi(attribute = "published-at")]
///     published_at: Option<String>,
///     #[jsonapi(to_one)]
///     author: ToOne<Author>,
///     #[jsonapi(to_many = "comments")]
///     replies: ToMany<Comment>,
/// }
/// ```
///
/// Struct attributes:
/// - `type = "..."`: JSON:API type. Defaults to the snake_case struct name
///   plus `s`.
///
/// Field attributes:
/// - `id`: the id field. Defaults to a field named `id`.
/// - `blank`: the blank flag. Defaults to a field named `is_blank`.
/// - `attribute`, `to_one`, `to_many`: bind the field, optionally under a
///   different JSON key. Bindings are registered in field order.
///
/// Fields without a binding attribute are not serialized.
#[proc_macro_derive(JsonApiModel, attributes(jsonapi))]
pub fn derive_json_api_model(input: TokenStream) -> TokenStream {
    model::derive_json_api_model(input)
}
