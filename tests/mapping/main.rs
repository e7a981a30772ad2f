//! Integration tests for document mapping and `included` graph resolution.

#[path = "../support/models.rs"]
mod models;

use jsonapi_rust::document::{parse_many_value, parse_one_value};
use jsonapi_rust::{parse_many, parse_one, Coordinate, MappingError, Model, Shared, ToMany, ToOne};
use models::{article, author, Article, Author, Comment};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn article_by_42() -> Value {
    json!({
        "type": "articles",
        "id": "1",
        "attributes": { "title": "Hello" },
        "relationships": {
            "author": { "data": { "id": "42", "type": "authors" } }
        }
    })
}

fn john() -> Value {
    json!({
        "type": "authors",
        "id": "42",
        "attributes": { "name": "John", "age": 80 }
    })
}

#[test]
fn included_author_is_materialized() {
    let document = json!({ "data": article_by_42(), "included": [john()] });
    let article = parse_one::<Article>(document.to_string().as_bytes()).unwrap();

    let author = article.read().author.get().cloned().unwrap();
    assert_eq!(author.read().name, "John");
    assert_eq!(author.read().age, 80);
    assert!(!author.is_blank());
}

#[test]
fn missing_included_keeps_stub() {
    let document = json!({ "data": article_by_42() });
    let article = parse_one::<Article>(document.to_string().as_bytes()).unwrap();

    let author = article.read().author.get().cloned().unwrap();
    assert_eq!(author.id(), "42");
    assert!(author.is_blank());
    assert!(author.read().name.is_empty());
    assert!(!article.is_blank());
}

#[test]
fn to_many_serializes_in_order() {
    let mut article = article("1", "Pair");
    article.authors.push(author("1", "Ann", 30));
    article.authors.push(author("2", "Bob", 40));

    let body = article.create_parameters();
    assert_eq!(
        body["data"]["relationships"]["authors"]["data"],
        json!([
            { "type": "authors", "id": "1" },
            { "type": "authors", "id": "2" }
        ])
    );
}

#[test]
fn shared_author_is_one_instance() {
    let mut second = article_by_42();
    second["id"] = json!("2");
    let document = json!({ "data": [article_by_42(), second], "included": [john()] });

    let articles = parse_many_value::<Article>(&document).unwrap();
    let first_author = articles[0].read().author.get().cloned().unwrap();
    let second_author = articles[1].read().author.get().cloned().unwrap();
    assert!(first_author.ptr_eq(&second_author));
}

#[test]
fn stub_without_included_is_shared_too() {
    let mut second = article_by_42();
    second["id"] = json!("2");
    let document = json!({ "data": [article_by_42(), second] });

    let articles = parse_many_value::<Article>(&document).unwrap();
    let a = articles[0].read().author.get().cloned().unwrap();
    let b = articles[1].read().author.get().cloned().unwrap();
    assert!(a.ptr_eq(&b));
    assert!(a.is_blank());
}

#[test]
fn back_reference_reuses_root() {
    let mut author = john();
    author["relationships"] = json!({
        "articles": { "data": [{ "type": "articles", "id": "1" }] }
    });
    let document = json!({ "data": article_by_42(), "included": [author] });

    let article = parse_one_value::<Article>(&document).unwrap();
    let author = article.read().author.get().cloned().unwrap();
    let back = author.read().articles.get(0).cloned().unwrap();
    assert!(back.ptr_eq(&article));

    // break the cycle
    author.write().articles = ToMany::default();
}

#[test]
fn nested_relationships_resolve_depth_first() {
    let document = json!({
        "data": {
            "type": "articles",
            "id": "1",
            "attributes": { "title": "Threads" },
            "relationships": {
                "comments": { "data": [
                    { "type": "comments", "id": "c2" },
                    { "type": "comments", "id": "c1" }
                ] }
            }
        },
        "included": [
            {
                "type": "comments",
                "id": "c1",
                "attributes": { "body": "first!" },
                "relationships": { "author": { "data": { "type": "authors", "id": "42" } } }
            },
            {
                "type": "comments",
                "id": "c2",
                "attributes": { "body": "agreed" },
                "relationships": { "author": { "data": { "type": "authors", "id": "42" } } }
            },
            john()
        ]
    });

    let article = parse_one_value::<Article>(&document).unwrap();
    let comments: Vec<Shared<Comment>> = article.read().comments.iter().cloned().collect();
    assert_eq!(comments[0].read().uuid, "c2");
    assert_eq!(comments[1].read().body, "first!");

    let a = comments[0].read().written_by.get().cloned().unwrap();
    let b = comments[1].read().written_by.get().cloned().unwrap();
    assert!(a.ptr_eq(&b));
    assert_eq!(a.read().name, "John");
}

#[test]
fn first_included_duplicate_wins() {
    let mut duplicate = john();
    duplicate["attributes"]["name"] = json!("Johnny");
    let document = json!({ "data": article_by_42(), "included": [john(), duplicate] });

    let article = parse_one_value::<Article>(&document).unwrap();
    let author = article.read().author.get().cloned().unwrap();
    assert_eq!(author.read().name, "John");
}

#[test]
fn update_body_parses_back() {
    let mut original = article("7", "Round trip");
    original.word_count = Some(1200);
    original.tags = vec!["rust".into(), "serde".into()];
    original.location = Some(Coordinate::new(52.52, 13.40));
    original.author = ToOne::new(author("42", "John", 80));
    original.comments.push(Comment {
        uuid: "c1".into(),
        ..Comment::default()
    });
    original.draft_notes = "not sent".into();

    let parsed = parse_one_value::<Article>(&original.update_parameters()).unwrap();
    let parsed = parsed.read();
    assert_eq!(parsed.id, "7");
    assert_eq!(parsed.title, original.title);
    assert_eq!(parsed.word_count, Some(1200));
    assert_eq!(parsed.tags, original.tags);
    assert_eq!(parsed.location, original.location);
    assert_eq!(parsed.author, original.author);
    assert_eq!(parsed.comments, original.comments);
    assert!(parsed.draft_notes.is_empty());
}

#[test]
fn none_attribute_is_omitted_from_body() {
    let body = article("1", "Short").create_parameters();
    let attributes = body["data"]["attributes"].as_object().unwrap();
    assert!(!attributes.contains_key("word-count"));
    assert!(!attributes.contains_key("location"));
    assert!(!attributes.contains_key("draft_notes"));
    assert_eq!(attributes["tags"], json!([]));
    assert!(body["data"].get("id").is_none());
}

#[test]
fn unloaded_relationship_is_left_out_of_update() {
    let document = json!({ "data": { "type": "articles", "id": "1", "attributes": { "title": "T" } } });
    let article = parse_one_value::<Article>(&document).unwrap();

    let body = article.read().update_parameters();
    let relationships = body["data"]["relationships"].as_object().unwrap();
    assert!(!relationships.contains_key("author"));
    assert_eq!(body["data"]["id"], json!("1"));
}

#[test]
fn absent_and_mistyped_fields_keep_defaults() {
    let document = json!({
        "data": {
            "type": "articles",
            "id": "1",
            "attributes": { "title": 5, "word-count": 300 }
        }
    });
    let article = parse_one_value::<Article>(&document).unwrap();
    let article = article.read();
    assert_eq!(article.title, "");
    assert_eq!(article.word_count, Some(300));
    assert!(article.author.is_none());
    assert!(article.comments.is_empty());
}

#[test]
fn mismatched_root_type_still_maps() {
    let document = json!({ "data": { "type": "posts", "id": "1", "attributes": { "title": "Odd" } } });
    let article = parse_one_value::<Article>(&document).unwrap();
    assert_eq!(article.read().title, "Odd");
}

#[test]
fn derive_defaults() {
    assert_eq!(Article::MODEL_NAME, "articles");
    assert_eq!(Comment::MODEL_NAME, "comments");

    let stub = Comment::stub("c9");
    assert_eq!(stub.uuid, "c9");
    assert!(stub.stub);

    let keys: Vec<String> = Article::registry()
        .bindings()
        .map(|b| b.json_key().to_string())
        .collect();
    assert_eq!(
        keys,
        vec!["title", "word-count", "tags", "location", "author", "authors", "comments"]
    );
}

#[test]
fn mapping_errors_are_reported() {
    assert!(matches!(
        parse_one::<Author>(b"nope"),
        Err(MappingError::MalformedJson(_))
    ));
    assert_eq!(
        parse_many::<Author>(br#"{"errors": []}"#).unwrap_err(),
        MappingError::MissingData
    );
}
