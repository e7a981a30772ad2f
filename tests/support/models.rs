//! Shared models for the integration suites.
#![allow(dead_code)]

use jsonapi_rust::{Coordinate, JsonApiModel, ToMany, ToOne};

#[derive(Default, Debug, JsonApiModel)]
#[jsonapi(type = "authors")]
pub struct Author {
    pub id: String,
    pub is_blank: bool,
    #[jsonapi(attribute)]
    pub name: String,
    #[jsonapi(attribute)]
    pub age: u32,
    #[jsonapi(to_many)]
    pub articles: ToMany<Article>,
}

#[derive(Default, Debug, JsonApiModel)]
#[jsonapi(type = "articles")]
pub struct Article {
    pub id: String,
    pub is_blank: bool,
    #[jsonapi(attribute)]
    pub title: String,
    #[jsonapi(attribute = "word-count")]
    pub word_count: Option<u32>,
    #[jsonapi(attribute)]
    pub tags: Vec<String>,
    #[jsonapi(attribute)]
    pub location: Option<Coordinate>,
    #[jsonapi(to_one)]
    pub author: ToOne<Author>,
    #[jsonapi(to_many)]
    pub authors: ToMany<Author>,
    #[jsonapi(to_many)]
    pub comments: ToMany<Comment>,
    /// Local only; never serialized.
    pub draft_notes: String,
}

/// Uses the default type name and non-default id and blank fields.
#[derive(Default, Debug, JsonApiModel)]
pub struct Comment {
    #[jsonapi(id)]
    pub uuid: String,
    #[jsonapi(blank)]
    pub stub: bool,
    #[jsonapi(attribute)]
    pub body: String,
    #[jsonapi(to_one = "author")]
    pub written_by: ToOne<Author>,
}

pub fn author(id: &str, name: &str, age: u32) -> Author {
    Author {
        id: id.into(),
        name: name.into(),
        age,
        ..Author::default()
    }
}

pub fn article(id: &str, title: &str) -> Article {
    Article {
        id: id.into(),
        title: title.into(),
        ..Article::default()
    }
}
