//! JSON:API documents: response parsing and request bodies.

use serde_json::{json, Value};

use crate::error::MappingError;
use crate::model::{Model, Shared};
use crate::object_store::{Included, ObjectStore};

/// Map a single-resource response body.
pub fn parse_one<M: Model>(body: &[u8]) -> Result<Shared<M>, MappingError> {
    let document: Value = serde_json::from_slice(body)?;
    parse_one_value(&document)
}

/// Map a collection response body. Order follows the `data` array.
pub fn parse_many<M: Model>(body: &[u8]) -> Result<Vec<Shared<M>>, MappingError> {
    let document: Value = serde_json::from_slice(body)?;
    parse_many_value(&document)
}

pub fn parse_one_value<M: Model>(document: &Value) -> Result<Shared<M>, MappingError> {
    let data = document.get("data").ok_or(MappingError::MissingData)?;
    if !data.is_object() {
        return Err(MappingError::UnexpectedShape {
            expected: "resource object",
        });
    }
    let included = Included::from_document(document);
    let mut store = ObjectStore::new();
    Ok(store.map_root(data, &included))
}

pub fn parse_many_value<M: Model>(document: &Value) -> Result<Vec<Shared<M>>, MappingError> {
    let data = document
        .get("data")
        .ok_or(MappingError::MissingData)?
        .as_array()
        .ok_or(MappingError::UnexpectedShape {
            expected: "array of resource objects",
        })?;
    let included = Included::from_document(document);
    let mut store = ObjectStore::new();
    Ok(data
        .iter()
        .map(|resource| store.map_root(resource, &included))
        .collect())
}

/// `{"data": {"type", ["id"], "attributes", "relationships"}}` for `model`.
pub fn resource_body<M: Model>(model: &M, with_id: bool) -> Value {
    let mut resource = json!({
        "type": M::MODEL_NAME,
        "attributes": model.attributes_json(),
        "relationships": model.relationships_json(),
    });
    if with_id {
        resource["id"] = Value::String(model.id().to_string());
    }
    json!({ "data": resource })
}
