//! Conversion of decoded YAML trees into JSON-safe trees.
//!
//! YAML allows mapping keys of any type (`1: a`, `true: b`, `[x]: c`) while
//! JSON objects only have string keys, so every mapping is checked and
//! rebuilt with string keys before a document can be persisted as JSON.

use serde_json::{Map, Number, Value as Json};
use serde_yaml::Value as Yaml;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("map keys must be strings (found {key})")]
    NonStringKey { key: String },

    #[error("number {0} cannot be represented in JSON")]
    NonFiniteNumber(String),

    #[error("nesting exceeds maximum depth of {max_depth}")]
    TooDeep { max_depth: usize },
}

/// Rewrite `node` into a JSON tree.
///
/// Sequences keep their order and scalars pass through. A mapping whose
/// key is not a string fails the whole conversion. YAML tags are dropped
/// and their inner value kept. `max_depth` bounds the number of nested
/// sequences/mappings since documents arrive over HTTP.
pub fn normalize(node: &Yaml, max_depth: usize) -> Result<Json, DocumentError> {
    normalize_at(node, 0, max_depth)
}

fn normalize_at(node: &Yaml, depth: usize, max_depth: usize) -> Result<Json, DocumentError> {
    match node {
        Yaml::Null => Ok(Json::Null),
        Yaml::Bool(b) => Ok(Json::Bool(*b)),
        Yaml::Number(n) => number(n),
        Yaml::String(s) => Ok(Json::String(s.clone())),
        Yaml::Sequence(items) => {
            check_depth(depth, max_depth)?;
            items
                .iter()
                .map(|item| normalize_at(item, depth + 1, max_depth))
                .collect::<Result<Vec<_>, _>>()
                .map(Json::Array)
        }
        Yaml::Mapping(mapping) => {
            check_depth(depth, max_depth)?;
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                let Yaml::String(key) = key else {
                    return Err(DocumentError::NonStringKey { key: describe_key(key) });
                };
                object.insert(key.clone(), normalize_at(value, depth + 1, max_depth)?);
            }
            Ok(Json::Object(object))
        }
        Yaml::Tagged(tagged) => normalize_at(&tagged.value, depth, max_depth),
    }
}

fn check_depth(depth: usize, max_depth: usize) -> Result<(), DocumentError> {
    if depth >= max_depth {
        return Err(DocumentError::TooDeep { max_depth });
    }
    Ok(())
}

fn number(n: &serde_yaml::Number) -> Result<Json, DocumentError> {
    if let Some(i) = n.as_i64() {
        return Ok(Json::Number(i.into()));
    }
    if let Some(u) = n.as_u64() {
        return Ok(Json::Number(u.into()));
    }
    n.as_f64()
        .and_then(Number::from_f64)
        .map(Json::Number)
        .ok_or_else(|| DocumentError::NonFiniteNumber(n.to_string()))
}

fn describe_key(key: &Yaml) -> String {
    match key {
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::String(s) => s.clone(),
        Yaml::Sequence(_) => "a sequence".to_string(),
        Yaml::Mapping(_) => "a mapping".to_string(),
        Yaml::Tagged(tagged) => format!("{} {}", tagged.tag, describe_key(&tagged.value)),
    }
}
