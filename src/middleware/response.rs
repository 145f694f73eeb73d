use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

pub const YAML_CONTENT_TYPE: &str = "application/yaml";

/// A YAML stream response: one document per item
#[derive(Debug)]
pub struct YamlDocuments<T: Serialize>(pub Vec<T>);

impl<T: Serialize> YamlDocuments<T> {
    pub fn one(item: T) -> Self {
        Self(vec![item])
    }

    fn render(&self) -> Result<String, serde_yaml::Error> {
        let mut body = String::new();
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                body.push_str("---\n");
            }
            body.push_str(&serde_yaml::to_string(item)?);
        }
        Ok(body)
    }
}

impl<T: Serialize> IntoResponse for YamlDocuments<T> {
    fn into_response(self) -> Response {
        match self.render() {
            Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, YAML_CONTENT_TYPE)], body).into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                ApiError::internal_server_error("Failed to encode response").into_response()
            }
        }
    }
}
