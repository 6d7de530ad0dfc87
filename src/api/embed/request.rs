// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! EmbedRequest type for POST /embed
//!
//! The raw body is checked field by field; every malformed request maps to
//! a structured [`ApiError`].

use crate::api::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for POST /embed
///
/// # Example
/// ```json
/// {
///   "inputs": ["fn main() {}", "parse a config file"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    /// Texts to embed, in the order their vectors are returned
    pub inputs: Vec<String>,
}

impl EmbedRequest {
    pub fn new(inputs: Vec<String>) -> Self {
        Self { inputs }
    }

    /// Parses and validates a raw request body
    ///
    /// # Validation Rules
    /// 1. The body must be JSON (else `InvalidRequest`)
    /// 2. The body must be an object with an `inputs` field
    /// 3. `inputs` must be an array
    /// 4. Every element of `inputs` must be a string
    ///
    /// An empty `inputs` array is valid. Unknown fields are ignored.
    pub fn from_json_bytes(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ApiError::InvalidRequest(format!("body is not valid JSON: {}", e)))?;

        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let Value::Object(mut body) = value else {
            return Err(ApiError::ValidationError {
                field: "body".to_string(),
                message: "request body must be a JSON object".to_string(),
            });
        };

        let inputs = match body.remove("inputs") {
            None => {
                return Err(ApiError::ValidationError {
                    field: "inputs".to_string(),
                    message: "field required".to_string(),
                })
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(ApiError::ValidationError {
                    field: "inputs".to_string(),
                    message: format!("must be a list of strings, got {}", json_type(&other)),
                })
            }
        };

        let inputs = inputs
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(text) => Ok(text),
                other => Err(ApiError::ValidationError {
                    field: format!("inputs[{}]", index),
                    message: format!("must be a string, got {}", json_type(&other)),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { inputs })
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
