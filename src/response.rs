//! JSON envelope shared by every non-streaming response.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};

pub const CODE_OK: i32 = 0;
pub const CODE_ERR: i32 = -1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "errorMsg", skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl Envelope {
    pub fn success(data: impl Into<Value>) -> Self {
        Self {
            code: CODE_OK,
            data: Some(data.into()),
            error_msg: None,
        }
    }

    pub fn success_empty() -> Self {
        Self::success(json!({}))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: CODE_ERR,
            data: None,
            error_msg: Some(message.into()),
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
