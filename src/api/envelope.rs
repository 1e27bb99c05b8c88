//! Response envelope shared by the REST API and `--format json`
//!
//! ```json
//! {"success": true, "data": {...}}
//! {"success": false, "error": {"message": "...", "code": "NOT_FOUND"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EngineError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                message: message.into(),
                code: code.into(),
            }),
        }
    }

    /// Envelope for an engine error; internal detail never leaves the process
    pub fn from_error(err: &EngineError) -> Self {
        Self::err(err.public_message(), err.code())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({
                "success": false,
                "error": {"message": "Internal server error", "code": "INTERNAL_ERROR"},
            })
        })
    }
}
