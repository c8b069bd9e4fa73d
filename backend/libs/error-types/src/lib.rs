//! Response envelope used on both sides of the gateway boundary
//!
//! Every response body, success or failure, is
//! `{"success": bool, "data": <payload>?, "error": <string>?}`.
//! Failures always carry a non-empty `error`; `data` is omitted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// An empty message is replaced so clients never see `"error": ""`.
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            data: None,
            error: Some(if message.trim().is_empty() {
                "request failed".to_string()
            } else {
                message
            }),
        }
    }

    /// The error message, or a generic one if the peer sent none.
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("request failed")
    }
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: i64,
}
