use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Fields are raw JSON so a wrongly typed value becomes a validation error
/// rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

/// Kept as raw JSON so each field's shape can be checked before decoding.
#[derive(Debug, Deserialize)]
pub struct EmailResultsRequest {
    #[serde(default)]
    pub email: Option<serde_json::Value>,
    #[serde(default)]
    pub query: Option<serde_json::Value>,
    #[serde(default)]
    pub results: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub cache_backend: &'static str,
    pub cache_reachable: bool,
    pub providers: Vec<String>,
    pub cache_ttl_seconds: u64,
    pub email_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
}
