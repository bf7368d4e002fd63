// Resume tailor backend API module.
// Provides the transport seam, the reqwest client, and typed endpoint calls.

pub mod client;
pub mod endpoints;
pub mod types;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::Result;

pub use client::BackendClient;
pub use types::{
    DocumentFormat, Envelope, LoginResponse, Page, Pagination, ResumeInfo, ResumeVersion,
    TailorRequest, resume_id_of,
};

/// Transport to the tailoring backend. Implementations unwrap the response
/// envelope and return its `data`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// JSON request to `endpoint` (relative to the API root).
    async fn call(&self, endpoint: &str, method: Method, body: Option<Value>) -> Result<Value>;

    /// Multipart file upload.
    async fn upload(&self, endpoint: &str, file_name: &str, bytes: Vec<u8>) -> Result<Value>;

    /// POST `body` and return the raw file the backend sends back.
    async fn download(&self, endpoint: &str, body: Value) -> Result<Vec<u8>>;

    /// Replace the bearer token sent with later requests.
    fn set_token(&self, _token: Option<String>) {}
}
