// Resume tailor backend HTTP client.
// Handles authentication, tunnel quirks, and response envelope processing.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{
    Client, Method, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
    multipart::{Form, Part},
};
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, TailorError};

use super::Backend;
use super::endpoints::{LOGIN, REGISTER};
use super::types::Envelope;

const NGROK_SKIP_HEADER: &str = "ngrok-skip-browser-warning";
const UPLOAD_FIELD: &str = "resume";

/// Full API root for a configured base URL. `/api` is appended unless present.
pub fn api_base_url(base: &str) -> String {
    let trimmed = base.trim().trim_end_matches('/');
    if trimmed.ends_with("/api") {
        trimmed.to_string()
    } else {
        format!("{}/api", trimmed)
    }
}

/// Whether the URL points at an ngrok tunnel, which serves an interstitial
/// page unless told not to.
pub fn is_ngrok_url(url: &str) -> bool {
    url.contains("ngrok")
}

fn default_headers(ngrok: bool) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("resume-tailor"));
    if ngrok {
        headers.insert(NGROK_SKIP_HEADER, HeaderValue::from_static("true"));
    }
    headers
}

fn non_json_hint(body: &str) -> String {
    if body.contains("ngrok") || body.contains("You have been denied access") {
        ". This looks like the ngrok warning page: check the tunnel is up and points at the backend"
            .to_string()
    } else {
        String::new()
    }
}

/// Routes where a 401 means "wrong email or password", not an expired session.
fn is_credential_route(endpoint: &str) -> bool {
    endpoint == LOGIN || endpoint == REGISTER
}

/// Map a failed status to an error, keeping the backend's own reason.
fn status_error(endpoint: &str, status: u16, reason: Option<String>) -> TailorError {
    match StatusCode::from_u16(status) {
        Ok(StatusCode::UNAUTHORIZED) if !is_credential_route(endpoint) => TailorError::Unauthorized,
        Ok(StatusCode::NOT_FOUND) => {
            TailorError::NotFound(reason.unwrap_or_else(|| format!("Not found: {}", endpoint)))
        }
        _ => TailorError::Backend(
            reason.unwrap_or_else(|| format!("Request failed with status {}", status)),
        ),
    }
}

/// Turn a raw HTTP response into the envelope's `data`, or an error.
pub fn parse_body(
    endpoint: &str,
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> Result<Value> {
    let success_status = (200..300).contains(&status);
    let is_json = content_type
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);

    if !is_json {
        return Err(match status {
            401 | 404 => status_error(endpoint, status, None),
            _ => TailorError::NonJson {
                status,
                hint: non_json_hint(body),
            },
        });
    }

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) if !success_status => return Err(status_error(endpoint, status, None)),
        Err(_) => {
            return Err(TailorError::Backend(
                "Malformed response from the server".to_string(),
            ));
        }
    };
    let envelope: Envelope = serde_json::from_value(value.clone()).unwrap_or_default();
    let reason = envelope.reason().map(str::to_string);

    if !success_status {
        return Err(status_error(endpoint, status, reason));
    }
    if envelope.success == Some(false) {
        return Err(TailorError::Backend(
            reason.unwrap_or_else(|| "Request failed".to_string()),
        ));
    }

    Ok(envelope.data.unwrap_or(value))
}

/// A download answers with the file itself. JSON means the backend refused.
pub fn parse_download(
    endpoint: &str,
    status: u16,
    content_type: Option<&str>,
    bytes: Vec<u8>,
) -> Result<Vec<u8>> {
    let is_json = content_type
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);
    if !is_json && (200..300).contains(&status) {
        return Ok(bytes);
    }

    let text = String::from_utf8_lossy(&bytes);
    parse_body(endpoint, status, content_type, &text)?;
    Err(TailorError::Backend(
        "Download failed: the server sent no file".to_string(),
    ))
}

fn send_error(e: reqwest::Error) -> TailorError {
    if e.is_timeout() {
        TailorError::Timeout
    } else {
        TailorError::Http(e)
    }
}

/// Backend client with bearer authentication.
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl BackendClient {
    /// Create a client for `base_url` (without the `/api` suffix is fine).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = api_base_url(base_url);

        let client = Client::builder()
            .default_headers(default_headers(is_ngrok_url(&base_url)))
            .timeout(timeout)
            .build()
            .map_err(TailorError::Http)?;

        Ok(Self {
            client,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Create a client from configuration and an optional stored token.
    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self> {
        let client = Self::new(&config.api_base_url, config.request_timeout())?;
        client.set_token(token);
        Ok(client)
    }

    pub fn api_base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read() {
            Ok(token) => match token.as_deref() {
                Some(token) => request.bearer_auth(token),
                None => request,
            },
            Err(_) => request,
        }
    }

    async fn read_response(&self, endpoint: &str, response: Response) -> Result<Value> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(send_error)?;

        debug!(endpoint, status, bytes = body.len(), "API response");
        parse_body(endpoint, status, content_type.as_deref(), &body)
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn call(&self, endpoint: &str, method: Method, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%method, %url, "API request");

        let mut request = self.authorize(self.client.request(method, &url));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(send_error)?;
        self.read_response(endpoint, response).await
    }

    async fn upload(&self, endpoint: &str, file_name: &str, bytes: Vec<u8>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, file_name, bytes = bytes.len(), "API upload");

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(send_error)?;
        self.read_response(endpoint, response).await
    }

    async fn download(&self, endpoint: &str, body: Value) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "API download");

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(send_error)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(send_error)?;

        debug!(endpoint, status, bytes = bytes.len(), "API download response");
        parse_download(endpoint, status, content_type.as_deref(), bytes.to_vec())
    }

    fn set_token(&self, token: Option<String>) {
        if let Ok(mut current) = self.token.write() {
            *current = token;
        }
    }
}
