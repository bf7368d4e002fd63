// Backend endpoint functions.
// Typed wrappers over the raw transport for each route the popup uses.

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, TailorError};

use super::Backend;
use super::types::{
    DownloadRequest, LoginRequest, LoginResponse, Page, RegisterRequest, RenameRequest, ResumeInfo,
    ResumeRef, ResumeVersion, TailorRequest, VersionRef,
};

pub const LOGIN: &str = "/login";
pub const REGISTER: &str = "/register";
pub const LOGOUT: &str = "/logout";
pub const CURRENT_USER: &str = "/me";
pub const DEFAULT_RESUME: &str = "/resume";
pub const UPLOAD_RESUME: &str = "/upload-resume";
pub const TAILOR_RESUME: &str = "/tailor-resume";
pub const RESUMES: &str = "/resumes";
pub const SET_DEFAULT_RESUME: &str = "/set-default-resume";
pub const RENAME_RESUME: &str = "/update-resume-name";
pub const DELETE_RESUME: &str = "/delete-resume";
pub const RESUME_VERSIONS: &str = "/resume-versions";
pub const PROMOTE_VERSION: &str = "/promote-version-to-main";
pub const DELETE_VERSION: &str = "/delete-resume-version";
pub const DOWNLOAD_TAILORED: &str = "/download-tailored-resume";

/// Page size used by the resume and version listings.
pub const PAGE_SIZE: u32 = 10;

fn decode<T: DeserializeOwned>(endpoint: &str, data: Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| TailorError::Backend(format!("Unexpected response from {}: {}", endpoint, e)))
}

/// Listing route with its page query. Pages start at 1.
pub fn page_route(route: &str, page: u32, limit: u32) -> String {
    format!("{}?page={}&limit={}", route, page.max(1), limit.max(1))
}

/// Listings come as `{ <key>: [..], pagination }`, or as a bare array.
fn decode_page<T: DeserializeOwned>(endpoint: &str, key: &str, data: Value) -> Result<Page<T>> {
    let (items, pagination) = match data {
        Value::Null => (Value::Array(Vec::new()), None),
        items @ Value::Array(_) => (items, None),
        Value::Object(mut fields) => (
            fields.remove(key).unwrap_or(Value::Array(Vec::new())),
            fields.remove("pagination").filter(|p| !p.is_null()),
        ),
        other => {
            return Err(TailorError::Backend(format!(
                "Unexpected response from {}: {}",
                endpoint, other
            )));
        }
    };

    Ok(Page {
        items: decode(endpoint, items)?,
        pagination: pagination.map(|p| decode(endpoint, p)).transpose()?,
    })
}

fn body<T: serde::Serialize>(request: &T) -> Result<Option<Value>> {
    Ok(Some(serde_json::to_value(request)?))
}

/// Exchange email and password for a token.
pub async fn login(backend: &dyn Backend, email: &str, password: &str) -> Result<LoginResponse> {
    let data = backend
        .call(LOGIN, Method::POST, body(&LoginRequest { email, password })?)
        .await?;
    decode(LOGIN, data)
}

/// Create an account. Signs the user in on success.
pub async fn register(
    backend: &dyn Backend,
    name: &str,
    email: &str,
    password: &str,
) -> Result<LoginResponse> {
    let request = RegisterRequest {
        name,
        email,
        password,
    };
    let data = backend
        .call(REGISTER, Method::POST, body(&request)?)
        .await?;
    decode(REGISTER, data)
}

/// Revoke the token on the backend.
pub async fn logout(backend: &dyn Backend) -> Result<()> {
    backend.call(LOGOUT, Method::POST, None).await?;
    Ok(())
}

/// Get the signed-in user's profile. Fails with `Unauthorized` for a dead token.
pub async fn fetch_current_user(backend: &dyn Backend) -> Result<Value> {
    backend.call(CURRENT_USER, Method::GET, None).await
}

/// Get the account's default resume, if it has one.
pub async fn fetch_default_resume(backend: &dyn Backend) -> Result<Option<ResumeInfo>> {
    match backend.call(DEFAULT_RESUME, Method::GET, None).await {
        Ok(Value::Null) => Ok(None),
        Ok(data) => decode(DEFAULT_RESUME, data).map(Some),
        Err(TailorError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Upload a resume file. Returns the raw payload, which carries `resumeId`.
pub async fn upload_resume(backend: &dyn Backend, file_name: &str, bytes: Vec<u8>) -> Result<Value> {
    backend.upload(UPLOAD_RESUME, file_name, bytes).await
}

/// Generate a tailored resume. Returns the result payload as-is for display.
pub async fn tailor_resume(backend: &dyn Backend, request: &TailorRequest<'_>) -> Result<Value> {
    backend
        .call(TAILOR_RESUME, Method::POST, body(request)?)
        .await
}

/// One page of the account's resumes.
pub async fn list_resumes(backend: &dyn Backend, page: u32, limit: u32) -> Result<Page<ResumeInfo>> {
    let route = page_route(RESUMES, page, limit);
    let data = backend.call(&route, Method::GET, None).await?;
    decode_page(&route, "resumes", data)
}

/// Make `resume_id` the account default.
pub async fn set_default_resume(backend: &dyn Backend, resume_id: &str) -> Result<()> {
    backend
        .call(SET_DEFAULT_RESUME, Method::POST, body(&ResumeRef { resume_id })?)
        .await?;
    Ok(())
}

/// Change the name a resume is listed under. Blank names are refused locally.
pub async fn rename_resume(backend: &dyn Backend, resume_id: &str, display_name: &str) -> Result<()> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(TailorError::Precondition(
            "resume name cannot be empty".to_string(),
        ));
    }

    let request = RenameRequest {
        resume_id,
        display_name,
    };
    backend
        .call(RENAME_RESUME, Method::POST, body(&request)?)
        .await?;
    Ok(())
}

pub async fn delete_resume(backend: &dyn Backend, resume_id: &str) -> Result<()> {
    backend
        .call(DELETE_RESUME, Method::POST, body(&ResumeRef { resume_id })?)
        .await?;
    Ok(())
}

/// One page of tailored versions across the account's resumes.
pub async fn list_versions(backend: &dyn Backend, page: u32, limit: u32) -> Result<Page<ResumeVersion>> {
    let route = page_route(RESUME_VERSIONS, page, limit);
    let data = backend.call(&route, Method::GET, None).await?;
    decode_page(&route, "versions", data)
}

/// Replace a version's parent resume content with the version.
pub async fn promote_version(backend: &dyn Backend, version_id: u64) -> Result<()> {
    backend
        .call(PROMOTE_VERSION, Method::POST, body(&VersionRef { version_id })?)
        .await?;
    Ok(())
}

pub async fn delete_version(backend: &dyn Backend, version_id: u64) -> Result<()> {
    backend
        .call(DELETE_VERSION, Method::POST, body(&VersionRef { version_id })?)
        .await?;
    Ok(())
}

/// Render tailored content into a PDF or DOCX file.
pub async fn download_tailored(backend: &dyn Backend, request: &DownloadRequest<'_>) -> Result<Vec<u8>> {
    backend
        .download(DOWNLOAD_TAILORED, serde_json::to_value(request)?)
        .await
}
