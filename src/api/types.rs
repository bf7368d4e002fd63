// Backend API payload types.
// Response envelope and the typed request/response bodies the flows use.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Standard response wrapper: `{ success, data, message, error }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    pub success: Option<bool>,
    pub data: Option<Value>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl Envelope {
    /// The backend's own explanation of a failure, if it gave one.
    pub fn reason(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of a successful login or registration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: Option<Value>,
}

/// A stored resume as described by `GET /resume` and `POST /upload-resume`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInfo {
    #[serde(default)]
    pub resume_id: Option<Value>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub cloudinary_url: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl ResumeInfo {
    pub fn id(&self) -> Option<String> {
        self.resume_id.as_ref().and_then(id_string)
    }

    /// Name shown to the user: the display name, else the file name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .or(self.filename.as_deref())
            .unwrap_or("Untitled resume")
    }
}

/// A tailored variant of a resume kept by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeVersion {
    pub version_id: u64,
    #[serde(default)]
    pub resume_name: Option<String>,
    #[serde(default)]
    pub version_name: Option<String>,
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub has_pdf: bool,
    #[serde(default)]
    pub has_docx: bool,
    #[serde(default)]
    pub download_urls: Option<DownloadUrls>,
}

impl ResumeVersion {
    /// Preferred download link: PDF, then DOCX.
    pub fn download_url(&self) -> Option<&str> {
        let urls = self.download_urls.as_ref()?;
        urls.pdf.as_deref().or(urls.docx.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadUrls {
    #[serde(default)]
    pub pdf: Option<String>,
    #[serde(default)]
    pub docx: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Option<Pagination>,
}

/// Request bodies keyed by resume id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRef<'a> {
    pub resume_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest<'a> {
    pub resume_id: &'a str,
    pub display_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRef {
    pub version_id: u64,
}

/// File format for downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

/// Document text sent for rendering into a file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadContent {
    pub full_resume: String,
    pub full_document: String,
    pub cover_letter: String,
    #[serde(rename = "isHTML")]
    pub is_html: bool,
}

impl DownloadContent {
    /// Build from a tailoring result payload.
    pub fn from_results(payload: &Value) -> Self {
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        let document = text("fullResume")
            .or_else(|| text("fullDocument"))
            .unwrap_or_default();
        Self {
            full_resume: document.clone(),
            full_document: document,
            cover_letter: text("coverLetter").unwrap_or_default(),
            is_html: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest<'a> {
    pub resume_id: &'a str,
    pub content: DownloadContent,
    pub format: DocumentFormat,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TailorRequest<'a> {
    pub resume_id: &'a str,
    pub job_description: &'a str,
    pub generate_freely: bool,
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract `resumeId` from a response payload. Accepts string or numeric ids.
pub fn resume_id_of(payload: &Value) -> Option<String> {
    payload.get("resumeId").and_then(id_string)
}
