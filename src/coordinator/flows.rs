// User-facing flows.
// Wraps each backend call in the matching coordinator transitions.

use std::path::Path;

use tracing::{info, warn};

use crate::api::endpoints::{self, PAGE_SIZE};
use crate::api::types::{DownloadContent, DownloadRequest};
use crate::api::{Backend, DocumentFormat, Page, ResumeInfo, ResumeVersion, TailorRequest};
use crate::error::{Result, TailorError};
use crate::render::PanelRenderer;
use crate::state::{OperationKind, OperationPayload, PanelView};
use crate::storage::{Credential, KeyValueStore};

use super::{Clock, Coordinator, Reconciliation, Verification, rules};

/// Largest resume file the backend accepts: 5 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

/// Resume formats the backend can parse.
pub const UPLOAD_EXTENSIONS: [&str; 4] = ["pdf", "doc", "docx", "txt"];

/// Check a resume file before uploading. Returns the file name to send.
pub fn validate_upload(path: &Path, size: u64) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
        return Err(TailorError::Precondition(
            "resume must be a PDF, DOC, DOCX or TXT file".to_string(),
        ));
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(TailorError::Precondition(
            "resume file must be 5 MB or smaller".to_string(),
        ));
    }

    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| TailorError::Precondition(format!("invalid file name: {}", path.display())))
}

async fn read_resume_file(path: &Path) -> Result<(String, Vec<u8>)> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|_| TailorError::Precondition(format!("{} does not exist", path.display())))?;
    let file_name = validate_upload(path, metadata.len())?;
    let bytes = tokio::fs::read(path).await?;
    Ok((file_name, bytes))
}

impl<S, B, R, C> Coordinator<S, B, R, C>
where
    S: KeyValueStore,
    B: Backend,
    R: PanelRenderer,
    C: Clock,
{
    /// Sign in with email and password.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Reconciliation> {
        let response = endpoints::login(&self.backend, email, password).await?;
        self.backend.set_token(Some(response.token.clone()));
        self.on_login(Credential {
            token: response.token,
            user: response.user,
        })
        .await
    }

    /// Create an account and sign in to it.
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Reconciliation> {
        let response = endpoints::register(&self.backend, name, email, password).await?;
        self.backend.set_token(Some(response.token.clone()));
        self.on_login(Credential {
            token: response.token,
            user: response.user,
        })
        .await
    }

    /// Sign out. The backend is told when reachable; the local session is
    /// cleared regardless.
    pub async fn logout(&mut self) -> Result<PanelView> {
        if let Err(e) = endpoints::logout(&self.backend).await {
            warn!(error = %e, "Backend logout failed, clearing local session anyway");
        }
        self.backend.set_token(None);
        self.on_logout().await
    }

    /// Ask the backend whether the stored credential still works.
    ///
    /// Only an explicit rejection signs the user out; an unreachable backend
    /// leaves the session alone.
    pub async fn verify_credential(&mut self) -> Result<Option<PanelView>> {
        match endpoints::fetch_current_user(&self.backend).await {
            Ok(_) => self.apply_verification(Verification::Valid).await,
            Err(e) if e.is_unauthorized() => self.apply_verification(Verification::Invalid).await,
            Err(e) => {
                warn!(error = %e, "Could not verify credential");
                Ok(None)
            }
        }
    }

    /// Upload a resume file and make it the active resume.
    pub async fn upload_resume(&mut self, path: &Path) -> Result<Option<PanelView>> {
        let (file_name, bytes) = read_resume_file(path).await?;

        let handle = self
            .begin_long_operation(OperationKind::Upload, OperationPayload::default())
            .await?;
        info!(file_name = %file_name, bytes = bytes.len(), "Uploading resume");

        let outcome = endpoints::upload_resume(&self.backend, &file_name, bytes)
            .await
            .into();
        self.complete_long_operation(handle, outcome).await
    }

    /// Tailor the active resume to a job description. Without `job`, the
    /// pending selection is used.
    pub async fn tailor(
        &mut self,
        job: Option<String>,
        generate_freely: bool,
    ) -> Result<Option<PanelView>> {
        let state = self.snapshot().await?;

        let job = job
            .filter(|text| !text.trim().is_empty())
            .or_else(|| state.selection().map(str::to_string))
            .ok_or_else(|| {
                TailorError::Precondition("select a job description first".to_string())
            })?;
        let resume_id = state.active_resume_id.clone().ok_or_else(|| {
            TailorError::Precondition("upload a resume before tailoring".to_string())
        })?;

        let payload = OperationPayload {
            job_description: Some(job.clone()),
            resume_id: Some(resume_id.clone()),
        };
        let handle = self
            .begin_long_operation(OperationKind::Tailor, payload)
            .await?;

        let request = TailorRequest {
            resume_id: &resume_id,
            job_description: &job,
            generate_freely,
        };
        let outcome = endpoints::tailor_resume(&self.backend, &request)
            .await
            .into();
        self.complete_long_operation(handle, outcome).await
    }

    /// Pass `result` through, signing out first if the backend rejected the
    /// credential.
    async fn signed_out_on_rejection<T>(&mut self, result: Result<T>) -> Result<T> {
        if matches!(&result, Err(e) if e.is_unauthorized()) {
            self.apply_verification(Verification::Invalid).await?;
        }
        result
    }

    pub async fn list_resumes(&mut self, page: u32) -> Result<Page<ResumeInfo>> {
        let result = endpoints::list_resumes(&self.backend, page, PAGE_SIZE).await;
        self.signed_out_on_rejection(result).await
    }

    pub async fn list_versions(&mut self, page: u32) -> Result<Page<ResumeVersion>> {
        let result = endpoints::list_versions(&self.backend, page, PAGE_SIZE).await;
        self.signed_out_on_rejection(result).await
    }

    /// Make `resume_id` the account default and the active resume.
    pub async fn set_default_resume(&mut self, resume_id: &str) -> Result<()> {
        let result = endpoints::set_default_resume(&self.backend, resume_id).await;
        self.signed_out_on_rejection(result).await?;

        let state = self.snapshot().await?;
        let next = rules::adopt_resume(&state, resume_id);
        self.persist(&state, &next, None).await?;
        info!(resume_id, "Default resume changed");
        Ok(())
    }

    pub async fn rename_resume(&mut self, resume_id: &str, display_name: &str) -> Result<()> {
        let result = endpoints::rename_resume(&self.backend, resume_id, display_name).await;
        self.signed_out_on_rejection(result).await
    }

    /// Delete a resume on the backend and forget it locally.
    pub async fn delete_resume(&mut self, resume_id: &str) -> Result<()> {
        let result = endpoints::delete_resume(&self.backend, resume_id).await;
        self.signed_out_on_rejection(result).await?;

        let state = self.snapshot().await?;
        let next = rules::forget_resume(&state, resume_id);
        self.persist(&state, &next, None).await?;
        info!(resume_id, "Resume deleted");
        Ok(())
    }

    pub async fn promote_version(&mut self, version_id: u64) -> Result<()> {
        let result = endpoints::promote_version(&self.backend, version_id).await;
        self.signed_out_on_rejection(result).await
    }

    pub async fn delete_version(&mut self, version_id: u64) -> Result<()> {
        let result = endpoints::delete_version(&self.backend, version_id).await;
        self.signed_out_on_rejection(result).await
    }

    /// Render the last tailoring results into a file.
    pub async fn download_results(&mut self, format: DocumentFormat) -> Result<Vec<u8>> {
        let state = self.snapshot().await?;
        let results = state.cached_results.ok_or_else(|| {
            TailorError::Precondition("tailor a resume before downloading".to_string())
        })?;

        let request = DownloadRequest {
            resume_id: &results.resume_id,
            content: DownloadContent::from_results(&results.payload),
            format,
        };
        let result = endpoints::download_tailored(&self.backend, &request).await;
        let bytes = self.signed_out_on_rejection(result).await?;
        info!(format = format.extension(), bytes = bytes.len(), "Downloaded tailored resume");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::state::{CachedResults, Panel, PanelProps, SessionState};
    use crate::storage::{MemoryStore, record_selection, save_session};
    use crate::test_support::{FakeBackend, TestCoordinator, coordinator};

    async fn signed_in(resume: Option<&str>) -> TestCoordinator {
        let store = MemoryStore::new();
        let state = SessionState {
            has_auth_token: true,
            active_resume_id: resume.map(str::to_string),
            ..Default::default()
        };
        let credential = Credential {
            token: "tok".to_string(),
            user: None,
        };
        save_session(&store, &state, Some(&credential)).await.unwrap();
        coordinator(store, FakeBackend::new())
    }

    #[test]
    fn test_validate_upload() {
        assert_eq!(
            validate_upload(Path::new("/tmp/cv.PDF"), 1024).unwrap(),
            "cv.PDF"
        );
        assert!(validate_upload(Path::new("/tmp/cv.docx"), MAX_UPLOAD_BYTES).is_ok());
        assert!(matches!(
            validate_upload(Path::new("/tmp/cv.png"), 10),
            Err(TailorError::Precondition(_))
        ));
        assert!(matches!(
            validate_upload(Path::new("/tmp/cv.pdf"), MAX_UPLOAD_BYTES + 1),
            Err(TailorError::Precondition(_))
        ));
        assert!(validate_upload(Path::new("/tmp/resume"), 10).is_err());
    }

    #[tokio::test]
    async fn test_login_stores_credential() {
        let mut coordinator = coordinator(MemoryStore::new(), FakeBackend::new());
        coordinator
            .backend()
            .respond("/login", Ok(json!({"token": "tok", "user": {"name": "Ada"}})));
        coordinator
            .backend()
            .respond("/resume", Ok(json!({"resumeId": "r1"})));

        let reconciled = coordinator.login("ada@example.com", "secret").await.unwrap();
        assert_eq!(reconciled.view.panel, Panel::Ready);

        let entries = coordinator.store().entries();
        assert_eq!(entries["authToken"], "tok");
        assert_eq!(entries["user"]["name"], "Ada");
        assert_eq!(coordinator.backend().tokens(), vec![Some("tok".to_string())]);
    }

    #[tokio::test]
    async fn test_failed_login_changes_nothing() {
        let mut coordinator = coordinator(MemoryStore::new(), FakeBackend::new());
        coordinator.backend().respond(
            "/login",
            Err(TailorError::Backend("Invalid credentials".to_string())),
        );

        let err = coordinator.login("ada@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(coordinator.store().write_count(), 0);
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let mut coordinator = coordinator(MemoryStore::new(), FakeBackend::new());
        coordinator
            .backend()
            .respond("/register", Ok(json!({"token": "fresh"})));

        let reconciled = coordinator
            .register("Ada", "ada@example.com", "secret")
            .await
            .unwrap();
        assert_eq!(reconciled.view.panel, Panel::Upload);
        assert_eq!(coordinator.store().entries()["authToken"], "fresh");
    }

    #[tokio::test]
    async fn test_logout_survives_unreachable_backend() {
        let mut coordinator = signed_in(Some("r1")).await;
        coordinator
            .backend()
            .respond("/logout", Err(TailorError::Timeout));

        let view = coordinator.logout().await.unwrap();
        assert_eq!(view.panel, Panel::Auth);
        assert!(!coordinator.snapshot().await.unwrap().has_auth_token);
        assert_eq!(coordinator.backend().tokens(), vec![None]);
    }

    #[tokio::test]
    async fn test_verify_credential() {
        let mut coordinator = signed_in(Some("r1")).await;

        coordinator.backend().respond("/me", Ok(json!({"name": "Ada"})));
        assert!(coordinator.verify_credential().await.unwrap().is_none());

        coordinator.backend().respond("/me", Err(TailorError::Timeout));
        assert!(coordinator.verify_credential().await.unwrap().is_none());
        assert!(coordinator.snapshot().await.unwrap().has_auth_token);

        coordinator.backend().respond("/me", Err(TailorError::Unauthorized));
        let view = coordinator.verify_credential().await.unwrap();
        assert_eq!(view.map(|v| v.panel), Some(Panel::Auth));
        assert!(!coordinator.snapshot().await.unwrap().has_auth_token);
    }

    #[tokio::test]
    async fn test_upload_sets_active_resume() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let mut coordinator = signed_in(None).await;
        coordinator.backend().respond(
            "/upload-resume",
            Ok(json!({"resumeId": "r7", "filename": "cv.pdf"})),
        );

        let view = coordinator.upload_resume(&path).await.unwrap().unwrap();
        assert_eq!(view.panel, Panel::Ready);

        let state = coordinator.snapshot().await.unwrap();
        assert_eq!(state.active_resume_id.as_deref(), Some("r7"));
        assert!(state.long_operation.is_none());
        assert_eq!(
            coordinator.backend().calls()[0].file_name.as_deref(),
            Some("cv.pdf")
        );

        // The busy Upload panel was shown before the request went out
        let shown = &coordinator.renderer().shown;
        assert_eq!(shown[0].props, PanelProps::Upload { busy: true });
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_file() {
        let mut coordinator = signed_in(None).await;
        let err = coordinator
            .upload_resume(Path::new("/definitely/not/here.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, TailorError::Precondition(_)));
        assert!(coordinator.backend().calls().is_empty());
    }

    async fn with_results(resume_id: &str) -> TestCoordinator {
        let coordinator = signed_in(Some(resume_id)).await;
        let state = SessionState {
            panel: Panel::Results,
            has_auth_token: true,
            active_resume_id: Some(resume_id.to_string()),
            cached_results: Some(CachedResults {
                payload: json!({"fullResume": "Tailored for Acme", "coverLetter": "Dear Acme"}),
                saved_at: chrono::Utc::now(),
                resume_id: resume_id.to_string(),
            }),
            ..Default::default()
        };
        save_session(coordinator.store(), &state, None).await.unwrap();
        coordinator
    }

    #[tokio::test]
    async fn test_tailor_with_typed_job_keeps_selection() {
        let mut coordinator = signed_in(Some("r1")).await;
        record_selection(coordinator.store(), "Staff engineer, Rust")
            .await
            .unwrap();
        coordinator
            .backend()
            .respond("/tailor-resume", Ok(json!({"fullResume": "..."})));

        coordinator
            .tailor(Some("Data engineer, Python".to_string()), false)
            .await
            .unwrap();

        let body = coordinator.backend().calls()[0].body.clone().unwrap();
        assert_eq!(body["jobDescription"], "Data engineer, Python");
        let state = coordinator.snapshot().await.unwrap();
        assert_eq!(state.selection(), Some("Staff engineer, Rust"));
    }

    #[tokio::test]
    async fn test_set_default_resume_switches_active() {
        let mut coordinator = with_results("r1").await;
        coordinator
            .backend()
            .respond("/set-default-resume", Ok(json!({"success": true})));
        let writes = coordinator.store().write_count();

        coordinator.set_default_resume("r2").await.unwrap();

        assert_eq!(
            coordinator.backend().calls()[0].body,
            Some(json!({"resumeId": "r2"}))
        );
        let state = coordinator.snapshot().await.unwrap();
        assert_eq!(state.active_resume_id.as_deref(), Some("r2"));
        assert!(state.cached_results.is_none());
        assert!(state.has_auth_token);
        assert_eq!(coordinator.store().write_count(), writes + 1);
    }

    #[tokio::test]
    async fn test_failed_set_default_changes_nothing() {
        let mut coordinator = with_results("r1").await;
        coordinator.backend().respond(
            "/set-default-resume",
            Err(TailorError::NotFound("Resume not found".to_string())),
        );
        let writes = coordinator.store().write_count();

        let err = coordinator.set_default_resume("r2").await.unwrap_err();
        assert_eq!(err.to_string(), "Resume not found");
        assert_eq!(coordinator.store().write_count(), writes);
        assert_eq!(
            coordinator.snapshot().await.unwrap().active_resume_id.as_deref(),
            Some("r1")
        );
    }

    #[tokio::test]
    async fn test_delete_active_resume_forgets_it() {
        let mut coordinator = with_results("r1").await;
        coordinator
            .backend()
            .respond("/delete-resume", Ok(json!({"success": true})));
        let writes = coordinator.store().write_count();

        coordinator.delete_resume("r1").await.unwrap();

        let state = coordinator.snapshot().await.unwrap();
        assert!(state.active_resume_id.is_none());
        assert!(state.cached_results.is_none());
        assert!(state.has_auth_token);
        assert_eq!(coordinator.store().write_count(), writes + 1);

        // Next open goes looking for the new default
        coordinator
            .backend()
            .respond("/resume", Err(TailorError::NotFound("/resume".to_string())));
        let opened = coordinator.reconcile_on_open().await.unwrap();
        assert_eq!(opened.view.panel, Panel::Upload);
    }

    #[tokio::test]
    async fn test_delete_other_resume_writes_nothing() {
        let mut coordinator = with_results("r1").await;
        coordinator
            .backend()
            .respond("/delete-resume", Ok(json!({"success": true})));
        let writes = coordinator.store().write_count();

        coordinator.delete_resume("r7").await.unwrap();

        assert_eq!(coordinator.store().write_count(), writes);
        let state = coordinator.snapshot().await.unwrap();
        assert_eq!(state.active_resume_id.as_deref(), Some("r1"));
        assert!(state.cached_results.is_some());
    }

    #[tokio::test]
    async fn test_rejected_credential_signs_out() {
        let mut coordinator = signed_in(Some("r1")).await;
        coordinator
            .backend()
            .respond("/resumes?page=1&limit=10", Err(TailorError::Unauthorized));

        let err = coordinator.list_resumes(1).await.unwrap_err();
        assert!(err.is_unauthorized());

        let state = coordinator.snapshot().await.unwrap();
        assert!(!state.has_auth_token);
        assert_eq!(coordinator.renderer().last().unwrap().panel, Panel::Auth);
    }

    #[tokio::test]
    async fn test_download_results() {
        let mut coordinator = with_results("r1").await;
        coordinator
            .backend()
            .respond("/download-tailored-resume", Ok(json!("%PDF-1.7")));

        let bytes = coordinator.download_results(DocumentFormat::Pdf).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");

        let body = coordinator.backend().calls()[0].body.clone().unwrap();
        assert_eq!(body["resumeId"], "r1");
        assert_eq!(body["content"]["fullResume"], "Tailored for Acme");
        assert_eq!(body["content"]["coverLetter"], "Dear Acme");
    }

    #[tokio::test]
    async fn test_download_needs_results() {
        let mut coordinator = signed_in(Some("r1")).await;
        let err = coordinator
            .download_results(DocumentFormat::Docx)
            .await
            .unwrap_err();
        assert!(matches!(err, TailorError::Precondition(_)));
        assert!(coordinator.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn test_tailor_uses_pending_selection() {
        let mut coordinator = signed_in(Some("r1")).await;
        record_selection(coordinator.store(), "Staff engineer, Rust")
            .await
            .unwrap();
        coordinator
            .backend()
            .respond("/tailor-resume", Ok(json!({"fullResume": "..."})));

        let view = coordinator.tailor(None, true).await.unwrap().unwrap();
        assert_eq!(view.panel, Panel::Results);

        let body = coordinator.backend().calls()[0].body.clone().unwrap();
        assert_eq!(body["jobDescription"], "Staff engineer, Rust");
        assert_eq!(body["resumeId"], "r1");
        assert_eq!(body["generateFreely"], true);

        let state = coordinator.snapshot().await.unwrap();
        assert!(state.pending_selection.is_none());
        assert_eq!(state.cached_results.unwrap().resume_id, "r1");
    }

    #[tokio::test]
    async fn test_tailor_failure_shows_error_and_keeps_resume() {
        let mut coordinator = signed_in(Some("r1")).await;
        coordinator.backend().respond(
            "/tailor-resume",
            Err(TailorError::Backend("Resume could not be parsed".to_string())),
        );

        let view = coordinator
            .tailor(Some("Rust role".to_string()), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            view.props,
            PanelProps::Error {
                message: "Resume could not be parsed".to_string()
            }
        );
        let state = coordinator.snapshot().await.unwrap();
        assert!(state.long_operation.is_none());
        assert_eq!(state.active_resume_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_tailor_expired_credential_signs_out() {
        let mut coordinator = signed_in(Some("r1")).await;
        coordinator
            .backend()
            .respond("/tailor-resume", Err(TailorError::Unauthorized));

        let view = coordinator
            .tailor(Some("Rust role".to_string()), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.panel, Panel::Auth);
        assert!(!coordinator.snapshot().await.unwrap().has_auth_token);
    }

    #[tokio::test]
    async fn test_tailor_preconditions() {
        let mut coordinator = signed_in(None).await;
        let err = coordinator
            .tailor(Some("Rust role".to_string()), false)
            .await
            .unwrap_err();
        assert!(matches!(err, TailorError::Precondition(_)));

        let mut coordinator = signed_in(Some("r1")).await;
        let err = coordinator.tailor(Some("   ".to_string()), false).await.unwrap_err();
        assert!(matches!(err, TailorError::Precondition(_)));
        assert!(coordinator.backend().calls().is_empty());
    }
}
