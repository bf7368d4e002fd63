// Persisted session state.
// The single record the coordinator reads, decides over, and writes back as a whole.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::panel::Panel;

/// Kind of long-running backend request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Upload,
    Tailor,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Upload => f.write_str("upload"),
            OperationKind::Tailor => f.write_str("tailor"),
        }
    }
}

/// Opaque token correlating a completion with the operation that started it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationHandle(Uuid);

impl OperationHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OperationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A backend request believed to be in flight, possibly from an earlier popup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongOperation {
    pub handle: OperationHandle,
    pub kind: OperationKind,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<String>,
}

/// Extra fields recorded when a long operation starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationPayload {
    pub job_description: Option<String>,
    pub resume_id: Option<String>,
}

impl OperationPayload {
    pub fn tailor(job_description: impl Into<String>) -> Self {
        Self {
            job_description: Some(job_description.into()),
            resume_id: None,
        }
    }
}

/// Last successful tailoring output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResults {
    pub payload: Value,
    pub saved_at: DateTime<Utc>,
    /// Resume the results were generated for.
    pub resume_id: String,
}

/// Everything the coordinator persists between popup lifetimes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionState {
    pub panel: Panel,
    pub long_operation: Option<LongOperation>,
    pub has_auth_token: bool,
    pub active_resume_id: Option<String>,
    pub cached_results: Option<CachedResults>,
    pub pending_selection: Option<String>,
}

impl SessionState {
    /// The pending selection, if it holds any non-blank text.
    pub fn selection(&self) -> Option<&str> {
        self.pending_selection
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Reset everything tied to the signed-in account.
    pub fn clear_account(&mut self) {
        self.has_auth_token = false;
        self.active_resume_id = None;
        self.cached_results = None;
        self.long_operation = None;
        self.pending_selection = None;
        self.panel = Panel::Auth;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_selection_is_absent() {
        let mut state = SessionState {
            pending_selection: Some("   \n".to_string()),
            ..Default::default()
        };
        assert_eq!(state.selection(), None);

        state.pending_selection = Some("Senior Engineer".to_string());
        assert_eq!(state.selection(), Some("Senior Engineer"));
    }

    #[test]
    fn test_long_operation_wire_format() {
        let op = LongOperation {
            handle: OperationHandle::new(),
            kind: OperationKind::Tailor,
            started_at: Utc::now(),
            job_description: Some("Staff engineer".to_string()),
            resume_id: None,
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["kind"], "tailor");
        assert!(json.get("startedAt").is_some());
        assert!(json.get("resumeId").is_none());

        let back: LongOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_clear_account() {
        let mut state = SessionState {
            panel: Panel::Results,
            has_auth_token: true,
            active_resume_id: Some("r1".to_string()),
            pending_selection: Some("job".to_string()),
            ..Default::default()
        };
        state.clear_account();
        assert_eq!(state, SessionState::default());
    }
}
