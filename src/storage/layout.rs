// Persisted key layout for the session.
// Maps SessionState fields onto the flat storage keys shared with the browser scripts.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::state::{CachedResults, LongOperation, Panel, SessionState};

use super::store::{KeyValueStore, Record};

pub const PANEL_KEY: &str = "currentSection";
pub const LONG_OPERATION_KEY: &str = "longOperation";
pub const AUTH_TOKEN_KEY: &str = "authToken";
pub const USER_KEY: &str = "user";
pub const ACTIVE_RESUME_KEY: &str = "resumeId";
pub const CACHED_RESULTS_KEY: &str = "lastResults";
pub const PENDING_SELECTION_KEY: &str = "selectedJobDescription";

/// Every key read when loading the session.
pub const SESSION_KEYS: [&str; 6] = [
    PANEL_KEY,
    LONG_OPERATION_KEY,
    AUTH_TOKEN_KEY,
    ACTIVE_RESUME_KEY,
    CACHED_RESULTS_KEY,
    PENDING_SELECTION_KEY,
];

/// Opaque credential issued by the backend on login.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    /// User profile as returned by the backend.
    pub user: Option<Value>,
}

/// Decode one key, treating undecodable values as absent.
fn decode<T: DeserializeOwned>(record: &Record, key: &str) -> Option<T> {
    let value = record.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(key, error = %e, "Ignoring unreadable stored value");
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Build a session from raw stored values.
pub fn session_from_record(record: &Record) -> SessionState {
    let token: Option<String> = non_empty(decode(record, AUTH_TOKEN_KEY));

    SessionState {
        panel: decode::<Panel>(record, PANEL_KEY).unwrap_or_default(),
        long_operation: decode::<LongOperation>(record, LONG_OPERATION_KEY),
        has_auth_token: token.is_some(),
        active_resume_id: non_empty(decode(record, ACTIVE_RESUME_KEY)),
        cached_results: decode::<CachedResults>(record, CACHED_RESULTS_KEY),
        pending_selection: decode(record, PENDING_SELECTION_KEY),
    }
}

fn to_value<T: serde::Serialize>(value: Option<&T>) -> Result<Value> {
    match value {
        Some(v) => Ok(serde_json::to_value(v)?),
        None => Ok(Value::Null),
    }
}

/// Encode the whole session as a single record. Absent fields become `null`
/// so that one `set` overwrites every key.
///
/// The credential value belongs to the auth layer: it is written only when
/// supplied, and erased when the session has no credential.
pub fn session_record(state: &SessionState, credential: Option<&Credential>) -> Result<Record> {
    let mut record = Record::new();
    record.insert(PANEL_KEY.to_string(), serde_json::to_value(state.panel)?);
    record.insert(
        LONG_OPERATION_KEY.to_string(),
        to_value(state.long_operation.as_ref())?,
    );
    record.insert(
        ACTIVE_RESUME_KEY.to_string(),
        to_value(state.active_resume_id.as_ref())?,
    );
    record.insert(
        CACHED_RESULTS_KEY.to_string(),
        to_value(state.cached_results.as_ref())?,
    );
    record.insert(
        PENDING_SELECTION_KEY.to_string(),
        to_value(state.pending_selection.as_ref())?,
    );

    match credential {
        Some(credential) if state.has_auth_token => {
            record.insert(
                AUTH_TOKEN_KEY.to_string(),
                Value::String(credential.token.clone()),
            );
            record.insert(
                USER_KEY.to_string(),
                credential.user.clone().unwrap_or(Value::Null),
            );
        }
        _ if !state.has_auth_token => {
            record.insert(AUTH_TOKEN_KEY.to_string(), Value::Null);
            record.insert(USER_KEY.to_string(), Value::Null);
        }
        _ => {}
    }

    Ok(record)
}

/// Read the current session snapshot.
pub async fn load_session(store: &dyn KeyValueStore) -> Result<SessionState> {
    let record = store.get(&SESSION_KEYS).await?;
    Ok(session_from_record(&record))
}

/// Persist the whole session in one write.
pub async fn save_session(
    store: &dyn KeyValueStore,
    state: &SessionState,
    credential: Option<&Credential>,
) -> Result<()> {
    store.set(session_record(state, credential)?).await
}

/// Read the stored credential token, if any.
pub async fn load_token(store: &dyn KeyValueStore) -> Result<Option<String>> {
    let record = store.get(&[AUTH_TOKEN_KEY]).await?;
    Ok(non_empty(decode(&record, AUTH_TOKEN_KEY)))
}

/// Selection source: record job text picked from a page for the Tailor panel.
pub async fn record_selection(store: &dyn KeyValueStore, text: &str) -> Result<()> {
    let mut record = Record::new();
    record.insert(
        PENDING_SELECTION_KEY.to_string(),
        Value::String(text.to_string()),
    );
    store.set(record).await
}
