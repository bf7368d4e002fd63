// Session transition rules.
// Pure functions from (state, trigger, now) to the next state and the panel to show.
// Popup-open reconciliation is a single priority-ordered rule table; a new
// condition gets an explicit rank here rather than a separate check elsewhere.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::api::resume_id_of;
use crate::error::{Result, TailorError};
use crate::state::{
    CachedResults, LongOperation, OperationHandle, OperationKind, OperationPayload, Panel,
    PanelProps, PanelView, Policy, SessionState,
};

use super::effects::{NavTarget, OperationOutcome, SideEffect, Verification};

/// Next state plus what to show and do.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub next: SessionState,
    pub view: PanelView,
    pub effects: Vec<SideEffect>,
}

impl Decision {
    fn new(mut next: SessionState, view: PanelView, effects: Vec<SideEffect>) -> Self {
        next.panel = view.panel;
        Self {
            next,
            view,
            effects,
        }
    }
}

/// The stored long operation, unless it has gone stale.
pub fn live_operation<'a>(
    state: &'a SessionState,
    now: DateTime<Utc>,
    policy: &Policy,
) -> Option<&'a LongOperation> {
    state
        .long_operation
        .as_ref()
        .filter(|op| !op.is_stale(now, policy))
}

/// Drop a stale long operation. Not an error: the request is presumed abandoned.
fn discard_stale(state: &mut SessionState, now: DateTime<Utc>, policy: &Policy) {
    if let Some(op) = &state.long_operation {
        if op.is_stale(now, policy) {
            warn!(
                kind = %op.kind,
                handle = %op.handle,
                started_at = %op.started_at,
                "Discarding stale long operation"
            );
            state.long_operation = None;
        }
    }
}

/// Props for the panel hosting a running operation.
fn busy_view(op: &LongOperation) -> PanelView {
    let props = match op.kind {
        OperationKind::Tailor => PanelProps::Tailor {
            job_description: op.job_description.clone(),
            busy: true,
        },
        OperationKind::Upload => PanelProps::Upload { busy: true },
    };
    PanelView::new(Panel::for_operation(op.kind), props)
}

fn results_usable(state: &SessionState, now: DateTime<Utc>, policy: &Policy) -> bool {
    match (&state.cached_results, &state.active_resume_id) {
        (Some(results), Some(resume_id)) => {
            results.is_fresh(now, policy)
                && &results.resume_id == resume_id
                && state.long_operation.is_none()
                && state.selection().is_none()
        }
        _ => false,
    }
}

/// Decide which panel to show when the popup opens. First matching rule wins.
pub fn reconcile_on_open(state: &SessionState, now: DateTime<Utc>, policy: &Policy) -> Decision {
    let mut next = state.clone();

    // 1. A stale operation is cleared before anything else looks at it
    discard_stale(&mut next, now, policy);

    // 2. Signed out
    if !next.has_auth_token {
        debug!("Rule: no credential");
        return Decision::new(next, PanelView::plain(Panel::Auth), Vec::new());
    }

    // 3. Job text picked from a page. Shown optimistically while the
    // credential is checked in the background.
    if let Some(text) = next.selection().map(str::to_string) {
        debug!(chars = text.len(), "Rule: pending selection");
        next.pending_selection = None;
        let view = PanelView::new(
            Panel::Tailor,
            PanelProps::Tailor {
                job_description: Some(text),
                busy: false,
            },
        );
        return Decision::new(
            next,
            view,
            vec![SideEffect::ClearPendingSelection, SideEffect::VerifyCredential],
        );
    }

    // 4. An operation from an earlier popup may still be running. Its fate is
    // unknown, so show it as busy and issue nothing.
    if let Some(op) = &next.long_operation {
        debug!(kind = %op.kind, "Rule: long operation in flight");
        let view = busy_view(op);
        return Decision::new(next, view, Vec::new());
    }

    // 5. Recent results for the current resume
    if results_usable(&next, now, policy) {
        if let Some(results) = &next.cached_results {
            debug!("Rule: cached results");
            let view = PanelView::new(
                Panel::Results,
                PanelProps::Results {
                    payload: results.payload.clone(),
                },
            );
            return Decision::new(next, view, Vec::new());
        }
    }

    // 6. Home
    if next.active_resume_id.is_some() {
        debug!("Rule: active resume");
        return Decision::new(next, PanelView::plain(Panel::Ready), Vec::new());
    }

    // 7. No known resume: upload, and look for one on the backend
    debug!("Rule: no resume");
    Decision::new(
        next,
        PanelView::new(Panel::Upload, PanelProps::Upload { busy: false }),
        vec![SideEffect::FetchDefaultResume],
    )
}

/// Start a long operation. Returns the next state and the operation record.
pub fn begin_long_operation(
    state: &SessionState,
    kind: OperationKind,
    payload: OperationPayload,
    now: DateTime<Utc>,
    policy: &Policy,
) -> Result<(SessionState, LongOperation, PanelView)> {
    if !state.has_auth_token {
        return Err(TailorError::Precondition("sign in first".to_string()));
    }
    if let Some(op) = live_operation(state, now, policy) {
        return Err(TailorError::OperationAlreadyInProgress(op.kind));
    }

    let mut next = state.clone();
    let mut op = LongOperation {
        handle: OperationHandle::new(),
        kind,
        started_at: now,
        job_description: payload.job_description,
        resume_id: payload.resume_id,
    };

    if kind == OperationKind::Tailor {
        if op.resume_id.is_none() {
            op.resume_id = state.active_resume_id.clone();
        }
        if op.resume_id.is_none() {
            return Err(TailorError::Precondition(
                "upload a resume before tailoring".to_string(),
            ));
        }
        let has_text = op
            .job_description
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty());
        if !has_text {
            return Err(TailorError::Precondition(
                "select a job description first".to_string(),
            ));
        }
        // A selection is spent only when it is the text being tailored
        if state.selection().is_some() && state.selection() == op.job_description.as_deref() {
            next.pending_selection = None;
        }
    }

    let view = busy_view(&op);
    next.long_operation = Some(op.clone());
    next.panel = view.panel;
    Ok((next, op, view))
}

/// Apply the outcome of a long operation. `None` when the handle does not match
/// the live stored operation: a late or duplicate callback changes nothing.
pub fn complete_long_operation(
    state: &SessionState,
    handle: OperationHandle,
    outcome: OperationOutcome,
    now: DateTime<Utc>,
    policy: &Policy,
) -> Option<(SessionState, PanelView)> {
    let op = live_operation(state, now, policy).filter(|op| op.handle == handle)?;

    let mut next = state.clone();
    next.long_operation = None;

    let view = match outcome {
        OperationOutcome::Success(payload) => match op.kind {
            OperationKind::Tailor => {
                let resume_id = op
                    .resume_id
                    .clone()
                    .or_else(|| state.active_resume_id.clone())
                    .unwrap_or_default();
                next.cached_results = Some(CachedResults {
                    payload: payload.clone(),
                    saved_at: now,
                    resume_id,
                });
                PanelView::new(Panel::Results, PanelProps::Results { payload })
            }
            OperationKind::Upload => match resume_id_of(&payload) {
                Some(resume_id) => {
                    next.active_resume_id = Some(resume_id);
                    PanelView::plain(Panel::Ready)
                }
                None => PanelView::new(
                    Panel::Error,
                    PanelProps::Error {
                        message: "Upload response did not include a resume id".to_string(),
                    },
                ),
            },
        },
        OperationOutcome::Failure(e) if e.is_unauthorized() => {
            warn!(kind = %op.kind, "Backend rejected the credential, signing out");
            next.has_auth_token = false;
            PanelView::plain(Panel::Auth)
        }
        OperationOutcome::Failure(e) => PanelView::new(
            Panel::Error,
            PanelProps::Error {
                message: e.to_string(),
            },
        ),
    };

    next.panel = view.panel;
    Some((next, view))
}

fn require(condition: bool, target: NavTarget, reason: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(TailorError::Precondition(format!(
            "cannot open {}: {}",
            target, reason
        )))
    }
}

/// Apply an explicit navigation.
pub fn navigate(
    state: &SessionState,
    target: NavTarget,
    now: DateTime<Utc>,
    policy: &Policy,
) -> Result<(SessionState, PanelView)> {
    require(state.has_auth_token, target, "not signed in")?;

    let mut next = state.clone();
    let running = live_operation(state, now, policy);

    let view = match target {
        NavTarget::Ready => {
            require(state.active_resume_id.is_some(), target, "no resume")?;
            PanelView::plain(Panel::Ready)
        }
        NavTarget::Upload => match running.filter(|op| op.kind == OperationKind::Upload) {
            Some(op) => busy_view(op),
            None => PanelView::new(Panel::Upload, PanelProps::Upload { busy: false }),
        },
        NavTarget::Tailor => {
            require(state.active_resume_id.is_some(), target, "no resume")?;
            match running.filter(|op| op.kind == OperationKind::Tailor) {
                Some(op) => busy_view(op),
                None => PanelView::new(
                    Panel::Tailor,
                    PanelProps::Tailor {
                        job_description: state.selection().map(str::to_string),
                        busy: false,
                    },
                ),
            }
        }
        NavTarget::Settings => PanelView::plain(Panel::Settings),
        NavTarget::NewTailoring => {
            require(state.active_resume_id.is_some(), target, "no resume")?;
            next.cached_results = None;
            next.pending_selection = None;
            next.long_operation = None;
            PanelView::plain(Panel::Ready)
        }
    };

    next.panel = view.panel;
    Ok((next, view))
}

/// Sign out: drop everything tied to the account.
pub fn logout(state: &SessionState) -> SessionState {
    let mut next = state.clone();
    next.clear_account();
    next
}

/// Sign in: a fresh credential starts from a clean account. A pending
/// selection survives so the user can continue with it.
pub fn login(state: &SessionState) -> SessionState {
    SessionState {
        panel: state.panel,
        long_operation: None,
        has_auth_token: true,
        active_resume_id: None,
        cached_results: None,
        pending_selection: state.pending_selection.clone(),
    }
}

/// Make `resume_id` the active resume. Results tailored from any other
/// resume are dropped. A signed-out session is left alone.
pub fn adopt_resume(state: &SessionState, resume_id: &str) -> SessionState {
    let mut next = state.clone();
    if !state.has_auth_token {
        return next;
    }
    next.active_resume_id = Some(resume_id.to_string());
    if next
        .cached_results
        .as_ref()
        .is_some_and(|results| results.resume_id != resume_id)
    {
        next.cached_results = None;
    }
    next
}

/// Forget a resume deleted on the backend: it stops being active and its
/// tailored results go with it.
pub fn forget_resume(state: &SessionState, resume_id: &str) -> SessionState {
    let mut next = state.clone();
    if next.active_resume_id.as_deref() == Some(resume_id) {
        next.active_resume_id = None;
    }
    if next
        .cached_results
        .as_ref()
        .is_some_and(|results| results.resume_id == resume_id)
    {
        next.cached_results = None;
    }
    next
}

/// Apply a background credential check. `None` when nothing changes.
pub fn apply_verification(
    state: &SessionState,
    verification: Verification,
) -> Option<(SessionState, PanelView)> {
    if verification == Verification::Valid || !state.has_auth_token {
        return None;
    }

    let mut next = state.clone();
    next.has_auth_token = false;
    next.panel = Panel::Auth;
    Some((next, PanelView::plain(Panel::Auth)))
}
