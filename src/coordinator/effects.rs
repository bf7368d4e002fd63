// Coordinator inputs and outputs.
// Triggers, outcomes, and the side effects a reconciliation asks for.

use std::fmt;

use serde_json::Value;

use crate::error::TailorError;
use crate::state::PanelView;

/// Work a reconciliation needs done besides showing a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    /// The pending selection was consumed. Applied by the coordinator in the
    /// same write that selected the Tailor panel.
    ClearPendingSelection,
    /// Check the credential with the backend without blocking the panel.
    /// Left to the caller; report the answer through `apply_verification`.
    VerifyCredential,
    /// Look for a default resume on the backend. Performed by the coordinator.
    FetchDefaultResume,
}

/// Result of reconciling on popup open.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub view: PanelView,
    pub effects: Vec<SideEffect>,
}

impl Reconciliation {
    /// Whether the caller should start a credential check.
    pub fn needs_verification(&self) -> bool {
        self.effects.contains(&SideEffect::VerifyCredential)
    }
}

/// How a long operation ended.
#[derive(Debug)]
pub enum OperationOutcome {
    Success(Value),
    Failure(TailorError),
}

impl From<crate::error::Result<Value>> for OperationOutcome {
    fn from(result: crate::error::Result<Value>) -> Self {
        match result {
            Ok(payload) => OperationOutcome::Success(payload),
            Err(e) => OperationOutcome::Failure(e),
        }
    }
}

/// Explicit navigation requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Ready,
    Upload,
    Tailor,
    Settings,
    /// Drop results, selection and any operation, then go home.
    NewTailoring,
}

impl fmt::Display for NavTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavTarget::Ready => "ready",
            NavTarget::Upload => "upload",
            NavTarget::Tailor => "tailor",
            NavTarget::Settings => "settings",
            NavTarget::NewTailoring => "new tailoring",
        };
        f.write_str(name)
    }
}

/// Answer of an asynchronous credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Valid,
    Invalid,
}
