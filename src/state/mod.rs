// Session state module.
// Defines the persisted session record, panels, and the staleness policy.

pub mod panel;
pub mod policy;
pub mod session;

pub use panel::{Panel, PanelProps, PanelView};
pub use policy::{DEFAULT_RESULTS_FRESH_FOR, DEFAULT_STALE_AFTER, Policy};
pub use session::{
    CachedResults, LongOperation, OperationHandle, OperationKind, OperationPayload, SessionState,
};
