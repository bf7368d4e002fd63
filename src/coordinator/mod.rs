// Session state coordinator.
// Reads the stored session, applies the transition rules, writes the result
// back in one bulk write, and tells the renderer which panel to show.

pub mod clock;
pub mod effects;
pub mod flows;
pub mod rules;

use tracing::{debug, info, warn};

use crate::api::{Backend, endpoints};
use crate::error::Result;
use crate::render::PanelRenderer;
use crate::state::{OperationHandle, OperationKind, OperationPayload, PanelView, Policy, SessionState};
use crate::storage::{Credential, KeyValueStore, load_session, save_session};

pub use clock::{Clock, ManualClock, SystemClock};
pub use effects::{NavTarget, OperationOutcome, Reconciliation, SideEffect, Verification};

/// Owns the decision of which panel is active.
///
/// Every operation reads one snapshot, computes the complete next state in
/// memory, and persists it with a single write before rendering. A failed
/// write leaves the stored session exactly as it was.
pub struct Coordinator<S, B, R, C = SystemClock> {
    store: S,
    backend: B,
    renderer: R,
    clock: C,
    policy: Policy,
}

impl<S, B, R, C> Coordinator<S, B, R, C>
where
    S: KeyValueStore,
    B: Backend,
    R: PanelRenderer,
    C: Clock,
{
    pub fn new(store: S, backend: B, renderer: R, clock: C) -> Self {
        Self {
            store,
            backend,
            renderer,
            clock,
            policy: Policy::default(),
        }
    }

    /// Replace the default staleness thresholds.
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Read the stored session without changing it.
    pub async fn snapshot(&self) -> Result<SessionState> {
        load_session(&self.store).await
    }

    /// Persist `next` in one write unless nothing changed.
    async fn persist(
        &self,
        before: &SessionState,
        next: &SessionState,
        credential: Option<&Credential>,
    ) -> Result<()> {
        if next != before || credential.is_some() {
            save_session(&self.store, next, credential).await?;
        }
        Ok(())
    }

    /// Persist `next` if it differs from `before` (or a credential must be
    /// written), then show `view`.
    async fn commit(
        &mut self,
        before: &SessionState,
        next: &SessionState,
        credential: Option<&Credential>,
        view: &PanelView,
    ) -> Result<()> {
        self.persist(before, next, credential).await?;
        info!(panel = ?view.panel, busy = view.props.is_busy(), "Showing panel");
        self.renderer.show(view);
        Ok(())
    }

    /// Decide what the popup shows when it opens.
    pub async fn reconcile_on_open(&mut self) -> Result<Reconciliation> {
        let state = self.snapshot().await?;
        self.reconcile_from(state, None).await
    }

    async fn reconcile_from(
        &mut self,
        state: SessionState,
        credential: Option<&Credential>,
    ) -> Result<Reconciliation> {
        let decision = rules::reconcile_on_open(&state, self.clock.now(), &self.policy);
        self.commit(&state, &decision.next, credential, &decision.view)
            .await?;

        if decision.effects.contains(&SideEffect::FetchDefaultResume) {
            if let Some(adopted) = self.adopt_default_resume().await? {
                return Ok(adopted);
            }
        }

        Ok(Reconciliation {
            view: decision.view,
            effects: decision.effects,
        })
    }

    /// Look for a default resume on the backend and, if found, re-run the
    /// rules with it. The snapshot is re-read after the lookup so that a
    /// selection recorded meanwhile still takes precedence over Ready.
    async fn adopt_default_resume(&mut self) -> Result<Option<Reconciliation>> {
        let resume_id = match endpoints::fetch_default_resume(&self.backend).await {
            Ok(Some(resume)) => match resume.id() {
                Some(id) => id,
                None => {
                    warn!("Default resume response has no resume id");
                    return Ok(None);
                }
            },
            Ok(None) => {
                debug!("No default resume on the backend");
                return Ok(None);
            }
            Err(e) if e.is_unauthorized() => {
                return Ok(self
                    .apply_verification(Verification::Invalid)
                    .await?
                    .map(|view| Reconciliation {
                        view,
                        effects: vec![SideEffect::FetchDefaultResume],
                    }));
            }
            Err(e) => {
                warn!(error = %e, "Default resume lookup failed, staying on upload");
                return Ok(None);
            }
        };

        let stored = self.snapshot().await?;
        if !stored.has_auth_token || stored.active_resume_id.is_some() {
            // Signed out or a resume arrived another way while we waited
            return Ok(None);
        }

        info!(resume_id = %resume_id, "Adopting default resume");
        let mut state = stored.clone();
        state.active_resume_id = Some(resume_id);

        let decision = rules::reconcile_on_open(&state, self.clock.now(), &self.policy);
        self.commit(&stored, &decision.next, None, &decision.view)
            .await?;

        let mut effects = vec![SideEffect::FetchDefaultResume];
        effects.extend(decision.effects);
        Ok(Some(Reconciliation {
            view: decision.view,
            effects,
        }))
    }

    /// Record that a long-running request is starting.
    pub async fn begin_long_operation(
        &mut self,
        kind: OperationKind,
        payload: OperationPayload,
    ) -> Result<OperationHandle> {
        let state = self.snapshot().await?;
        let (next, op, view) =
            rules::begin_long_operation(&state, kind, payload, self.clock.now(), &self.policy)?;
        self.commit(&state, &next, None, &view).await?;
        info!(kind = %op.kind, handle = %op.handle, "Long operation started");
        Ok(op.handle)
    }

    /// Record how a long-running request ended. Returns `None`, changing
    /// nothing, when `handle` is not the live stored operation.
    pub async fn complete_long_operation(
        &mut self,
        handle: OperationHandle,
        outcome: OperationOutcome,
    ) -> Result<Option<PanelView>> {
        let state = self.snapshot().await?;
        let Some((next, view)) = rules::complete_long_operation(
            &state,
            handle,
            outcome,
            self.clock.now(),
            &self.policy,
        ) else {
            debug!(handle = %handle, "Ignoring completion for an operation no longer tracked");
            return Ok(None);
        };

        self.commit(&state, &next, None, &view).await?;
        info!(handle = %handle, panel = ?view.panel, "Long operation finished");
        Ok(Some(view))
    }

    /// Switch panels on user request.
    pub async fn navigate(&mut self, target: NavTarget) -> Result<PanelView> {
        let state = self.snapshot().await?;
        let (next, view) = rules::navigate(&state, target, self.clock.now(), &self.policy)?;
        self.commit(&state, &next, None, &view).await?;
        Ok(view)
    }

    /// Store a fresh credential and reconcile from a clean account.
    pub async fn on_login(&mut self, credential: Credential) -> Result<Reconciliation> {
        let state = self.snapshot().await?;
        let signed_in = rules::login(&state);
        info!("Signed in");
        self.reconcile_from(signed_in, Some(&credential)).await
    }

    /// Drop the credential and everything tied to the account.
    pub async fn on_logout(&mut self) -> Result<PanelView> {
        // Logout does not depend on what was stored
        let state = match self.snapshot().await {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Could not read session before logout");
                SessionState::default()
            }
        };
        let next = rules::logout(&state);
        let view = PanelView::plain(next.panel);
        save_session(&self.store, &next, None).await?;
        info!("Signed out");
        self.renderer.show(&view);
        Ok(view)
    }

    /// Apply the answer of a background credential check. An invalid
    /// credential overrides whatever panel is currently showing.
    pub async fn apply_verification(
        &mut self,
        verification: Verification,
    ) -> Result<Option<PanelView>> {
        let state = self.snapshot().await?;
        let Some((next, view)) = rules::apply_verification(&state, verification) else {
            return Ok(None);
        };

        warn!("Credential rejected by the backend, returning to sign in");
        self.commit(&state, &next, None, &view).await?;
        Ok(Some(view))
    }
}
