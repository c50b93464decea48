//! The guard state machine.
//!
//! A [`Guard`] protects one surface with one [`CompositeRequirement`]. Each
//! call to [`Guard::check`] resolves the current session (the only await),
//! evaluates the requirement and settles in a terminal state.
//!
//! # Invariants
//!
//! - Entering `Denied` or `SessionInvalid` hands exactly one record to the
//!   audit sink, before the outcome (and any redirect in it) is returned.
//! - A terminal state is kept for the lifetime of its (session, requirement)
//!   pair. Re-checking an unchanged pair returns the cached outcome without
//!   leaving that state, so it is not a transition and emits nothing.
//! - A result computed while the provider's epoch moved is discarded.
//! - Provider errors become `Denied` with `CollaboratorFailure`. Nothing is
//!   propagated to the caller.

use audit::{AuditOutcome, AuditRecord, AuditSink, DenialReason};
use authz::types::CompositeRequirement;
use authz::AuthzEvaluator;
use session::{Session, SessionProvider};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::outcome::{GuardConfig, GuardOutcome, GuardState};

/// Attempts made when the session keeps changing mid-check.
pub const MAX_STALE_RETRIES: usize = 4;

/// What the session provider reported.
enum Resolution {
    NoSession,
    Inactive(Session),
    Active(Session),
    Failed(String),
}

/// Identity of a settled session, for caching terminal states.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SessionKey {
    session_id: Option<String>,
    active: bool,
}

impl Resolution {
    fn key(&self) -> Option<SessionKey> {
        match self {
            Resolution::NoSession => Some(SessionKey {
                session_id: None,
                active: false,
            }),
            Resolution::Inactive(s) => Some(SessionKey {
                session_id: Some(s.id.clone()),
                active: false,
            }),
            Resolution::Active(s) => Some(SessionKey {
                session_id: Some(s.id.clone()),
                active: true,
            }),
            Resolution::Failed(_) => None,
        }
    }
}

/// Turns authorization decisions into render outcomes and audit records.
pub struct Guard {
    evaluator: AuthzEvaluator,
    requirement: CompositeRequirement,
    audit: Arc<dyn AuditSink>,
    config: GuardConfig,
    state: GuardState,
    transitions: u64,
    settled: Option<(SessionKey, GuardOutcome)>,
}

impl Guard {
    pub fn new(
        evaluator: AuthzEvaluator,
        requirement: CompositeRequirement,
        audit: Arc<dyn AuditSink>,
        config: GuardConfig,
    ) -> Self {
        Self {
            evaluator,
            requirement,
            audit,
            config,
            state: GuardState::Initializing,
            transitions: 0,
            settled: None,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    pub fn requirement(&self) -> &CompositeRequirement {
        &self.requirement
    }

    /// Number of state changes so far. Hosts can re-render only when it moves.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// The most recent settled outcome, if any.
    pub fn last_outcome(&self) -> Option<&GuardOutcome> {
        self.settled.as_ref().map(|(_, outcome)| outcome)
    }

    /// Replace the requirement. A different requirement re-enters `Checking`.
    pub fn set_requirement(&mut self, requirement: CompositeRequirement) {
        if requirement == self.requirement {
            return;
        }
        self.requirement = requirement;
        self.settled = None;
        if self.state != GuardState::Initializing {
            self.transition(GuardState::Checking);
        }
    }

    /// Run the state machine against the provider's current session.
    pub async fn check(&mut self, provider: &dyn SessionProvider) -> GuardOutcome {
        for attempt in 1..=MAX_STALE_RETRIES {
            // Snapshot the epoch around the lookup
            let epoch = provider.epoch();
            let resolution = Self::resolve(provider).await;
            let now = provider.epoch();

            // Drop results the session changed under
            if now == epoch {
                return self.settle(resolution);
            }
            debug!(
                "GUARD: discarding check {} started at epoch {} (now {})",
                attempt, epoch, now
            );
        }

        warn!(
            "GUARD: session changed on every one of {} attempts",
            MAX_STALE_RETRIES
        );
        self.settle(Resolution::Failed(
            "session changed during every check attempt".to_string(),
        ))
    }

    async fn resolve(provider: &dyn SessionProvider) -> Resolution {
        let session = match provider.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Resolution::NoSession,
            Err(e) => return Resolution::Failed(e.to_string()),
        };

        match provider.is_session_active(&session).await {
            Ok(true) => Resolution::Active(session),
            Ok(false) => Resolution::Inactive(session),
            Err(e) => Resolution::Failed(e.to_string()),
        }
    }

    fn settle(&mut self, resolution: Resolution) -> GuardOutcome {
        let key = resolution.key();

        let cached = match (&key, &self.settled) {
            (Some(key), Some((settled_key, outcome))) if key == settled_key => {
                Some(outcome.clone())
            }
            _ => None,
        };
        if let Some(outcome) = cached {
            // Same pair as last time: stay put.
            return outcome;
        }

        // A fresh decision restarts the cycle.
        if self.state == GuardState::SessionInvalid {
            self.transition(GuardState::Initializing);
        }
        self.transition(GuardState::Checking);

        // Decide the outcome and what to audit
        let redirect = self.config.redirect_on_denial.clone();
        let (outcome, record) = match resolution {
            Resolution::NoSession => (
                GuardOutcome::SessionInvalid {
                    reason: DenialReason::NoSession,
                    redirect,
                },
                Some(self.record(AuditOutcome::SessionInvalid, DenialReason::NoSession, None)),
            ),
            Resolution::Inactive(session) => (
                GuardOutcome::SessionInvalid {
                    reason: DenialReason::ExpiredSession,
                    redirect,
                },
                Some(self.record(
                    AuditOutcome::SessionInvalid,
                    DenialReason::ExpiredSession,
                    Some(&session),
                )),
            ),
            Resolution::Failed(message) => {
                warn!("GUARD: session provider failed, denying: {}", message);
                (
                    GuardOutcome::Denied {
                        role: None,
                        reason: DenialReason::CollaboratorFailure,
                        redirect,
                    },
                    Some(self.record(
                        AuditOutcome::Denied,
                        DenialReason::CollaboratorFailure,
                        None,
                    )),
                )
            }
            Resolution::Active(session) => {
                if self.evaluator.evaluate(session.role, &self.requirement) {
                    (
                        GuardOutcome::Granted {
                            role: session.role,
                            session_id: session.id.clone(),
                        },
                        None,
                    )
                } else {
                    let reason = if self.evaluator.knows_all_resources(&self.requirement) {
                        DenialReason::InsufficientPermissions
                    } else {
                        DenialReason::UnknownResourceOrRole
                    };
                    (
                        GuardOutcome::Denied {
                            role: Some(session.role),
                            reason,
                            redirect,
                        },
                        Some(self.record(AuditOutcome::Denied, reason, Some(&session))),
                    )
                }
            }
        };

        self.transition(outcome.state());

        // Audit before the host can act on the outcome
        if let Some(record) = record {
            info!(
                "GUARD: access refused ({}) for {}",
                record.reason,
                record.requirements_label()
            );
            if let Err(e) = self.audit.record_unauthorized_access(record) {
                warn!("GUARD: audit sink rejected record: {}", e);
            }
        }

        // Cache for the next check of the same session
        self.settled = key.map(|key| (key, outcome.clone()));
        outcome
    }

    fn record(
        &self,
        outcome: AuditOutcome,
        reason: DenialReason,
        session: Option<&Session>,
    ) -> AuditRecord {
        let record = AuditRecord::new(outcome, reason, &self.requirement);
        match session {
            Some(s) => record
                .with_actor(&s.user_id, s.role, &s.id)
                .with_scope(s.scope.enterprise_id.clone(), s.scope.site_id.clone()),
            None => record,
        }
    }

    fn transition(&mut self, next: GuardState) {
        if self.state != next {
            debug!("GUARD: {:?} -> {:?}", self.state, next);
            self.state = next;
            self.transitions += 1;
        }
    }
}
