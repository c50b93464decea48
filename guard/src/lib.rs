//! Guard wrapper for protected surfaces.
//!
//! A guard asks the [`authz::AuthzEvaluator`] about the current session's
//! role and reports one of three outcomes:
//!
//! - [`GuardOutcome::Granted`] – render the protected content
//! - [`GuardOutcome::Denied`] – render the fallback, or navigate away
//! - [`GuardOutcome::SessionInvalid`] – nobody signed in, or the session lapsed
//!
//! Guards are the only layer with side effects: they write the audit record
//! for every refusal. The host decides how to render, using
//! [`GuardOutcome::render_instruction`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use audit::MemoryAuditSink;
//! use authz::{AuthzEvaluator, PermissionTable, types::{Action, CompositeRequirement, Role}};
//! use guard::{Guard, GuardConfig, RenderInstruction};
//! use session::{InMemorySessionProvider, TenantScope};
//!
//! # tokio_test_block(async {
//! let evaluator = AuthzEvaluator::new(Arc::new(PermissionTable::clinic_default()));
//! let provider = InMemorySessionProvider::default();
//! provider.sign_in("dr-1", Role::Physician, TenantScope::platform()).await;
//!
//! let mut guard = Guard::new(
//!     evaluator,
//!     CompositeRequirement::single("patients", Action::Update),
//!     Arc::new(MemoryAuditSink::new()),
//!     GuardConfig::with_redirect("/login"),
//! );
//! let outcome = guard.check(&provider).await;
//! assert_eq!(outcome.render_instruction(), RenderInstruction::RenderContent);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod error;
pub mod guard;
pub mod outcome;


pub use error::{GuardError, Result};
pub use guard::{Guard, MAX_STALE_RETRIES};
pub use outcome::{GuardConfig, GuardOutcome, GuardState, RenderInstruction};
