//! Role/resource authorization for the clinic ERP.
//!
//! This crate owns the static permission table and the evaluator that every
//! authorization decision funnels through. It performs no I/O at decision
//! time and never fails: anything it cannot resolve is a denial.
//!
//! # Architecture Overview
//!
//! 1. **Permission table** ([`PermissionTable`]) is built once at start-up,
//!    from [`PermissionTable::clinic_default`] or a YAML file
//!    ([`config::load_table`]), and shared through `Arc`.
//! 2. **Evaluator** ([`AuthzEvaluator`]) answers `can`, `can_any`, `can_all`
//!    and composite checks against that table.
//! 3. **Guards** (the `guard` crate) turn decisions into render outcomes and
//!    audit records. They are the only layer with side effects.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use authz::{AuthzEvaluator, PermissionTable, types::{Action, Role}};
//!
//! let evaluator = AuthzEvaluator::new(Arc::new(PermissionTable::clinic_default()));
//!
//! assert!(evaluator.can(Role::Physician, "patients", Action::Update));
//! assert!(!evaluator.can(Role::FrontDesk, "settings", Action::Read));
//! ```
//!
//! # Known limitations
//!
//! - Tenant and site scope never change a decision; they are carried for
//!   auditing only.
//! - There are no per-tenant overrides of the table.

pub mod cedar;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod table;
pub mod types;

pub use error::{AuthzError, Result};
pub use evaluator::{AuthzEvaluator, RequirementCheck};
pub use table::{PermissionTable, PermissionTableBuilder};
