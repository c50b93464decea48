//! Identity and session resolution.
//!
//! Authorization code only ever reads sessions through the
//! [`SessionProvider`] trait. [`InMemorySessionProvider`] is the provider used
//! by embedding hosts that manage a single signed-in actor, and by tests.

pub mod error;
pub mod provider;
pub mod types;

pub use error::{Result as SessionResult, SessionError};
pub use provider::{InMemorySessionProvider, SessionProvider};
pub use types::{Session, SessionConfig, TenantScope};
