//! Identity and session management: a local credential provider issuing
//! short-lived ID tokens, and a session manager exchanging verified tokens
//! for revocable 5-day session cookies.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod session;

pub use principal::Principal;
pub use provider::{IdentityProvider, LocalIdentityProvider, RegisterError, RegisterRequest};
pub use session::{Session, SessionManager, SessionToken};
