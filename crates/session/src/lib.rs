//! Session state for the signed-in user.
//!
//! [`SessionStore`] owns the only session this client may hold and the
//! identity resolved for it. Consumers read it through snapshots or a
//! change receiver.

mod error;
mod store;

pub use error::{AuthError, RegistrationError};
pub use store::{SessionState, SessionStatus, SessionStore};
