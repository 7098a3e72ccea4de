//! Session authentication module.
//!
//! Resolves an opaque session token into a tenant identity. Token issuance
//! belongs to an external identity collaborator; this module only validates
//! JWT session tokens (plus a dev bypass mode with configurable tenants) and
//! injects the resolved tenant into requests.

mod config;
mod error;
mod middleware;

pub use config::{AuthConfig, Claims};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentTenant, auth_middleware};
