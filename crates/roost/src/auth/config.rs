//! Authentication configuration and token claims.

use serde::{Deserialize, Serialize};

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enable development mode (dev tokens and the X-Dev-Tenant header).
    pub dev_mode: bool,

    /// JWT secret for HS256. Supports `env:VAR_NAME` indirection.
    /// Required when dev_mode is false.
    pub jwt_secret: Option<String>,

    /// Tenants accepted by dev tokens (only used in dev mode).
    pub dev_tenants: Vec<String>,

    /// Allowed CORS origins.
    pub allowed_origins: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_mode: false,
            jwt_secret: None,
            dev_tenants: Vec::new(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:8080".to_string(),
            ],
        }
    }
}

impl AuthConfig {
    /// Resolve the JWT secret, expanding `env:VAR_NAME` syntax.
    pub fn resolve_jwt_secret(&self) -> Option<String> {
        match &self.jwt_secret {
            None => None,
            Some(value) => {
                if let Some(var_name) = value.strip_prefix("env:") {
                    std::env::var(var_name).ok().filter(|s| !s.is_empty())
                } else {
                    Some(value.clone())
                }
            }
        }
    }
}

/// JWT claims for a session token.
///
/// `sub` carries the tenant id; the rest is standard JWT bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Tenant id.
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Expiry (unix seconds).
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl Claims {
    pub fn tenant_id(&self) -> &str {
        &self.sub
    }
}
