//! Session token middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use log::{debug, warn};
use std::sync::Arc;

use super::{AuthConfig, AuthError, Claims};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Session gate state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    decoding_key: Option<DecodingKey>,
}

impl AuthState {
    /// Create new auth state from config.
    /// Resolves `env:VAR_NAME` syntax in jwt_secret at construction time.
    pub fn new(mut config: AuthConfig) -> Self {
        if let Some(resolved) = config.resolve_jwt_secret() {
            config.jwt_secret = Some(resolved);
        }

        let decoding_key = config
            .jwt_secret
            .as_ref()
            .map(|s| DecodingKey::from_secret(s.as_bytes()));

        Self {
            config: Arc::new(config),
            decoding_key,
        }
    }

    /// Check if dev mode is enabled.
    pub fn is_dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Check whether a tenant is in the dev tenant list.
    pub fn is_dev_tenant(&self, tenant_id: &str) -> bool {
        self.config.dev_tenants.iter().any(|t| t == tenant_id)
    }

    /// Validate a session token and resolve the tenant it belongs to.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        // Dev tokens are prefixed with "dev:" and only honored in dev mode.
        if self.config.dev_mode {
            if let Some(tenant_id) = token.strip_prefix("dev:") {
                return self.dev_tenant_claims(tenant_id);
            }
        }

        let decoding_key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.required_spec_claims.clear(); // Allow missing iss/aud

        let token_data = decode::<Claims>(token, decoding_key, &validation).map_err(|e| {
            warn!("JWT validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    fn dev_tenant_claims(&self, tenant_id: &str) -> Result<Claims, AuthError> {
        if !self.is_dev_tenant(tenant_id) {
            return Err(AuthError::UnknownTenant);
        }

        Ok(Claims {
            sub: tenant_id.to_string(),
            iss: Some("dev".to_string()),
            exp: Utc::now().timestamp() + 3600 * 24,
            iat: Some(Utc::now().timestamp()),
        })
    }

    /// Generate a session token for a tenant.
    pub fn generate_token(&self, tenant_id: &str) -> Result<String, AuthError> {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let secret = self
            .config
            .jwt_secret
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let claims = Claims {
            sub: tenant_id.to_string(),
            iss: Some("roost".to_string()),
            exp: Utc::now().timestamp() + 3600 * 24,
            iat: Some(Utc::now().timestamp()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }
}

/// The tenant resolved from the caller's session.
#[derive(Debug, Clone)]
pub struct CurrentTenant {
    pub claims: Claims,
}

impl CurrentTenant {
    /// Get the tenant id.
    pub fn id(&self) -> &str {
        &self.claims.sub
    }
}

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentTenant>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Session authentication middleware.
///
/// Resolves the session token to a tenant and injects `CurrentTenant` into
/// request extensions. Supports multiple token sources in priority order:
/// 1. Authorization: Bearer <token> header
/// 2. session_token cookie
/// 3. token query parameter
/// 4. X-Dev-Tenant header (dev mode only)
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    // Browser clients send the token as a cookie.
    let cookie_token = req
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_header| token_from_cookie_header(cookie_header, "session_token"));

    let query_token = req.uri().query().and_then(|q| {
        q.split('&').find_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            let value = parts.next()?;
            if key == "token" {
                urlencoding::decode(value).ok().map(|s| s.into_owned())
            } else {
                None
            }
        })
    });

    let claims = if let Some(header) = auth_header {
        let token = bearer_token_from_header(header)?;
        auth.validate_token(token)?
    } else if let Some(token) = cookie_token {
        auth.validate_token(token)?
    } else if let Some(ref token) = query_token {
        auth.validate_token(token)?
    } else if auth.is_dev_mode() {
        if let Some(tenant_id) = req
            .headers()
            .get("X-Dev-Tenant")
            .and_then(|h| h.to_str().ok())
        {
            debug!("using dev tenant: {}", tenant_id);
            auth.validate_token(&format!("dev:{}", tenant_id))?
        } else {
            return Err(AuthError::MissingToken);
        }
    } else {
        return Err(AuthError::MissingToken);
    };

    let tenant = CurrentTenant { claims };
    req.extensions_mut().insert(tenant);

    Ok(next.run(req).await)
}
