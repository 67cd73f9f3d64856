// Bearer-token gate in front of telemetry and admin routes
use crate::infrastructure::config::AuthSettings;
use crate::infrastructure::http_response::ApiError;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

/// Verified caller, attached to the request extensions by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub role: Role,
}

#[derive(Debug, Default)]
pub struct AuthGate {
    tokens: HashMap<String, Role>,
}

impl AuthGate {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut tokens = HashMap::new();
        for token in &settings.user_tokens {
            tokens.insert(token.clone(), Role::User);
        }
        // Admin wins when a token is listed twice
        for token in &settings.admin_tokens {
            tokens.insert(token.clone(), Role::Admin);
        }
        if tokens.is_empty() {
            tracing::warn!("No API tokens configured, all routes are open");
        }
        Self { tokens }
    }

    pub fn is_open(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, ApiError> {
        if self.is_open() {
            return Ok(Principal { role: Role::Admin });
        }

        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .ok_or(ApiError::Unauthorized)?;

        self.tokens
            .get(token)
            .map(|&role| Principal { role })
            .ok_or(ApiError::Unauthorized)
    }
}

pub async fn require_user(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = gate.authenticate(request.headers())?;
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(gate): State<Arc<AuthGate>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = gate.authenticate(request.headers())?;
    if principal.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}
