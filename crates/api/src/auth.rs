//! Bearer token authentication for the admin surface.
//!
//! A single shared admin password yields a capability token; there is no
//! per-user identity or session store, so token checks are a prefix check.
//! Login, health probes, and provider webhooks stay open: webhooks carry
//! their own HMAC signature instead.

use crate::models::{ErrorResponse, LoginRequest, LoginResponse};
use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use invite_core::config::AdminConfig;
use invite_core::{InviteError, InviteResult};
use rand::Rng;

const TOKEN_PREFIX: &str = "ie_admin_";

/// Validate the shared admin password and mint a bearer token.
pub fn authenticate(config: &AdminConfig, req: &LoginRequest) -> InviteResult<LoginResponse> {
    config.require_password()?;
    if req.password != config.password {
        return Err(InviteError::Validation("invalid password".to_string()));
    }
    Ok(LoginResponse {
        token: generate_token(),
        expires_at: Utc::now() + Duration::hours(24),
    })
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    format!(
        "{}{}",
        TOKEN_PREFIX,
        bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    )
}

fn is_open_path(path: &str) -> bool {
    path == "/admin/login"
        || path.starts_with("/health")
        || path.starts_with("/ready")
        || path.starts_with("/live")
        || path.starts_with("/webhooks/")
}

/// Middleware checking the bearer token on every protected route.
pub async fn auth_middleware(req: Request, next: Next) -> Response {
    if is_open_path(req.uri().path()) {
        return next.run(req).await;
    }

    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if value.starts_with("Bearer ") => {
            let token = &value[7..];
            if token.starts_with(TOKEN_PREFIX) && token.len() > TOKEN_PREFIX.len() {
                next.run(req).await
            } else {
                unauthorized("invalid_token", "Invalid bearer token")
            }
        }
        _ => unauthorized(
            "missing_auth",
            "Authorization header with Bearer token required",
        ),
    }
}

fn unauthorized(code: &str, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: code.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}
