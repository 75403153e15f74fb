//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes, and the request metadata
//! extractor used by the verification endpoints.

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::error;
use veridant_core::domain::Actor;
use veridant_core::Requester;

use crate::error::AppError;
use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// Reads the session id from the `session` cookie or an `Authorization: Bearer` header.
pub fn session_id(headers: &HeaderMap) -> Option<&str> {
    let from_cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|c| {
                c.trim()
                    .strip_prefix(SESSION_COOKIE)
                    .and_then(|rest| rest.strip_prefix('='))
            })
        })
        .filter(|id| !id.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|id| !id.is_empty())
    })
}

/// Resolves the caller of a request, if it carries a live session.
pub async fn resolve_actor(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Option<Actor>, AppError> {
    let Some(auth_session_id) = session_id(headers) else {
        return Ok(None);
    };

    let user_id = match state.db.validate_auth_session(auth_session_id).await {
        Ok(Some(user_id)) => user_id,
        Ok(None) => return Ok(None),
        Err(e) => {
            error!("Failed to validate auth session: {:?}", e);
            return Err(AppError::Unauthorized);
        }
    };

    let user = state.db.get_user_by_id(user_id).await?;
    Ok(user.map(|u| Actor {
        user_id: u.id,
        role: u.role,
    }))
}

/// Middleware that validates the auth session and resolves the caller.
///
/// If valid, inserts the `Actor` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve_actor(&state, req.headers())
        .await?
        .ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but additionally rejects non-admin callers with 403.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let actor = resolve_actor(&state, req.headers())
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

//=========================================================================================
// Client Metadata
//=========================================================================================

/// The requester's address and user agent, as recorded in the verification log.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo(pub Requester);

impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty());
        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(ClientInfo(Requester { ip, user_agent }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn session_id_prefers_cookie_then_bearer() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(session_id(&headers), Some("abc"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=xyz; other=1"),
        );
        assert_eq!(session_id(&headers), Some("xyz"));
    }

    #[test]
    fn similarly_named_cookies_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session_hint=1"));
        assert_eq!(session_id(&headers), None);
    }
}
