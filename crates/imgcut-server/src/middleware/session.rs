use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
    middleware::Next,
    response::Response,
};
use imgcut_core::{CoreError, Session};
use tracing::{debug, info, warn};

use crate::state::AppState;
use crate::utils::error::ApiError;

/// Session middleware - resolve the session cookie or start a new session.
///
/// Unknown or malformed cookies fall through to a new session. Every request
/// that resolves a session restarts its idle timer.
pub async fn manage_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let cookie_name = state.settings.session.cookie_name.as_str();

    let existing = session_cookie(request.headers(), cookie_name)
        .and_then(|id| state.registry.find(id));
    let (session, created) = match existing {
        Some(session) => (session, false),
        None => {
            info!("creating new session");
            (state.registry.new_session(), true)
        }
    };

    session.touch();
    debug!("working session: {}", session);
    request.extensions_mut().insert(session.clone());

    let mut response = next.run(request).await;

    if created {
        let cookie = session_set_cookie(
            cookie_name,
            &session.id().to_string(),
            state.settings.session.cookie_max_age_secs,
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
                debug!("sent cookie: {}", cookie);
            }
            Err(e) => warn!("invalid session cookie {}: {}", cookie, e),
        }
    }

    response
}

/// Session attached to the request by [`manage_session`].
pub struct CurrentSession(pub Arc<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<Session>>()
            .cloned()
            .map(CurrentSession)
            .ok_or_else(|| ApiError::from(CoreError::NilSession))
    }
}

/// Value of cookie `name`, if the request carries one.
pub fn session_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
}

pub fn session_set_cookie(name: &str, value: &str, max_age_secs: u64) -> String {
    format!("{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite=Lax")
}
