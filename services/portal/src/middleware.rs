//! Middleware attaching a browser session to every request

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

/// Cookie carrying the session id
pub const SESSION_COOKIE: &str = "kipsafe_session";

/// Load the session named by the cookie, or start a new one
///
/// The session is inserted into the request extensions. A cookie is only set
/// on the response when a new session was created.
pub async fn session_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let existing = match jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
    {
        Some(id) => state.sessions.get_session(id).await,
        None => None,
    };

    let (session, created) = match existing {
        Some(session) => (session, false),
        None => (state.sessions.create_session().await, true),
    };
    let id = session.id;
    debug!("Request bound to session {}", id);

    req.extensions_mut().insert(session);
    let response = next.run(req).await;

    if !created {
        return response;
    }

    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), response).into_response()
}
