//! Portal routes
//!
//! Every action route runs one [`Action`] through the portal, stores the
//! updated session and answers with the rendered page view.

use axum::{
    Extension, Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{error, info};

use crate::error::{ErrorKind, PortalError};
use crate::middleware::session_middleware;
use crate::session::Session;
use crate::shell::{
    Action, AudioAlertRequest, ChangePasswordRequest, Outcome, SignInRequest, SignUpRequest,
    TextAlertRequest,
};
use crate::state::AppState;
use crate::view::{Flash, PageView};

/// Create the router for the portal
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(current_page))
        .route("/home/sign-in", post(show_sign_in))
        .route("/home/sign-up", post(show_sign_up))
        .route("/home", post(back_home))
        .route("/sign-in", post(sign_in))
        .route("/sign-up", post(sign_up))
        .route("/dashboard", post(open_dashboard))
        .route("/dashboard/alert-panel", post(open_alert_panel))
        .route("/dashboard/change-password", post(open_change_password))
        .route("/account/password", post(change_password))
        .route("/alerts/location", post(resolve_location))
        .route("/alerts/audio", post(send_audio_alert))
        .route("/alerts/text", post(send_text_alert))
        .route("/refresh", post(refresh))
        .route("/sign-out", post(sign_out))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "portal"
    }))
}

/// Render the page the session is on
pub async fn current_page(Extension(session): Extension<Session>) -> impl IntoResponse {
    Json(PageView::render(&session, None, None))
}

pub async fn show_sign_in(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::ShowSignIn).await
}

pub async fn show_sign_up(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::ShowSignUp).await
}

pub async fn back_home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::BackHome).await
}

/// User sign-in endpoint
pub async fn sign_in(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Outcome {
    perform_json(&state, session, payload, Action::SignIn).await
}

/// Account creation endpoint
pub async fn sign_up(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Outcome {
    perform_json(&state, session, payload, Action::SignUp).await
}

pub async fn open_dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::OpenDashboard).await
}

pub async fn open_alert_panel(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::OpenAlertPanel).await
}

pub async fn open_change_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::OpenChangePassword).await
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Outcome {
    perform_json(&state, session, payload, Action::ChangePassword).await
}

pub async fn resolve_location(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::ResolveLocation).await
}

pub async fn send_audio_alert(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<AudioAlertRequest>, JsonRejection>,
) -> Outcome {
    perform_json(&state, session, payload, Action::SendAudioAlert).await
}

pub async fn send_text_alert(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<TextAlertRequest>, JsonRejection>,
) -> Outcome {
    perform_json(&state, session, payload, Action::SendTextAlert).await
}

pub async fn refresh(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::Refresh).await
}

pub async fn sign_out(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Outcome {
    perform(&state, session, Action::SignOut).await
}

async fn perform(state: &AppState, session: Session, action: Action) -> Outcome {
    let outcome = state.portal.handle(session, action).await;
    state.sessions.update_session(outcome.session.clone()).await;
    outcome
}

/// Run the action built from a JSON body. An unreadable body is answered
/// with the current page and a validation error.
async fn perform_json<T>(
    state: &AppState,
    session: Session,
    payload: Result<Json<T>, JsonRejection>,
    action: fn(T) -> Action,
) -> Outcome {
    match payload {
        Ok(Json(payload)) => perform(state, session, action(payload)).await,
        Err(rejection) => Outcome {
            session,
            result: Err(PortalError::InvalidRequest(rejection.body_text())),
        },
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        match self.result {
            Ok(flash) => (
                StatusCode::OK,
                Json(PageView::render(&self.session, Some(flash), None)),
            )
                .into_response(),
            Err(err) => {
                let kind = err.kind();
                if kind == ErrorKind::Internal {
                    error!("Action failed: {}", err);
                } else {
                    info!("Action rejected: {}", err);
                }

                let flash = Flash::error(err.user_message());
                (
                    err.status(),
                    Json(PageView::render(&self.session, Some(flash), Some(kind))),
                )
                    .into_response()
            }
        }
    }
}
