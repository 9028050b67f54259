//! Action handling
//!
//! [`Portal::handle`] takes a session and a user action, performs the action
//! and returns the updated session together with the message to show.

use serde::Deserialize;
use tracing::info;

use crate::alerts::{AlertDispatcher, AudioAlert};
use crate::auth::AuthService;
use crate::error::{AuthError, PortalError};
use crate::page::{Page, Transition};
use crate::rate_limiter::RateLimiter;
use crate::session::Session;
use crate::validation::sanitize_input;
use crate::view::Flash;

/// Request for user sign-in
#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

/// Request for account creation
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// Request for a password change
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Request for a pre-recorded audio alert
#[derive(Debug, Clone, Deserialize)]
pub struct AudioAlertRequest {
    pub alert: AudioAlert,
    /// Replaces the vehicle number remembered by the session when present
    #[serde(default)]
    pub vehicle_no: Option<String>,
    #[serde(default)]
    pub recipient: Option<String>,
}

/// Request for a free-text alert
#[derive(Debug, Clone, Deserialize)]
pub struct TextAlertRequest {
    pub message: String,
    #[serde(default)]
    pub recipient: Option<String>,
}

/// Everything a user can do
#[derive(Clone)]
pub enum Action {
    ShowSignIn,
    ShowSignUp,
    BackHome,
    SignIn(SignInRequest),
    SignUp(SignUpRequest),
    OpenDashboard,
    OpenAlertPanel,
    OpenChangePassword,
    ChangePassword(ChangePasswordRequest),
    ResolveLocation,
    SendAudioAlert(AudioAlertRequest),
    SendTextAlert(TextAlertRequest),
    Refresh,
    SignOut,
}

impl Action {
    /// Name used in logs and page views. Never includes the payload.
    pub fn name(&self) -> &'static str {
        match self {
            Action::ShowSignIn => "show_sign_in",
            Action::ShowSignUp => "show_sign_up",
            Action::BackHome => "back_home",
            Action::SignIn(_) => "sign_in",
            Action::SignUp(_) => "sign_up",
            Action::OpenDashboard => "open_dashboard",
            Action::OpenAlertPanel => "open_alert_panel",
            Action::OpenChangePassword => "open_change_password",
            Action::ChangePassword(_) => "change_password",
            Action::ResolveLocation => "resolve_location",
            Action::SendAudioAlert(_) => "send_audio_alert",
            Action::SendTextAlert(_) => "send_text_alert",
            Action::Refresh => "refresh",
            Action::SignOut => "sign_out",
        }
    }
}

/// Result of one action
#[derive(Debug)]
pub struct Outcome {
    pub session: Session,
    pub result: Result<Flash, PortalError>,
}

/// Routes user actions to the auth service and the alert dispatcher
#[derive(Clone)]
pub struct Portal {
    auth: AuthService,
    alerts: AlertDispatcher,
    sign_in_limiter: RateLimiter,
}

impl Portal {
    pub fn new(auth: AuthService, alerts: AlertDispatcher, sign_in_limiter: RateLimiter) -> Self {
        Self {
            auth,
            alerts,
            sign_in_limiter,
        }
    }

    /// Perform `action` for `session`
    pub async fn handle(&self, mut session: Session, action: Action) -> Outcome {
        session.page = session.effective_page();
        info!("Action {} on page {}", action.name(), session.page);

        let result = self.apply(&mut session, action).await;
        Outcome { session, result }
    }

    async fn apply(&self, session: &mut Session, action: Action) -> Result<Flash, PortalError> {
        match action {
            Action::ShowSignIn => navigate(session, Transition::ShowSignIn),
            Action::ShowSignUp => navigate(session, Transition::ShowSignUp),
            Action::BackHome => navigate(session, Transition::BackHome),
            Action::OpenDashboard => navigate(session, Transition::OpenDashboard),
            Action::OpenAlertPanel => navigate(session, Transition::OpenAlertPanel),
            Action::OpenChangePassword => navigate(session, Transition::OpenChangePassword),
            Action::SignIn(request) => self.sign_in(session, request).await,
            Action::SignUp(request) => self.sign_up(session, request).await,
            Action::ChangePassword(request) => self.change_password(session, request).await,
            Action::ResolveLocation => {
                require_alert_panel(session)?;

                session.location_link = self.alerts.get_current_location().await;
                Ok(match &session.location_link {
                    Some(link) => Flash::success(format!("Location detected: {link}")),
                    None => Flash::warning("Could not detect location."),
                })
            }
            Action::SendAudioAlert(request) => {
                require_alert_panel(session)?;

                if let Some(vehicle_no) = request.vehicle_no {
                    session.vehicle_no = vehicle_no.trim().to_string();
                }

                let alert = request.alert;
                self.alerts
                    .send_audio_alert(
                        alert.audio_url(),
                        &session.vehicle_no,
                        alert.label(),
                        session.location_link.as_deref(),
                        request.recipient.as_deref(),
                    )
                    .await?;
                Ok(Flash::success("Audio sent successfully!"))
            }
            Action::SendTextAlert(request) => {
                require_alert_panel(session)?;

                self.alerts
                    .send_text_alert(&request.message, request.recipient.as_deref())
                    .await?;
                Ok(Flash::success("Text message sent successfully!"))
            }
            Action::Refresh => {
                next_page(session, Transition::Refresh)?;
                session.reset();
                Ok(Flash::info("Session refreshed."))
            }
            Action::SignOut => {
                next_page(session, Transition::SignOut)?;
                info!("User signed out: {}", session.username.as_deref().unwrap_or_default());
                session.reset();
                Ok(Flash::success("Signed out successfully!"))
            }
        }
    }

    async fn sign_in(&self, session: &mut Session, request: SignInRequest) -> Result<Flash, PortalError> {
        let next = next_page(session, Transition::SignedIn)?;
        let username = sanitize_input(&request.username);

        if !self.sign_in_limiter.is_allowed(&username).await {
            return Err(AuthError::TooManyAttempts.into());
        }

        if !self.auth.authenticate(&username, &request.password).await? {
            self.sign_in_limiter.record_failure(&username).await;
            return Err(AuthError::InvalidCredentials.into());
        }

        self.sign_in_limiter.reset(&username).await;
        session.username = Some(username);
        session.page = next;
        Ok(Flash::success("Signed in successfully!"))
    }

    async fn sign_up(&self, session: &mut Session, request: SignUpRequest) -> Result<Flash, PortalError> {
        let next = next_page(session, Transition::Registered)?;

        if request.password != request.confirm_password {
            return Err(AuthError::PasswordMismatch.into());
        }

        self.auth
            .register(&request.username, &request.password, &request.email)
            .await?;

        session.page = next;
        Ok(Flash::success("Account created successfully!"))
    }

    async fn change_password(
        &self,
        session: &mut Session,
        request: ChangePasswordRequest,
    ) -> Result<Flash, PortalError> {
        let next = next_page(session, Transition::PasswordChanged)?;
        let username = session.username.clone().ok_or(PortalError::SignInRequired)?;

        if request.new_password != request.confirm_password {
            return Err(AuthError::PasswordMismatch.into());
        }

        self.auth
            .change_password(&username, &request.current_password, &request.new_password)
            .await?;

        session.page = next;
        Ok(Flash::success("Password changed successfully!"))
    }
}

/// Page `transition` leads to from the session's page
fn next_page(session: &Session, transition: Transition) -> Result<Page, PortalError> {
    match session.page.next(transition) {
        Some(page) => Ok(page),
        None if !session.is_signed_in() && needs_sign_in(transition) => {
            Err(PortalError::SignInRequired)
        }
        None => Err(PortalError::ActionUnavailable(session.page)),
    }
}

fn navigate(session: &mut Session, transition: Transition) -> Result<Flash, PortalError> {
    session.page = next_page(session, transition)?;
    Ok(Flash::info(format!("Showing the {} page.", session.page)))
}

fn needs_sign_in(transition: Transition) -> bool {
    matches!(
        transition,
        Transition::OpenDashboard
            | Transition::OpenAlertPanel
            | Transition::OpenChangePassword
            | Transition::PasswordChanged
            | Transition::SignOut
    )
}

fn require_alert_panel(session: &Session) -> Result<(), PortalError> {
    match session.page {
        Page::AlertPanel => Ok(()),
        _ if !session.is_signed_in() => Err(PortalError::SignInRequired),
        page => Err(PortalError::ActionUnavailable(page)),
    }
}
