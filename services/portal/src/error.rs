//! Custom error types for the portal service

use axum::http::StatusCode;
use common::error::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::page::Page;

/// Errors raised while registering, signing in or changing a password
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid username format. Use 3-20 alphanumeric characters or underscores.")]
    InvalidUsername,

    #[error("Invalid email format.")]
    InvalidEmail,

    #[error("Password must be at least 8 characters long and contain both letters and numbers.")]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Username already exists.")]
    UsernameTaken,

    /// Same message for unknown users and wrong passwords
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Too many failed sign-in attempts. Try again later.")]
    TooManyAttempts,

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors raised while sending alerts
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Please enter a message before sending.")]
    EmptyMessage,

    /// Provider or transport failure, detail passed through from the provider
    #[error("Error sending message: {0}")]
    Dispatch(String),

    /// Provider failure while sending an audio alert
    #[error("Error sending audio: {0}")]
    AudioDispatch(String),

    /// Provider failure while sending a text alert
    #[error("Error sending text message: {0}")]
    TextDispatch(String),
}

/// Any failure of a user action
#[derive(Error, Debug)]
pub enum PortalError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    /// Request body that could not be read as the action's payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Please sign in to continue.")]
    SignInRequired,

    #[error("That action is not available from the {0} page.")]
    ActionUnavailable(Page),
}

/// Error taxonomy surfaced with every failed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Auth,
    DuplicateAccount,
    Dispatch,
    EmptyInput,
    Navigation,
    Internal,
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::Auth(e) => match e {
                AuthError::InvalidUsername
                | AuthError::InvalidEmail
                | AuthError::WeakPassword
                | AuthError::PasswordMismatch => ErrorKind::Validation,
                AuthError::UsernameTaken => ErrorKind::DuplicateAccount,
                AuthError::InvalidCredentials | AuthError::TooManyAttempts => ErrorKind::Auth,
                AuthError::Hashing(_) | AuthError::Store(_) => ErrorKind::Internal,
            },
            PortalError::Alert(AlertError::EmptyMessage) => ErrorKind::EmptyInput,
            PortalError::Alert(
                AlertError::Dispatch(_) | AlertError::AudioDispatch(_) | AlertError::TextDispatch(_),
            ) => ErrorKind::Dispatch,
            PortalError::InvalidRequest(_) => ErrorKind::Validation,
            PortalError::SignInRequired | PortalError::ActionUnavailable(_) => {
                ErrorKind::Navigation
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            PortalError::Auth(AuthError::TooManyAttempts) => StatusCode::TOO_MANY_REQUESTS,
            PortalError::SignInRequired => StatusCode::UNAUTHORIZED,
            PortalError::ActionUnavailable(_) => StatusCode::CONFLICT,
            _ => match self.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Auth => StatusCode::UNAUTHORIZED,
                ErrorKind::DuplicateAccount => StatusCode::CONFLICT,
                ErrorKind::Dispatch => StatusCode::BAD_GATEWAY,
                ErrorKind::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Navigation => StatusCode::CONFLICT,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Message shown inline on the page. Internal details stay in the logs.
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Something went wrong. Please try again.".to_string(),
            _ => self.to_string(),
        }
    }
}
