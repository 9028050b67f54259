//! Page views returned for every request

use chrono::Local;
use serde::Serialize;

use crate::alerts::AudioAlert;
use crate::error::ErrorKind;
use crate::page::Page;
use crate::session::Session;

const TITLE: &str = "Welcome";
const SUBTITLE: &str = "The Security Alert System for Taxi Rides";

/// Severity of an inline message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Inline message shown above the page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, message)
    }

    fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Feature {
    pub title: &'static str,
    pub description: &'static str,
}

static FEATURES: [Feature; 4] = [
    Feature {
        title: "Real-time Alerts",
        description: "Instant notifications for enhanced safety",
    },
    Feature {
        title: "Secure Rides",
        description: "Advanced encryption for data protection",
    },
    Feature {
        title: "GPS Tracking",
        description: "Accurate location monitoring for peace of mind",
    },
    Feature {
        title: "24/7 Support",
        description: "Round-the-clock assistance for users",
    },
];

#[derive(Debug, Serialize)]
pub struct AudioAlertView {
    pub id: AudioAlert,
    pub label: &'static str,
}

/// Page-specific part of a view
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    Home {
        heading: &'static str,
        features: &'static [Feature],
    },
    SignIn {
        fields: &'static [&'static str],
    },
    SignUp {
        fields: &'static [&'static str],
    },
    Dashboard {
        greeting: String,
        message: &'static str,
    },
    AlertPanel {
        vehicle_no: String,
        location_link: Option<String>,
        audio_alerts: Vec<AudioAlertView>,
    },
    ChangePassword {
        fields: &'static [&'static str],
    },
}

/// Rendered page
#[derive(Debug, Serialize)]
pub struct PageView {
    pub page: Page,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub now: String,
    pub user: Option<String>,
    pub flash: Option<Flash>,
    pub error: Option<ErrorKind>,
    pub actions: &'static [&'static str],
    pub content: PageContent,
}

impl PageView {
    /// Render the page `session` is on
    pub fn render(session: &Session, flash: Option<Flash>, error: Option<ErrorKind>) -> Self {
        let page = session.effective_page();

        Self {
            page,
            title: TITLE,
            subtitle: SUBTITLE,
            now: Local::now().format("%B %d, %Y %H:%M:%S").to_string(),
            user: session.username.clone(),
            flash,
            error,
            actions: page.actions(),
            content: content(page, session),
        }
    }
}

fn content(page: Page, session: &Session) -> PageContent {
    match page {
        Page::Home => PageContent::Home {
            heading: "Why Choose KIP SAFE?",
            features: &FEATURES,
        },
        Page::SignIn => PageContent::SignIn {
            fields: &["username", "password"],
        },
        Page::SignUp => PageContent::SignUp {
            fields: &["username", "email", "password", "confirm_password"],
        },
        Page::Dashboard => PageContent::Dashboard {
            greeting: format!("Welcome, {}!", session.username.as_deref().unwrap_or_default()),
            message: "This is your KIP SAFE dashboard. More features will be added here.",
        },
        Page::AlertPanel => PageContent::AlertPanel {
            vehicle_no: session.vehicle_no.clone(),
            location_link: session.location_link.clone(),
            audio_alerts: AudioAlert::ALL
                .into_iter()
                .map(|alert| AudioAlertView {
                    id: alert,
                    label: alert.label(),
                })
                .collect(),
        },
        Page::ChangePassword => PageContent::ChangePassword {
            fields: &["current_password", "new_password", "confirm_password"],
        },
    }
}
