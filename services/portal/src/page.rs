//! Page state machine

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical page a session is on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    #[default]
    Home,
    #[serde(rename = "signin")]
    SignIn,
    #[serde(rename = "signup")]
    SignUp,
    Dashboard,
    AlertPanel,
    ChangePassword,
}

/// A page change triggered by a user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ShowSignIn,
    ShowSignUp,
    BackHome,
    SignedIn,
    Registered,
    OpenAlertPanel,
    OpenChangePassword,
    OpenDashboard,
    PasswordChanged,
    SignOut,
    Refresh,
}

impl Page {
    pub const ALL: [Page; 6] = [
        Page::Home,
        Page::SignIn,
        Page::SignUp,
        Page::Dashboard,
        Page::AlertPanel,
        Page::ChangePassword,
    ];

    /// Page reached by `transition` from this page, or `None` when the
    /// transition is not available here.
    pub fn next(self, transition: Transition) -> Option<Page> {
        use Page::*;
        use Transition::*;

        match (self, transition) {
            (_, Refresh) => Some(Home),
            (Home, ShowSignIn) => Some(SignIn),
            (Home, ShowSignUp) => Some(SignUp),
            (SignIn | SignUp, BackHome) => Some(Home),
            (SignIn, SignedIn) => Some(Dashboard),
            (SignUp, Registered) => Some(SignIn),
            (Dashboard, OpenAlertPanel) => Some(AlertPanel),
            (Dashboard, OpenChangePassword) => Some(ChangePassword),
            (AlertPanel | ChangePassword, OpenDashboard) => Some(Dashboard),
            (ChangePassword, PasswordChanged) => Some(Dashboard),
            (Dashboard | AlertPanel | ChangePassword, SignOut) => Some(Home),
            _ => None,
        }
    }

    /// Whether the page is only reachable with a signed-in user
    pub fn requires_sign_in(self) -> bool {
        matches!(
            self,
            Page::Dashboard | Page::AlertPanel | Page::ChangePassword
        )
    }

    /// Names of the actions a page view offers
    pub fn actions(self) -> &'static [&'static str] {
        match self {
            Page::Home => &["show_sign_in", "show_sign_up", "refresh"],
            Page::SignIn => &["sign_in", "back_home", "refresh"],
            Page::SignUp => &["sign_up", "back_home", "refresh"],
            Page::Dashboard => &[
                "open_alert_panel",
                "open_change_password",
                "sign_out",
                "refresh",
            ],
            Page::AlertPanel => &[
                "resolve_location",
                "send_audio_alert",
                "send_text_alert",
                "open_dashboard",
                "sign_out",
                "refresh",
            ],
            Page::ChangePassword => &["change_password", "open_dashboard", "sign_out", "refresh"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::SignIn => "signin",
            Page::SignUp => "signup",
            Page::Dashboard => "dashboard",
            Page::AlertPanel => "alert_panel",
            Page::ChangePassword => "change_password",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
