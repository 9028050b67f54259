//! Portal configuration
//!
//! Built-in defaults are layered under environment variables prefixed with
//! `KIPSAFE_`. Nested keys use `__`, e.g. `KIPSAFE_MESSAGING__ACCOUNT_SID`.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_USERS_FILE: &str = "users.csv";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;
const DEFAULT_MESSAGING_API_BASE: &str = "https://api.twilio.com";
const DEFAULT_GEOLOCATION_ENDPOINT: &str = "https://ipinfo.io/loc";
const DEFAULT_MAP_BASE: &str = "https://maps.google.com/?q=";
const DEFAULT_MAX_SIGN_IN_ATTEMPTS: u32 = 5;
const DEFAULT_SIGN_IN_WINDOW_SECS: u64 = 300;
const DEFAULT_SIGN_IN_LOCKOUT_SECS: u64 = 900;

/// Top-level portal configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Address the HTTP server listens on
    pub bind_addr: String,
    /// Path of the CSV credential file
    pub users_file: PathBuf,
    /// Timeout applied to every outbound provider request
    pub http_timeout_secs: u64,
    /// Seconds a browser session survives without requests
    pub session_idle_secs: u64,
    pub messaging: MessagingConfig,
    pub geolocation: GeolocationConfig,
    pub sign_in: SignInConfig,
}

/// Messaging provider account
#[derive(Clone, Deserialize)]
pub struct MessagingConfig {
    pub api_base: String,
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number registered with the provider
    pub from_number: String,
    /// Recipient used when an alert does not name one
    pub to_number: String,
}

/// IP geolocation provider
#[derive(Debug, Clone, Deserialize)]
pub struct GeolocationConfig {
    /// Endpoint answering with a `lat,long` text body
    pub endpoint: String,
    /// Prefix the coordinates are appended to when building a map link
    pub map_base: String,
}

/// Sign-in throttling
#[derive(Debug, Clone, Deserialize)]
pub struct SignInConfig {
    pub max_attempts: u32,
    pub window_secs: u64,
    pub lockout_secs: u64,
}

impl PortalConfig {
    /// Load the configuration from the environment
    ///
    /// # Environment Variables
    /// - `KIPSAFE_BIND_ADDR` (default: "0.0.0.0:3000")
    /// - `KIPSAFE_USERS_FILE` (default: "users.csv")
    /// - `KIPSAFE_HTTP_TIMEOUT_SECS` (default: 10)
    /// - `KIPSAFE_SESSION_IDLE_SECS` (default: 1800)
    /// - `KIPSAFE_MESSAGING__API_BASE`, `__ACCOUNT_SID`, `__AUTH_TOKEN`,
    ///   `__FROM_NUMBER`, `__TO_NUMBER`
    /// - `KIPSAFE_GEOLOCATION__ENDPOINT`, `__MAP_BASE`
    /// - `KIPSAFE_SIGN_IN__MAX_ATTEMPTS`, `__WINDOW_SECS`, `__LOCKOUT_SECS`
    pub fn from_env() -> Result<Self> {
        let config = Config::builder()
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?
            .set_default("users_file", DEFAULT_USERS_FILE)?
            .set_default("http_timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS as i64)?
            .set_default("session_idle_secs", DEFAULT_SESSION_IDLE_SECS as i64)?
            .set_default("messaging.api_base", DEFAULT_MESSAGING_API_BASE)?
            .set_default("messaging.account_sid", "")?
            .set_default("messaging.auth_token", "")?
            .set_default("messaging.from_number", "")?
            .set_default("messaging.to_number", "")?
            .set_default("geolocation.endpoint", DEFAULT_GEOLOCATION_ENDPOINT)?
            .set_default("geolocation.map_base", DEFAULT_MAP_BASE)?
            .set_default("sign_in.max_attempts", DEFAULT_MAX_SIGN_IN_ATTEMPTS as i64)?
            .set_default("sign_in.window_secs", DEFAULT_SIGN_IN_WINDOW_SECS as i64)?
            .set_default("sign_in.lockout_secs", DEFAULT_SIGN_IN_LOCKOUT_SECS as i64)?
            .add_source(
                Environment::with_prefix("KIPSAFE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            users_file: PathBuf::from(DEFAULT_USERS_FILE),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
            messaging: MessagingConfig {
                api_base: DEFAULT_MESSAGING_API_BASE.to_string(),
                account_sid: String::new(),
                auth_token: String::new(),
                from_number: String::new(),
                to_number: String::new(),
            },
            geolocation: GeolocationConfig {
                endpoint: DEFAULT_GEOLOCATION_ENDPOINT.to_string(),
                map_base: DEFAULT_MAP_BASE.to_string(),
            },
            sign_in: SignInConfig {
                max_attempts: DEFAULT_MAX_SIGN_IN_ATTEMPTS,
                window_secs: DEFAULT_SIGN_IN_WINDOW_SECS,
                lockout_secs: DEFAULT_SIGN_IN_LOCKOUT_SECS,
            },
        }
    }
}

impl MessagingConfig {
    /// Whether the account credentials and sender are all present
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

impl fmt::Debug for MessagingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessagingConfig")
            .field("api_base", &self.api_base)
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_portal_config_from_env_defaults() {
        let config = PortalConfig::from_env().unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.users_file, PathBuf::from("users.csv"));
        assert_eq!(config.http_timeout_secs, 10);
        assert_eq!(config.session_idle_secs, 1800);
        assert_eq!(config.messaging.api_base, "https://api.twilio.com");
        assert!(!config.messaging.is_configured());
        assert_eq!(config.geolocation.endpoint, "https://ipinfo.io/loc");
        assert_eq!(config.geolocation.map_base, "https://maps.google.com/?q=");
        assert_eq!(config.sign_in.max_attempts, 5);
        assert_eq!(config.sign_in.window_secs, 300);
        assert_eq!(config.sign_in.lockout_secs, 900);
    }

    #[test]
    #[serial]
    fn test_portal_config_from_env_with_custom_values() {
        // Set environment variables for testing
        unsafe {
            std::env::set_var("KIPSAFE_USERS_FILE", "/var/lib/kipsafe/users.csv");
            std::env::set_var("KIPSAFE_HTTP_TIMEOUT_SECS", "3");
            std::env::set_var("KIPSAFE_MESSAGING__ACCOUNT_SID", "AC123");
            std::env::set_var("KIPSAFE_MESSAGING__AUTH_TOKEN", "secret");
            std::env::set_var("KIPSAFE_MESSAGING__FROM_NUMBER", "+15550001111");
            std::env::set_var("KIPSAFE_SIGN_IN__MAX_ATTEMPTS", "2");
        }

        let config = PortalConfig::from_env().unwrap();
        assert_eq!(
            config.users_file,
            PathBuf::from("/var/lib/kipsafe/users.csv")
        );
        assert_eq!(config.http_timeout_secs, 3);
        assert_eq!(config.messaging.account_sid, "AC123");
        assert!(config.messaging.is_configured());
        assert_eq!(config.sign_in.max_attempts, 2);
        assert!(!format!("{:?}", config.messaging).contains("secret"));

        // Clean up
        unsafe {
            std::env::remove_var("KIPSAFE_USERS_FILE");
            std::env::remove_var("KIPSAFE_HTTP_TIMEOUT_SECS");
            std::env::remove_var("KIPSAFE_MESSAGING__ACCOUNT_SID");
            std::env::remove_var("KIPSAFE_MESSAGING__AUTH_TOKEN");
            std::env::remove_var("KIPSAFE_MESSAGING__FROM_NUMBER");
            std::env::remove_var("KIPSAFE_SIGN_IN__MAX_ATTEMPTS");
        }
    }
}
