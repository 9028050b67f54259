//! KIP SAFE portal
//!
//! Account sign-up and sign-in backed by a CSV credential file, plus alert
//! dispatch for taxi riders: pre-recorded audio alerts and free-text messages
//! sent through a messaging provider, with an optional map link resolved from
//! the caller's IP address.

pub mod alerts;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod page;
pub mod rate_limiter;
pub mod routes;
pub mod session;
pub mod shell;
pub mod state;
pub mod validation;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use common::credentials::{CredentialStore, CsvCredentialStore};
use tracing::{info, warn};

use crate::alerts::{AlertDispatcher, IpInfoResolver, LocationResolver, MessageSender, TwilioSender};
use crate::auth::AuthService;
use crate::config::PortalConfig;
use crate::rate_limiter::{RateLimiter, RateLimiterConfig};
use crate::session::SessionManager;
use crate::shell::Portal;
use crate::state::AppState;

/// Wire the production providers and the credential file
pub async fn build_state(config: &PortalConfig) -> Result<AppState> {
    let store = CsvCredentialStore::new(&config.users_file)?;
    if store.health_check().await? {
        info!("Credential file {} is readable", store.path().display());
    } else {
        anyhow::bail!(
            "Credential file {} is not a valid account file",
            store.path().display()
        );
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    if !config.messaging.is_configured() {
        warn!("Messaging credentials are not configured; alerts will fail until they are set");
    }

    let sender = TwilioSender::new(client.clone(), config.messaging.clone());
    let resolver = IpInfoResolver::new(client, config.geolocation.endpoint.clone());

    Ok(assemble_state(
        config,
        Arc::new(store),
        Arc::new(sender),
        Arc::new(resolver),
    ))
}

/// Build the state from already constructed collaborators
pub fn assemble_state(
    config: &PortalConfig,
    store: Arc<dyn CredentialStore>,
    sender: Arc<dyn MessageSender>,
    resolver: Arc<dyn LocationResolver>,
) -> AppState {
    let auth = AuthService::new(store);
    let alerts = AlertDispatcher::new(sender, resolver, config.geolocation.map_base.clone());
    let sign_in_limiter = RateLimiter::new(RateLimiterConfig::from(&config.sign_in));

    AppState {
        portal: Arc::new(Portal::new(auth, alerts, sign_in_limiter)),
        sessions: SessionManager::new(Duration::from_secs(config.session_idle_secs)),
    }
}
