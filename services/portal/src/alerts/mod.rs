//! Alert dispatch
//!
//! Alerts are composed here and handed to a [`MessageSender`]. The caller's
//! position comes from a [`LocationResolver`]. Production implementations of
//! both talk to external HTTP providers; tests substitute in-process fakes.

pub mod geolocation;
pub mod messaging;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::AlertError;

pub use geolocation::IpInfoResolver;
pub use messaging::TwilioSender;

/// A message ready to hand to the messaging provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Recipient override; the sender's default recipient is used when absent
    pub to: Option<String>,
    pub body: String,
    pub media_url: Option<String>,
}

/// Capability to deliver a message
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), AlertError>;
}

/// Capability to look up the caller's coordinates
#[async_trait]
pub trait LocationResolver: Send + Sync {
    /// Raw `lat,long` answer of the provider
    async fn lookup(&self) -> Result<String, AlertError>;
}

/// Pre-recorded audio alerts offered on the alert panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioAlert {
    Kidnappers,
    ArmedRobbers,
    GunShot,
}

impl AudioAlert {
    pub const ALL: [AudioAlert; 3] = [
        AudioAlert::Kidnappers,
        AudioAlert::ArmedRobbers,
        AudioAlert::GunShot,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AudioAlert::Kidnappers => "Voice Kidnappers",
            AudioAlert::ArmedRobbers => "Voice Armed Robbers",
            AudioAlert::GunShot => "Voice Gun Shot",
        }
    }

    /// Hosted recording sent as the media attachment
    pub fn audio_url(self) -> &'static str {
        match self {
            AudioAlert::Kidnappers => {
                "https://drive.google.com/uc?id=1VoQzrEC6sgH9aB1JyPLeXOMI-kLqtB5J"
            }
            AudioAlert::ArmedRobbers => {
                "https://drive.google.com/uc?id=1LWu6VkL6VNA-hmnugXRQ6OOtSMIJEbYv"
            }
            AudioAlert::GunShot => "https://drive.google.com/uc?id=1Ke_1pHV8LzCS_gVd0er4kwwqs2aaRXRy",
        }
    }
}

/// Composes alerts and sends them through the messaging provider
#[derive(Clone)]
pub struct AlertDispatcher {
    sender: Arc<dyn MessageSender>,
    resolver: Arc<dyn LocationResolver>,
    map_base: String,
}

impl AlertDispatcher {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        resolver: Arc<dyn LocationResolver>,
        map_base: impl Into<String>,
    ) -> Self {
        Self {
            sender,
            resolver,
            map_base: map_base.into(),
        }
    }

    /// Send a pre-recorded audio alert with the recording attached
    pub async fn send_audio_alert(
        &self,
        audio_reference: &str,
        vehicle_id: &str,
        label: &str,
        location_link: Option<&str>,
        recipient: Option<&str>,
    ) -> Result<(), AlertError> {
        let body = compose_audio_body(label, vehicle_id, audio_reference, Local::now(), location_link);
        let message = OutboundMessage {
            to: recipient.map(str::to_string),
            body,
            media_url: Some(audio_reference.to_string()),
        };

        info!("Dispatching audio alert '{}' for vehicle '{}'", label, vehicle_id);
        self.sender.send(&message).await.map_err(|e| match e {
            AlertError::Dispatch(detail) => AlertError::AudioDispatch(detail),
            other => other,
        })
    }

    /// Send a free-text message
    pub async fn send_text_alert(&self, body: &str, recipient: Option<&str>) -> Result<(), AlertError> {
        if body.trim().is_empty() {
            return Err(AlertError::EmptyMessage);
        }

        let message = OutboundMessage {
            to: recipient.map(str::to_string),
            body: body.to_string(),
            media_url: None,
        };

        info!("Dispatching text alert ({} characters)", body.chars().count());
        self.sender.send(&message).await.map_err(|e| match e {
            AlertError::Dispatch(detail) => AlertError::TextDispatch(detail),
            other => other,
        })
    }

    /// Map link for the caller's current position, if the provider gives a
    /// usable answer
    pub async fn get_current_location(&self) -> Option<String> {
        let raw = match self.resolver.lookup().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Location lookup failed: {}", e);
                return None;
            }
        };

        let Some((latitude, longitude)) = parse_coordinates(&raw) else {
            warn!("Location provider returned an unusable answer: {:?}", raw);
            return None;
        };

        Some(format!("{}{},{}", self.map_base, latitude, longitude))
    }
}

/// Body of an audio alert message
pub fn compose_audio_body(
    label: &str,
    vehicle_id: &str,
    audio_reference: &str,
    at: DateTime<Local>,
    location_link: Option<&str>,
) -> String {
    let mut body = format!(
        "Alert: {label}\n\
         Audio alert for Vehicle No: {vehicle_id}\n\
         Audio message link: {audio_reference}\n\
         Date and Time: {}",
        at.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(link) = location_link {
        body.push_str("\nLocation: ");
        body.push_str(link);
    }

    body
}

/// Split a `lat,long` answer into its two parts. Both must be finite decimal
/// numbers within the latitude and longitude ranges.
pub fn parse_coordinates(raw: &str) -> Option<(&str, &str)> {
    let (latitude, longitude) = raw.trim().split_once(',')?;
    let (latitude, longitude) = (latitude.trim(), longitude.trim());

    coordinate_in(latitude, 90.0)?;
    coordinate_in(longitude, 180.0)?;

    Some((latitude, longitude))
}

fn coordinate_in(value: &str, bound: f64) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (-bound..=bound).contains(v))
}
