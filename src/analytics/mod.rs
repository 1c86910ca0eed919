//! Analytics and ad-platform pixel dispatch
//!
//! Conversion events are recorded through [`AnalyticsSink`] and forwarded to
//! the ad platforms a gate has pixels configured for through
//! [`PixelDispatcher`]. Both are fire-and-forget from the caller's point of
//! view: redemption never waits on, or fails because of, analytics.

pub mod default;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

pub use default::{LoggingAnalyticsSink, LoggingPixelDispatcher};

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("analytics sink rejected event: {0}")]
    Sink(String),

    #[error("pixel dispatch failed: {0}")]
    Dispatch(String),
}

/// A conversion event recorded against a gate.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsEvent {
    pub gate_id: Uuid,
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Ad platforms a gate can carry pixels for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelPlatform {
    Meta,
    Tiktok,
    Google,
}

/// One configured pixel on a gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixelEntry {
    pub platform: PixelPlatform,
    pub pixel_id: String,
    #[serde(default)]
    pub enabled: bool,
    /// Server-side API token where the platform supports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

/// The gate's `pixel_config` JSON column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PixelConfig {
    #[serde(default)]
    pub pixels: Vec<PixelEntry>,
}

impl PixelConfig {
    /// Parse a gate's raw `pixel_config` value; `None` and malformed JSON
    /// both yield an empty configuration.
    pub fn from_gate_value(value: Option<&serde_json::Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn enabled_pixels(&self) -> impl Iterator<Item = &PixelEntry> {
        self.pixels.iter().filter(|p| p.enabled)
    }
}

/// A conversion forwarded to an ad platform.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    pub event_name: String,
    pub gate_id: Uuid,
    /// SHA-256 of the normalized visitor email, never the raw address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashed_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PixelSendResult {
    pub platform: PixelPlatform,
    pub accepted: bool,
}

/// Sink for first-party conversion events.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    /// Record an event, returning its assigned id.
    async fn track(&self, event: AnalyticsEvent) -> Result<Uuid, AnalyticsError>;
}

/// Forwarder for ad-platform pixel events.
#[async_trait]
pub trait PixelDispatcher: Send + Sync {
    async fn send_event(
        &self,
        pixel: &PixelEntry,
        event: &ConversionEvent,
    ) -> Result<PixelSendResult, AnalyticsError>;
}

/// Hash an email for pixel matching: trim, lowercase, SHA-256, hex.
pub fn hash_email(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}
