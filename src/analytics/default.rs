//! Logging-backed analytics defaults
//!
//! Structured-log implementations used until a real warehouse or CAPI
//! integration is wired in. They satisfy the traits so the redemption path
//! is identical in every environment.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{
    AnalyticsError, AnalyticsEvent, AnalyticsSink, ConversionEvent, PixelDispatcher, PixelEntry,
    PixelSendResult,
};

/// Records events as structured log lines.
#[derive(Debug, Clone, Default)]
pub struct LoggingAnalyticsSink;

#[async_trait]
impl AnalyticsSink for LoggingAnalyticsSink {
    async fn track(&self, event: AnalyticsEvent) -> Result<Uuid, AnalyticsError> {
        let event_id = Uuid::new_v4();
        info!(
            event_id = %event_id,
            gate_id = %event.gate_id,
            event_type = %event.event_type,
            ip_address = event.ip_address.as_deref().unwrap_or("-"),
            "analytics event"
        );
        Ok(event_id)
    }
}

/// Logs pixel events instead of calling out to ad platforms.
#[derive(Debug, Clone, Default)]
pub struct LoggingPixelDispatcher;

#[async_trait]
impl PixelDispatcher for LoggingPixelDispatcher {
    async fn send_event(
        &self,
        pixel: &PixelEntry,
        event: &ConversionEvent,
    ) -> Result<PixelSendResult, AnalyticsError> {
        info!(
            platform = ?pixel.platform,
            pixel_id = %pixel.pixel_id,
            event_name = %event.event_name,
            gate_id = %event.gate_id,
            hashed_email = event.hashed_email.as_deref().unwrap_or("-"),
            "pixel event"
        );
        Ok(PixelSendResult {
            platform: pixel.platform,
            accepted: true,
        })
    }
}
