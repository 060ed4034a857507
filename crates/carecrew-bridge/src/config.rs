use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alert::{DATABASE_ALERT_DURATION, DEFAULT_ALERT_DURATION};

/// Timing of transient alerts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Auto-dismiss delay in milliseconds for alerts that do not carry their
    /// own duration.
    pub default_duration_ms: u64,
    /// Auto-dismiss delay in milliseconds for alerts raised by inserted rows
    /// of the watched table.
    pub database_duration_ms: u64,
}

impl AlertsConfig {
    /// Default alert duration. Zero falls back to the built-in value.
    pub fn default_duration(&self) -> Duration {
        non_zero_millis(self.default_duration_ms, DEFAULT_ALERT_DURATION)
    }

    /// Duration of database-sourced alerts. Zero falls back to the built-in
    /// value.
    pub fn database_duration(&self) -> Duration {
        non_zero_millis(self.database_duration_ms, DATABASE_ALERT_DURATION)
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: DEFAULT_ALERT_DURATION.as_millis() as u64,
            database_duration_ms: DATABASE_ALERT_DURATION.as_millis() as u64,
        }
    }
}

fn non_zero_millis(millis: u64, fallback: Duration) -> Duration {
    match millis {
        0 => fallback,
        millis => Duration::from_millis(millis),
    }
}

/// Placement of the overlay stack, anchored to the top-right corner of the
/// screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Distance in pixels from the top of the screen to the first overlay.
    pub top: u32,
    /// Distance in pixels from the right edge of the screen.
    pub right: u32,
    /// Vertical distance in pixels between stacked overlays.
    pub spacing: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            top: 16,
            right: 16,
            spacing: 88,
        }
    }
}

/// Location of the watched notifications table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub schema: String,
    pub table: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            table: "notifications".to_string(),
        }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub alerts: AlertsConfig,
    pub overlay: OverlayConfig,
    pub realtime: RealtimeConfig,
}
