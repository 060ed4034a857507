use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

/// Auto-dismiss delay used when the caller does not pick one.
pub const DEFAULT_ALERT_DURATION: Duration = Duration::from_millis(3000);

/// Auto-dismiss delay for alerts raised from inserted database rows.
pub const DATABASE_ALERT_DURATION: Duration = Duration::from_millis(5000);

/// Severity or category for user-visible alerts.
///
/// This enum classifies alerts by their intent and visual styling, allowing
/// the UI to display them appropriately. Anything that cannot be recognized
/// is treated as [`AlertKind::Info`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Indicates a successful operation or positive outcome.
    Success,
    /// Indicates an error or failure that may affect functionality.
    Error,
    /// Indicates a non-critical issue that the user should be aware of, but
    /// does not prevent normal operation.
    Warning,
    /// Neutral informational message that does not indicate success or failure.
    #[default]
    Info,
}

/// Returned by [`AlertKind::from_str`] for values outside the known set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown alert kind: {0:?}")]
pub struct UnknownAlertKind(pub String);

impl AlertKind {
    /// Every kind, in display order.
    pub const ALL: [AlertKind; 4] = [
        AlertKind::Success,
        AlertKind::Error,
        AlertKind::Warning,
        AlertKind::Info,
    ];

    /// Resolves an optional, possibly unknown, kind name. Missing or
    /// unrecognized values fall back to [`AlertKind::Info`].
    pub fn from_lenient(value: Option<&str>) -> Self {
        value
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Success => "success",
            AlertKind::Error => "error",
            AlertKind::Warning => "warning",
            AlertKind::Info => "info",
        }
    }
}

impl FromStr for AlertKind {
    type Err = UnknownAlertKind;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        AlertKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownAlertKind(value.to_string()))
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single transient alert intended for the user interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPayload {
    /// Short text label.
    pub title: String,
    /// Body text.
    pub description: String,
    /// The type/severity of the alert, determining its visual style.
    pub kind: AlertKind,
    /// Time before the alert dismisses itself. `None` lets the dispatcher
    /// apply its configured default.
    pub duration: Option<Duration>,
}

impl AlertPayload {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            kind: AlertKind::default(),
            duration: None,
        }
    }

    pub fn with_kind(mut self, kind: AlertKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets an explicit duration. A zero duration is treated as unset.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = (!duration.is_zero()).then_some(duration);
        self
    }

    /// Duration the alert stays on screen, given the dispatcher's default.
    pub fn effective_duration(&self, default: Duration) -> Duration {
        match self.duration {
            Some(duration) if !duration.is_zero() => duration,
            _ if default.is_zero() => DEFAULT_ALERT_DURATION,
            _ => default,
        }
    }
}
