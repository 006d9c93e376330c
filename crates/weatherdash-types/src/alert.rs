//! Derived alerts and the overall insight status.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Severity of an alert.
///
/// Variants are ordered by severity so that `Danger > Warning > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Info,
    Warning,
    Danger,
}

impl AlertKind {
    /// Sort priority: danger 3, warning 2, info 1.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            AlertKind::Danger => 3,
            AlertKind::Warning => 2,
            AlertKind::Info => 1,
        }
    }

    /// Whether this severity counts as critical (warning or danger).
    #[must_use]
    pub fn is_critical(self) -> bool {
        matches!(self, AlertKind::Warning | AlertKind::Danger)
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertKind::Info => write!(f, "info"),
            AlertKind::Warning => write!(f, "warning"),
            AlertKind::Danger => write!(f, "danger"),
        }
    }
}

/// A human-readable alert. Alerts are produced fresh on every request and
/// have no identity beyond `(kind, message)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Warning,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Danger,
            message: message.into(),
        }
    }
}

/// Overall status of an insights response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightStatus {
    Info,
    Warning,
}

impl InsightStatus {
    /// `Warning` when any alert is critical, `Info` otherwise.
    pub fn from_alerts(alerts: &[Alert]) -> Self {
        if alerts.iter().any(|a| a.kind.is_critical()) {
            InsightStatus::Warning
        } else {
            InsightStatus::Info
        }
    }
}
