use crate::error::SigningError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Signed,
    Expired,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Signed => "SIGNED",
            DocumentStatus::Expired => "EXPIRED",
            DocumentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DocumentStatus::Pending)
    }

    /// Only `PENDING` has outgoing edges.
    pub fn can_transition_to(&self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Pending, DocumentStatus::Signed)
                | (DocumentStatus::Pending, DocumentStatus::Expired)
                | (DocumentStatus::Pending, DocumentStatus::Cancelled)
        )
    }

    /// The error a caller sees when a document in this status blocks access.
    pub fn blocking_error(&self) -> Option<SigningError> {
        match self {
            DocumentStatus::Pending => None,
            DocumentStatus::Signed => Some(SigningError::AlreadySigned),
            DocumentStatus::Expired => Some(SigningError::Expired),
            DocumentStatus::Cancelled => Some(SigningError::Cancelled),
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(DocumentStatus::Pending),
            "SIGNED" => Ok(DocumentStatus::Signed),
            "EXPIRED" => Ok(DocumentStatus::Expired),
            "CANCELLED" => Ok(DocumentStatus::Cancelled),
            other => Err(format!("unknown document status: {other}")),
        }
    }
}

/// Outcome of the access guard for a document that is not blocked outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Pending and within its deadline.
    Open,
    /// Pending but past its deadline; the caller must record `EXPIRED`
    /// and then fail with `Expired`.
    ExpireNow,
}

/// Pure access check over `(now, expires_at, status)`.
pub fn gate(
    status: DocumentStatus,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<Gate, SigningError> {
    if let Some(err) = status.blocking_error() {
        return Err(err);
    }
    if now > expires_at {
        Ok(Gate::ExpireNow)
    } else {
        Ok(Gate::Open)
    }
}

/// Status as it would read after the lazy expiry check, without persisting it.
pub fn effective_status(
    status: DocumentStatus,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> DocumentStatus {
    match gate(status, expires_at, now) {
        Ok(Gate::ExpireNow) => DocumentStatus::Expired,
        _ => status,
    }
}
