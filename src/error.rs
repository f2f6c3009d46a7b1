//! Error handling for navigation
//!
//! None of these errors cross the async boundary as a fault: the router logs
//! them and moves on. They exist so the pipeline can describe *why* a
//! navigation produced no `get` dispatch.

use std::fmt;

// ============================================================================
// Navigation Outcome
// ============================================================================

/// How a resolved navigation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Response was accepted by the status policy and dispatched
    Handled { url: String, status: u16 },
    /// Response arrived but the status policy discarded it
    Dropped { url: String, status: u16 },
    /// The request never produced a response
    Failed(NavigationError),
}

impl NavigationOutcome {
    /// Check if the navigation was dispatched to subscribers
    pub fn is_handled(&self) -> bool {
        matches!(self, NavigationOutcome::Handled { .. })
    }

    /// Check if the response was silently discarded
    pub fn is_dropped(&self) -> bool {
        matches!(self, NavigationOutcome::Dropped { .. })
    }

    /// Check if the request failed before producing a response
    pub fn is_failed(&self) -> bool {
        matches!(self, NavigationOutcome::Failed(_))
    }

    /// Status of the response, if one arrived
    pub fn status(&self) -> Option<u16> {
        match self {
            NavigationOutcome::Handled { status, .. } | NavigationOutcome::Dropped { status, .. } => {
                Some(*status)
            }
            NavigationOutcome::Failed(_) => None,
        }
    }
}

// ============================================================================
// Navigation Error
// ============================================================================

/// Errors that can occur while resolving a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    /// The transport could not complete the request
    Transport { url: String, message: String },

    /// A response arrived with a status the router does not handle
    UnhandledStatus { url: String, status: u16 },

    /// An href could not be resolved into an absolute URL
    InvalidUrl { url: String, message: String },
}

impl NavigationError {
    /// Build a transport error from any displayable cause
    pub fn transport(url: impl Into<String>, cause: impl fmt::Display) -> Self {
        NavigationError::Transport {
            url: url.into(),
            message: cause.to_string(),
        }
    }

    /// URL the error refers to
    pub fn url(&self) -> &str {
        match self {
            NavigationError::Transport { url, .. }
            | NavigationError::UnhandledStatus { url, .. }
            | NavigationError::InvalidUrl { url, .. } => url,
        }
    }
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavigationError::Transport { url, message } => {
                write!(f, "Request to {} failed: {}", url, message)
            }
            NavigationError::UnhandledStatus { url, status } => {
                write!(f, "Unhandled status {} for {}", status, url)
            }
            NavigationError::InvalidUrl { url, message } => {
                write!(f, "Invalid URL {}: {}", url, message)
            }
        }
    }
}

impl std::error::Error for NavigationError {}

impl From<url::ParseError> for NavigationError {
    fn from(err: url::ParseError) -> Self {
        NavigationError::InvalidUrl {
            url: String::new(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
