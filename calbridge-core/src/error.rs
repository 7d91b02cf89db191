//! Error types for the calbridge ecosystem.

use thiserror::Error;

use crate::constants::PRIVILEGE_ERROR_SIGNATURE;

/// Run-level errors. Any of these aborts the whole create or remove pass.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Usage: {0}")]
    Usage(String),

    #[error("Calendar \"{name}\" (#{index}) not found")]
    CalendarNotFound { name: String, index: usize },

    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for calbridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Message a provider sends back when it can't serve a request shape.
pub const UNSUPPORTED_MESSAGE: &str = "unsupported";

const DENIED_PREFIX: &str = "denied: ";

/// Errors raised by a single call through the [`Host`](crate::host::Host) port.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Operation not supported by the host")]
    Unsupported,

    #[error("Host denied access: {0}")]
    Denied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Failed to spawn {path}: {source}")]
    Spawn {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type HostResult<T> = Result<T, HostError>;

impl HostError {
    /// True when the host refused the call for lack of authorization.
    pub fn is_privilege_violation(&self) -> bool {
        match self {
            HostError::Denied(_) => true,
            HostError::Provider(msg) => msg.contains(PRIVILEGE_ERROR_SIGNATURE),
            _ => false,
        }
    }

    /// True when there is no host to talk to at all, rather than one call or
    /// namespace failing.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            HostError::ProviderNotInstalled(_) | HostError::Spawn { .. } | HostError::Io(_)
        )
    }

    /// Rebuild an error from the message a provider put on the wire.
    pub fn from_provider_message(msg: String) -> Self {
        if msg == UNSUPPORTED_MESSAGE {
            return HostError::Unsupported;
        }
        match msg.strip_prefix(DENIED_PREFIX) {
            Some(reason) => HostError::Denied(reason.to_string()),
            None => HostError::Provider(msg),
        }
    }

    /// The message a provider should send so the CLI can rebuild this error.
    pub fn to_provider_message(&self) -> String {
        match self {
            HostError::Unsupported => UNSUPPORTED_MESSAGE.to_string(),
            HostError::Denied(reason) => format!("{DENIED_PREFIX}{reason}"),
            HostError::Provider(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
