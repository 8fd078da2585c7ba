use crate::Provider;
use std::time::Duration;
use thiserror::Error;

/// Every way a fetch can fail.
///
/// A failed fetch never carries a partial payload; the caller either receives the whole
/// [`RawPayload`](crate::RawPayload) or one of these.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The provider has no data for the identifier (or no filing of the requested type).
    #[error("{provider} has no data for {what}")]
    NotFound { provider: Provider, what: String },

    /// The Rate Budget is exhausted, either locally or as reported by the provider.
    #[error("{provider} rate limit reached, retry after {retry_after:?}")]
    RateLimit {
        provider: Provider,
        retry_after: Duration,
    },

    /// Missing, blank or rejected credentials (API key, or the SEC contact email).
    #[error("{provider} authentication failed: {reason}")]
    Auth { provider: Provider, reason: String },

    /// Network failure, or an HTTP status the layer doesn't map to anything more specific.
    #[error("{provider} transport error: {reason}")]
    Transport { provider: Provider, reason: String },

    /// The response body couldn't be read as the expected format.
    #[error("{provider} returned malformed data: {reason}")]
    MalformedData { provider: Provider, reason: String },

    /// The identifier failed validation before any request was made.
    #[error("invalid identifier {0:?}")]
    InvalidIdentifier(String),
}

impl FetchError {
    pub(crate) fn not_found(provider: Provider, what: impl std::fmt::Display) -> Self {
        Self::NotFound {
            provider,
            what: what.to_string(),
        }
    }

    pub(crate) fn auth(provider: Provider, reason: impl std::fmt::Display) -> Self {
        Self::Auth {
            provider,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn transport(provider: Provider, reason: impl std::fmt::Display) -> Self {
        Self::Transport {
            provider,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(provider: Provider, reason: impl std::fmt::Display) -> Self {
        Self::MalformedData {
            provider,
            reason: reason.to_string(),
        }
    }

    /// The provider this error came from, if any.
    pub fn provider(&self) -> Option<Provider> {
        match self {
            Self::NotFound { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::Auth { provider, .. }
            | Self::Transport { provider, .. }
            | Self::MalformedData { provider, .. } => Some(*provider),
            Self::InvalidIdentifier(_) => None,
        }
    }
}

/// Errors raised while reading the `.env` configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}
