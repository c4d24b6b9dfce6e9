//! IP reputation lookups against the GreyNoise community API.
//!
//! This module provides the [`ReputationClient`], an implementation of
//! [`ReputationLookup`](crate::core::ReputationLookup) over HTTP, and the
//! typed error each lookup may fail with.

pub mod client;

pub use client::ReputationClient;

use thiserror::Error;

/// Why a single lookup produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("HTTP code 400 - Invalid Request")]
    InvalidRequest,

    #[error("HTTP code 401 - Authentication Error")]
    Auth,

    #[error("HTTP code 429 - Daily Rate-Limit Exceeded")]
    RateLimited,

    #[error("HTTP code 500 - Internal Error")]
    Server,

    /// A transport failure, or any unexpected non-2xx status. `status` is
    /// `None` when the request never produced a response.
    #[error("transport error (status {status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("failed to decode response body: {0}")]
    Decode(String),

    #[error("lookup cancelled before completion")]
    Cancelled,
}

impl LookupError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LookupError::InvalidRequest => "invalid_request",
            LookupError::Auth => "auth",
            LookupError::RateLimited => "rate_limited",
            LookupError::Server => "server",
            LookupError::Transport { .. } => "transport",
            LookupError::Decode(_) => "decode",
            LookupError::Cancelled => "cancelled",
        }
    }
}
