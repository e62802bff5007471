pub mod auth;
pub mod client;
pub mod findings;
pub mod reports;
pub mod scans;
pub mod stats;

pub use client::ApiClient;

use thiserror::Error;

/// Error taxonomy for the remote API.
///
/// The polling layer swallows `Transport` and `NotFound` (logged, retried on
/// the next tick); `Unauthorized` clears the stored session and cancels the
/// watch; `Validation` is surfaced synchronously to whoever issued the
/// mutation.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication required")]
    Unauthorized,

    #[error("resource not available")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("server error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}
