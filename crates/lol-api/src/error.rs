//! Error types for the LoL API client library.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

use crate::api::types::Region;

/// Boxed error produced by a [`crate::api::transport::Transport`] implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors reported by the LoL API client.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The mandatory path parameter for an endpoint was not supplied.
    /// No network call is attempted.
    #[error("operation `{operation}` requires the `{name}` parameter")]
    MissingParameter {
        operation: &'static str,
        name: &'static str,
    },

    /// The gate refused a non-blocking dispatch. The call was not attempted
    /// and may be retried once `retry_in` has elapsed.
    #[error("gate closed, next call eligible in {}ms", .retry_in.as_millis())]
    Throttled { retry_in: Duration },

    /// The network call itself could not complete. Distinct from a valid
    /// non-200 response; the gate state is left as committed at dispatch.
    #[error("API transport failure: {0}")]
    Transport(#[source] BoxError),

    /// A completed call returned a non-200, non-429 status. The raw body is
    /// kept for caller inspection.
    #[error("API call failed with status {status}")]
    Upstream { status: StatusCode, body: String },

    /// The upstream service reported its own rate limit (status 429).
    /// `retry_after` is the parsed `Retry-After` header, when usable.
    #[error("API rate limit exceeded (status 429)")]
    Overloaded {
        retry_after: Option<Duration>,
        body: String,
    },

    /// The selected region has no endpoint root wired up.
    #[error("region {0} has no endpoint root wired up")]
    UnwiredRegion(Region),
}
