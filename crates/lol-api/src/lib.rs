//! Rate-limited client library for the League of Legends v3 API
//!
//! This crate provides:
//! - A dual-window throttle gate with status-driven cooldowns
//! - URL construction for the v3 endpoints
//! - Configuration management
//! - Logging infrastructure

pub mod api;
pub mod config;
pub mod error;
pub mod logging;

pub use api::{
    ApiResponse, ApiStats, CallParams, DispatchPermit, Endpoint, HttpTransport, LolClient,
    MatchFilter, RawResponse, Region, RequestSpec, ThrottleGate, Transport,
};
pub use config::Config;
pub use error::{Error, Result};
