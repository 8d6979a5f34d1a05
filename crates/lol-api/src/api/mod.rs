//! LoL API interaction module

pub mod client;
pub mod request;
pub mod throttle;
pub mod transport;
pub mod types;

pub use client::LolClient;
pub use request::{CallParams, Endpoint, MatchFilter, RequestSpec};
pub use throttle::{ApiStats, DispatchPermit, ThrottleGate};
pub use transport::{HttpTransport, RawResponse, Transport};
pub use types::{ApiResponse, Region};
