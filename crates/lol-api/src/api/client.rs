//! Rate-limited client for the League of Legends v3 API.

use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::request::{MatchFilter, RequestSpec};
use super::throttle::{parse_retry_after, ApiStats, DispatchPermit, ThrottleGate};
use super::transport::{HttpTransport, Transport};
use super::types::{ApiResponse, Region};
use crate::config::Config;
use crate::error::{Error, Result};

/// LoL API v3 client.
///
/// All calls share one [`ThrottleGate`], so a client is the unit of rate
/// limiting: one client per API key.
pub struct LolClient {
    /// Riot API key, appended to every URL
    api_key: String,
    /// Regional shard this client targets
    region: Region,
    /// Endpoint root of the shard
    base_url: String,
    /// Throttle gate every call passes through
    gate: ThrottleGate,
    /// HTTP transport
    transport: Arc<dyn Transport>,
}

impl LolClient {
    /// Create a client for `region` using the default HTTP transport.
    pub fn new(api_key: impl Into<String>, region: Region, config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new()?);
        Self::with_transport(api_key, region, config, transport)
    }

    /// Create a client with an injected transport.
    pub fn with_transport(
        api_key: impl Into<String>,
        region: Region,
        config: &Config,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let base_url = region
            .endpoint_root()
            .ok_or(Error::UnwiredRegion(region))?
            .to_string();

        Ok(Self {
            api_key: api_key.into(),
            region,
            base_url,
            gate: ThrottleGate::new(&config.rate_limit, &config.cooldown),
            transport,
        })
    }

    /// Region this client targets.
    pub fn region(&self) -> Region {
        self.region
    }

    /// Look up a summoner by name.
    pub async fn get_summoner_by_name(&self, name: &str) -> Result<ApiResponse> {
        info!(name, "Looking up summoner by name");
        self.execute(&RequestSpec::summoner_by_name(name)).await
    }

    /// Look up the live game a summoner is currently in, if any.
    ///
    /// The service answers 404 when the summoner is not in a game.
    pub async fn get_current_match(&self, summoner_id: i64) -> Result<ApiResponse> {
        info!(summoner_id, "Looking up current match");
        self.execute(&RequestSpec::current_match(summoner_id)).await
    }

    /// Look up an account's recent matches, optionally filtered.
    pub async fn get_recent_matches(
        &self,
        account_id: i64,
        filter: &MatchFilter,
    ) -> Result<ApiResponse> {
        info!(account_id, "Looking up recent matches");
        self.execute(&RequestSpec::recent_matches(account_id, filter))
            .await
    }

    /// Look up one match by id.
    pub async fn get_match(&self, match_id: i64) -> Result<ApiResponse> {
        info!(match_id, "Looking up match detail");
        self.execute(&RequestSpec::match_by_id(match_id)).await
    }

    /// Dispatch `request`, waiting for the gate whenever it is closed.
    pub async fn execute(&self, request: &RequestSpec) -> Result<ApiResponse> {
        let url = request.build_url(&self.base_url, &self.api_key)?;
        let permit = self.gate.admit(request.operation()).await;
        self.dispatch(request.operation(), &url, permit).await
    }

    /// Dispatch `request` only if the gate is open right now.
    ///
    /// Returns [`Error::Throttled`] without touching the network otherwise.
    pub async fn try_execute(&self, request: &RequestSpec) -> Result<ApiResponse> {
        let url = request.build_url(&self.base_url, &self.api_key)?;
        let permit = self.gate.try_admit(request.operation()).await?;
        self.dispatch(request.operation(), &url, permit).await
    }

    /// Snapshot of the gate's counters.
    pub async fn stats(&self) -> ApiStats {
        self.gate.stats().await
    }

    async fn dispatch(
        &self,
        operation: &'static str,
        url: &str,
        permit: DispatchPermit<'_>,
    ) -> Result<ApiResponse> {
        match self.transport.fetch(url).await {
            Ok(response) => {
                let status = response.status;
                let retry_after = parse_retry_after(&response.headers);
                permit.record(status, retry_after);

                if status == StatusCode::OK {
                    debug!(operation, "API call succeeded");
                    Ok(ApiResponse {
                        status,
                        body: response.body,
                    })
                } else if status == StatusCode::TOO_MANY_REQUESTS {
                    warn!(operation, "Rate limited by server");
                    Err(Error::Overloaded {
                        retry_after,
                        body: response.body,
                    })
                } else {
                    warn!(
                        operation,
                        status = status.as_u16(),
                        "API call failed, see https://developer.riotgames.com/response-codes.html"
                    );
                    Err(Error::Upstream {
                        status,
                        body: response.body,
                    })
                }
            }
            Err(source) => {
                // no post-dispatch adjustment on a transport failure
                drop(permit);
                warn!(operation, error = %source, "API transport failure");
                Err(Error::Transport(source))
            }
        }
    }
}
