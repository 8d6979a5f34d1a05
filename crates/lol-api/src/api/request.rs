//! URL construction for LoL API calls.
//!
//! Every call is described by a [`RequestSpec`]: an endpoint plus a set of
//! optional parameter bindings. Building the URL is a pure function of the
//! request, the region's endpoint root, and the API key.

use crate::error::{Error, Result};

/// Endpoints of the League of Legends v3 API reachable through this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Summoner lookup by name
    SummonerByName,
    /// Live game lookup by summoner id
    CurrentMatch,
    /// Match history lookup by account id
    RecentMatches,
    /// Single match detail by match id
    MatchById,
}

impl Endpoint {
    /// Path template containing the endpoint's `{placeholder}` token.
    pub fn template(&self) -> &'static str {
        match self {
            Endpoint::SummonerByName => "/lol/summoner/v3/summoners/by-name/{summonerName}",
            Endpoint::CurrentMatch => "/lol/spectator/v3/active-games/by-summoner/{summonerId}",
            Endpoint::RecentMatches => "/lol/match/v3/matchlists/by-account/{accountId}",
            Endpoint::MatchById => "/lol/match/v3/matches/{matchId}",
        }
    }

    /// Name of the mandatory path parameter.
    pub fn path_param(&self) -> &'static str {
        match self {
            Endpoint::SummonerByName => "summonerName",
            Endpoint::CurrentMatch => "summonerId",
            Endpoint::RecentMatches => "accountId",
            Endpoint::MatchById => "matchId",
        }
    }

    /// Operation name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            Endpoint::SummonerByName => "get_summoner_by_name",
            Endpoint::CurrentMatch => "get_current_match",
            Endpoint::RecentMatches => "get_recent_matches",
            Endpoint::MatchById => "get_match",
        }
    }
}

/// Parameter bindings for one API call.
///
/// One optional field per placeholder the v3 endpoints recognize. Absent
/// fields are simply omitted from the produced URL; only the endpoint's
/// path parameter is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParams {
    pub account_id: Option<i64>,
    pub match_id: Option<i64>,
    pub summoner_id: Option<i64>,
    pub summoner_name: Option<String>,
    pub champion: Option<i64>,
    pub begin_index: Option<u32>,
    pub end_index: Option<u32>,
}

impl CallParams {
    /// Supplied bindings in declared field order, with the upstream
    /// camelCase spellings.
    fn bindings(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = self.account_id {
            out.push(("accountId", v.to_string()));
        }
        if let Some(v) = self.match_id {
            out.push(("matchId", v.to_string()));
        }
        if let Some(v) = self.summoner_id {
            out.push(("summonerId", v.to_string()));
        }
        if let Some(v) = &self.summoner_name {
            out.push(("summonerName", v.clone()));
        }
        if let Some(v) = self.champion {
            out.push(("champion", v.to_string()));
        }
        if let Some(v) = self.begin_index {
            out.push(("beginIndex", v.to_string()));
        }
        if let Some(v) = self.end_index {
            out.push(("endIndex", v.to_string()));
        }
        out
    }
}

/// Optional filters for the recent-match listing endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchFilter {
    /// Restrict the listing to a single champion id
    pub champion: Option<i64>,
    /// First match index to return (0-based)
    pub begin_index: Option<u32>,
    /// One past the last match index to return
    pub end_index: Option<u32>,
}

/// An immutable description of one logical API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub endpoint: Endpoint,
    pub params: CallParams,
}

impl RequestSpec {
    pub fn new(endpoint: Endpoint, params: CallParams) -> Self {
        Self { endpoint, params }
    }

    pub fn summoner_by_name(name: impl Into<String>) -> Self {
        Self::new(
            Endpoint::SummonerByName,
            CallParams {
                summoner_name: Some(name.into()),
                ..Default::default()
            },
        )
    }

    pub fn current_match(summoner_id: i64) -> Self {
        Self::new(
            Endpoint::CurrentMatch,
            CallParams {
                summoner_id: Some(summoner_id),
                ..Default::default()
            },
        )
    }

    pub fn recent_matches(account_id: i64, filter: &MatchFilter) -> Self {
        Self::new(
            Endpoint::RecentMatches,
            CallParams {
                account_id: Some(account_id),
                champion: filter.champion,
                begin_index: filter.begin_index,
                end_index: filter.end_index,
                ..Default::default()
            },
        )
    }

    pub fn match_by_id(match_id: i64) -> Self {
        Self::new(
            Endpoint::MatchById,
            CallParams {
                match_id: Some(match_id),
                ..Default::default()
            },
        )
    }

    /// Operation name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        self.endpoint.operation()
    }

    /// Produce the fully qualified URL for this call.
    ///
    /// The path placeholder is substituted from its binding (mandatory),
    /// every other supplied binding becomes a query parameter in declared
    /// field order, and the API key is always appended last. Values are
    /// inserted verbatim; callers supply URL-safe identifiers.
    pub fn build_url(&self, base_url: &str, api_key: &str) -> Result<String> {
        let path_param = self.endpoint.path_param();
        let mut bindings = self.params.bindings();

        let path_value = match bindings.iter().position(|(name, _)| *name == path_param) {
            Some(index) => bindings.remove(index).1,
            None => {
                return Err(Error::MissingParameter {
                    operation: self.operation(),
                    name: path_param,
                })
            }
        };

        let path = self
            .endpoint
            .template()
            .replace(&format!("{{{}}}", path_param), &path_value);

        let mut url = format!("{}{}", base_url, path);
        let mut separator = '?';
        for (name, value) in bindings {
            url.push(separator);
            url.push_str(name);
            url.push('=');
            url.push_str(&value);
            separator = '&';
        }
        url.push(separator);
        url.push_str("api_key=");
        url.push_str(api_key);

        Ok(url)
    }
}
