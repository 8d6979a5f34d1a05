//! Core types shared across the LoL API surface.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Regional shard of the League of Legends API.
///
/// Only the NA shard has its endpoint root wired up today; the other
/// variants are accepted by parsers and configuration files but rejected
/// at client construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Na,
    Br,
    Eune,
    Euw,
    Jp,
    Kr,
}

impl Region {
    /// Endpoint root for this shard, if wired up.
    pub fn endpoint_root(&self) -> Option<&'static str> {
        match self {
            Region::Na => Some("https://na1.api.riotgames.com"),
            _ => None,
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::Na
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Na => write!(f, "NA"),
            Region::Br => write!(f, "BR"),
            Region::Eune => write!(f, "EUNE"),
            Region::Euw => write!(f, "EUW"),
            Region::Jp => write!(f, "JP"),
            Region::Kr => write!(f, "KR"),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NA" => Ok(Region::Na),
            "BR" => Ok(Region::Br),
            "EUNE" => Ok(Region::Eune),
            "EUW" => Ok(Region::Euw),
            "JP" => Ok(Region::Jp),
            "KR" => Ok(Region::Kr),
            _ => Err(anyhow::anyhow!("Unknown region: {}", s)),
        }
    }
}

/// Status and raw body of a completed API call.
///
/// The body is left unparsed; callers feed it to `serde_json` themselves.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status of the call (200 for anything the client returns as `Ok`)
    pub status: StatusCode,
    /// Raw JSON body as returned by the service
    pub body: String,
}
