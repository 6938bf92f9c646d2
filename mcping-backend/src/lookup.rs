//! Upstream status lookup.
//!
//! The wire protocol lives behind the public mcsrvstat.us API; this module
//! only maps its answers and failures onto [`ServerStatus`] and [`LookupError`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use mcping_store::{
  Diagnostics, Edition, MotdLines, PlayerEntry, Players, Protocol, ServerAddress, ServerStatus,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::circuit_breaker::BreakerError;

/// Why a lookup produced no status. `Display` text is safe to show to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
  #[error("Could not resolve hostname")]
  Dns,

  #[error("Server did not respond in time")]
  Timeout,

  #[error("Status service is rate limiting requests, try again shortly")]
  RateLimited,

  /// Reachable but not running. The pipeline turns this into an `online: false` status.
  #[error("Server is offline")]
  Offline,

  #[error("Status service is unavailable")]
  Unavailable,

  #[error("Status service is temporarily disabled")]
  CircuitOpen,
}

impl LookupError {
  /// Transient failures worth another attempt after back-off.
  pub fn is_retryable(&self) -> bool {
    matches!(self, LookupError::Dns | LookupError::Timeout | LookupError::Unavailable)
  }
}

impl From<BreakerError<LookupError>> for LookupError {
  fn from(err: BreakerError<LookupError>) -> Self {
    match err {
      BreakerError::Open => LookupError::CircuitOpen,
      BreakerError::Inner(inner) => inner,
    }
  }
}

#[async_trait]
pub trait StatusLookup: Send + Sync {
  async fn lookup(&self, address: &ServerAddress) -> Result<ServerStatus, LookupError>;
}

/// Lookup against the mcsrvstat.us v3 API.
pub struct McsrvstatLookup {
  client: Client,
  base_url: String,
}

impl McsrvstatLookup {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = Client::builder()
      .timeout(timeout)
      .user_agent(concat!("mcping/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    })
  }

  fn url_for(&self, address: &ServerAddress) -> String {
    match address.edition {
      Edition::Java => format!("{}/3/{}", self.base_url, address.authority()),
      Edition::Bedrock => format!("{}/bedrock/3/{}", self.base_url, address.authority()),
    }
  }
}

#[async_trait]
impl StatusLookup for McsrvstatLookup {
  async fn lookup(&self, address: &ServerAddress) -> Result<ServerStatus, LookupError> {
    let url = self.url_for(address);
    debug!(%url, "querying status api");

    let started = Instant::now();
    let response = self.client.get(&url).send().await.map_err(classify_transport)?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
      return Err(LookupError::RateLimited);
    }
    if !status.is_success() {
      warn!(%status, %address, "status api returned an error");
      return Err(LookupError::Unavailable);
    }

    let body: ApiResponse = response.json().await.map_err(|err| {
      warn!(error = %err, %address, "status api returned an unreadable body");
      if err.is_timeout() {
        LookupError::Timeout
      } else {
        LookupError::Unavailable
      }
    })?;

    let mut status = body.into_status(address)?;
    status.ping = Some(started.elapsed().as_millis() as u64);
    Ok(status)
  }
}

fn classify_transport(err: reqwest::Error) -> LookupError {
  if err.is_timeout() {
    LookupError::Timeout
  } else {
    warn!(error = %err, "status api request failed");
    LookupError::Unavailable
  }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
  online: bool,
  ip: Option<String>,
  port: Option<u16>,
  hostname: Option<String>,
  #[serde(default)]
  debug: ApiDebug,
  version: Option<String>,
  protocol: Option<ApiProtocol>,
  icon: Option<String>,
  software: Option<String>,
  map: Option<ApiText>,
  gamemode: Option<String>,
  #[serde(default)]
  eula_blocked: bool,
  motd: Option<ApiMotd>,
  players: Option<ApiPlayers>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiDebug {
  #[serde(default)]
  ping: bool,
  #[serde(default)]
  query: bool,
  #[serde(default)]
  srv: bool,
  #[serde(default)]
  animatedmotd: bool,
  #[serde(default)]
  cachetime: i64,
}

#[derive(Debug, Deserialize)]
struct ApiProtocol {
  version: i64,
  name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiText {
  clean: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMotd {
  #[serde(default)]
  raw: Vec<String>,
  #[serde(default)]
  clean: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPlayers {
  online: u32,
  max: u32,
  list: Option<Vec<ApiPlayer>>,
}

#[derive(Debug, Deserialize)]
struct ApiPlayer {
  name: String,
  uuid: Option<String>,
}

impl ApiResponse {
  fn into_status(self, address: &ServerAddress) -> Result<ServerStatus, LookupError> {
    if !self.online {
      // No resolved address means the name never resolved.
      return match self.ip {
        None => Err(LookupError::Dns),
        Some(_) => Err(LookupError::Offline),
      };
    }

    let list = self.players.as_ref().and_then(|p| p.list.as_ref()).map(|list| {
      list
        .iter()
        .map(|player| PlayerEntry {
          name: player.name.clone(),
          uuid: player.uuid.clone(),
        })
        .collect::<Vec<_>>()
    });

    Ok(ServerStatus {
      online: true,
      hostname: self.hostname.unwrap_or_else(|| address.hostname.clone()),
      ip: self.ip,
      port: self.port.unwrap_or(address.port),
      edition: address.edition,
      version: self.version,
      protocol: self.protocol.map(|p| Protocol {
        version: p.version,
        name: p.name,
      }),
      software: self.software,
      players: self.players.map(|p| Players {
        online: p.online,
        max: p.max,
        sample: list.clone(),
        list,
      }),
      motd: self.motd.map(|m| MotdLines {
        raw: m.raw,
        clean: m.clean,
      }),
      ping: None,
      icon: self.icon,
      map: self.map.and_then(|m| m.clean),
      gamemode: self.gamemode,
      diagnostics: Diagnostics {
        srv_record: self.debug.srv,
        query: self.debug.query,
        ping: self.debug.ping,
        eula_blocked: self.eula_blocked,
        animated_motd: self.debug.animatedmotd,
      },
      cache_time: self.debug.cachetime,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn parse(value: serde_json::Value) -> ApiResponse {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn test_online_response_maps_fields() {
    let address = ServerAddress::new("mc.hypixel.net", None, Edition::Java);
    let status = parse(json!({
      "online": true,
      "ip": "172.65.230.166",
      "port": 25565,
      "hostname": "mc.hypixel.net",
      "debug": { "ping": true, "query": false, "srv": false, "cachetime": 1700000000 },
      "version": "Requires MC 1.8 / 1.21",
      "protocol": { "version": 47, "name": "1.8.9" },
      "motd": { "raw": ["§aHypixel"], "clean": ["Hypixel"], "html": ["..."] },
      "players": { "online": 31000, "max": 200000 }
    }))
    .into_status(&address)
    .unwrap();

    assert!(status.online);
    assert_eq!(status.ip.as_deref(), Some("172.65.230.166"));
    assert_eq!(status.protocol.unwrap().version, 47);
    assert_eq!(status.players.unwrap().online, 31000);
    assert_eq!(status.motd.unwrap().raw, vec!["§aHypixel".to_string()]);
    assert!(status.diagnostics.ping);
    assert_eq!(status.cache_time, 1700000000);
  }

  #[test]
  fn test_offline_without_ip_is_dns_failure() {
    let address = ServerAddress::new("nope.invalid", None, Edition::Java);
    let result = parse(json!({ "online": false, "debug": {} })).into_status(&address);
    assert_eq!(result, Err(LookupError::Dns));
  }

  #[test]
  fn test_offline_with_ip_is_offline() {
    let address = ServerAddress::new("example.com", None, Edition::Java);
    let result = parse(json!({ "online": false, "ip": "1.2.3.4", "port": 25565 }))
      .into_status(&address);
    assert_eq!(result, Err(LookupError::Offline));
  }

  #[test]
  fn test_bedrock_url() {
    let lookup = McsrvstatLookup::new("https://api.mcsrvstat.us/", Duration::from_secs(1)).unwrap();
    let address = ServerAddress::new("play.example.net", None, Edition::Bedrock);
    assert_eq!(
      lookup.url_for(&address),
      "https://api.mcsrvstat.us/bedrock/3/play.example.net:19132"
    );
  }

  #[test]
  fn test_retryable_classification() {
    assert!(LookupError::Timeout.is_retryable());
    assert!(LookupError::Dns.is_retryable());
    assert!(!LookupError::RateLimited.is_retryable());
    assert!(!LookupError::Offline.is_retryable());
    assert!(!LookupError::CircuitOpen.is_retryable());
  }
}
