use serde::{Deserialize, Serialize};
use std::fmt;

/// Minecraft edition being queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edition {
  #[default]
  Java,
  Bedrock,
}

impl Edition {
  /// Port used when the caller does not give one.
  pub fn default_port(self) -> u16 {
    match self {
      Edition::Java => 25565,
      Edition::Bedrock => 19132,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Edition::Java => "java",
      Edition::Bedrock => "bedrock",
    }
  }
}

impl fmt::Display for Edition {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A server to query. Hostnames are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
  pub hostname: String,
  pub port: u16,
  pub edition: Edition,
}

impl ServerAddress {
  pub fn new(hostname: &str, port: Option<u16>, edition: Edition) -> Self {
    Self {
      hostname: hostname.trim().to_ascii_lowercase(),
      port: port.unwrap_or_else(|| edition.default_port()),
      edition,
    }
  }

  /// Key shared by the status cache and the request deduplicator
  /// (`edition:hostname:port`).
  pub fn cache_key(&self) -> String {
    format!("{}:{}:{}", self.edition, self.hostname, self.port)
  }

  /// `hostname:port`, as passed to the status lookup.
  pub fn authority(&self) -> String {
    format!("{}:{}", self.hostname, self.port)
  }
}

impl fmt::Display for ServerAddress {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.authority(), self.edition)
  }
}

/// Result of a status lookup. Treated as immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatus {
  pub online: bool,
  pub hostname: String,
  pub ip: Option<String>,
  pub port: u16,
  pub edition: Edition,
  pub version: Option<String>,
  pub protocol: Option<Protocol>,
  pub software: Option<String>,
  pub players: Option<Players>,
  pub motd: Option<MotdLines>,
  /// Round trip in milliseconds
  pub ping: Option<u64>,
  /// `data:image/png;base64,...` favicon
  pub icon: Option<String>,
  pub map: Option<String>,
  pub gamemode: Option<String>,
  #[serde(default)]
  pub diagnostics: Diagnostics,
  /// Unix timestamp (seconds) the upstream produced this answer
  pub cache_time: i64,
}

impl ServerStatus {
  /// A reachable-but-offline answer for `address`.
  pub fn offline(address: &ServerAddress, cache_time: i64) -> Self {
    Self {
      online: false,
      hostname: address.hostname.clone(),
      ip: None,
      port: address.port,
      edition: address.edition,
      version: None,
      protocol: None,
      software: None,
      players: None,
      motd: None,
      ping: None,
      icon: None,
      map: None,
      gamemode: None,
      diagnostics: Diagnostics::default(),
      cache_time,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
  pub version: i64,
  pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
  pub online: u32,
  pub max: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub list: Option<Vec<PlayerEntry>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sample: Option<Vec<PlayerEntry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub uuid: Option<String>,
}

/// MOTD lines as returned upstream: raw keeps the `§` codes, clean has them stripped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotdLines {
  pub raw: Vec<String>,
  pub clean: Vec<String>,
}

/// Lookup-side facts surfaced in the response's debug block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
  pub srv_record: bool,
  pub query: bool,
  pub ping: bool,
  pub eula_blocked: bool,
  pub animated_motd: bool,
}

/// A cached status and the time (epoch ms) it was stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
  pub status: ServerStatus,
  pub timestamp: i64,
}

/// Fixed-window request counter for one IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
  pub count: u32,
  /// Epoch ms at which the window reopens
  pub reset_time: i64,
}
