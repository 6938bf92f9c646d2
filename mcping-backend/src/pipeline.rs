//! Status check orchestration.
//!
//! A check runs validation, then the Turnstile gate, the IP and hostname
//! limits and the cache. On a miss the lookup is deduplicated per address and
//! retried with back-off, optionally behind a circuit breaker. Only the lookup
//! itself is retried.

use std::sync::Arc;
use std::time::Duration;

use mcping_motd::to_html;
use mcping_store::{
  CacheConfig, CacheEntry, Edition, MemoryStore, PendingRequest, Players, Protocol,
  REQUEST_TIMEOUT, RateLimitConfig, RateLimitEntry, RateLimiter, RequestDeduplicator,
  ServerAddress, ServerStatus, StatusCache, Store,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::error::AppError;
use crate::lookup::{LookupError, StatusLookup};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::turnstile::TurnstileVerifier;
use crate::validation;

#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
  pub rate_limit: RateLimitConfig,
  pub cache: CacheConfig,
  pub retry: RetryConfig,
  /// `None` leaves the lookup unguarded
  pub circuit_breaker: Option<CircuitBreakerConfig>,
  /// Cap on one lookup including every retry and back-off. Keep it below the
  /// request timeout so a slow upstream surfaces as 504 rather than 408.
  pub lookup_deadline: Option<Duration>,
}

/// Backing stores for the limiter, cache and deduplicator. Wrap a store in
/// `Arc` to share it between pipelines.
pub struct PipelineStores<
  I = MemoryStore<RateLimitEntry>,
  H = MemoryStore<i64>,
  C = MemoryStore<CacheEntry>,
  P = MemoryStore<PendingRequest<ServerStatus, LookupError>>,
> {
  pub ip_windows: I,
  pub hostname_checks: H,
  pub cache: C,
  pub pending: P,
}

impl Default for PipelineStores {
  fn default() -> Self {
    Self {
      ip_windows: MemoryStore::new(),
      hostname_checks: MemoryStore::new(),
      cache: MemoryStore::new(),
      pending: MemoryStore::new(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
  pub hostname: String,
  #[serde(default)]
  pub port: Option<i64>,
  #[serde(default)]
  pub bedrock: bool,
  #[serde(default)]
  pub turnstile_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
  pub success: bool,
  pub cached: bool,
  pub server: ServerBlock,
  pub players: Option<Players>,
  pub motd: Option<MotdBlock>,
  pub performance: Performance,
  pub query: QueryBlock,
  pub icon: Option<String>,
  pub debug: DebugBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerBlock {
  pub online: bool,
  pub hostname: String,
  pub ip: Option<String>,
  pub port: u16,
  pub edition: Edition,
  pub version: Option<String>,
  pub protocol: Option<Protocol>,
  pub software: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MotdBlock {
  pub raw: Vec<String>,
  pub html: String,
  pub clean: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Performance {
  pub ping: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryBlock {
  pub enabled: bool,
  pub map: Option<String>,
  pub gamemode: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugBlock {
  pub cache_time: i64,
  pub dns: DnsDebug,
  pub protocol: ProtocolDebug,
  pub connectivity: ConnectivityDebug,
  pub security: SecurityDebug,
  pub server_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub circuit_breaker: Option<CircuitState>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsDebug {
  pub srv_record: bool,
  pub resolved: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolDebug {
  pub ping: bool,
  pub query: bool,
  pub animated_motd: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityDebug {
  pub online: bool,
  pub ping: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityDebug {
  pub eula_blocked: bool,
  pub turnstile: bool,
}

/// Entries dropped by one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
  pub cache: usize,
  pub rate_limits: usize,
  pub pending: usize,
}

pub struct StatusPipeline<
  I = MemoryStore<RateLimitEntry>,
  H = MemoryStore<i64>,
  C = MemoryStore<CacheEntry>,
  P = MemoryStore<PendingRequest<ServerStatus, LookupError>>,
> {
  limiter: RateLimiter<I, H>,
  cache: StatusCache<C>,
  dedup: RequestDeduplicator<ServerStatus, LookupError, P>,
  retry: RetryPolicy,
  breaker: Option<Arc<CircuitBreaker>>,
  lookup_deadline: Option<Duration>,
  lookup: Arc<dyn StatusLookup>,
  turnstile: Option<Arc<dyn TurnstileVerifier>>,
}

impl StatusPipeline {
  /// Pipeline on in-process stores.
  pub fn new(
    config: PipelineConfig,
    lookup: Arc<dyn StatusLookup>,
    turnstile: Option<Arc<dyn TurnstileVerifier>>,
    shutdown: CancellationToken,
  ) -> Self {
    Self::with_stores(config, PipelineStores::default(), lookup, turnstile, shutdown)
  }
}

impl<I, H, C, P> StatusPipeline<I, H, C, P>
where
  I: Store<RateLimitEntry>,
  H: Store<i64>,
  C: Store<CacheEntry>,
  P: Store<PendingRequest<ServerStatus, LookupError>>,
{
  pub fn with_stores(
    config: PipelineConfig,
    stores: PipelineStores<I, H, C, P>,
    lookup: Arc<dyn StatusLookup>,
    turnstile: Option<Arc<dyn TurnstileVerifier>>,
    shutdown: CancellationToken,
  ) -> Self {
    Self {
      limiter: RateLimiter::with_stores(config.rate_limit, stores.ip_windows, stores.hostname_checks),
      cache: StatusCache::with_store(config.cache, stores.cache),
      dedup: RequestDeduplicator::with_store(stores.pending, REQUEST_TIMEOUT),
      retry: RetryPolicy::with_shutdown(config.retry, shutdown),
      breaker: config
        .circuit_breaker
        .map(|breaker| Arc::new(CircuitBreaker::new(breaker))),
      lookup_deadline: config.lookup_deadline,
      lookup,
      turnstile,
    }
  }

  /// State of the lookup breaker, if one is configured.
  pub fn circuit_state(&self) -> Option<CircuitState> {
    self.breaker.as_ref().map(|breaker| breaker.get_state())
  }

  pub async fn check(
    &self,
    request: StatusRequest,
    client_ip: &str,
    now: i64,
  ) -> Result<StatusResponse, AppError> {
    let address = resolve_address(&request)?;

    if let Some(verifier) = &self.turnstile {
      let token = request
        .turnstile_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Captcha("Verification token is required".to_string()))?;
      validation::validate_turnstile_token(token)?;
      let remote_ip = (client_ip != "unknown").then_some(client_ip);
      if !verifier.verify(token, remote_ip).await {
        return Err(AppError::Captcha(
          "Verification failed. Please try again.".to_string(),
        ));
      }
    }

    self.limiter.check(client_ip, &address.hostname, now).await?;

    if let Some(status) = self.cache.get(&address, now).await {
      debug!(%address, "cache hit");
      return Ok(self.shape(status, true));
    }
    debug!(%address, "cache miss");

    let status = self.fetch(&address, now).await?;
    self.cache.put(&address, status.clone(), now).await;

    Ok(self.shape(status, false))
  }

  /// One deduplicated, retried lookup.
  async fn fetch(&self, address: &ServerAddress, now: i64) -> Result<ServerStatus, LookupError> {
    let lookup = self.lookup.clone();
    let retry = self.retry.clone();
    let breaker = self.breaker.clone();
    let deadline = self.lookup_deadline;
    let target = address.clone();

    self
      .dedup
      .run(&address.cache_key(), move || async move {
        let attempts = retry.run_if(
          || guarded_lookup(lookup.as_ref(), breaker.as_deref(), &target, now),
          LookupError::is_retryable,
        );
        let Some(deadline) = deadline else {
          return attempts.await;
        };
        match tokio::time::timeout(deadline, attempts).await {
          Ok(result) => result,
          Err(_) => {
            warn!(address = %target, deadline_ms = deadline.as_millis() as u64, "lookup deadline reached");
            Err(LookupError::Timeout)
          }
        }
      })
      .await
  }

  fn shape(&self, status: ServerStatus, cached: bool) -> StatusResponse {
    let motd = status.motd.map(|lines| MotdBlock {
      html: to_html(&lines.raw.join("\n")),
      raw: lines.raw,
      clean: lines.clean,
    });
    let diagnostics = status.diagnostics;

    StatusResponse {
      success: true,
      cached,
      server: ServerBlock {
        online: status.online,
        hostname: status.hostname,
        ip: status.ip.clone(),
        port: status.port,
        edition: status.edition,
        version: status.version,
        protocol: status.protocol,
        software: status.software.clone(),
      },
      players: status.players,
      motd,
      performance: Performance { ping: status.ping },
      query: QueryBlock {
        enabled: diagnostics.query,
        map: status.map,
        gamemode: status.gamemode,
      },
      icon: status.icon,
      debug: DebugBlock {
        cache_time: status.cache_time,
        dns: DnsDebug {
          srv_record: diagnostics.srv_record,
          resolved: status.ip.is_some(),
        },
        protocol: ProtocolDebug {
          ping: diagnostics.ping,
          query: diagnostics.query,
          animated_motd: diagnostics.animated_motd,
        },
        connectivity: ConnectivityDebug {
          online: status.online,
          ping: status.ping,
        },
        security: SecurityDebug {
          eula_blocked: diagnostics.eula_blocked,
          turnstile: self.turnstile.is_some(),
        },
        server_type: status
          .software
          .unwrap_or_else(|| status.edition.as_str().to_string()),
        circuit_breaker: self.circuit_state(),
      },
    }
  }

  /// Drop expired cache entries, closed rate-limit windows and abandoned lookups.
  pub async fn sweep(&self, now: i64) -> SweepReport {
    let report = SweepReport {
      cache: self.cache.sweep(now).await,
      rate_limits: self.limiter.sweep(now).await,
      pending: self.dedup.sweep().await,
    };
    if report != SweepReport::default() {
      info!(
        cache = report.cache,
        rate_limits = report.rate_limits,
        pending = report.pending,
        "swept stale entries"
      );
    }
    report
  }
}

fn resolve_address(request: &StatusRequest) -> Result<ServerAddress, AppError> {
  let (hostname, port) = match request.port {
    Some(port) => (request.hostname.trim(), Some(validation::validate_port(port)?)),
    None => validation::split_address(&request.hostname)?,
  };
  validation::validate_hostname(hostname)?;

  let edition = if request.bedrock {
    Edition::Bedrock
  } else {
    Edition::Java
  };
  Ok(ServerAddress::new(hostname, port, edition))
}

/// A single lookup attempt. Offline answers become an `online: false` status
/// and DNS failures pass through without counting against the breaker.
async fn guarded_lookup(
  lookup: &dyn StatusLookup,
  breaker: Option<&CircuitBreaker>,
  address: &ServerAddress,
  now: i64,
) -> Result<ServerStatus, LookupError> {
  let attempt = move || async move {
    match lookup.lookup(address).await {
      Ok(status) => Ok(Ok(status)),
      Err(LookupError::Offline) => Ok(Ok(ServerStatus::offline(address, now / 1000))),
      Err(LookupError::Dns) => Ok(Err(LookupError::Dns)),
      Err(err) => Err(err),
    }
  };

  match breaker {
    Some(breaker) => breaker.call(attempt).await.map_err(LookupError::from)?,
    None => attempt().await?,
  }
}
