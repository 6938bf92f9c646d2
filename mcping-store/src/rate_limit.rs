//! Per-IP request windows and per-hostname cooldowns.
//!
//! IPs get a fixed 60 second window counting requests. Hostnames get a single
//! cooldown timer: a check is allowed once `cooldown` has passed since the
//! last allowed check, and every allowed check re-arms the timer.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::models::RateLimitEntry;
use crate::store::{MemoryStore, Mutation, Store};

/// Length of the per-IP window.
pub const WINDOW_MS: i64 = 60_000;

/// Hostname timers untouched for this long are swept.
pub const HOSTNAME_IDLE_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// 0 disables the IP limit
    pub requests_per_minute: u32,
    /// 0 disables the hostname cooldown
    pub cooldown_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 10,
            cooldown_seconds: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitReason {
    Ip,
    Hostname,
}

impl fmt::Display for LimitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitReason::Ip => f.write_str("ip"),
            LimitReason::Hostname => f.write_str("hostname"),
        }
    }
}

/// A rejected check and how long the caller has to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimited {
    pub reason: LimitReason,
    pub remaining_secs: u64,
}

fn ceil_secs(ms: i64) -> u64 {
    (ms.max(1) as u64).div_ceil(1000)
}

fn hostname_key(hostname: &str) -> String {
    hostname.trim().to_ascii_lowercase()
}

pub struct RateLimiter<I = MemoryStore<RateLimitEntry>, H = MemoryStore<i64>> {
    config: RateLimitConfig,
    ip_windows: I,
    hostname_checks: H,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_stores(config, MemoryStore::new(), MemoryStore::new())
    }
}

impl<I, H> RateLimiter<I, H>
where
    I: Store<RateLimitEntry>,
    H: Store<i64>,
{
    pub fn with_stores(config: RateLimitConfig, ip_windows: I, hostname_checks: H) -> Self {
        Self {
            config,
            ip_windows,
            hostname_checks,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn cooldown_ms(&self) -> i64 {
        self.config.cooldown_seconds as i64 * 1000
    }

    /// Count a request from `ip` against its window.
    pub async fn check_ip(&self, ip: &str, now: i64) -> Result<(), RateLimited> {
        let limit = self.config.requests_per_minute;
        if limit == 0 {
            return Ok(());
        }

        let result = self
            .ip_windows
            .update(ip, |entry| match entry {
                Some(window) if now < window.reset_time => {
                    if window.count >= limit {
                        let rejected = RateLimited {
                            reason: LimitReason::Ip,
                            remaining_secs: ceil_secs(window.reset_time - now),
                        };
                        (Mutation::Keep, Err(rejected))
                    } else {
                        let next = RateLimitEntry {
                            count: window.count + 1,
                            reset_time: window.reset_time,
                        };
                        (Mutation::Set(next), Ok(()))
                    }
                }
                _ => {
                    let fresh = RateLimitEntry {
                        count: 1,
                        reset_time: now + WINDOW_MS,
                    };
                    (Mutation::Set(fresh), Ok(()))
                }
            })
            .await;

        if let Err(rejected) = &result {
            debug!(%ip, remaining = rejected.remaining_secs, "ip rate limit hit");
        }
        result
    }

    /// Allow `hostname` if its cooldown has elapsed, re-arming the timer.
    pub async fn check_hostname(&self, hostname: &str, now: i64) -> Result<(), RateLimited> {
        let cooldown = self.cooldown_ms();
        if cooldown == 0 {
            return Ok(());
        }

        let key = hostname_key(hostname);
        let result = self
            .hostname_checks
            .update(&key, |last| match last {
                Some(&last) if now - last < cooldown => {
                    let remaining = (cooldown - (now - last)).min(cooldown);
                    let rejected = RateLimited {
                        reason: LimitReason::Hostname,
                        remaining_secs: ceil_secs(remaining),
                    };
                    (Mutation::Keep, Err(rejected))
                }
                _ => (Mutation::Set(now), Ok(())),
            })
            .await;

        if let Err(rejected) = &result {
            debug!(hostname = %key, remaining = rejected.remaining_secs, "hostname cooldown active");
        }
        result
    }

    /// IP window first, then hostname cooldown. An IP rejection leaves the
    /// hostname timer untouched.
    pub async fn check(&self, ip: &str, hostname: &str, now: i64) -> Result<(), RateLimited> {
        self.check_ip(ip, now).await?;
        self.check_hostname(hostname, now).await
    }

    /// Drop closed IP windows and idle hostname timers.
    pub async fn sweep(&self, now: i64) -> usize {
        let idle = HOSTNAME_IDLE_MS.max(self.cooldown_ms());
        let windows = self
            .ip_windows
            .retain(|_, window| now < window.reset_time)
            .await;
        let hostnames = self
            .hostname_checks
            .retain(|_, last| now - *last <= idle)
            .await;
        windows + hostnames
    }

    pub fn tracked_ips(&self) -> usize {
        self.ip_windows.len()
    }

    pub fn tracked_hostnames(&self) -> usize {
        self.hostname_checks.len()
    }
}

/// Client-side mirror of the hostname cooldown, kept in browser-local style
/// storage under `mc-cooldown:<hostname>`.
///
/// Lets a UI disable its submit button without a round trip. It is advisory:
/// the server runs [`RateLimiter::check_hostname`] regardless.
pub struct ClientCooldown<S = MemoryStore<i64>> {
    cooldown_ms: i64,
    storage: S,
}

impl ClientCooldown {
    pub fn new(cooldown_seconds: u64) -> Self {
        Self::with_storage(cooldown_seconds, MemoryStore::new())
    }
}

impl<S: Store<i64>> ClientCooldown<S> {
    pub fn with_storage(cooldown_seconds: u64, storage: S) -> Self {
        Self {
            cooldown_ms: cooldown_seconds as i64 * 1000,
            storage,
        }
    }

    pub fn storage_key(hostname: &str) -> String {
        format!("mc-cooldown:{}", hostname_key(hostname))
    }

    /// Seconds left before `hostname` may be checked again; 0 when free.
    pub async fn remaining_secs(&self, hostname: &str, now: i64) -> u64 {
        match self.storage.get(&Self::storage_key(hostname)).await {
            Some(last) if now - last < self.cooldown_ms => {
                ceil_secs((self.cooldown_ms - (now - last)).min(self.cooldown_ms))
            }
            _ => 0,
        }
    }

    pub async fn can_check(&self, hostname: &str, now: i64) -> bool {
        self.remaining_secs(hostname, now).await == 0
    }

    pub async fn record_check(&self, hostname: &str, now: i64) {
        self.storage.set(&Self::storage_key(hostname), now).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    fn limiter(requests_per_minute: u32, cooldown_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            requests_per_minute,
            cooldown_seconds,
        })
    }

    #[tokio::test]
    async fn test_ip_window_boundary() {
        let limiter = limiter(3, 0);
        for i in 0..3 {
            assert!(limiter.check_ip("1.2.3.4", T0 + i * 100).await.is_ok());
        }

        let rejected = limiter.check_ip("1.2.3.4", T0 + 1_000).await.unwrap_err();
        assert_eq!(rejected.reason, LimitReason::Ip);
        assert_eq!(rejected.remaining_secs, 59);

        // Other IPs have their own window
        assert!(limiter.check_ip("5.6.7.8", T0 + 1_000).await.is_ok());

        // Window reopens at resetTime
        assert!(limiter.check_ip("1.2.3.4", T0 + WINDOW_MS).await.is_ok());
    }

    #[tokio::test]
    async fn test_zero_limit_is_unlimited_and_untracked() {
        let limiter = limiter(0, 0);
        for _ in 0..100 {
            assert!(limiter.check_ip("1.2.3.4", T0).await.is_ok());
        }
        assert_eq!(limiter.tracked_ips(), 0);
    }

    #[tokio::test]
    async fn test_hostname_cooldown_boundary() {
        let limiter = limiter(0, 40);
        assert!(limiter.check_hostname("mc.example.com", T0).await.is_ok());

        let rejected = limiter
            .check_hostname("MC.example.com", T0 + 39_900)
            .await
            .unwrap_err();
        assert_eq!(rejected.reason, LimitReason::Hostname);
        assert_eq!(rejected.remaining_secs, 1);

        assert!(limiter.check_hostname("mc.example.com", T0 + 40_000).await.is_ok());
        // Allowed check re-armed the timer
        assert!(limiter.check_hostname("mc.example.com", T0 + 40_001).await.is_err());
    }

    #[tokio::test]
    async fn test_rejection_does_not_rearm_cooldown() {
        let limiter = limiter(0, 40);
        limiter.check_hostname("a.example", T0).await.unwrap();
        let _ = limiter.check_hostname("a.example", T0 + 20_000).await;
        assert!(limiter.check_hostname("a.example", T0 + 40_000).await.is_ok());
    }

    #[tokio::test]
    async fn test_ip_checked_before_hostname() {
        let limiter = limiter(1, 40);
        limiter.check("1.1.1.1", "a.example", T0).await.unwrap();

        // Both would fail: the IP reason wins
        let rejected = limiter.check("1.1.1.1", "a.example", T0 + 1).await.unwrap_err();
        assert_eq!(rejected.reason, LimitReason::Ip);

        // IP exhaustion did not consume the hostname check of b.example
        let rejected = limiter.check("1.1.1.1", "b.example", T0 + 2).await.unwrap_err();
        assert_eq!(rejected.reason, LimitReason::Ip);
        assert!(limiter.check("2.2.2.2", "b.example", T0 + 3).await.is_ok());
    }

    #[tokio::test]
    async fn test_sweep_drops_closed_windows_and_idle_hostnames() {
        let limiter = limiter(5, 40);
        limiter.check("1.1.1.1", "a.example", T0).await.unwrap();
        limiter.check("2.2.2.2", "b.example", T0 + WINDOW_MS).await.unwrap();

        let removed = limiter.sweep(T0 + WINDOW_MS + 1).await;
        assert_eq!(removed, 1);
        assert_eq!(limiter.tracked_ips(), 1);
        assert_eq!(limiter.tracked_hostnames(), 2);

        let removed = limiter.sweep(T0 + HOSTNAME_IDLE_MS + 1).await;
        assert_eq!(removed, 2);
        assert_eq!(limiter.tracked_hostnames(), 1);
    }

    #[tokio::test]
    async fn test_client_cooldown_mirror() {
        let client = ClientCooldown::new(40);
        assert!(client.can_check("mc.example.com", T0).await);

        client.record_check("mc.example.com", T0).await;
        assert_eq!(client.remaining_secs("MC.EXAMPLE.COM", T0 + 10_000).await, 30);
        assert!(!client.can_check("mc.example.com", T0 + 39_999).await);
        assert!(client.can_check("mc.example.com", T0 + 40_000).await);
    }
}
