use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{HeaderMap, request::Parts};

pub fn now_ms() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}

pub fn now_secs() -> i64 {
  now_ms() / 1000
}

/// Caller address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the
/// socket peer, then `"unknown"`.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
  let forwarded = headers
    .get("x-forwarded-for")
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(',').next())
    .map(str::trim)
    .filter(|v| !v.is_empty());

  let real_ip = || {
    headers
      .get("x-real-ip")
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|v| !v.is_empty())
  };

  forwarded
    .or_else(real_ip)
    .map(str::to_string)
    .or_else(|| peer.map(|addr| addr.ip().to_string()))
    .unwrap_or_else(|| "unknown".to_string())
}

/// Extractor wrapping [`client_ip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
  S: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    let peer = parts
      .extensions
      .get::<ConnectInfo<SocketAddr>>()
      .map(|ConnectInfo(addr)| *addr);
    Ok(ClientIp(client_ip(&parts.headers, peer)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  #[test]
  fn test_forwarded_for_wins() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
    assert_eq!(client_ip(&headers, None), "203.0.113.7");
  }

  #[test]
  fn test_real_ip_then_peer_then_unknown() {
    let mut headers = HeaderMap::new();
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
    assert_eq!(client_ip(&headers, None), "198.51.100.2");

    let peer: SocketAddr = "192.0.2.1:5000".parse().unwrap();
    assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.1");
    assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
  }

  #[test]
  fn test_now_units() {
    let ms = now_ms();
    assert!(ms > 1_600_000_000_000);
    assert!((now_secs() - ms / 1000).abs() <= 1);
  }
}
