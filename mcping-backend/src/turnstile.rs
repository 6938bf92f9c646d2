use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

pub const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Human-verification check for status requests.
#[async_trait]
pub trait TurnstileVerifier: Send + Sync {
  /// `true` only when the token was positively verified.
  async fn verify(&self, token: &str, remote_ip: Option<&str>) -> bool;
}

/// Cloudflare Turnstile siteverify client
pub struct CloudflareTurnstile {
  client: Client,
  secret_key: String,
  verify_url: String,
}

#[derive(Deserialize)]
struct SiteverifyResponse {
  success: bool,
  #[serde(default, rename = "error-codes")]
  error_codes: Vec<String>,
}

impl CloudflareTurnstile {
  pub fn new(secret_key: impl Into<String>) -> Result<Self, reqwest::Error> {
    Self::with_url(secret_key, SITEVERIFY_URL)
  }

  pub fn with_url(
    secret_key: impl Into<String>,
    verify_url: impl Into<String>,
  ) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self {
      client,
      secret_key: secret_key.into(),
      verify_url: verify_url.into(),
    })
  }
}

#[async_trait]
impl TurnstileVerifier for CloudflareTurnstile {
  async fn verify(&self, token: &str, remote_ip: Option<&str>) -> bool {
    let mut form = vec![("secret", self.secret_key.as_str()), ("response", token)];
    if let Some(ip) = remote_ip {
      form.push(("remoteip", ip));
    }

    let response = match self.client.post(&self.verify_url).form(&form).send().await {
      Ok(response) => response,
      Err(err) => {
        warn!(error = %err, "turnstile verification request failed");
        return false;
      }
    };

    match response.json::<SiteverifyResponse>().await {
      Ok(body) => {
        if !body.success {
          warn!(codes = ?body.error_codes, "turnstile token rejected");
        }
        body.success
      }
      Err(err) => {
        warn!(error = %err, "turnstile returned an unreadable body");
        false
      }
    }
  }
}
