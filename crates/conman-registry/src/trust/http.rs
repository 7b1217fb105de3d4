//! HTTP layer: status mapping, retry, RoleOutcome.
//!
//! This is the ONLY place for status code handling. trust/mod.rs never
//! interprets status codes.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Outcome of fetching one role's metadata.
#[derive(Debug)]
pub(crate) enum RoleOutcome {
    Missing,
    Present(Vec<u8>),
}

/// HTTP backend for the trust service (holds reqwest client and retry budget).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) max_retries: u32,
}

impl HttpBackend {
    /// Fetch role metadata; 404 => Missing, 2xx => Present.
    pub(crate) async fn fetch_role_optional(&self, url: &str) -> RegistryResult<RoleOutcome> {
        match self.request(url).await {
            Ok(response) => {
                let body = response.bytes().await.map_err(|e| RegistryError::Network {
                    message: format!("failed to read trust metadata: {}", e),
                })?;
                Ok(RoleOutcome::Present(body.to_vec()))
            }
            Err(RegistryError::NotFound { .. }) => {
                debug!(url = %url, "role metadata not published");
                Ok(RoleOutcome::Missing)
            }
            Err(e) => Err(e),
        }
    }

    /// GET with retry on transient failures.
    pub(crate) async fn request(&self, url: &str) -> RegistryResult<reqwest::Response> {
        use rand::Rng;

        let mut retries = 0;

        loop {
            match self.request_once(url).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retries < self.max_retries => {
                    retries += 1;

                    let base_backoff = base_backoff(retries);
                    let jittered_ms =
                        rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                    let backoff = Duration::from_millis(jittered_ms.max(10));

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying trust service request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(&self, url: &str) -> RegistryResult<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            404 => Err(RegistryError::NotFound {
                name: url.to_string(),
            }),

            429 | 500..=599 => Err(RegistryError::Network {
                message: format!("HTTP {} from trust service", status.as_u16()),
            }),

            _ => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(RegistryError::TrustService {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }
        }
    }
}

/// Exponential backoff ceiling for the given retry, capped at 30 seconds.
fn base_backoff(retry: u32) -> Duration {
    let secs = 1_u64.checked_shl(retry).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_backoff_doubles_then_caps() {
        assert_eq!(base_backoff(1), Duration::from_secs(2));
        assert_eq!(base_backoff(4), Duration::from_secs(16));
        assert_eq!(base_backoff(5), MAX_BACKOFF);
    }

    #[test]
    fn test_base_backoff_large_retry_budgets() {
        assert_eq!(base_backoff(31), MAX_BACKOFF);
        assert_eq!(base_backoff(63), MAX_BACKOFF);
        assert_eq!(base_backoff(64), MAX_BACKOFF);
        assert_eq!(base_backoff(u32::MAX), MAX_BACKOFF);
    }
}
