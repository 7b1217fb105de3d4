//! Artifact download with size bound and checksum gate.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::checksum::verify_hashes;
use crate::error::{RegistryError, RegistryResult};
use crate::icon::IconDescriptor;
use crate::types::{RegistryConfig, SizePolicy};
use crate::USER_AGENT_VALUE;

/// Downloads icons and verifies them before handing the bytes out.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    size_policy: SizePolicy,
}

impl Downloader {
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| RegistryError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            size_policy: config.size_policy,
        })
    }

    /// Fetch the icon and verify its checksums.
    ///
    /// Under [`SizePolicy::Enforce`] the body may not exceed the declared
    /// size, whether announced by `Content-Length` or observed while reading.
    pub async fn download(&self, icon: &IconDescriptor) -> RegistryResult<Vec<u8>> {
        let url = icon.url();
        debug!(url = %url, declared_size = icon.declared_size(), "downloading icon");

        let transport = |e: reqwest::Error| RegistryError::Download {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let enforced = self.size_policy.is_enforced();
        let declared = icon.declared_size();

        if enforced {
            if let Some(length) = response.content_length() {
                if length > declared {
                    return Err(RegistryError::Oversize {
                        declared,
                        actual: length,
                    });
                }
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            body.extend_from_slice(&chunk);
            if enforced && body.len() as u64 > declared {
                return Err(RegistryError::Oversize {
                    declared,
                    actual: body.len() as u64,
                });
            }
        }

        verify_hashes(&body, icon.checksums())?;
        debug!(url = %url, bytes = body.len(), "icon verified");

        Ok(body)
    }
}
