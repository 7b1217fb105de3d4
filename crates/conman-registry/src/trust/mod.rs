//! Trust repository lookup.
//!
//! Targets are looked up by name in the image repository's trust metadata.
//! Signature checking of that metadata belongs to the trust-repository
//! client; this module only locates the named target and hands back its
//! custom payload for independent validation.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::types::{RegistryConfig, TargetRecord};
use crate::USER_AGENT_VALUE;

mod http;

use http::{HttpBackend, RoleOutcome};

/// Roles searched for targets, highest priority first.
pub const TARGET_ROLES: [&str; 2] = ["targets/releases", "targets"];

/// Verified name → record lookup.
#[async_trait]
pub trait TargetLookup: Send + Sync {
    /// Look up a single target by name.
    async fn get_target_by_name(&self, name: &str) -> RegistryResult<TargetRecord>;

    /// List every target, sorted by name.
    async fn list_targets(&self) -> RegistryResult<Vec<TargetRecord>>;
}

#[derive(Debug, Deserialize)]
struct SignedTargets {
    signed: TargetsBody,
}

#[derive(Debug, Deserialize)]
struct TargetsBody {
    #[serde(default)]
    targets: BTreeMap<String, TargetMeta>,
}

#[derive(Debug, Deserialize)]
struct TargetMeta {
    #[serde(default)]
    custom: Option<Box<RawValue>>,
}

/// Read-only, unauthenticated client for the trust service.
#[derive(Debug, Clone)]
pub struct TrustClient {
    http: HttpBackend,
    repository: String,
}

impl TrustClient {
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

        let base_url = config.trust_server.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(RegistryError::Config {
                message: "trust server URL is empty".to_string(),
            });
        }

        Ok(Self {
            http: HttpBackend {
                client,
                base_url,
                max_retries: config.max_retries,
            },
            repository: config.image_repository.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.http.base_url
    }

    fn role_url(&self, role: &str) -> String {
        format!(
            "{}/v2/{}/_trust/tuf/{}.json",
            self.http.base_url, self.repository, role
        )
    }

    /// Targets of every published role, in priority order.
    async fn fetch_roles(&self) -> RegistryResult<Vec<BTreeMap<String, TargetMeta>>> {
        let mut roles = Vec::new();

        for role in TARGET_ROLES {
            let url = self.role_url(role);
            debug!(url = %url, "fetching trust metadata");

            if let RoleOutcome::Present(body) = self.http.fetch_role_optional(&url).await? {
                let parsed: SignedTargets =
                    serde_json::from_slice(&body).map_err(|e| RegistryError::TrustService {
                        message: format!("failed to parse {} metadata: {}", role, e),
                    })?;
                roles.push(parsed.signed.targets);
            }
        }

        if roles.is_empty() {
            return Err(RegistryError::TrustService {
                message: format!("no trust data for {}", self.repository),
            });
        }

        Ok(roles)
    }
}

fn to_record(name: &str, meta: &TargetMeta) -> RegistryResult<TargetRecord> {
    let custom = meta
        .custom
        .as_ref()
        .ok_or_else(|| RegistryError::TrustService {
            message: format!("target {} has no custom payload", name),
        })?;

    Ok(TargetRecord {
        name: name.to_string(),
        custom: custom.get().as_bytes().to_vec(),
    })
}

#[async_trait]
impl TargetLookup for TrustClient {
    async fn get_target_by_name(&self, name: &str) -> RegistryResult<TargetRecord> {
        let roles = self.fetch_roles().await?;

        roles
            .iter()
            .find_map(|targets| targets.get(name))
            .ok_or_else(|| RegistryError::NotFound {
                name: name.to_string(),
            })
            .and_then(|meta| to_record(name, meta))
    }

    async fn list_targets(&self) -> RegistryResult<Vec<TargetRecord>> {
        let roles = self.fetch_roles().await?;

        let mut merged: BTreeMap<&str, &TargetMeta> = BTreeMap::new();
        for targets in roles.iter().rev() {
            for (name, meta) in targets {
                merged.insert(name, meta);
            }
        }

        merged
            .into_iter()
            .map(|(name, meta)| to_record(name, meta))
            .collect()
    }
}
