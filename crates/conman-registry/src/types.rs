//! Shared types: configuration and trust-service records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, RegistryResult};

/// A named target as returned by the trust service.
///
/// `custom` is the target's opaque custom field, exactly as stored by the
/// trust service. Its content is not signed per-field and must be validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetRecord {
    /// Target name (the application name).
    pub name: String,

    /// Raw custom payload.
    pub custom: Vec<u8>,
}

/// One row of the application catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Application name.
    #[serde(rename = "Name")]
    pub name: String,

    /// Icon URL from the application's descriptor.
    #[serde(rename = "URL")]
    pub icon_url: String,
}

/// Whether the declared icon size bounds the download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizePolicy {
    /// Reject content larger than the declared size.
    #[default]
    Enforce,

    /// Read the whole body regardless of the declared size.
    Disabled,
}

impl SizePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enforce" | "1" | "true" => Some(Self::Enforce),
            "disabled" | "0" | "false" => Some(Self::Disabled),
            _ => None,
        }
    }

    pub fn is_enforced(self) -> bool {
        matches!(self, Self::Enforce)
    }
}

/// Client configuration.
///
/// Passed explicitly into every network component; nothing is configured
/// process-wide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the trust service.
    #[serde(default = "default_trust_server")]
    pub trust_server: String,

    /// Image repository (the trust collection) holding all apps.
    #[serde(default = "default_image_repository")]
    pub image_repository: String,

    /// Timeout in seconds for trust lookups and icon downloads.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries for transient trust-service failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Icon download size policy.
    #[serde(default)]
    pub size_policy: SizePolicy,

    /// Pull the container image before resolving the descriptor.
    #[serde(default = "default_pull_image")]
    pub pull_image: bool,

    /// Home directory override.
    #[serde(default)]
    pub home_dir: Option<PathBuf>,
}

fn default_trust_server() -> String {
    "https://notary.docker.io".to_string()
}

fn default_image_repository() -> String {
    "docker.io/conman/apps".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_pull_image() -> bool {
    cfg!(target_os = "linux")
}

fn env_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            trust_server: default_trust_server(),
            image_repository: default_image_repository(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            size_policy: SizePolicy::default(),
            pull_image: default_pull_image(),
            home_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `CONMAN_TRUST_SERVER` | Trust service base URL |
    /// | `CONMAN_IMAGE_REPOSITORY` | Image repository holding the apps |
    /// | `CONMAN_TIMEOUT` | Network timeout in seconds |
    /// | `CONMAN_MAX_RETRIES` | Retries for transient trust-service failures |
    /// | `CONMAN_ICON_SIZE_POLICY` | `enforce` or `disabled` |
    /// | `CONMAN_PULL_IMAGE` | Pull the app image first (`1`/`0`) |
    /// | `CONMAN_HOME` | Home directory override |
    pub fn from_env() -> Self {
        Self {
            trust_server: std::env::var("CONMAN_TRUST_SERVER")
                .unwrap_or_else(|_| default_trust_server()),
            image_repository: std::env::var("CONMAN_IMAGE_REPOSITORY")
                .unwrap_or_else(|_| default_image_repository()),
            timeout_secs: std::env::var("CONMAN_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout),
            max_retries: std::env::var("CONMAN_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_retries),
            size_policy: std::env::var("CONMAN_ICON_SIZE_POLICY")
                .ok()
                .and_then(|v| SizePolicy::parse(&v))
                .unwrap_or_default(),
            pull_image: std::env::var("CONMAN_PULL_IMAGE")
                .map(|v| env_flag(&v))
                .unwrap_or_else(|_| default_pull_image()),
            home_dir: std::env::var_os("CONMAN_HOME").map(PathBuf::from),
        }
    }

    /// Set the trust service URL.
    pub fn with_trust_server(mut self, url: impl Into<String>) -> Self {
        self.trust_server = url.into();
        self
    }

    /// Set the home directory.
    pub fn with_home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    /// Set the icon size policy.
    pub fn with_size_policy(mut self, policy: SizePolicy) -> Self {
        self.size_policy = policy;
        self
    }

    /// Enable or disable the image pull.
    pub fn with_pull_image(mut self, pull: bool) -> Self {
        self.pull_image = pull;
        self
    }

    /// Home directory, from the override or the platform.
    pub fn resolve_home(&self) -> RegistryResult<PathBuf> {
        match &self.home_dir {
            Some(home) => Ok(home.clone()),
            None => dirs::home_dir().ok_or_else(|| RegistryError::Config {
                message: "unable to figure out your home directory".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        std::env::remove_var("CONMAN_TRUST_SERVER");
        std::env::remove_var("CONMAN_ICON_SIZE_POLICY");
        std::env::remove_var("CONMAN_HOME");

        let config = RegistryConfig::from_env();
        assert_eq!(config.trust_server, "https://notary.docker.io");
        assert_eq!(config.image_repository, "docker.io/conman/apps");
        assert_eq!(config.size_policy, SizePolicy::Enforce);
        assert!(config.home_dir.is_none());
    }

    #[test]
    #[serial]
    fn test_config_from_env_overrides() {
        std::env::set_var("CONMAN_ICON_SIZE_POLICY", "disabled");
        std::env::set_var("CONMAN_HOME", "/tmp/conman-home");

        let config = RegistryConfig::from_env();
        assert_eq!(config.size_policy, SizePolicy::Disabled);
        assert_eq!(config.home_dir, Some(PathBuf::from("/tmp/conman-home")));

        std::env::remove_var("CONMAN_ICON_SIZE_POLICY");
        std::env::remove_var("CONMAN_HOME");
    }

    #[test]
    fn test_config_builder() {
        let config = RegistryConfig::default()
            .with_trust_server("https://notary.example.com")
            .with_size_policy(SizePolicy::Disabled)
            .with_pull_image(false)
            .with_home_dir("/home/test");

        assert_eq!(config.trust_server, "https://notary.example.com");
        assert!(!config.size_policy.is_enforced());
        assert!(!config.pull_image);
        assert_eq!(config.resolve_home().unwrap(), PathBuf::from("/home/test"));
    }

    #[test]
    fn test_size_policy_parse() {
        assert_eq!(SizePolicy::parse("Enforce"), Some(SizePolicy::Enforce));
        assert_eq!(SizePolicy::parse("0"), Some(SizePolicy::Disabled));
        assert_eq!(SizePolicy::parse("sometimes"), None);
    }
}
