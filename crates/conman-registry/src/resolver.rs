//! Application resolution and installation.
//!
//! The pipeline runs strictly in order:
//! 1. Image pull (if enabled)
//! 2. Trust lookup
//! 3. Custom payload unwrap
//! 4. Descriptor parse and validation
//! 5. Icon download and verification
//! 6. Installation
//!
//! Nothing touches the filesystem before step 6, so every integrity failure
//! leaves the home directory untouched.

use std::path::PathBuf;

use tracing::{debug, info};

use crate::custom::unwrap_custom;
use crate::descriptor::{parse_descriptor, AppDescriptor, DescriptorFormat};
use crate::download::Downloader;
use crate::error::RegistryResult;
use crate::image::{DockerPuller, ImagePuller, NoPull};
use crate::install::{InstallReport, Installer, Platform};
use crate::reference::AppRef;
use crate::trust::{TargetLookup, TrustClient};
use crate::types::{CatalogEntry, RegistryConfig};

/// Resolves application references and installs them.
pub struct AppResolver {
    /// Verified target lookup.
    lookup: Box<dyn TargetLookup>,

    /// Icon downloader.
    downloader: Downloader,

    /// Platform installer.
    installer: Box<dyn Installer>,

    /// Image puller.
    puller: Box<dyn ImagePuller>,

    /// Configuration.
    config: RegistryConfig,
}

impl AppResolver {
    /// Create a resolver for the current platform.
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let lookup = TrustClient::new(&config)?;
        let downloader = Downloader::new(&config)?;
        let installer =
            Platform::current().installer(config.resolve_home()?, &config.image_repository)?;
        let puller: Box<dyn ImagePuller> = if config.pull_image {
            Box::new(DockerPuller)
        } else {
            Box::new(NoPull)
        };

        Ok(Self::with_components(
            Box::new(lookup),
            downloader,
            installer,
            puller,
            config,
        ))
    }

    /// Create a resolver for testing with custom components.
    pub fn with_components(
        lookup: Box<dyn TargetLookup>,
        downloader: Downloader,
        installer: Box<dyn Installer>,
        puller: Box<dyn ImagePuller>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            lookup,
            downloader,
            installer,
            puller,
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Descriptor shape the installer consumes.
    pub fn format(&self) -> DescriptorFormat {
        self.installer.format()
    }

    /// Resolve a reference to a validated descriptor.
    pub async fn resolve(&self, reference: &str) -> RegistryResult<AppDescriptor> {
        let app = AppRef::parse(reference)?;
        self.resolve_ref(&app).await
    }

    /// Resolve a parsed reference.
    pub async fn resolve_ref(&self, app: &AppRef) -> RegistryResult<AppDescriptor> {
        debug!(app = %app, "looking up target");
        let record = self.lookup.get_target_by_name(app.name()).await?;

        let raw = unwrap_custom(&record.custom)?;
        debug!(app = %app, bytes = raw.len(), "custom payload unwrapped");

        parse_descriptor(&raw, app.name(), self.format(), self.config.size_policy)
    }

    /// Pull, resolve, verify and install an application.
    pub async fn install(&self, reference: &str) -> RegistryResult<InstallReport> {
        let app = AppRef::parse(reference)?;

        self.puller
            .pull(&self.config.image_repository, app.name())
            .await?;

        let descriptor = self.resolve_ref(&app).await?;
        let icon = self.downloader.download(descriptor.icon()).await?;

        let mut files: Vec<PathBuf> = Vec::new();
        files.extend(self.installer.write_config(&descriptor).await?);
        files.extend(self.installer.write_icon(&descriptor, &icon).await?);
        files.extend(self.installer.finalize(&descriptor).await?);

        info!(app = %app, files = files.len(), "application installed");

        Ok(InstallReport {
            app_name: app.name().to_string(),
            files,
        })
    }

    /// Every published application with its icon URL.
    pub async fn catalog(&self) -> RegistryResult<Vec<CatalogEntry>> {
        let targets = self.lookup.list_targets().await?;
        let mut entries = Vec::with_capacity(targets.len());

        for target in targets {
            let raw = unwrap_custom(&target.custom)?;
            let descriptor =
                parse_descriptor(&raw, &target.name, self.format(), self.config.size_policy)?;

            entries.push(CatalogEntry {
                icon_url: descriptor.icon().url().to_string(),
                name: target.name,
            });
        }

        debug!(count = entries.len(), "catalog listed");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom::wrap_custom;
    use crate::error::RegistryError;
    use crate::install::DesktopInstaller;
    use crate::types::TargetRecord;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct StaticLookup(BTreeMap<String, Vec<u8>>);

    impl StaticLookup {
        fn with(name: &str, descriptor: serde_json::Value) -> Self {
            let mut targets = BTreeMap::new();
            targets.insert(name.to_string(), wrap_custom(descriptor.to_string().as_bytes()));
            Self(targets)
        }
    }

    #[async_trait]
    impl TargetLookup for StaticLookup {
        async fn get_target_by_name(&self, name: &str) -> RegistryResult<TargetRecord> {
            self.0
                .get(name)
                .map(|custom| TargetRecord {
                    name: name.to_string(),
                    custom: custom.clone(),
                })
                .ok_or_else(|| RegistryError::NotFound {
                    name: name.to_string(),
                })
        }

        async fn list_targets(&self) -> RegistryResult<Vec<TargetRecord>> {
            Ok(self
                .0
                .iter()
                .map(|(name, custom)| TargetRecord {
                    name: name.clone(),
                    custom: custom.clone(),
                })
                .collect())
        }
    }

    struct CountingPuller(Arc<AtomicUsize>);

    #[async_trait]
    impl ImagePuller for CountingPuller {
        async fn pull(&self, _repository: &str, _app: &str) -> RegistryResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingPuller;

    #[async_trait]
    impl ImagePuller for FailingPuller {
        async fn pull(&self, repository: &str, app: &str) -> RegistryResult<()> {
            Err(RegistryError::ImagePull {
                image: format!("{repository}:{app}"),
                message: "denied".into(),
            })
        }
    }

    fn spotify(url: &str) -> serde_json::Value {
        serde_json::json!({
            "desktop": "[Desktop Entry]\nName=Spotify\nIcon=spotify\nExec=spotify",
            "icon": {"url": url, "checksum": {"sha256": "AAAA"}, "size": 10}
        })
    }

    fn resolver(
        lookup: StaticLookup,
        home: &TempDir,
        puller: Box<dyn ImagePuller>,
    ) -> AppResolver {
        let config = RegistryConfig::default().with_home_dir(home.path());
        AppResolver::with_components(
            Box::new(lookup),
            Downloader::new(&config).unwrap(),
            Box::new(DesktopInstaller::new(home.path())),
            puller,
            config,
        )
    }

    #[tokio::test]
    async fn test_resolve_strips_scheme() {
        let home = TempDir::new().unwrap();
        let resolver = resolver(
            StaticLookup::with("spotify", spotify("https://example.com/spotify.png")),
            &home,
            Box::new(NoPull),
        );

        let descriptor = resolver.resolve("conman://spotify").await.unwrap();
        assert_eq!(descriptor.app_name(), "spotify");
        assert_eq!(descriptor.icon().local_filename(), "spotify.png");
    }

    #[tokio::test]
    async fn test_resolve_unknown_app() {
        let home = TempDir::new().unwrap();
        let resolver = resolver(
            StaticLookup::with("spotify", spotify("https://example.com/spotify.png")),
            &home,
            Box::new(NoPull),
        );

        let err = resolver.resolve("slack").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_install_pull_failure_aborts_before_lookup() {
        let home = TempDir::new().unwrap();
        let resolver = resolver(StaticLookup(BTreeMap::new()), &home, Box::new(FailingPuller));

        let err = resolver.install("spotify").await.unwrap_err();
        assert!(matches!(err, RegistryError::ImagePull { .. }));
        assert!(std::fs::read_dir(home.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_invalid_reference_skips_pull() {
        let home = TempDir::new().unwrap();
        let pulls = Arc::new(AtomicUsize::new(0));
        let resolver = resolver(
            StaticLookup(BTreeMap::new()),
            &home,
            Box::new(CountingPuller(pulls.clone())),
        );

        let err = resolver.install("conman://").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidReference { .. }));
        assert_eq!(pulls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_catalog() {
        let home = TempDir::new().unwrap();
        let resolver = resolver(
            StaticLookup::with("spotify", spotify("https://example.com/spotify.png")),
            &home,
            Box::new(NoPull),
        );

        let catalog = resolver.catalog().await.unwrap();
        assert_eq!(
            catalog,
            vec![CatalogEntry {
                name: "spotify".into(),
                icon_url: "https://example.com/spotify.png".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_catalog_aborts_on_bad_target() {
        let home = TempDir::new().unwrap();
        let mut lookup = StaticLookup::with("spotify", spotify("https://example.com/spotify.png"));
        lookup.0.insert("broken".into(), b"\"!!!\"".to_vec());
        let resolver = resolver(lookup, &home, Box::new(NoPull));

        let err = resolver.catalog().await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode { layer: 1, .. }));
    }
}
