//! Desktop-entry installer (freedesktop launchers).

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::{create_dir_all, write_atomic, Installer};
use crate::descriptor::{AppDescriptor, DescriptorFormat, Launch};
use crate::error::{RegistryError, RegistryResult};

/// `*.desktop` files, relative to home.
pub const APPLICATIONS_DIR: &str = ".local/share/applications";

/// Icon files, relative to home.
pub const ICONS_DIR: &str = ".local/share/icons";

/// Installs a desktop entry and its icon under the user's home.
#[derive(Debug, Clone)]
pub struct DesktopInstaller {
    home: PathBuf,
}

impl DesktopInstaller {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn entry_path(&self, app: &AppDescriptor) -> PathBuf {
        self.home
            .join(APPLICATIONS_DIR)
            .join(format!("{}.desktop", app.app_name()))
    }

    pub fn icon_path(&self, app: &AppDescriptor) -> PathBuf {
        self.home
            .join(ICONS_DIR)
            .join(app.icon().local_filename())
    }
}

#[async_trait]
impl Installer for DesktopInstaller {
    fn format(&self) -> DescriptorFormat {
        DescriptorFormat::DesktopEntry
    }

    async fn write_config(&self, app: &AppDescriptor) -> RegistryResult<Vec<PathBuf>> {
        let Launch::Desktop(entry) = app.launch() else {
            return Err(RegistryError::InvalidDescriptor {
                message: format!("{} has no desktop entry", app.app_name()),
            });
        };

        let path = self.entry_path(app);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        write_atomic(&path, entry.to_string().as_bytes()).await?;

        info!(path = %path.display(), "installed desktop entry");
        Ok(vec![path])
    }

    async fn write_icon(&self, app: &AppDescriptor, icon: &[u8]) -> RegistryResult<Vec<PathBuf>> {
        let path = self.icon_path(app);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        write_atomic(&path, icon).await?;

        info!(path = %path.display(), bytes = icon.len(), "installed icon");
        Ok(vec![path])
    }

    async fn finalize(&self, _app: &AppDescriptor) -> RegistryResult<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::parse_descriptor;
    use crate::types::SizePolicy;
    use tempfile::TempDir;

    fn spotify() -> AppDescriptor {
        let raw = serde_json::json!({
            "desktop": "[Desktop Entry]\nName=Spotify\nIcon=spotify\nExec=docker run spotify",
            "icon": {"url": "https://example.com/spotify.svg", "checksum": {"sha256": "AAAA"}, "size": 3}
        })
        .to_string();
        parse_descriptor(
            raw.as_bytes(),
            "spotify",
            DescriptorFormat::DesktopEntry,
            SizePolicy::Enforce,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_install_desktop_entry_and_icon() {
        let home = TempDir::new().unwrap();
        let installer = DesktopInstaller::new(home.path());
        let app = spotify();

        let config = installer.write_config(&app).await.unwrap();
        let icon = installer.write_icon(&app, b"<svg/>").await.unwrap();
        let rest = installer.finalize(&app).await.unwrap();

        let entry_path = home.path().join(".local/share/applications/spotify.desktop");
        let icon_path = home.path().join(".local/share/icons/spotify.svg");
        assert_eq!(config, vec![entry_path.clone()]);
        assert_eq!(icon, vec![icon_path.clone()]);
        assert!(rest.is_empty());

        let written = std::fs::read_to_string(entry_path).unwrap();
        assert!(written.starts_with("[Desktop Entry]\n"));
        assert!(written.contains("Name=Spotify"));
        assert!(written.contains("Exec=docker run spotify"));
        assert_eq!(std::fs::read(icon_path).unwrap(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_rejects_bundle_descriptor() {
        let home = TempDir::new().unwrap();
        let raw = serde_json::json!({
            "cmd": "gimp",
            "icon": {"url": "https://example.com/gimp.png", "checksum": {"sha256": "AAAA"}, "size": 3}
        })
        .to_string();
        let app = parse_descriptor(
            raw.as_bytes(),
            "gimp",
            DescriptorFormat::Bundle,
            SizePolicy::Enforce,
        )
        .unwrap();

        let err = DesktopInstaller::new(home.path())
            .write_config(&app)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidDescriptor { .. }));
        assert!(!home.path().join(APPLICATIONS_DIR).exists());
    }
}
