//! Platform installers.
//!
//! Both variants consume the same validated [`AppDescriptor`] and run the
//! same ordered steps: configuration, icon, finalize. There is no rollback;
//! a step that fails leaves whatever earlier steps wrote.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::descriptor::{AppDescriptor, DescriptorFormat};
use crate::error::{RegistryError, RegistryResult};

mod bundle;
mod convert;
mod desktop;

pub use bundle::{BundleInstaller, BUNDLE_ICON_FILE, BUNDLE_ROOT};
pub use convert::{IconConverter, SipsIconutil, ICON_SIZES};
pub use desktop::{DesktopInstaller, APPLICATIONS_DIR, ICONS_DIR};

/// Host platform, as far as installation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Unsupported,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Unsupported
        }
    }

    /// Descriptor shape published for this platform.
    pub fn descriptor_format(self) -> Option<DescriptorFormat> {
        match self {
            Self::Linux => Some(DescriptorFormat::DesktopEntry),
            Self::MacOs => Some(DescriptorFormat::Bundle),
            Self::Unsupported => None,
        }
    }

    /// Default installer for this platform, rooted at `home`.
    pub fn installer(
        self,
        home: PathBuf,
        image_repository: &str,
    ) -> RegistryResult<Box<dyn Installer>> {
        match self {
            Self::Linux => Ok(Box::new(DesktopInstaller::new(home))),
            Self::MacOs => Ok(Box::new(BundleInstaller::new(
                home,
                image_repository,
                std::sync::Arc::new(SipsIconutil),
            ))),
            Self::Unsupported => Err(RegistryError::Config {
                message: format!("unsupported platform: {}", std::env::consts::OS),
            }),
        }
    }
}

/// Writes an application to disk.
///
/// Each step returns the paths it wrote, in order.
#[async_trait]
pub trait Installer: Send + Sync {
    /// Descriptor shape this installer consumes.
    fn format(&self) -> DescriptorFormat;

    /// Write launch configuration (desktop entry or bundle metadata).
    async fn write_config(&self, app: &AppDescriptor) -> RegistryResult<Vec<PathBuf>>;

    /// Write the verified icon bytes.
    async fn write_icon(&self, app: &AppDescriptor, icon: &[u8]) -> RegistryResult<Vec<PathBuf>>;

    /// Remaining platform steps (launch script, permissions).
    async fn finalize(&self, app: &AppDescriptor) -> RegistryResult<Vec<PathBuf>>;
}

/// What an install wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub app_name: String,
    pub files: Vec<PathBuf>,
}

pub(crate) async fn create_dir_all(path: &Path) -> RegistryResult<()> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| RegistryError::io(path, e))
}

/// Write through a sibling temp file so a reader never sees half a file.
pub(crate) async fn write_atomic(path: &Path, content: &[u8]) -> RegistryResult<()> {
    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)
        .await
        .map_err(|e| RegistryError::io(&temp_path, e))?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| RegistryError::io(path, e))?;

    Ok(())
}
