//! Application bundle installer.
//!
//! Layout, relative to home:
//!
//! ```text
//! Applications/<Bundle Name>.app/Contents/
//!   Info.plist
//!   MacOS/<app>
//!   Resources/Icon.icns
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::convert::{build_iconset, IconConverter};
use super::{create_dir_all, write_atomic, Installer};
use crate::descriptor::{AppDescriptor, DescriptorFormat, Launch};
use crate::error::{RegistryError, RegistryResult};

/// Bundles live here, relative to home.
pub const BUNDLE_ROOT: &str = "Applications";

/// Icon container inside `Contents/Resources`.
pub const BUNDLE_ICON_FILE: &str = "Icon.icns";

const MINIMUM_SYSTEM_VERSION: &str = "10.11.0";

/// Icon-set entries are always PNG; the icon container only accepts PNG.
const ICONSET_EXTENSION: &str = "png";

/// Installs an application bundle with a generated icon container.
pub struct BundleInstaller {
    home: PathBuf,
    image_repository: String,
    converter: Arc<dyn IconConverter>,
}

impl std::fmt::Debug for BundleInstaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleInstaller")
            .field("home", &self.home)
            .field("image_repository", &self.image_repository)
            .finish_non_exhaustive()
    }
}

impl BundleInstaller {
    pub fn new(
        home: impl Into<PathBuf>,
        image_repository: impl Into<String>,
        converter: Arc<dyn IconConverter>,
    ) -> Self {
        Self {
            home: home.into(),
            image_repository: image_repository.into(),
            converter,
        }
    }

    /// `Applications/<Bundle Name>.app/Contents` under home.
    pub fn contents_dir(&self, app: &AppDescriptor) -> PathBuf {
        self.home
            .join(BUNDLE_ROOT)
            .join(format!("{}.app", app.bundle_name()))
            .join("Contents")
    }

    /// Bundle metadata as an XML property list.
    pub fn info_plist(app: &AppDescriptor) -> RegistryResult<Vec<u8>> {
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleExecutable".into(), app.app_name().into());
        dict.insert("CFBundleIconFile".into(), BUNDLE_ICON_FILE.into());
        dict.insert("CFBundleName".into(), app.bundle_name().into());
        dict.insert("LSMinimumSystemVersion".into(), MINIMUM_SYSTEM_VERSION.into());
        dict.insert("CFBundleSignature".into(), "????".into());
        dict.insert("CFBundleTypeIconFile".into(), BUNDLE_ICON_FILE.into());
        dict.insert("CFBundlePackageType".into(), "APPL".into());
        dict.insert("CFBundleInfoDictionaryVersion".into(), "6.0".into());

        let mut data = Vec::new();
        plist::Value::Dictionary(dict)
            .to_writer_xml(&mut data)
            .map_err(|e| RegistryError::Io {
                path: PathBuf::from("Info.plist"),
                message: format!("failed to serialize property list: {}", e),
            })?;

        Ok(data)
    }

    /// Launch script contents for the descriptor.
    pub fn launch_script(&self, app: &AppDescriptor) -> String {
        let command = match app.launch() {
            Launch::Script(script) => return script.clone(),
            Launch::Command(cmd) => cmd.clone(),
            Launch::Image | Launch::Desktop(_) => format!(
                "docker run --rm -e DISPLAY {}:{}",
                self.image_repository,
                app.app_name()
            ),
        };

        format!(
            "#!/bin/bash\n\
             export DISPLAY=\"${{DISPLAY:-host.docker.internal:0}}\"\n\
             export DOCKER_CONTENT_TRUST=1\n\
             exec {}\n",
            command
        )
    }
}

#[async_trait]
impl Installer for BundleInstaller {
    fn format(&self) -> DescriptorFormat {
        DescriptorFormat::Bundle
    }

    async fn write_config(&self, app: &AppDescriptor) -> RegistryResult<Vec<PathBuf>> {
        let contents = self.contents_dir(app);
        create_dir_all(&contents).await?;

        let path = contents.join("Info.plist");
        write_atomic(&path, &Self::info_plist(app)?).await?;

        info!(path = %path.display(), "installed bundle metadata");
        Ok(vec![path])
    }

    async fn write_icon(&self, app: &AppDescriptor, icon: &[u8]) -> RegistryResult<Vec<PathBuf>> {
        let resources = self.contents_dir(app).join("Resources");
        create_dir_all(&resources).await?;

        let output = resources.join(BUNDLE_ICON_FILE);
        let converter = Arc::clone(&self.converter);
        let source_name = app.icon().local_filename();
        let iconset_name = format!("{}.iconset", app.icon().filename());
        let icon = icon.to_vec();
        let target = output.clone();

        tokio::task::spawn_blocking(move || {
            convert_icon(converter.as_ref(), &icon, &source_name, &iconset_name, &target)
        })
        .await
        .map_err(|e| RegistryError::ToolFailed {
            tool: "icon conversion".to_string(),
            status: "aborted".to_string(),
            output: e.to_string(),
        })??;

        info!(path = %output.display(), "installed bundle icon");
        Ok(vec![output])
    }

    async fn finalize(&self, app: &AppDescriptor) -> RegistryResult<Vec<PathBuf>> {
        let macos = self.contents_dir(app).join("MacOS");
        create_dir_all(&macos).await?;

        let path = macos.join(app.app_name());
        write_atomic(&path, self.launch_script(app).as_bytes()).await?;
        set_executable(&path).await?;

        info!(path = %path.display(), "installed launch script");
        Ok(vec![path])
    }
}

fn convert_icon(
    converter: &dyn IconConverter,
    icon: &[u8],
    source_name: &str,
    iconset_name: &str,
    output: &Path,
) -> RegistryResult<()> {
    let temp = tempfile::Builder::new()
        .prefix("conman-icons")
        .tempdir()
        .map_err(|e| RegistryError::io(std::env::temp_dir(), e))?;

    let source = temp.path().join(source_name);
    std::fs::write(&source, icon).map_err(|e| RegistryError::io(&source, e))?;

    let iconset = temp.path().join(iconset_name);
    std::fs::create_dir(&iconset).map_err(|e| RegistryError::io(&iconset, e))?;

    let entries = build_iconset(converter, &source, &iconset, ICONSET_EXTENSION)?;
    debug!(entries = entries.len(), iconset = %iconset.display(), "icon-set rendered");

    converter.package(&iconset, output)
}

#[cfg(unix)]
async fn set_executable(path: &Path) -> RegistryResult<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .await
        .map_err(|e| RegistryError::io(path, e))
}

#[cfg(not(unix))]
async fn set_executable(_path: &Path) -> RegistryResult<()> {
    Ok(())
}
