//! Icon conversion through external image tools.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};

/// Icon-set pixel sizes; each is rendered at 1x and 2x density.
pub const ICON_SIZES: [u32; 6] = [16, 32, 64, 128, 256, 512];

/// Resizes images and packages icon-sets.
///
/// Implementations are blocking; installers run them off the async runtime.
pub trait IconConverter: Send + Sync {
    /// Render `source` as a `pixels` x `pixels` PNG at `output`.
    fn resize(&self, source: &Path, pixels: u32, output: &Path) -> RegistryResult<()>;

    /// Package an `.iconset` directory into an icon container at `output`.
    fn package(&self, iconset: &Path, output: &Path) -> RegistryResult<()>;
}

/// `sips` + `iconutil`, both shipped with macOS.
#[derive(Debug, Clone, Copy, Default)]
pub struct SipsIconutil;

impl IconConverter for SipsIconutil {
    fn resize(&self, source: &Path, pixels: u32, output: &Path) -> RegistryResult<()> {
        let pixels = pixels.to_string();
        let mut cmd = Command::new(locate("sips")?);
        cmd.args(["-s", "format", "png", "-z", &pixels, &pixels, "--out"])
            .arg(output)
            .arg(source);
        run("sips", cmd)
    }

    fn package(&self, iconset: &Path, output: &Path) -> RegistryResult<()> {
        let mut cmd = Command::new(locate("iconutil")?);
        cmd.args(["-c", "icns", "-o"]).arg(output).arg(iconset);
        run("iconutil", cmd)
    }
}

fn locate(tool: &str) -> RegistryResult<PathBuf> {
    which::which(tool).map_err(|_| RegistryError::MissingTool {
        tool: tool.to_string(),
    })
}

fn run(tool: &str, mut cmd: Command) -> RegistryResult<()> {
    debug!(tool, command = ?cmd, "running icon tool");

    let output = cmd.output().map_err(|e| RegistryError::ToolFailed {
        tool: tool.to_string(),
        status: "not started".to_string(),
        output: e.to_string(),
    })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(RegistryError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            output: combined.trim().to_string(),
        });
    }

    Ok(())
}

/// File names of one icon-set entry: `icon_NxN.<ext>` or `icon_NxN@2x.<ext>`.
pub(crate) fn iconset_entry(size: u32, scale: u32, extension: &str) -> String {
    if scale == 1 {
        format!("icon_{size}x{size}.{extension}")
    } else {
        format!("icon_{size}x{size}@{scale}x.{extension}")
    }
}

/// Resize `source` into every icon-set entry under `iconset`.
pub(crate) fn build_iconset(
    converter: &dyn IconConverter,
    source: &Path,
    iconset: &Path,
    extension: &str,
) -> RegistryResult<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(ICON_SIZES.len() * 2);

    for size in ICON_SIZES {
        for scale in [1, 2] {
            let output = iconset.join(iconset_entry(size, scale, extension));
            converter.resize(source, size * scale, &output)?;
            written.push(output);
        }
    }

    Ok(written)
}
