//! Application descriptor parsing and validation.
//!
//! The descriptor JSON comes in one of two shapes depending on the target
//! platform:
//!
//! ```text
//! desktop entry: {"desktop": "<ini>", "mimetypes": [...], "icon": {...}}
//! bundle:        {"script": "...", "cmd": "...", "mimetypes": [...], "icon": {...}}
//! ```
//!
//! Parsing is pure: no network or filesystem access happens here.

use serde::Deserialize;
use tracing::debug;

use crate::desktop_entry::{DesktopEntry, DESKTOP_ENTRY_SECTION};
use crate::error::{RegistryError, RegistryResult};
use crate::icon::{IconDescriptor, IconMeta};
use crate::types::SizePolicy;

/// Descriptor shape expected for the target platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    /// Structured desktop entry block with an embedded name.
    DesktopEntry,

    /// Launch script or command for an application bundle.
    Bundle,
}

/// How the installed application is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    /// Desktop entry written verbatim.
    Desktop(DesktopEntry),

    /// Literal launch script.
    Script(String),

    /// Command wrapped in a generated launch script.
    Command(String),

    /// No script or command published; run the app image directly.
    Image,
}

/// A validated application descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppDescriptor {
    app_name: String,
    launch: Launch,
    icon: IconDescriptor,
    mime_types: Vec<String>,
}

impl AppDescriptor {
    /// Name the descriptor was requested under.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn launch(&self) -> &Launch {
        &self.launch
    }

    pub fn icon(&self) -> &IconDescriptor {
        &self.icon
    }

    pub fn mime_types(&self) -> &[String] {
        &self.mime_types
    }

    /// Display name for the bundle: first letter capitalized.
    pub fn bundle_name(&self) -> String {
        bundle_name(&self.app_name)
    }
}

#[derive(Debug, Deserialize)]
struct DesktopShape {
    desktop: String,
    #[serde(default)]
    mimetypes: Vec<String>,
    icon: IconMeta,
}

#[derive(Debug, Deserialize)]
struct BundleShape {
    #[serde(default)]
    script: Option<String>,
    #[serde(default)]
    cmd: Option<String>,
    #[serde(default)]
    mimetypes: Vec<String>,
    icon: IconMeta,
}

/// Parse and validate raw descriptor JSON requested as `expected_name`.
///
/// # Validation
///
/// - Desktop entries need a `[Desktop Entry]` section. Its `Name`, when
///   present, must equal `expected_name` ignoring case. Its `Icon` becomes
///   the icon filename and must not be empty.
/// - Bundles carry no embedded name; the icon filename is the app name.
/// - The icon must pass [`IconDescriptor::from_meta`].
pub fn parse_descriptor(
    raw: &[u8],
    expected_name: &str,
    format: DescriptorFormat,
    size_policy: SizePolicy,
) -> RegistryResult<AppDescriptor> {
    match format {
        DescriptorFormat::DesktopEntry => parse_desktop(raw, expected_name, size_policy),
        DescriptorFormat::Bundle => parse_bundle(raw, expected_name, size_policy),
    }
}

fn parse_desktop(
    raw: &[u8],
    expected_name: &str,
    size_policy: SizePolicy,
) -> RegistryResult<AppDescriptor> {
    let shape: DesktopShape = from_json(raw)?;
    let entry = DesktopEntry::parse(&shape.desktop)?;

    let section =
        entry
            .section(DESKTOP_ENTRY_SECTION)
            .ok_or_else(|| RegistryError::MissingSection {
                section: DESKTOP_ENTRY_SECTION.to_string(),
            })?;

    if let Some(name) = section.get("Name") {
        if name.to_lowercase() != expected_name.to_lowercase() {
            return Err(RegistryError::NameMismatch {
                expected: expected_name.to_string(),
                actual: name.to_string(),
            });
        }
    }

    let icon_name = section.get("Icon").unwrap_or_default();
    if icon_name.trim().is_empty() {
        return Err(RegistryError::EmptyIconName);
    }
    let icon = IconDescriptor::from_meta(shape.icon, size_policy)?.with_filename(icon_name)?;

    debug!(app = expected_name, icon = %icon.url(), "parsed desktop entry descriptor");

    Ok(AppDescriptor {
        app_name: expected_name.to_string(),
        launch: Launch::Desktop(entry),
        icon,
        mime_types: shape.mimetypes,
    })
}

fn parse_bundle(
    raw: &[u8],
    expected_name: &str,
    size_policy: SizePolicy,
) -> RegistryResult<AppDescriptor> {
    let shape: BundleShape = from_json(raw)?;

    let icon = IconDescriptor::from_meta(shape.icon, size_policy)?.with_filename(expected_name)?;

    let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
    let launch = match (non_empty(shape.script), non_empty(shape.cmd)) {
        (Some(script), _) => Launch::Script(script),
        (None, Some(cmd)) => Launch::Command(cmd),
        (None, None) => Launch::Image,
    };

    debug!(app = expected_name, icon = %icon.url(), "parsed bundle descriptor");

    Ok(AppDescriptor {
        app_name: expected_name.to_string(),
        launch,
        icon,
        mime_types: shape.mimetypes,
    })
}

fn from_json<'a, T: Deserialize<'a>>(raw: &'a [u8]) -> RegistryResult<T> {
    serde_json::from_slice(raw).map_err(|e| RegistryError::InvalidDescriptor {
        message: e.to_string(),
    })
}

/// Bundle directory name: the app name with its first letter capitalized.
///
/// App names are single words, since [`crate::AppRef::parse`] rejects
/// whitespace.
pub fn bundle_name(app_name: &str) -> String {
    let mut chars = app_name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
