//! Icon descriptors.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::checksum::Hashes;
use crate::error::{RegistryError, RegistryResult};
use crate::types::SizePolicy;

/// Allowed icon formats, derived from the URL extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IconType {
    Png,
    Svg,
    Ico,
}

impl IconType {
    /// Every allowed type.
    pub const ALLOWED: [IconType; 3] = [IconType::Png, IconType::Svg, IconType::Ico];

    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALLOWED
            .into_iter()
            .find(|t| t.extension().eq_ignore_ascii_case(extension))
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Ico => "ico",
        }
    }
}

impl std::fmt::Display for IconType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Icon fields as published in the descriptor JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IconMeta {
    /// Download URL.
    pub url: String,

    /// Expected digests (base64 per algorithm).
    #[serde(default)]
    pub checksum: Hashes,

    /// Declared size in bytes.
    #[serde(default)]
    pub size: u64,
}

/// A validated remote icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconDescriptor {
    filename: String,
    url: Url,
    checksums: Hashes,
    declared_size: u64,
    icon_type: IconType,
}

impl IconDescriptor {
    /// Validate the published icon fields.
    ///
    /// The filename is not part of the published icon; it is assigned by the
    /// descriptor parser through [`IconDescriptor::with_filename`].
    pub fn from_meta(meta: IconMeta, size_policy: SizePolicy) -> RegistryResult<Self> {
        if meta.checksum.is_empty() {
            return Err(RegistryError::EmptyChecksums);
        }

        if size_policy.is_enforced() && meta.size == 0 {
            return Err(RegistryError::InvalidIconSize { size: meta.size });
        }

        let url = Url::parse(&meta.url).map_err(|e| RegistryError::InvalidIconUrl {
            url: meta.url.clone(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegistryError::InvalidIconUrl {
                url: meta.url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }

        let extension = Path::new(url.path())
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let icon_type = IconType::from_extension(&extension)
            .ok_or(RegistryError::DisallowedIconType { extension })?;

        Ok(Self {
            filename: String::new(),
            url,
            checksums: meta.checksum,
            declared_size: meta.size,
            icon_type,
        })
    }

    /// Assign the local filename (without extension).
    pub fn with_filename(mut self, filename: impl Into<String>) -> RegistryResult<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(RegistryError::EmptyIconName);
        }
        if filename.contains('/') || filename.contains('\\') || filename == ".." {
            return Err(RegistryError::InvalidDescriptor {
                message: format!("icon name must be a plain file name: {}", filename),
            });
        }
        self.filename = filename;
        Ok(self)
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Normalized download URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn checksums(&self) -> &Hashes {
        &self.checksums
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn icon_type(&self) -> IconType {
        self.icon_type
    }

    /// `<filename>.<type>`, the name the icon is stored under.
    pub fn local_filename(&self) -> String {
        format!("{}.{}", self.filename, self.icon_type)
    }
}
