//! Error types for descriptor resolution and installation.

use std::path::{Path, PathBuf};

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStage {
    Lookup,
    Decode,
    Validation,
    Integrity,
    Install,
}

impl std::fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lookup => write!(f, "lookup"),
            Self::Decode => write!(f, "decode"),
            Self::Validation => write!(f, "validation"),
            Self::Integrity => write!(f, "integrity"),
            Self::Install => write!(f, "install"),
        }
    }
}

/// Registry errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No target with this name in the trust repository.
    #[error("no such application: {name}")]
    NotFound { name: String },

    /// Trust service rejected the request or returned unusable metadata.
    #[error("trust service error: {message}")]
    TrustService { message: String },

    /// Custom payload could not be decoded.
    #[error("failed to decode custom payload (layer {layer}): {reason}")]
    Decode { layer: usize, reason: String },

    /// Custom payload uses an encoding this client does not understand.
    #[error("unsupported custom payload encoding: {reason}")]
    UnsupportedEncoding { reason: String },

    /// Invalid application reference.
    #[error("invalid application reference: {reference} - {reason}")]
    InvalidReference { reference: String, reason: String },

    /// Descriptor JSON does not have the expected shape.
    #[error("invalid descriptor: {message}")]
    InvalidDescriptor { message: String },

    /// Desktop entry block has a syntax error.
    #[error("malformed desktop entry at line {line}: {reason}")]
    MalformedConfig { line: usize, reason: String },

    /// Desktop entry block lacks a required section.
    #[error("desktop entry has no [{section}] section")]
    MissingSection { section: String },

    /// Embedded name differs from the requested name.
    #[error("invalid application name {actual} (expected {expected})")]
    NameMismatch { expected: String, actual: String },

    /// Icon filename resolved to an empty string.
    #[error("invalid icon name: icon filename is empty")]
    EmptyIconName,

    /// Icon carries no checksums.
    #[error("invalid icon checksum information: no checksums")]
    EmptyChecksums,

    /// Icon declares an unusable size.
    #[error("invalid icon size: {size}")]
    InvalidIconSize { size: u64 },

    /// Icon URL does not parse.
    #[error("invalid icon url {url}: {reason}")]
    InvalidIconUrl { url: String, reason: String },

    /// Icon URL extension is not in the allow-list.
    #[error("invalid icon type: {extension:?}")]
    DisallowedIconType { extension: String },

    /// Computed digest differs from the expected digest.
    #[error("checksum mismatch for {algorithm}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        algorithm: String,
        expected: String,
        actual: String,
    },

    /// Digest algorithm is not supported locally.
    #[error("unsupported checksum algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// Content is larger than its declared size.
    #[error("content too big: declared {declared} bytes, got {actual}")]
    Oversize { declared: u64, actual: u64 },

    /// Non-success HTTP status while downloading an artifact.
    #[error("could not download {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// Transport failure while downloading an artifact.
    #[error("could not download {url}: {message}")]
    Download { url: String, message: String },

    /// Filesystem write failed.
    #[error("failed to write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// External tool is not installed.
    #[error("missing external dependency: {tool} not found on PATH")]
    MissingTool { tool: String },

    /// External tool exited unsuccessfully.
    #[error("{tool} failed ({status}): {output}")]
    ToolFailed {
        tool: String,
        status: String,
        output: String,
    },

    /// Container image pull failed.
    #[error("failed to pull image {image}: {message}")]
    ImagePull { image: String, message: String },

    /// Network error.
    #[error("network error: {message}")]
    Network { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RegistryError {
    /// Stage of the pipeline that failed.
    pub fn stage(&self) -> ErrorStage {
        match self {
            Self::NotFound { .. } | Self::TrustService { .. } | Self::Network { .. } => {
                ErrorStage::Lookup
            }

            Self::Decode { .. } | Self::UnsupportedEncoding { .. } => ErrorStage::Decode,

            Self::InvalidReference { .. }
            | Self::InvalidDescriptor { .. }
            | Self::MalformedConfig { .. }
            | Self::MissingSection { .. }
            | Self::NameMismatch { .. }
            | Self::EmptyIconName
            | Self::EmptyChecksums
            | Self::InvalidIconSize { .. }
            | Self::InvalidIconUrl { .. }
            | Self::DisallowedIconType { .. }
            | Self::Config { .. } => ErrorStage::Validation,

            Self::ChecksumMismatch { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::Oversize { .. }
            | Self::HttpStatus { .. }
            | Self::Download { .. } => ErrorStage::Integrity,

            Self::Io { .. }
            | Self::MissingTool { .. }
            | Self::ToolFailed { .. }
            | Self::ImagePull { .. } => ErrorStage::Install,
        }
    }

    /// Exit code for CLI.
    ///
    /// Every pipeline failure is terminal and reported the same way.
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether the error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    pub(crate) fn io(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
        }
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
