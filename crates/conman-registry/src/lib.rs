//! Trust-verified application installs for ConMan.
//!
//! This crate resolves an application name against the image repository's
//! trust metadata and installs it as a desktop launcher, providing:
//!
//! - Trust service lookup with retry
//! - Custom payload unwrapping
//! - Descriptor and desktop entry validation
//! - Size-bounded, checksum-verified icon downloads
//! - Desktop entry and application bundle installers
//!
//! # Quick Start
//!
//! ```no_run
//! use conman_registry::{AppResolver, RegistryConfig};
//!
//! # async fn example() -> conman_registry::RegistryResult<()> {
//! let resolver = AppResolver::new(RegistryConfig::from_env())?;
//!
//! let report = resolver.install("conman://spotify").await?;
//! for file in &report.files {
//!     println!("{}", file.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `CONMAN_TRUST_SERVER` | Trust service URL (default: `https://notary.docker.io`) |
//! | `CONMAN_IMAGE_REPOSITORY` | Image repository holding the apps (default: `docker.io/conman/apps`) |
//! | `CONMAN_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `CONMAN_MAX_RETRIES` | Max retries for transient trust-service failures (default: 3) |
//! | `CONMAN_ICON_SIZE_POLICY` | `enforce` (default) or `disabled` |
//! | `CONMAN_PULL_IMAGE` | Pull the app image before installing (default: on Linux) |
//! | `CONMAN_HOME` | Install under this directory instead of `$HOME` |

pub mod checksum;
pub mod custom;
pub mod descriptor;
pub mod desktop_entry;
pub mod download;
pub mod error;
pub mod icon;
pub mod image;
pub mod install;
pub mod reference;
pub mod resolver;
pub mod trust;
pub mod types;

/// User-Agent sent on every request.
pub const USER_AGENT_VALUE: &str = concat!("conman-registry/", env!("CARGO_PKG_VERSION"));

// Re-export main types
pub use checksum::{verify_hashes, HashAlgorithm, Hashes};
pub use custom::{unwrap_custom, wrap_custom, ENCODING_LAYERS};
pub use descriptor::{bundle_name, parse_descriptor, AppDescriptor, DescriptorFormat, Launch};
pub use desktop_entry::{DesktopEntry, Section, DESKTOP_ENTRY_SECTION};
pub use download::Downloader;
pub use error::{ErrorStage, RegistryError, RegistryResult};
pub use icon::{IconDescriptor, IconMeta, IconType};
pub use image::{DockerPuller, ImagePuller, NoPull};
pub use install::{
    BundleInstaller, DesktopInstaller, IconConverter, InstallReport, Installer, Platform,
    SipsIconutil,
};
pub use reference::{AppRef, URI_SCHEME};
pub use resolver::AppResolver;
pub use trust::{TargetLookup, TrustClient};
pub use types::{CatalogEntry, RegistryConfig, SizePolicy, TargetRecord};
