//! Application reference parsing.
//!
//! Accepted forms:
//! - `spotify` → app name
//! - `conman://spotify` → app name from a URI handler (scheme stripped)

use crate::error::{RegistryError, RegistryResult};

/// URI scheme registered for install links.
pub const URI_SCHEME: &str = "conman://";

/// A validated application name.
///
/// The name doubles as a path component and an image tag, so anything that
/// could escape a directory is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppRef {
    name: String,
}

impl AppRef {
    /// Parse an application reference.
    ///
    /// # Examples
    ///
    /// ```
    /// use conman_registry::AppRef;
    ///
    /// let app = AppRef::parse("conman://spotify").unwrap();
    /// assert_eq!(app.name(), "spotify");
    ///
    /// assert!(AppRef::parse("../etc").is_err());
    /// ```
    pub fn parse(reference: &str) -> RegistryResult<Self> {
        let trimmed = reference.trim();
        let name = trimmed.strip_prefix(URI_SCHEME).unwrap_or(trimmed);
        // URI handlers often append a trailing slash.
        let name = name.trim_end_matches('/');

        let invalid = |reason: &str| RegistryError::InvalidReference {
            reference: reference.to_string(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("empty application name"));
        }

        if name == "." || name == ".." {
            return Err(invalid("name must not be a relative path"));
        }

        if name.contains('/') || name.contains('\\') {
            return Err(invalid("name must not contain path separators"));
        }

        if name.chars().any(|c| c.is_control() || c.is_whitespace()) {
            return Err(invalid("name must not contain whitespace or control characters"));
        }

        Ok(Self {
            name: name.to_string(),
        })
    }

    /// The application name used for lookup.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for AppRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
