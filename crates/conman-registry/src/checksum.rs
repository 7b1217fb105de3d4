//! Checksum verification for downloaded artifacts.
//!
//! This is the single integrity gate between bytes fetched from the network
//! and bytes written to disk.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{RegistryError, RegistryResult};

/// Digest algorithms supported locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Look up an algorithm by its trust-metadata name.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Some(Self::Sha256),
            "sha512" | "sha-512" => Some(Self::Sha512),
            _ => None,
        }
    }

    pub fn digest(self, bytes: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(bytes).to_vec(),
            Self::Sha512 => Sha512::digest(bytes).to_vec(),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Expected digests keyed by algorithm name.
///
/// Serialized as a JSON object of base64 strings, the encoding the trust
/// metadata uses for hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hashes(BTreeMap<String, Vec<u8>>);

impl Hashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expected digest.
    pub fn with(mut self, algorithm: impl Into<String>, digest: impl Into<Vec<u8>>) -> Self {
        self.0.insert(algorithm.into(), digest.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl Serialize for Hashes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded: BTreeMap<&str, String> = self
            .0
            .iter()
            .map(|(alg, digest)| (alg.as_str(), BASE64.encode(digest)))
            .collect();
        encoded.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Hashes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = BTreeMap::<String, String>::deserialize(deserializer)?;
        encoded
            .into_iter()
            .map(|(alg, b64)| {
                BASE64
                    .decode(b64.as_bytes())
                    .map(|digest| (alg.clone(), digest))
                    .map_err(|e| D::Error::custom(format!("invalid {} digest: {}", alg, e)))
            })
            .collect::<Result<_, _>>()
            .map(Hashes)
    }
}

/// Verify `bytes` against every expected digest.
///
/// An empty set of digests never verifies. Unknown algorithms fail rather
/// than being skipped.
pub fn verify_hashes(bytes: &[u8], hashes: &Hashes) -> RegistryResult<()> {
    if hashes.is_empty() {
        return Err(RegistryError::EmptyChecksums);
    }

    for (name, expected) in hashes.iter() {
        let algorithm =
            HashAlgorithm::parse(name).ok_or_else(|| RegistryError::UnsupportedAlgorithm {
                algorithm: name.to_string(),
            })?;

        let actual = algorithm.digest(bytes);
        if actual.as_slice() != expected {
            return Err(RegistryError::ChecksumMismatch {
                algorithm: algorithm.to_string(),
                expected: hex::encode(expected),
                actual: hex::encode(&actual),
            });
        }
    }

    Ok(())
}
