//! Unwrapping of the trust service's custom payload.
//!
//! The custom field of a target is a quoted base64 string whose decoded
//! content is itself a quoted base64 string of the descriptor JSON:
//!
//! ```text
//! "BASE64( "BASE64(json)" )"
//! ```
//!
//! Each layer may additionally carry NUL padding. The nesting depth is a
//! fixed protocol detail.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::de::IgnoredAny;

use crate::error::{RegistryError, RegistryResult};

/// Number of quote+base64 layers around the descriptor JSON.
pub const ENCODING_LAYERS: usize = 2;

/// Recover the raw descriptor JSON from a target's custom payload.
///
/// Fails on any base64 error. A payload whose first layer already decodes to
/// JSON was produced by a single-layer publisher and is rejected rather than
/// decoded into garbage.
pub fn unwrap_custom(custom: &[u8]) -> RegistryResult<Vec<u8>> {
    let mut current = custom.to_vec();

    for layer in 1..=ENCODING_LAYERS {
        let unquoted = trim_layer(&current);
        if layer > 1 && looks_like_json_container(unquoted) {
            return Err(RegistryError::UnsupportedEncoding {
                reason: format!(
                    "payload has {} encoding layer(s), expected {}",
                    layer - 1,
                    ENCODING_LAYERS
                ),
            });
        }

        current = BASE64
            .decode(unquoted)
            .map_err(|e| RegistryError::Decode {
                layer,
                reason: e.to_string(),
            })?;
    }

    let raw = trim_matches(&current, b'\0');
    if let Err(e) = serde_json::from_slice::<IgnoredAny>(raw) {
        return Err(RegistryError::UnsupportedEncoding {
            reason: format!("decoded payload is not JSON: {}", e),
        });
    }

    Ok(raw.to_vec())
}

/// Apply the publisher-side encoding: the inverse of [`unwrap_custom`].
pub fn wrap_custom(descriptor_json: &[u8]) -> Vec<u8> {
    let mut current = descriptor_json.to_vec();
    for _ in 0..ENCODING_LAYERS {
        current = format!("\"{}\"", BASE64.encode(&current)).into_bytes();
    }
    current
}

fn trim_layer(bytes: &[u8]) -> &[u8] {
    trim_matches(trim_matches(bytes, b'\0'), b'"')
}

fn trim_matches(bytes: &[u8], byte: u8) -> &[u8] {
    let start = bytes.iter().position(|b| *b != byte).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| *b != byte).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Base64 text never starts with `{` or `[`.
fn looks_like_json_container(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| matches!(b, b'{' | b'['))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const DESCRIPTOR: &str = r#"{"desktop":"[Desktop Entry]\nName=Spotify","icon":{}}"#;

    #[test]
    fn test_unwrap_two_layers() {
        let wrapped = wrap_custom(DESCRIPTOR.as_bytes());
        assert_eq!(unwrap_custom(&wrapped).unwrap(), DESCRIPTOR.as_bytes());
    }

    #[test]
    fn test_unwrap_ignores_nul_padding() {
        let inner = format!("\"{}\"\0\0", BASE64.encode(DESCRIPTOR));
        let outer = format!("\0\"{}\"\0\0\0", BASE64.encode(inner));
        assert_eq!(
            unwrap_custom(outer.as_bytes()).unwrap(),
            DESCRIPTOR.as_bytes()
        );
    }

    #[test]
    fn test_unwrap_rejects_bad_base64_outer() {
        let err = unwrap_custom(b"\"not base64!\"").unwrap_err();
        assert!(matches!(err, RegistryError::Decode { layer: 1, .. }));
    }

    #[test]
    fn test_unwrap_rejects_bad_base64_inner() {
        let outer = format!("\"{}\"", BASE64.encode("\"%%%\""));
        let err = unwrap_custom(outer.as_bytes()).unwrap_err();
        assert!(matches!(err, RegistryError::Decode { layer: 2, .. }));
    }

    #[test]
    fn test_unwrap_rejects_single_layer() {
        let single = format!("\"{}\"", BASE64.encode(DESCRIPTOR));
        let err = unwrap_custom(single.as_bytes()).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedEncoding { .. }));
    }

    #[test]
    fn test_unwrap_three_layers_stops_at_two() {
        let triple = format!(
            "\"{}\"",
            BASE64.encode(wrap_custom(DESCRIPTOR.as_bytes()))
        );
        let innermost = format!("\"{}\"", BASE64.encode(DESCRIPTOR));
        assert_eq!(unwrap_custom(triple.as_bytes()).unwrap(), innermost.as_bytes());
    }

    #[test]
    fn test_trim_matches_all_same() {
        assert_eq!(trim_matches(b"\"\"\"", b'"'), b"");
        assert_eq!(trim_matches(b"", b'"'), b"");
        assert_eq!(trim_matches(b"\"a\"", b'"'), b"a");
    }

    #[test]
    fn test_unwrap_non_object_documents() {
        for doc in [&b"[1,2,3]"[..], b"\"spotify\"", b"42", b"null", b"\"\""] {
            assert_eq!(unwrap_custom(&wrap_custom(doc)).unwrap(), doc);
        }
    }

    #[test]
    fn test_unwrap_rejects_non_json() {
        let wrapped = wrap_custom(b"not json at all");
        let err = unwrap_custom(&wrapped).unwrap_err();
        assert!(matches!(err, RegistryError::UnsupportedEncoding { .. }));
    }

    fn json_document() -> impl Strategy<Value = serde_json::Value> {
        let leaf = prop_oneof![
            Just(serde_json::Value::Null),
            any::<bool>().prop_map(serde_json::Value::from),
            any::<i64>().prop_map(serde_json::Value::from),
            ".{0,16}".prop_map(serde_json::Value::from),
        ];
        leaf.prop_recursive(3, 32, 6, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..6).prop_map(serde_json::Value::Array),
                proptest::collection::btree_map("[a-z]{1,8}", inner, 0..6)
                    .prop_map(|m| serde_json::Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_wrap_unwrap_roundtrip(value in json_document()) {
            let doc = serde_json::to_vec(&value).unwrap();
            let wrapped = wrap_custom(&doc);
            prop_assert_eq!(unwrap_custom(&wrapped).unwrap(), doc);
        }
    }
}
