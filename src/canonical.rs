//! Deterministic JSON canonicalization for signing.
//!
//! The signature in a [`SignedDocument`](crate::SignedDocument) covers a
//! SHA-256 digest of the canonical bytes, so the same logical content must
//! produce the same bytes in every process and every release. The rule is
//! fixed: object keys sorted bytewise ascending at every nesting level,
//! compact separators, serde_json's number formatting, no trailing
//! whitespace. Arrays keep their order (order is content).

use crate::errors::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Serialize `document` into its canonical JSON text.
pub fn to_canonical_json<T: Serialize>(document: &T) -> Result<String> {
    let value = serde_json::to_value(document)
        .map_err(|err| Error::Signing(format!("document is not serializable: {err}")))?;
    let sorted = sort_value(value);
    serde_json::to_string(&sorted)
        .map_err(|err| Error::Signing(format!("canonical serialization failed: {err}")))
}

fn sort_value(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map
                .into_iter()
                .map(|(key, value)| (key, sort_value(value)))
                .collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            // Rebuild in sorted order so the output is stable whether or
            // not serde_json's `preserve_order` feature is in the build.
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, value);
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_value).collect()),
        other => other,
    }
}
