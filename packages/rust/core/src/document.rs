//! YAML-or-JSON parsing of the two configuration documents.
//!
//! Parsing is two-staged: the raw bytes are decoded into a generic
//! [`serde_json::Value`], which is then converted into the typed document.
//! Finally the document's `schema` discriminator is checked.

use std::io::Read;

use compositor_shared::{CompositeError, DocumentKind, Result, SchemaDocument};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Parse a catalog or composite document from `reader`.
pub fn parse_document<T>(mut reader: impl Read) -> Result<T>
where
    T: DeserializeOwned + SchemaDocument,
{
    let kind = T::KIND;
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| decode_error(kind, format!("reading document: {e}")))?;

    let doc = decode_first(&bytes).map_err(|message| decode_error(kind, message))?;
    let parsed: T = serde_json::from_value(doc).map_err(|source| CompositeError::Unmarshal {
        document: kind,
        source,
    })?;

    let expected = kind.expected_schema();
    if parsed.schema() != expected {
        return Err(CompositeError::SchemaMismatch {
            document: kind,
            expected,
            found: parsed.schema().to_string(),
        });
    }

    debug!(document = %kind, "parsed configuration document");
    Ok(parsed)
}

fn decode_error(document: DocumentKind, message: String) -> CompositeError {
    CompositeError::Decode { document, message }
}

/// Decode the first document of a YAML or JSON stream.
///
/// Input starting with `{` is read as JSON, anything else as YAML.
fn decode_first(bytes: &[u8]) -> std::result::Result<Value, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("input is not UTF-8: {e}"))?;
    let trimmed = text.trim_start();

    let value = if trimmed.starts_with('{') {
        serde_json::Deserializer::from_str(trimmed)
            .into_iter::<Value>()
            .next()
            .transpose()
            .map_err(|e| format!("invalid JSON: {e}"))?
    } else {
        match serde_yaml::Deserializer::from_str(text).next() {
            Some(document) => {
                Some(Value::deserialize(document).map_err(|e| format!("invalid YAML: {e}"))?)
            }
            None => None,
        }
    };

    match value {
        Some(Value::Null) | None => Err("document is empty".into()),
        Some(value) => Ok(value),
    }
}
