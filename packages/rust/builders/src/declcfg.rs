//! Reading, writing, and checking streams of declarative config objects.
//!
//! A catalog file is a stream of JSON objects (concatenated) or YAML
//! documents (`---` separated). Every object carries a `schema` field.

use std::path::{Path, PathBuf};

use compositor_shared::{CompositeError, OutputType, Result};
use serde::Deserialize;
use serde_json::Value;

pub const PACKAGE_SCHEMA: &str = "olm.package";
pub const CHANNEL_SCHEMA: &str = "olm.channel";
pub const BUNDLE_SCHEMA: &str = "olm.bundle";

/// Decode a JSON or YAML stream into its objects. Empty documents are dropped.
pub fn decode_stream(bytes: &[u8]) -> std::result::Result<Vec<Value>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("input is not UTF-8: {e}"))?;
    let trimmed = text.trim_start();

    let mut objects = Vec::new();
    if trimmed.starts_with('{') {
        for value in serde_json::Deserializer::from_str(trimmed).into_iter::<Value>() {
            objects.push(value.map_err(|e| format!("invalid JSON: {e}"))?);
        }
    } else {
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = Value::deserialize(document).map_err(|e| format!("invalid YAML: {e}"))?;
            if !value.is_null() {
                objects.push(value);
            }
        }
    }
    Ok(objects)
}

/// Read every object from a catalog or template file.
pub fn read_objects(path: &Path) -> Result<Vec<Value>> {
    let bytes = std::fs::read(path).map_err(|e| CompositeError::io(path, e))?;
    decode_stream(&bytes)
        .map_err(|e| CompositeError::template(format!("{}: {e}", path.display())))
}

/// Write `objects` to `<dir>/<stem>.<ext>`, creating `dir` if needed.
pub fn write_objects(
    dir: &Path,
    stem: &str,
    output: OutputType,
    objects: &[Value],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| CompositeError::io(dir, e))?;
    let path = dir.join(format!("{stem}.{}", output.extension()));

    let mut content = String::new();
    match output {
        OutputType::Json => {
            for object in objects {
                let encoded = serde_json::to_string_pretty(object)
                    .map_err(|e| CompositeError::template(e.to_string()))?;
                content.push_str(&encoded);
                content.push('\n');
            }
        }
        OutputType::Yaml => {
            for object in objects {
                let encoded = serde_yaml::to_string(object)
                    .map_err(|e| CompositeError::template(e.to_string()))?;
                content.push_str("---\n");
                content.push_str(&encoded);
            }
        }
    }

    std::fs::write(&path, content).map_err(|e| CompositeError::io(&path, e))?;
    Ok(path)
}

/// Catalog files of the given format directly under `dir`, sorted.
pub fn output_files(dir: &Path, output: OutputType) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| CompositeError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CompositeError::io(dir, e))?.path();
        let matches = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => output == OutputType::Json,
            Some("yaml" | "yml") => output == OutputType::Yaml,
            _ => false,
        };
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Check structural rules every declarative config object must satisfy.
pub fn validate_objects(objects: &[Value]) -> std::result::Result<(), String> {
    for (i, object) in objects.iter().enumerate() {
        let Some(map) = object.as_object() else {
            return Err(format!("object {i} is not a mapping"));
        };
        let schema = non_empty_str(map.get("schema"))
            .ok_or_else(|| format!("object {i} has no schema"))?;

        match schema {
            PACKAGE_SCHEMA => {
                non_empty_str(map.get("name"))
                    .ok_or_else(|| format!("object {i} ({schema}) has no name"))?;
            }
            CHANNEL_SCHEMA | BUNDLE_SCHEMA => {
                non_empty_str(map.get("name"))
                    .ok_or_else(|| format!("object {i} ({schema}) has no name"))?;
                non_empty_str(map.get("package"))
                    .ok_or_else(|| format!("object {i} ({schema}) has no package"))?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Extract the `schema` of an object, if any.
pub fn schema_of(object: &Value) -> Option<&str> {
    non_empty_str(object.get("schema"))
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
