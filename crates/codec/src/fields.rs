//! Sensitive-field annotation and field-level encryption.
//!
//! A caller that does not hold the key marks the sensitive fields of a
//! payload with [`mark_fields_for_remote_encryption`]; the gateway then calls
//! [`encrypt_marked_fields`] to replace each marked field with an envelope.
//!
//! Field names are dot paths. Array fields use the `[]` suffix before the dot
//! separator, e.g. `"orders[].card_number"`.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::codec::EnvelopeCodec;
use crate::error::EncryptError;

/// Key under which the list of sensitive field paths travels.
pub const SENSITIVE_FIELDS_KEY: &str = "_encryptFields";

/// Annotate `payload` with the fields a downstream service must encrypt.
///
/// Performs no cryptography. Names are merged with any existing annotation,
/// de-duplicated and kept in first-seen order. A non-object payload cannot
/// carry the annotation and is returned unchanged.
pub fn mark_fields_for_remote_encryption(payload: &Value, field_names: &[&str]) -> Value {
    let Value::Object(map) = payload else {
        debug!("payload is not an object; not annotated");
        return payload.clone();
    };

    // A malformed existing annotation is replaced; the encrypting side
    // rejects it anyway.
    let mut names: Vec<String> = marked_fields(map).unwrap_or_default();
    for name in field_names {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push((*name).to_owned());
        }
    }

    let mut out = map.clone();
    out.insert(
        SENSITIVE_FIELDS_KEY.to_owned(),
        Value::Array(names.into_iter().map(Value::String).collect()),
    );
    Value::Object(out)
}

/// Replace every annotated field of `payload` with its wire envelope.
///
/// The annotation is removed. An object without an annotation is left as is.
/// Inside an array expansion, elements lacking the field are skipped. Returns
/// the number of values encrypted.
///
/// # Errors
///
/// - [`EncryptError::InvalidAnnotation`] if `payload` is not an object, the
///   annotation is not an array of non-empty strings, or a path names a field
///   the payload does not have.
/// - Otherwise the first [`EncryptError`] from the codec.
///
/// On error the payload may be partially transformed and must be discarded,
/// never forwarded.
pub fn encrypt_marked_fields(payload: &mut Value, codec: &EnvelopeCodec) -> Result<usize, EncryptError> {
    let Value::Object(map) = payload else {
        warn!("payload is not an object; cannot carry a field annotation");
        return Err(EncryptError::InvalidAnnotation);
    };
    let paths = marked_fields(map)?;
    map.remove(SENSITIVE_FIELDS_KEY);

    let mut count = 0;
    for path in &paths {
        let segments = parse_path(path);
        match encrypt_at_path(payload, &segments, codec)? {
            Some(n) => count += n,
            None => {
                warn!(path = %path, "annotated field not found in payload");
                return Err(EncryptError::InvalidAnnotation);
            }
        }
    }
    debug!(fields = count, "marked fields encrypted");
    Ok(count)
}

fn marked_fields(map: &Map<String, Value>) -> Result<Vec<String>, EncryptError> {
    let items = match map.get(SENSITIVE_FIELDS_KEY) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            warn!("field annotation is not an array");
            return Err(EncryptError::InvalidAnnotation);
        }
    };
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(name) if !name.is_empty() => Ok(name.to_owned()),
            _ => {
                warn!("field annotation holds a non-string or empty entry");
                Err(EncryptError::InvalidAnnotation)
            }
        })
        .collect()
}

/// Segments of a dot-notation field path.
#[derive(Debug, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            segments.push(PathSegment::Key(key.to_owned()));
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// Encrypt the value(s) at `segments`.
///
/// `None` means the path does not resolve. Array expansion always resolves,
/// counting only the elements that have the rest of the path.
fn encrypt_at_path(
    value: &mut Value,
    segments: &[PathSegment],
    codec: &EnvelopeCodec,
) -> Result<Option<usize>, EncryptError> {
    let Some((first, rest)) = segments.split_first() else {
        let envelope = codec.encrypt(&*value)?;
        *value = serde_json::to_value(envelope).map_err(|_| EncryptError::Serialization)?;
        return Ok(Some(1));
    };

    match (first, value) {
        (PathSegment::Key(key), Value::Object(map)) => match map.get_mut(key) {
            Some(child) => encrypt_at_path(child, rest, codec),
            None => Ok(None),
        },
        (PathSegment::ArrayItem, Value::Array(items)) => {
            let mut count = 0;
            for item in items.iter_mut() {
                count += encrypt_at_path(item, rest, codec)?.unwrap_or(0);
            }
            Ok(Some(count))
        }
        _ => Ok(None),
    }
}
