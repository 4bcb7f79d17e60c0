use crate::error::RegistryError;
use crate::model::{Ecosystem, RegistryStatus};
use serde_json::Value;

/// Classifies one registry response.
///
/// A 404 means the package is gone in every ecosystem. Only npm exposes an
/// unpublish marker (`time.unpublished`), so RubyGems and PyPI responses
/// other than 404 are always treated as published.
pub fn classify(
    ecosystem: Ecosystem,
    package: &str,
    status: u16,
    body: &[u8],
) -> Result<RegistryStatus, RegistryError> {
    if status == 404 {
        return Ok(RegistryStatus::NotFound);
    }

    if ecosystem == Ecosystem::Npm && status == 200 {
        let metadata: Value =
            serde_json::from_slice(body).map_err(|source| RegistryError::MalformedBody {
                package: package.to_string(),
                source,
            })?;
        if has_unpublish_marker(&metadata) {
            return Ok(RegistryStatus::Unpublished);
        }
    }

    Ok(RegistryStatus::Published)
}

/// True when npm metadata carries a present, non-empty `time.unpublished`.
pub fn has_unpublish_marker(metadata: &Value) -> bool {
    match metadata.get("time").and_then(|time| time.get("unpublished")) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}
