//! YAML parsing of `.repoverlay.yaml` into validated configuration values.
use serde::Deserialize;
use serde_yaml::Value;

use super::{MappingMode, MappingSpec, OverlaySource};
use crate::error::ConfigError;

/// The only schema version this build understands.
pub const SUPPORTED_VERSION: u64 = 1;

#[derive(Debug, Deserialize)]
struct RawConfig {
    version: Option<Value>,
    overlay: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawOverlay {
    repo: Option<String>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    mappings: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    src: Option<String>,
    dst: Option<String>,
}

/// Parse and validate the text of a config file.
///
/// Unknown keys are tolerated. An absent, null, or empty `mappings` list
/// selects mirror-all mode.
///
/// # Errors
///
/// Returns [`ConfigError`] when the document is empty or malformed, when
/// `version` or `overlay.repo` is missing, or when `version` is not `1`.
pub fn parse(content: &str) -> Result<(OverlaySource, MappingMode), ConfigError> {
    if content.trim().is_empty() {
        return Err(ConfigError::Invalid("empty config file".to_string()));
    }

    let document: Value =
        serde_yaml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    if document.is_null() {
        return Err(ConfigError::Invalid("empty config file".to_string()));
    }

    let raw: RawConfig = serde_yaml::from_value(document)
        .map_err(|e| ConfigError::Invalid(format!("top level must be a mapping: {e}")))?;

    let version = raw
        .version
        .ok_or_else(|| ConfigError::MissingField("version".to_string()))?;
    if version.as_u64() != Some(SUPPORTED_VERSION) {
        return Err(ConfigError::UnsupportedVersion(render_scalar(&version)));
    }

    let overlay_value = raw
        .overlay
        .filter(|v| !v.is_null())
        .ok_or_else(|| ConfigError::MissingField("overlay".to_string()))?;
    let overlay: RawOverlay = serde_yaml::from_value(overlay_value)
        .map_err(|e| ConfigError::Invalid(format!("overlay: {e}")))?;

    let repo = overlay
        .repo
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingField("overlay.repo".to_string()))?;

    let source = OverlaySource {
        repo,
        reference: overlay.reference.filter(|r| !r.trim().is_empty()),
    };

    let mappings = parse_mappings(overlay.mappings)?;
    Ok((source, mappings))
}

fn parse_mappings(value: Option<Value>) -> Result<MappingMode, ConfigError> {
    let items = match value {
        None | Some(Value::Null) => return Ok(MappingMode::MirrorAll),
        Some(Value::Sequence(items)) => items,
        Some(_) => {
            return Err(ConfigError::Invalid(
                "overlay.mappings must be a list".to_string(),
            ));
        }
    };

    if items.is_empty() {
        return Ok(MappingMode::MirrorAll);
    }

    let mut specs = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let raw: RawMapping = serde_yaml::from_value(item).map_err(|e| {
            ConfigError::Invalid(format!("overlay.mappings[{index}] must be a mapping: {e}"))
        })?;
        let src = raw
            .src
            .ok_or_else(|| ConfigError::MissingField(format!("overlay.mappings[{index}].src")))?;
        let dst = raw
            .dst
            .ok_or_else(|| ConfigError::MissingField(format!("overlay.mappings[{index}].dst")))?;
        specs.push(MappingSpec { src, dst });
    }
    Ok(MappingMode::Explicit(specs))
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map_or_else(|_| format!("{other:?}"), |s| s.trim().to_string()),
    }
}
