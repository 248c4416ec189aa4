//! YAML codec for the active-response limits file.
//!
//! File layout:
//! ```yaml
//! active-response:
//!   global-limit: 200
//!   custom-limit:
//!     block-domain0: 100
//!     quick-scan0: 200
//! ```
//!
//! Decoding is lenient about content and strict about syntax.  Missing keys
//! and bad values fall back to defaults (with a warning); text that is not
//! YAML, or whose root is not a mapping, is a [`CodecError`].
//!
//! Keys the tool does not own are carried through a decode/encode cycle
//! unchanged, both at the root and inside `active-response`.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::warn;

use crate::domain::limits::{Limit, LimitsDocument, DEFAULT_GLOBAL_LIMIT};

/// Root key of the active-response section.
pub const SECTION_KEY: &str = "active-response";
/// Key of the global limit inside the section.
pub const GLOBAL_LIMIT_KEY: &str = "global-limit";
/// Key of the per-command mapping inside the section.
pub const CUSTOM_LIMIT_KEY: &str = "custom-limit";

/// Errors that can occur while decoding or encoding a limits file.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The text is not valid YAML.
    #[error("failed to parse limits YAML: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// The document root is a scalar or a sequence.
    #[error("limits YAML root must be a mapping")]
    NotAMapping,

    /// The document could not be rendered as YAML.
    #[error("failed to serialize limits YAML: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// In-memory image of a limits file: the owned document plus foreign keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitsFile {
    document: LimitsDocument,
    root_extra: Mapping,
    section_extra: Mapping,
}

impl LimitsFile {
    pub fn from_document(document: LimitsDocument) -> Self {
        Self {
            document,
            ..Self::default()
        }
    }

    pub fn document(&self) -> &LimitsDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut LimitsDocument {
        &mut self.document
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes limits file text.  An empty file yields the default document.
///
/// # Errors
///
/// Returns [`CodecError::Parse`] for invalid YAML and
/// [`CodecError::NotAMapping`] when the root is not a mapping.
pub fn decode_limits(text: &str) -> Result<LimitsFile, CodecError> {
    let root = match serde_yaml::from_str::<Value>(text).map_err(CodecError::Parse)? {
        Value::Null => return Ok(LimitsFile::default()),
        Value::Mapping(mapping) => mapping,
        _ => return Err(CodecError::NotAMapping),
    };

    let mut section = None;
    let mut root_extra = Mapping::new();
    for (key, value) in root {
        if key.as_str() == Some(SECTION_KEY) {
            section = Some(value);
        } else {
            root_extra.insert(key, value);
        }
    }

    let section = match section {
        None | Some(Value::Null) => Mapping::new(),
        Some(Value::Mapping(mapping)) => mapping,
        Some(_) => {
            warn!("'{SECTION_KEY}' is not a mapping; replacing it with defaults");
            Mapping::new()
        }
    };

    let mut global_limit = DEFAULT_GLOBAL_LIMIT;
    let mut custom_limits = BTreeMap::new();
    let mut section_extra = Mapping::new();
    for (key, value) in section {
        match key.as_str() {
            Some(GLOBAL_LIMIT_KEY) => global_limit = decode_global_limit(&value),
            Some(CUSTOM_LIMIT_KEY) => custom_limits = decode_custom_limits(value),
            _ => {
                section_extra.insert(key, value);
            }
        }
    }

    Ok(LimitsFile {
        document: LimitsDocument::new(global_limit, custom_limits),
        root_extra,
        section_extra,
    })
}

/// Encodes a limits file.  Per-command entries come out sorted by name.
///
/// # Errors
///
/// Returns [`CodecError::Serialize`] if YAML rendering fails.
pub fn encode_limits(file: &LimitsFile) -> Result<String, CodecError> {
    let custom: Mapping = file
        .document
        .custom_limits()
        .iter()
        .map(|(name, limit)| (Value::from(name.as_str()), Value::from(limit.get())))
        .collect();

    let mut section = Mapping::new();
    section.insert(
        Value::from(GLOBAL_LIMIT_KEY),
        Value::from(file.document.global_limit().get()),
    );
    section.insert(Value::from(CUSTOM_LIMIT_KEY), Value::Mapping(custom));
    for (key, value) in &file.section_extra {
        section.insert(key.clone(), value.clone());
    }

    let mut root = Mapping::new();
    root.insert(Value::from(SECTION_KEY), Value::Mapping(section));
    for (key, value) in &file.root_extra {
        root.insert(key.clone(), value.clone());
    }

    serde_yaml::to_string(&Value::Mapping(root)).map_err(CodecError::Serialize)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn decode_limit(value: &Value) -> Option<Limit> {
    if let Some(v) = value.as_u64() {
        return Limit::try_from(v).ok();
    }
    value.as_i64().and_then(|v| Limit::try_from(v).ok())
}

fn decode_global_limit(value: &Value) -> Limit {
    if value.is_null() {
        return DEFAULT_GLOBAL_LIMIT;
    }
    decode_limit(value).unwrap_or_else(|| {
        warn!(
            ?value,
            "unusable '{GLOBAL_LIMIT_KEY}', using default {DEFAULT_GLOBAL_LIMIT}"
        );
        DEFAULT_GLOBAL_LIMIT
    })
}

fn decode_custom_limits(value: Value) -> BTreeMap<String, Limit> {
    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        Value::Null => return BTreeMap::new(),
        other => {
            warn!(value = ?other, "'{CUSTOM_LIMIT_KEY}' is not a mapping; ignoring it");
            return BTreeMap::new();
        }
    };

    let mut limits = BTreeMap::new();
    for (key, value) in mapping {
        match (key.as_str(), decode_limit(&value)) {
            (Some(name), Some(limit)) => {
                limits.insert(name.to_string(), limit);
            }
            _ => warn!(?key, ?value, "dropping unusable custom limit entry"),
        }
    }
    limits
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
active-response:
  global-limit: 250
  custom-limit:
    block-domain0: 100
    old-command0: 10
";

    #[test]
    fn test_decode_reads_global_and_custom_limits() {
        // Act
        let file = decode_limits(SAMPLE).expect("decode");

        // Assert
        let doc = file.document();
        assert_eq!(doc.global_limit(), Limit::new(250));
        assert_eq!(doc.custom_limits().get("block-domain0"), Some(&Limit::new(100)));
        assert_eq!(doc.custom_limits().get("old-command0"), Some(&Limit::new(10)));
    }

    #[test]
    fn test_decode_empty_text_yields_defaults() {
        let file = decode_limits("").expect("decode");
        assert_eq!(file.document(), &LimitsDocument::default());
    }

    #[test]
    fn test_decode_without_section_yields_defaults() {
        let file = decode_limits("other: 1\n").expect("decode");
        assert_eq!(file.document().global_limit(), DEFAULT_GLOBAL_LIMIT);
        assert!(file.document().custom_limits().is_empty());
    }

    #[test]
    fn test_decode_unparseable_global_limit_falls_back_to_200() {
        let text = "active-response:\n  global-limit: lots\n";
        let file = decode_limits(text).expect("decode");
        assert_eq!(file.document().global_limit(), Limit::new(200));
    }

    #[test]
    fn test_decode_negative_global_limit_falls_back_to_200() {
        let text = "active-response:\n  global-limit: -5\n";
        let file = decode_limits(text).expect("decode");
        assert_eq!(file.document().global_limit(), DEFAULT_GLOBAL_LIMIT);
    }

    #[test]
    fn test_decode_drops_non_integer_custom_entries() {
        let text = "\
active-response:
  custom-limit:
    good0: 5
    bad0: five
    neg0: -1
";
        let file = decode_limits(text).expect("decode");
        let keys: Vec<&str> = file
            .document()
            .custom_limits()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["good0"]);
    }

    #[test]
    fn test_decode_invalid_yaml_returns_parse_error() {
        let result = decode_limits("active-response: [unclosed");
        assert!(matches!(result, Err(CodecError::Parse(_))));
    }

    #[test]
    fn test_decode_scalar_root_returns_not_a_mapping() {
        let result = decode_limits("just a string\n");
        assert!(matches!(result, Err(CodecError::NotAMapping)));
    }

    #[test]
    fn test_encode_writes_expected_layout() {
        // Arrange
        let mut custom = BTreeMap::new();
        custom.insert("quick-scan0".to_string(), Limit::new(15));
        custom.insert("block-domain0".to_string(), Limit::new(50));
        let file = LimitsFile::from_document(LimitsDocument::new(Limit::new(300), custom));

        // Act
        let text = encode_limits(&file).expect("encode");

        // Assert
        assert_eq!(
            text,
            "\
active-response:
  global-limit: 300
  custom-limit:
    block-domain0: 50
    quick-scan0: 15
"
        );
    }

    #[test]
    fn test_encode_preserves_foreign_keys() {
        // Arrange
        let text = "\
active-response:
  global-limit: 10
  enabled: true
logging:
  level: debug
";
        let file = decode_limits(text).expect("decode");

        // Act
        let encoded = encode_limits(&file).expect("encode");
        let reparsed: Value = serde_yaml::from_str(&encoded).expect("reparse");

        // Assert
        assert_eq!(reparsed["logging"]["level"].as_str(), Some("debug"));
        assert_eq!(reparsed[SECTION_KEY]["enabled"].as_bool(), Some(true));
        assert_eq!(reparsed[SECTION_KEY][GLOBAL_LIMIT_KEY].as_u64(), Some(10));
    }

    #[test]
    fn test_encode_empty_custom_limits_as_empty_mapping() {
        let encoded = encode_limits(&LimitsFile::default()).expect("encode");
        let reparsed: Value = serde_yaml::from_str(&encoded).expect("reparse");
        assert!(reparsed[SECTION_KEY][CUSTOM_LIMIT_KEY].is_mapping());
    }
}
