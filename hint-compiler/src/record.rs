//! Typed instruction records, and the format check that guards them.
//!
//! Every record read from a source lib goes through [`FormatVersion::check`]
//! before anything else looks at it. Only version "1" is understood.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::{error::Error, source::keys, Result};

/// The versions of the instruction record format we understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatVersion {
    V1,
}

/// The font-level instruction record.
///
/// Fields that are absent (or `null`) in the source are `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontHintRecord {
    /// Assembly for the `fpgm` table.
    pub font_program: Option<String>,
    /// Assembly for the `prep` table.
    pub control_value_program: Option<String>,
    /// Sparse cvt entries, keyed by the decimal index.
    pub control_value: Option<BTreeMap<String, i16>>,
    pub max_storage: Option<u16>,
    pub max_function_defs: Option<u16>,
    pub max_instruction_defs: Option<u16>,
    pub max_stack_elements: Option<u16>,
    pub max_zones: Option<u16>,
    pub max_twilight_points: Option<u16>,
}

/// The glyph-level instruction record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GlyphHintRecord {
    /// The hash of the outline the assembly was written for.
    ///
    /// Kept as a raw value: an id that is not a string can never match, which
    /// is reported for the glyph rather than failing the whole font.
    pub id: Option<Value>,
    pub assembly: Option<String>,
}

/// Per-component flag overrides, from a glyph's object libs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentLib {
    pub round_offset_to_grid: Option<bool>,
    pub use_my_metrics: Option<bool>,
}

impl FormatVersion {
    /// Check the `formatVersion` field of a raw record.
    ///
    /// `location` describes where the record came from, for error messages.
    pub fn check(record: &Value, location: &str) -> Result<FormatVersion> {
        match record.get("formatVersion") {
            Some(Value::String(version)) if version == "1" => Ok(FormatVersion::V1),
            Some(Value::String(version)) => Err(Error::UnsupportedVersion {
                location: location.to_owned(),
                version: version.clone(),
            }),
            other => Err(Error::Format {
                location: location.to_owned(),
                found: json_type_name(other.unwrap_or(&Value::Null)),
            }),
        }
    }
}

impl FontHintRecord {
    pub(crate) const LOCATION: &'static str = "the font lib";

    /// Read the font-level record from its raw lib value.
    ///
    /// A missing, `null` or empty record means the font has no instruction
    /// data at all; this is not checked further and returns `None`.
    pub fn from_lib(value: Option<&Value>) -> Result<Option<Self>> {
        let Some(value) = value.filter(|value| !is_empty_record(value)) else {
            return Ok(None);
        };
        FormatVersion::check(value, Self::LOCATION)?;
        FontHintRecord::deserialize(value)
            .map(Some)
            .map_err(|e| Error::InvalidRecord {
                location: Self::LOCATION.to_owned(),
                message: e.to_string(),
            })
    }

    /// The sparse cvt entries with their keys parsed as indices.
    ///
    /// Returns `None` if there are no entries.
    pub(crate) fn control_values(&self) -> Result<Option<BTreeMap<u16, i16>>> {
        let Some(entries) = self.control_value.as_ref().filter(|map| !map.is_empty()) else {
            return Ok(None);
        };
        entries
            .iter()
            .map(|(key, value)| {
                key.trim()
                    .parse::<u16>()
                    .map(|index| (index, *value))
                    .map_err(|_| Error::InvalidControlValueIndex { key: key.clone() })
            })
            .collect::<Result<_>>()
            .map(Some)
    }
}

impl GlyphHintRecord {
    /// Read a glyph-level record from its raw lib value.
    ///
    /// Unlike the font-level record, a glyph record that is present is
    /// always checked, even if it is empty.
    pub fn from_lib(value: &Value, glyph_name: &str) -> Result<Self> {
        let location = format!("glyph '{glyph_name}'");
        FormatVersion::check(value, &location)?;
        GlyphHintRecord::deserialize(value).map_err(|e| Error::InvalidRecord {
            location,
            message: e.to_string(),
        })
    }
}

impl ComponentLib {
    /// Read the flag overrides from a component's object lib.
    ///
    /// A key that is present with a value other than `true` counts as `false`.
    pub fn from_object_lib(value: &Value) -> Self {
        let flag = |key: &str| value.get(key).map(|v| v.as_bool().unwrap_or(false));
        ComponentLib {
            round_offset_to_grid: flag(keys::TRUETYPE_ROUND),
            use_my_metrics: flag(keys::TRUETYPE_METRICS),
        }
    }

    /// `true` if this lib overrides any component flag.
    pub fn has_overrides(&self) -> bool {
        self.round_offset_to_grid.is_some() || self.use_my_metrics.is_some()
    }
}

fn is_empty_record(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn format_version_one() {
        let record = json!({ "formatVersion": "1" });
        assert_eq!(
            FormatVersion::check(&record, "location"),
            Ok(FormatVersion::V1)
        );
    }

    #[rstest]
    #[case(json!({ "formatVersion": 1 }), "number")]
    #[case(json!({ "formatVersion": null }), "null")]
    #[case(json!({}), "null")]
    #[case(json!({ "formatVersion": ["1"] }), "array")]
    fn format_version_wrong_type(#[case] record: Value, #[case] found: &'static str) {
        let err = FormatVersion::check(&record, "location").unwrap_err();
        assert_eq!(
            err,
            Error::Format {
                location: "location".into(),
                found
            }
        );
    }

    #[rstest]
    #[case("2")]
    #[case("1.5")]
    #[case("")]
    #[case(" 1")]
    fn format_version_unsupported(#[case] version: &str) {
        let record = json!({ "formatVersion": version });
        let err = FormatVersion::check(&record, "location").unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedVersion {
                location: "location".into(),
                version: version.into()
            }
        );
        assert_eq!(
            err.to_string(),
            format!("unknown formatVersion '{version}' for instructions in location")
        );
    }

    #[test]
    fn font_record_absent_or_empty() {
        assert_eq!(FontHintRecord::from_lib(None), Ok(None));
        assert_eq!(FontHintRecord::from_lib(Some(&Value::Null)), Ok(None));
        assert_eq!(FontHintRecord::from_lib(Some(&json!({}))), Ok(None));
    }

    #[test]
    fn font_record_fields() {
        let raw = json!({
            "formatVersion": "1",
            "fontProgram": "PUSHB[]\n0\nFDEF[]\nPOP[]\nENDF[]",
            "controlValueProgram": null,
            "controlValue": { "1": 500, "3": -250 },
            "maxStorage": 1,
            "maxZones": 2,
            "maxSizeOfInstructions": 1,
        });
        let record = FontHintRecord::from_lib(Some(&raw)).unwrap().unwrap();
        assert_eq!(
            record.font_program.as_deref(),
            Some("PUSHB[]\n0\nFDEF[]\nPOP[]\nENDF[]")
        );
        assert_eq!(record.control_value_program, None);
        assert_eq!(record.max_storage, Some(1));
        assert_eq!(record.max_zones, Some(2));
        assert_eq!(record.max_function_defs, None);
        let cvt = record.control_values().unwrap().unwrap();
        assert_eq!(cvt.into_iter().collect::<Vec<_>>(), [(1, 500), (3, -250)]);
    }

    #[test]
    fn font_record_checks_format_when_not_empty() {
        let raw = json!({ "maxStorage": 1 });
        assert!(matches!(
            FontHintRecord::from_lib(Some(&raw)),
            Err(Error::Format { found: "null", .. })
        ));
    }

    #[test]
    fn font_record_bad_field() {
        let raw = json!({ "formatVersion": "1", "maxZones": "two" });
        assert!(matches!(
            FontHintRecord::from_lib(Some(&raw)),
            Err(Error::InvalidRecord { .. })
        ));
        let raw = json!({ "formatVersion": "1", "controlValue": { "0": 40000 } });
        assert!(matches!(
            FontHintRecord::from_lib(Some(&raw)),
            Err(Error::InvalidRecord { .. })
        ));
    }

    #[test]
    fn bad_cvt_index() {
        let raw = json!({ "formatVersion": "1", "controlValue": { "x": 1 } });
        let record = FontHintRecord::from_lib(Some(&raw)).unwrap().unwrap();
        assert_eq!(
            record.control_values(),
            Err(Error::InvalidControlValueIndex { key: "x".into() })
        );
        let raw = json!({ "formatVersion": "1", "controlValue": { "-1": 1 } });
        let record = FontHintRecord::from_lib(Some(&raw)).unwrap().unwrap();
        assert!(record.control_values().is_err());
    }

    #[test]
    fn glyph_record_always_checked() {
        let err = GlyphHintRecord::from_lib(&json!({}), "a").unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal type 'null' instead of 'string' for formatVersion of instructions in glyph 'a'"
        );
    }

    #[test]
    fn glyph_record_fields() {
        let raw = json!({ "formatVersion": "1", "id": "w500", "assembly": "" });
        let record = GlyphHintRecord::from_lib(&raw, "a").unwrap();
        assert_eq!(record.id, Some(json!("w500")));
        assert_eq!(record.assembly.as_deref(), Some(""));
        let raw = json!({ "formatVersion": "1", "id": "w500" });
        assert_eq!(GlyphHintRecord::from_lib(&raw, "a").unwrap().assembly, None);
    }

    #[test]
    fn glyph_record_id_of_any_type() {
        let raw = json!({ "formatVersion": "1", "id": 12345, "assembly": "" });
        let record = GlyphHintRecord::from_lib(&raw, "a").unwrap();
        assert_eq!(record.id, Some(json!(12345)));
        let raw = json!({ "formatVersion": "1", "id": null });
        assert_eq!(GlyphHintRecord::from_lib(&raw, "a").unwrap().id, None);
    }

    #[test]
    fn component_lib() {
        let lib = ComponentLib::from_object_lib(&json!({
            "public.truetype.roundOffsetToGrid": false,
        }));
        assert_eq!(lib.round_offset_to_grid, Some(false));
        assert_eq!(lib.use_my_metrics, None);
        assert!(lib.has_overrides());
        assert!(!ComponentLib::from_object_lib(&json!({ "other": 1 })).has_overrides());
    }
}
