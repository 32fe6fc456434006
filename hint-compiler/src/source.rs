//! The parts of a font source that carry instruction data.
//!
//! Sources store arbitrary, loosely typed metadata in "lib" dictionaries, at
//! the font level and per glyph. We keep those as JSON values and only turn
//! them into typed records once their format version has been checked.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Well-known lib keys.
pub mod keys {
    /// The instruction record, at font level and per glyph.
    pub const TRUETYPE_INSTRUCTIONS: &str = "public.truetype.instructions";
    /// Per-object metadata, keyed by object identifier.
    pub const OBJECT_LIBS: &str = "public.objectLibs";
    /// Component-level: whether to set `ROUND_XY_TO_GRID`.
    pub const TRUETYPE_ROUND: &str = "public.truetype.roundOffsetToGrid";
    /// Component-level: whether to set `USE_MY_METRICS`.
    pub const TRUETYPE_METRICS: &str = "public.truetype.useMyMetrics";
    /// Glyph-level: whether to set `OVERLAP_COMPOUND` on the first component.
    pub const TRUETYPE_OVERLAP: &str = "public.truetype.overlap";
}

/// A font source, reduced to what instruction compilation needs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceFont {
    pub lib: Map<String, Value>,
    /// The source glyphs, in source order.
    pub glyphs: IndexMap<String, SourceGlyph>,
}

/// A glyph in the font source.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceGlyph {
    pub components: Vec<SourceComponent>,
    pub lib: Map<String, Value>,
}

/// A component reference in a source glyph.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceComponent {
    /// The name of the referenced glyph.
    pub base: String,
    /// The identifier used to look up per-component metadata.
    pub identifier: Option<String>,
}

impl SourceFont {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn glyph(&self, name: &str) -> Option<&SourceGlyph> {
        self.glyphs.get(name)
    }

    /// Add a glyph, replacing any existing glyph with the same name.
    pub fn insert_glyph(&mut self, name: impl Into<String>, glyph: SourceGlyph) {
        self.glyphs.insert(name.into(), glyph);
    }

    /// The raw font-level instruction record, if any.
    pub(crate) fn instructions(&self) -> Option<&Value> {
        self.lib.get(keys::TRUETYPE_INSTRUCTIONS)
    }
}

impl SourceGlyph {
    /// The raw glyph-level instruction record, if any.
    pub(crate) fn instructions(&self) -> Option<&Value> {
        self.lib.get(keys::TRUETYPE_INSTRUCTIONS)
    }

    /// The object lib for the object with this identifier.
    pub(crate) fn object_lib(&self, identifier: &str) -> Option<&Value> {
        self.lib.get(keys::OBJECT_LIBS)?.get(identifier)
    }

    /// The glyph-level overlap flag, if one is recorded.
    ///
    /// Any value that is not `true` counts as `false`.
    pub(crate) fn overlap(&self) -> Option<bool> {
        self.lib
            .get(keys::TRUETYPE_OVERLAP)
            .map(|value| value.as_bool().unwrap_or(false))
    }
}

impl SourceComponent {
    pub fn new(base: impl Into<String>, identifier: Option<&str>) -> Self {
        Self {
            base: base.into(),
            identifier: identifier.map(Into::into),
        }
    }
}
