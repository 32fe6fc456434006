//! Compiled TrueType glyphs, as produced by the outline compiler.

use indexmap::IndexMap;
use write_fonts::{
    tables::glyf::{Component, SimpleGlyph},
    types::GlyphId16,
};

use crate::{error::Error, Result};

/// The most glyphs a font can hold, as `maxp.numGlyphs` is 16 bits.
pub const MAX_GLYPHS: usize = u16::MAX as usize;

/// A glyph consisting of components, with an optional glyph program.
///
/// The program is an `Option` so that a composite without instructions can
/// be told apart from one whose program is present but empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositeGlyph {
    pub components: Vec<Component>,
    pub program: Option<Vec<u8>>,
}

/// A compiled glyph outline.
///
/// For simple glyphs the program lives in [`SimpleGlyph::instructions`];
/// an empty vector means "no program". Glyphs without any contours are
/// empty simple glyphs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Glyph {
    Simple(SimpleGlyph),
    Composite(CompositeGlyph),
}

/// A glyph along with the metadata we need to verify its program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledGlyph {
    pub advance: u16,
    pub glyph: Glyph,
}

/// All the compiled glyphs of a font, in glyph order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GlyphSet {
    glyphs: IndexMap<String, CompiledGlyph>,
}

impl CompositeGlyph {
    pub fn new(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
            program: None,
        }
    }
}

impl Glyph {
    pub fn is_composite(&self) -> bool {
        matches!(self, Glyph::Composite(_))
    }

    /// The glyph program, if one is attached.
    ///
    /// For composites this may be an empty slice, before it is cleaned up.
    pub fn program(&self) -> Option<&[u8]> {
        match self {
            Glyph::Simple(simple) if simple.instructions.is_empty() => None,
            Glyph::Simple(simple) => Some(simple.instructions.as_slice()),
            Glyph::Composite(composite) => composite.program.as_deref(),
        }
    }

    /// The length in bytes of the attached program, or 0.
    pub fn program_len(&self) -> usize {
        self.program().map(<[u8]>::len).unwrap_or_default()
    }

    pub(crate) fn set_program(&mut self, bytecode: Vec<u8>) {
        match self {
            Glyph::Simple(simple) => simple.instructions = bytecode,
            Glyph::Composite(composite) => composite.program = Some(bytecode),
        }
    }

    /// Drop the program of a composite glyph if it is empty.
    ///
    /// Returns `true` if a program was removed.
    pub(crate) fn remove_empty_composite_program(&mut self) -> bool {
        match self {
            Glyph::Composite(composite)
                if composite.program.as_ref().is_some_and(Vec::is_empty) =>
            {
                composite.program = None;
                true
            }
            _ => false,
        }
    }
}

impl CompiledGlyph {
    pub fn new(advance: u16, glyph: impl Into<Glyph>) -> Self {
        Self {
            advance,
            glyph: glyph.into(),
        }
    }
}

impl GlyphSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a glyph, returning its id.
    ///
    /// A glyph with an existing name replaces the old one and keeps its id.
    /// Adding a new glyph to a set that already holds [`MAX_GLYPHS`] fails.
    pub fn push(&mut self, name: impl Into<String>, glyph: CompiledGlyph) -> Result<GlyphId16> {
        let name = name.into();
        let index = self
            .glyphs
            .get_index_of(&name)
            .unwrap_or(self.glyphs.len());
        let gid = u16::try_from(index)
            .ok()
            .filter(|_| index < MAX_GLYPHS)
            .map(GlyphId16::new)
            .ok_or_else(|| Error::TooManyGlyphs { name: name.clone() })?;
        self.glyphs.insert(name, glyph);
        Ok(gid)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn get(&self, gid: GlyphId16) -> Option<&CompiledGlyph> {
        self.glyphs
            .get_index(gid.to_u16() as usize)
            .map(|(_, glyph)| glyph)
    }

    pub fn get_mut(&mut self, gid: GlyphId16) -> Option<&mut CompiledGlyph> {
        self.glyphs
            .get_index_mut(gid.to_u16() as usize)
            .map(|(_, glyph)| glyph)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&CompiledGlyph> {
        self.glyphs.get(name)
    }

    pub fn glyph_id(&self, name: &str) -> Option<GlyphId16> {
        self.glyphs
            .get_index_of(name)
            .and_then(|index| u16::try_from(index).ok())
            .map(GlyphId16::new)
    }

    pub fn name(&self, gid: GlyphId16) -> Option<&str> {
        self.glyphs
            .get_index(gid.to_u16() as usize)
            .map(|(name, _)| name.as_str())
    }

    /// The ids of all glyphs, in glyph order.
    pub fn glyph_ids(&self) -> impl Iterator<Item = GlyphId16> {
        (0..=u16::MAX).take(self.len()).map(GlyphId16::new)
    }

    /// Iterate over glyph ids, names and glyphs, in glyph order.
    pub fn iter(&self) -> impl Iterator<Item = (GlyphId16, &str, &CompiledGlyph)> {
        self.glyph_ids()
            .zip(&self.glyphs)
            .map(|(gid, (name, glyph))| (gid, name.as_str(), glyph))
    }
}

impl From<SimpleGlyph> for Glyph {
    fn from(value: SimpleGlyph) -> Self {
        Glyph::Simple(value)
    }
}

impl From<CompositeGlyph> for Glyph {
    fn from(value: CompositeGlyph) -> Self {
        Glyph::Composite(value)
    }
}
