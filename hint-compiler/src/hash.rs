//! Content hashes binding glyph programs to their outlines.
//!
//! A glyph program refers to points by index, so it is only meaningful for
//! the exact outline it was written against. Authoring tools store a hash of
//! that outline next to the program; we recompute it from the compiled glyph
//! and refuse to attach the program if the two differ.
//!
//! The hash is a textual description of the glyph: its advance width, then
//! each point as a type character (`l` line, `q` on-curve after an
//! off-curve point, `o` off-curve) followed by its coordinates, with `|`
//! closing each contour. Components are drawn recursively inside `[...]`,
//! followed by their transform. Descriptions of 128 characters or more are
//! replaced by their SHA-512 hex digest.

use serde_json::Value;
use sha2::{Digest, Sha512};
use write_fonts::{
    tables::glyf::{Anchor, Component, Contour, Transform},
    types::{F2Dot14, GlyphId16},
};

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    glyph::{Glyph, GlyphSet},
};

/// Descriptions at least this long are replaced by a digest.
const MAX_PLAIN_LEN: usize = 128;

/// Components nested deeper than this are assumed to be cyclic.
const MAX_COMPONENT_DEPTH: usize = 64;

/// An error that prevents computing a glyph hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashError {
    /// The glyph, or a component it references, is not in the glyph set.
    MissingGlyph(GlyphId16),
    /// Components are nested too deeply (or reference themselves).
    TooDeep(GlyphId16),
}

impl std::fmt::Display for HashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HashError::MissingGlyph(gid) => write!(f, "glyph {} not found", gid.to_u16()),
            HashError::TooDeep(gid) => {
                write!(f, "component {} is nested too deeply", gid.to_u16())
            }
        }
    }
}

impl std::error::Error for HashError {}

/// Compute the content hash of the glyph with the given id.
pub fn glyph_hash(glyphs: &GlyphSet, gid: GlyphId16) -> Result<String, HashError> {
    let glyph = glyphs.get(gid).ok_or(HashError::MissingGlyph(gid))?;
    let mut pen = HashPen::new(glyph.advance);
    pen.draw_glyph(glyphs, &glyph.glyph, 0)?;
    Ok(pen.finish())
}

/// Check the stored hash of a glyph program against the compiled glyph.
///
/// `stored` is the `id` of the glyph's instruction record; anything other
/// than a string is treated as a mismatch.
///
/// Returns `true` if the program can be trusted. Otherwise a diagnostic
/// explaining why is added to `diagnostics`.
pub fn verify_glyph_hash(
    glyphs: &GlyphSet,
    gid: GlyphId16,
    stored: Option<&Value>,
    diagnostics: &mut Diagnostics,
) -> bool {
    let name = glyphs.name(gid).unwrap_or_default();
    let kind = match (stored, glyph_hash(glyphs, gid)) {
        (None, _) => DiagnosticKind::HashMissing,
        (Some(Value::String(stored)), Ok(hash)) if *stored == hash => return true,
        (Some(_), Ok(_)) => DiagnosticKind::HashMismatch,
        (Some(_), Err(HashError::MissingGlyph(missing) | HashError::TooDeep(missing))) => {
            DiagnosticKind::UnresolvedComponent {
                glyph_id: missing.to_u16(),
            }
        }
    };
    diagnostics.push(Diagnostic::glyph(name, kind));
    false
}

/// Accumulates the textual description of a glyph.
struct HashPen {
    data: String,
}

impl HashPen {
    fn new(advance: u16) -> Self {
        HashPen {
            data: format!("w{advance}"),
        }
    }

    fn draw_glyph(
        &mut self,
        glyphs: &GlyphSet,
        glyph: &Glyph,
        depth: usize,
    ) -> Result<(), HashError> {
        match glyph {
            Glyph::Simple(simple) => simple.contours.iter().for_each(|c| self.draw_contour(c)),
            Glyph::Composite(composite) => {
                for component in &composite.components {
                    if depth >= MAX_COMPONENT_DEPTH {
                        return Err(HashError::TooDeep(component.glyph));
                    }
                    let base = glyphs
                        .get(component.glyph)
                        .ok_or(HashError::MissingGlyph(component.glyph))?;
                    self.data.push('[');
                    self.draw_glyph(glyphs, &base.glyph, depth + 1)?;
                    self.data.push('(');
                    self.data.push_str(&transform_terms(component));
                    self.data.push_str(")]");
                }
            }
        }
        Ok(())
    }

    fn draw_contour(&mut self, contour: &Contour) {
        // the first point continues the segment that closes the contour
        let mut prev_on_curve = contour.iter().last().map_or(true, |pt| pt.on_curve);
        for point in contour.iter() {
            let kind = match (point.on_curve, prev_on_curve) {
                (false, _) => 'o',
                (true, true) => 'l',
                (true, false) => 'q',
            };
            self.data.push_str(&format!("{kind}{}{:+}", point.x, point.y));
            prev_on_curve = point.on_curve;
        }
        self.data.push('|');
    }

    fn finish(self) -> String {
        if self.data.len() >= MAX_PLAIN_LEN {
            format!("{:x}", Sha512::digest(self.data.as_bytes()))
        } else {
            self.data
        }
    }
}

/// The six transform terms `xx yx xy yy dx dy`, each with a leading sign.
fn transform_terms(component: &Component) -> String {
    let mut terms = if component.transform == Transform::default() {
        "+1+0+0+1".to_string()
    } else {
        let Transform { xx, yx, xy, yy } = &component.transform;
        [*xx, *yx, *xy, *yy].into_iter().map(format_scale).collect()
    };
    match component.anchor {
        Anchor::Offset { x, y } => terms.push_str(&format!("{x:+}{y:+}")),
        Anchor::Point { base, component } => terms.push_str(&format!("@{base},{component}")),
    }
    terms
}

/// Format a scale term like a float's shortest round-trip representation,
/// with a leading sign: `+1.0`, `-0.5`, `+6.103515625e-05`.
fn format_scale(value: F2Dot14) -> String {
    let value = value.to_bits() as f64 / 16384.0;
    let sign = if value < 0.0 { '-' } else { '+' };
    let abs = value.abs();
    if abs != 0.0 && abs < 1e-4 {
        // exponent notation, with at least two exponent digits
        let repr = format!("{abs:e}");
        let (mantissa, exponent) = repr.split_once('e').unwrap_or((&repr, "0"));
        let exponent: i32 = exponent.parse().unwrap_or_default();
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.abs())
    } else if abs.fract() == 0.0 {
        format!("{sign}{abs:.1}")
    } else {
        format!("{sign}{abs}")
    }
}
