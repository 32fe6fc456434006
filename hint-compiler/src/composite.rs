//! Component flags of composite glyphs.
//!
//! Some flags of a composite glyph's components cannot be derived from the
//! outlines and are recorded in the source instead: per component in the
//! glyph's object libs, and for the whole glyph in its lib.

use write_fonts::tables::glyf::Component;

use crate::{
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    glyph::CompositeGlyph,
    record::ComponentLib,
    source::{SourceComponent, SourceGlyph},
};

/// Set the flags of each component of `composite` from its source glyph.
///
/// Components are matched to the source by index, so both glyphs must have
/// the same number of components; if they don't, nothing is changed and an
/// error is reported.
///
/// - A component without an identifier has no recorded flags; it always
///   gets `ROUND_XY_TO_GRID`.
/// - A component whose object lib overrides a flag gets `ROUND_XY_TO_GRID`
///   unless rounding is disabled explicitly. It gets `USE_MY_METRICS` if it
///   asks for it and no earlier component already has it, unless
///   `auto_use_my_metrics` is set, in which case that flag is left alone.
/// - The glyph-level overlap flag only ever applies to the first component.
pub fn set_composite_flags(
    name: &str,
    source: &SourceGlyph,
    composite: &mut CompositeGlyph,
    auto_use_my_metrics: bool,
    diagnostics: &mut Diagnostics,
) {
    if source.components.len() != composite.components.len() {
        diagnostics.push(Diagnostic::glyph(
            name,
            DiagnosticKind::ComponentCountMismatch {
                source: source.components.len(),
                compiled: composite.components.len(),
            },
        ));
        return;
    }

    source
        .components
        .iter()
        .zip(composite.components.iter_mut())
        .fold(None::<&str>, |claimed_by, (source_component, component)| {
            let Some(identifier) = source_component.identifier.as_deref() else {
                component.flags.round_xy_to_grid = true;
                return claimed_by;
            };
            let lib = component_lib(source, source_component);
            if !lib.has_overrides() {
                return claimed_by;
            }
            component.flags.round_xy_to_grid = lib.round_offset_to_grid.unwrap_or(true);
            if auto_use_my_metrics || lib.use_my_metrics != Some(true) {
                return claimed_by;
            }
            claim_metrics(name, identifier, component, claimed_by, diagnostics)
        });

    if let (Some(overlap), Some(first)) = (source.overlap(), composite.components.first_mut()) {
        first.flags.overlap_compound = overlap;
    }
}

fn component_lib(source: &SourceGlyph, component: &SourceComponent) -> ComponentLib {
    component
        .identifier
        .as_deref()
        .and_then(|identifier| source.object_lib(identifier))
        .map(ComponentLib::from_object_lib)
        .unwrap_or_default()
}

/// Give `USE_MY_METRICS` to `component` unless another one already has it.
///
/// Returns the identifier of the component holding the flag.
fn claim_metrics<'a>(
    name: &str,
    identifier: &'a str,
    component: &mut Component,
    claimed_by: Option<&'a str>,
    diagnostics: &mut Diagnostics,
) -> Option<&'a str> {
    component.flags.use_my_metrics = false;
    match claimed_by {
        Some(claimed_by) => {
            diagnostics.push(Diagnostic::glyph(
                name,
                DiagnosticKind::DuplicateUseMyMetrics {
                    component: identifier.to_owned(),
                    claimed_by: claimed_by.to_owned(),
                },
            ));
            Some(claimed_by)
        }
        None => {
            component.flags.use_my_metrics = true;
            Some(identifier)
        }
    }
}
