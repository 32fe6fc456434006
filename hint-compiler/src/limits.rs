//! Interpreter limits, stored in the [maxp] table.
//!
//! [maxp]: https://learn.microsoft.com/en-us/typography/opentype/spec/maxp

use write_fonts::tables::maxp::Maxp;

use crate::{glyph::GlyphSet, record::FontHintRecord};

/// Update the interpreter limits of `maxp`.
///
/// The limits recorded in the source are copied as they are; limits the
/// source does not mention keep their current value. `maxSizeOfInstructions`
/// is never read from the source: it is always the size of the largest
/// glyph program in `glyphs`.
pub fn update_maxp(record: Option<&FontHintRecord>, glyphs: &GlyphSet, maxp: &mut Maxp) {
    if let Some(record) = record {
        let authored = [
            (&mut maxp.max_storage, record.max_storage),
            (&mut maxp.max_function_defs, record.max_function_defs),
            (&mut maxp.max_instruction_defs, record.max_instruction_defs),
            (&mut maxp.max_stack_elements, record.max_stack_elements),
            (&mut maxp.max_zones, record.max_zones),
            (&mut maxp.max_twilight_points, record.max_twilight_points),
        ];
        for (field, value) in authored {
            if value.is_some() {
                *field = value;
            }
        }
    }
    maxp.max_size_of_instructions = Some(max_program_len(glyphs));
}

fn max_program_len(glyphs: &GlyphSet) -> u16 {
    let max = glyphs
        .iter()
        .map(|(_, _, glyph)| glyph.glyph.program_len())
        .max()
        .unwrap_or_default();
    u16::try_from(max).unwrap_or(u16::MAX)
}
