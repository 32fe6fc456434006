//! Compiling hinting programs: the font-wide `fpgm` and `prep` tables, and
//! the per-glyph programs.

use serde_json::Value;
use write_fonts::{
    read::TopLevelTable,
    types::{GlyphId16, Tag},
    validate::{Validate, ValidationCtx},
    FontWrite, TableWriter,
};

use crate::{
    assembler::Assemble,
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    error::Error,
    glyph::GlyphSet,
    hash::verify_glyph_hash,
    record::{FontHintRecord, GlyphHintRecord},
    Result,
};

/// The font-wide programs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Program {
    /// The font program, stored in `fpgm`.
    Font,
    /// The control value program, stored in `prep`.
    ControlValue,
}

impl Program {
    /// The tag of the table this program is stored in.
    pub fn tag(self) -> Tag {
        match self {
            Program::Font => Fpgm::TAG,
            Program::ControlValue => Prep::TAG,
        }
    }

    /// The key of this program's assembly in the font-level record.
    pub fn record_key(self) -> &'static str {
        match self {
            Program::Font => "fontProgram",
            Program::ControlValue => "controlValueProgram",
        }
    }

    fn assembly(self, record: &FontHintRecord) -> Option<&str> {
        match self {
            Program::Font => record.font_program.as_deref(),
            Program::ControlValue => record.control_value_program.as_deref(),
        }
    }
}

macro_rules! program_table {
    ($(#[$attr:meta])* $name:ident, $tag:literal) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Default, PartialEq, Eq)]
        pub struct $name {
            pub bytecode: Vec<u8>,
        }

        impl $name {
            pub fn new(bytecode: Vec<u8>) -> Self {
                Self { bytecode }
            }
        }

        impl TopLevelTable for $name {
            const TAG: Tag = Tag::new($tag);
        }

        impl FontWrite for $name {
            fn write_into(&self, writer: &mut TableWriter) {
                self.bytecode.write_into(writer)
            }
        }

        impl Validate for $name {
            fn validate_impl(&self, ctx: &mut ValidationCtx) {
                ctx.in_table(stringify!($name), |ctx| {
                    if self.bytecode.is_empty() {
                        ctx.report("program must not be empty");
                    }
                })
            }
        }
    };
}

program_table!(
    /// The [fpgm (Font Program)][fpgm] table.
    ///
    /// [fpgm]: https://learn.microsoft.com/en-us/typography/opentype/spec/fpgm
    Fpgm,
    b"fpgm"
);

program_table!(
    /// The [prep (Control Value Program)][prep] table.
    ///
    /// [prep]: https://learn.microsoft.com/en-us/typography/opentype/spec/prep
    Prep,
    b"prep"
);

/// Assemble one of the font-wide programs.
///
/// Returns `None` if the record has no assembly for this program, or if the
/// assembly is empty; only the latter is reported.
pub(crate) fn compile_table_program(
    program: Program,
    record: &FontHintRecord,
    assembler: &impl Assemble,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Vec<u8>>> {
    let Some(assembly) = program.assembly(record) else {
        return Ok(None);
    };
    let bytecode = if assembly.is_empty() {
        Vec::new()
    } else {
        assembler
            .assemble(assembly)
            .map_err(|error| Error::Assembly {
                location: format!("table '{}'", program.tag()),
                error,
            })?
    };
    if bytecode.is_empty() {
        diagnostics.push(Diagnostic::table(
            program.tag(),
            DiagnosticKind::EmptyTableProgram,
        ));
        return Ok(None);
    }
    Ok(Some(bytecode))
}

/// Attach the authored program to a compiled glyph.
///
/// `raw` is the glyph's instruction record. The program is only attached if
/// the record's hash matches the compiled glyph and it has a non-empty
/// assembly; anything else leaves the glyph untouched and is reported.
pub(crate) fn compile_glyph_program(
    glyphs: &mut GlyphSet,
    gid: GlyphId16,
    raw: &Value,
    assembler: &impl Assemble,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let name = glyphs.name(gid).unwrap_or_default().to_owned();
    let record = GlyphHintRecord::from_lib(raw, &name)?;
    if !verify_glyph_hash(glyphs, gid, record.id.as_ref(), diagnostics) {
        return Ok(());
    }
    let Some(assembly) = record.assembly else {
        diagnostics.push(Diagnostic::glyph(name, DiagnosticKind::AssemblyMissing));
        return Ok(());
    };
    if assembly.is_empty() {
        diagnostics.push(Diagnostic::glyph(name, DiagnosticKind::EmptyGlyphProgram));
        return Ok(());
    }
    let bytecode = assembler
        .assemble(&assembly)
        .map_err(|error| Error::Assembly {
            location: format!("glyph '{name}'"),
            error,
        })?;
    if let Some(glyph) = glyphs.get_mut(gid) {
        glyph.glyph.set_program(bytecode);
    }
    Ok(())
}
