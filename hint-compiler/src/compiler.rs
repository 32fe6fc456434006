//! The instruction compiler, tying the individual passes together.

use serde::Deserialize;
use write_fonts::{
    read::TopLevelTable, tables::maxp::Maxp, types::GlyphId16, validate::Validate, FontBuilder,
    FontWrite,
};

use crate::{
    assembler::{Assemble, Assembler},
    composite::set_composite_flags,
    cvt::Cvt,
    diagnostic::{Diagnostic, DiagnosticKind, Diagnostics},
    error::Error,
    glyph::{Glyph, GlyphSet},
    limits,
    program::{compile_glyph_program, compile_table_program, Fpgm, Prep, Program},
    record::FontHintRecord,
    source::SourceFont,
    Result,
};

/// Options that change how instructions are compiled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    /// If `true`, `USE_MY_METRICS` is chosen automatically elsewhere and is
    /// never set from the source.
    pub auto_use_my_metrics: bool,
}

/// Compiles the TrueType instructions of a font source.
///
/// The compiler only reads the source; the compiled glyphs, the `maxp`
/// table and the font builder it is handed are updated in place.
#[derive(Clone, Debug)]
pub struct InstructionCompiler<'a, A = Assembler> {
    source: &'a SourceFont,
    options: CompilerOptions,
    assembler: A,
}

impl<'a> InstructionCompiler<'a> {
    pub fn new(source: &'a SourceFont, options: CompilerOptions) -> Self {
        Self::with_assembler(source, options, Assembler)
    }
}

impl<'a, A: Assemble> InstructionCompiler<'a, A> {
    /// Create a compiler that uses a custom assembler.
    pub fn with_assembler(source: &'a SourceFont, options: CompilerOptions, assembler: A) -> Self {
        Self {
            source,
            options,
            assembler,
        }
    }

    /// The font-level instruction record, if the source has one.
    pub fn font_record(&self) -> Result<Option<FontHintRecord>> {
        FontHintRecord::from_lib(self.source.instructions())
    }

    /// Compile the `fpgm` table.
    pub fn setup_fpgm(&self, diagnostics: &mut Diagnostics) -> Result<Option<Fpgm>> {
        let Some(record) = self.font_record()? else {
            return Ok(None);
        };
        self.table_program(Program::Font, &record, diagnostics)
            .map(|bytecode| bytecode.map(Fpgm::new))
    }

    /// Compile the `prep` table.
    pub fn setup_prep(&self, diagnostics: &mut Diagnostics) -> Result<Option<Prep>> {
        let Some(record) = self.font_record()? else {
            return Ok(None);
        };
        self.table_program(Program::ControlValue, &record, diagnostics)
            .map(|bytecode| bytecode.map(Prep::new))
    }

    /// Build the `cvt ` table.
    pub fn setup_cvt(&self) -> Result<Option<Cvt>> {
        match self.font_record()? {
            Some(record) => Cvt::from_record(&record),
            None => Ok(None),
        }
    }

    /// Compile the program and component flags of a single glyph.
    ///
    /// Glyphs that are not in the source are left alone.
    pub fn compile_glyph_instructions(
        &self,
        glyphs: &mut GlyphSet,
        gid: GlyphId16,
    ) -> Result<Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        let Some(name) = glyphs.name(gid).map(str::to_owned) else {
            return Ok(diagnostics);
        };
        let Some(source_glyph) = self.source.glyph(&name) else {
            diagnostics.push(Diagnostic::glyph(name, DiagnosticKind::GlyphNotInSource));
            return Ok(diagnostics);
        };

        if let Some(raw) = source_glyph.instructions() {
            compile_glyph_program(glyphs, gid, raw, &self.assembler, &mut diagnostics)?;
        }

        let Some(compiled) = glyphs.get_mut(gid) else {
            return Ok(diagnostics);
        };
        if compiled.glyph.remove_empty_composite_program() {
            diagnostics.push(Diagnostic::glyph(
                name.as_str(),
                DiagnosticKind::EmptyCompositeProgramRemoved,
            ));
        }
        if let Glyph::Composite(composite) = &mut compiled.glyph {
            set_composite_flags(
                &name,
                source_glyph,
                composite,
                self.options.auto_use_my_metrics,
                &mut diagnostics,
            );
        }
        Ok(diagnostics)
    }

    /// Update the interpreter limits in `maxp`.
    ///
    /// This should run after all glyphs have been compiled.
    pub fn update_maxp(&self, glyphs: &GlyphSet, maxp: &mut Maxp) -> Result<()> {
        limits::update_maxp(self.font_record()?.as_ref(), glyphs, maxp);
        Ok(())
    }

    /// Compile everything: the font-wide tables, every glyph and the
    /// interpreter limits.
    ///
    /// The `fpgm`, `prep` and `cvt ` tables are added to `builder` if they
    /// have any content.
    pub fn compile(
        &self,
        glyphs: &mut GlyphSet,
        maxp: &mut Maxp,
        builder: &mut FontBuilder,
    ) -> Result<Diagnostics> {
        let record = self.font_record()?;
        let mut diagnostics = Diagnostics::new();

        if let Some(record) = &record {
            if let Some(bytecode) = self.table_program(Program::Font, record, &mut diagnostics)? {
                add_table(builder, &Fpgm::new(bytecode))?;
            }
            if let Some(bytecode) =
                self.table_program(Program::ControlValue, record, &mut diagnostics)?
            {
                add_table(builder, &Prep::new(bytecode))?;
            }
            if let Some(cvt) = Cvt::from_record(record)? {
                add_table(builder, &cvt)?;
            }
        }

        for gid in glyphs.glyph_ids() {
            diagnostics.extend(self.compile_glyph_instructions(glyphs, gid)?);
        }

        limits::update_maxp(record.as_ref(), glyphs, maxp);
        Ok(diagnostics)
    }

    fn table_program(
        &self,
        program: Program,
        record: &FontHintRecord,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Vec<u8>>> {
        compile_table_program(program, record, &self.assembler, diagnostics)
    }
}

fn add_table<T>(builder: &mut FontBuilder, table: &T) -> Result<()>
where
    T: FontWrite + Validate + TopLevelTable,
{
    let bytes = write_fonts::dump_table(table).map_err(|e| Error::Write {
        tag: T::TAG,
        message: e.to_string(),
    })?;
    builder.add_raw(T::TAG, bytes);
    Ok(())
}
