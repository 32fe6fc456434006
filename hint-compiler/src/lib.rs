//! Compiling TrueType hinting instructions from font sources.
//!
//! This crate takes glyphs that have already been compiled to TrueType
//! outlines and attaches the hinting programs authored for them in the font
//! source. It also builds the font-wide `fpgm`, `prep` and `cvt ` tables and
//! fills in the interpreter limits of the `maxp` table.
//!
//! Authored glyph programs are bound to the exact outline they were written
//! against through a content hash (see [`glyph_hash`]). A program whose hash
//! no longer matches the compiled glyph is dropped, and the glyph is left
//! unhinted.
//!
//! The main entry point is [`InstructionCompiler`]:
//!
//! ```no_run
//! use hint_compiler::{CompilerOptions, GlyphSet, InstructionCompiler, SourceFont};
//! use write_fonts::{tables::maxp::Maxp, FontBuilder};
//! # fn load() -> (SourceFont, GlyphSet, Maxp) { unimplemented!() }
//!
//! let (source, mut glyphs, mut maxp) = load();
//! let mut builder = FontBuilder::new();
//! let compiler = InstructionCompiler::new(&source, CompilerOptions::default());
//! let diagnostics = compiler
//!     .compile(&mut glyphs, &mut maxp, &mut builder)
//!     .expect("malformed instruction data");
//! diagnostics.emit();
//! ```

mod assembler;
mod composite;
mod compiler;
mod cvt;
mod diagnostic;
mod error;
mod glyph;
mod hash;
mod limits;
mod program;
mod record;
mod source;

pub use assembler::{Assemble, AssembleError, AssembleErrorKind, Assembler};
pub use compiler::{CompilerOptions, InstructionCompiler};
pub use composite::set_composite_flags;
pub use cvt::Cvt;
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics, Level, Scope};
pub use error::{Error, Result};
pub use glyph::{CompiledGlyph, CompositeGlyph, Glyph, GlyphSet, MAX_GLYPHS};
pub use hash::{glyph_hash, verify_glyph_hash, HashError};
pub use limits::update_maxp;
pub use program::{Fpgm, Prep, Program};
pub use record::{ComponentLib, FontHintRecord, FormatVersion, GlyphHintRecord};
pub use source::{keys, SourceComponent, SourceFont, SourceGlyph};

/// The target used for all log output from this crate.
pub(crate) const LOG_TARGET: &str = "hint_compiler";
