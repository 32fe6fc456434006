//! Errors that abort compilation

use write_fonts::types::Tag;

use crate::assembler::AssembleError;

/// A type alias for results returned by the instruction compiler.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A hard error, encountered while compiling instructions.
///
/// Problems that only affect a single glyph or table (a stale glyph hash,
/// a missing assembly string) are not errors; they are reported as
/// [`Diagnostic`][crate::Diagnostic]s and the affected item is skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The `formatVersion` of an instruction record is missing or is not a string.
    Format {
        location: String,
        /// The kind of value that was found instead.
        found: &'static str,
    },
    /// The `formatVersion` of an instruction record is not supported.
    UnsupportedVersion { location: String, version: String },
    /// A field of an instruction record has an unexpected shape.
    InvalidRecord { location: String, message: String },
    /// A key in the `controlValue` mapping is not a valid cvt index.
    InvalidControlValueIndex { key: String },
    /// Assembly source could not be turned into bytecode.
    Assembly {
        location: String,
        error: AssembleError,
    },
    /// A compiled table failed validation.
    Write { tag: Tag, message: String },
    /// A glyph was added to a glyph set that is already full.
    TooManyGlyphs { name: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Format { location, found } => write!(
                f,
                "illegal type '{found}' instead of 'string' for formatVersion of instructions in {location}"
            ),
            Error::UnsupportedVersion { location, version } => write!(
                f,
                "unknown formatVersion '{version}' for instructions in {location}"
            ),
            Error::InvalidRecord { location, message } => {
                write!(f, "malformed instructions in {location}: {message}")
            }
            Error::InvalidControlValueIndex { key } => {
                write!(f, "'{key}' is not a valid control value index")
            }
            Error::Assembly { location, error } => {
                write!(f, "failed to assemble {location}: {error}")
            }
            Error::Write { tag, message } => write!(f, "failed to compile '{tag}': {message}"),
            Error::TooManyGlyphs { name } => write!(
                f,
                "cannot add glyph '{name}': a font holds at most {} glyphs",
                crate::glyph::MAX_GLYPHS
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Assembly { error, .. } => Some(error),
            _ => None,
        }
    }
}
