//! Reporting problems that do not abort compilation.

use write_fonts::types::Tag;

use crate::LOG_TARGET;

/// The severity of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Error,
    Warning,
    Info,
    Debug,
}

/// The item a [`Diagnostic`] is about.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    Glyph(String),
    Table(Tag),
}

/// Something that went wrong (or is merely worth mentioning) while
/// compiling instructions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DiagnosticKind {
    /// The compiled glyph has no counterpart in the source, e.g. `.notdef`.
    GlyphNotInSource,
    /// The glyph's instruction record has no `id`.
    HashMissing,
    /// The glyph's outline changed since its program was written.
    HashMismatch,
    /// A component of the glyph could not be resolved while hashing.
    UnresolvedComponent { glyph_id: u16 },
    /// The glyph's instruction record has no `assembly`.
    AssemblyMissing,
    /// The glyph's assembly is empty.
    EmptyGlyphProgram,
    /// The assembly for a font-wide program is empty.
    EmptyTableProgram,
    /// An empty program was removed from a composite glyph.
    EmptyCompositeProgramRemoved,
    /// The source and compiled glyph disagree on the number of components.
    ComponentCountMismatch { source: usize, compiled: usize },
    /// More than one component asked to provide the glyph's metrics.
    DuplicateUseMyMetrics {
        component: String,
        claimed_by: String,
    },
}

/// A single reported problem.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub scope: Scope,
    pub kind: DiagnosticKind,
}

/// An ordered collection of diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics(Vec<Diagnostic>);

impl DiagnosticKind {
    /// The severity of this kind of problem.
    pub fn level(&self) -> Level {
        match self {
            DiagnosticKind::HashMissing
            | DiagnosticKind::HashMismatch
            | DiagnosticKind::UnresolvedComponent { .. }
            | DiagnosticKind::AssemblyMissing
            | DiagnosticKind::ComponentCountMismatch { .. } => Level::Error,
            DiagnosticKind::DuplicateUseMyMetrics { .. } => Level::Warning,
            DiagnosticKind::GlyphNotInSource => Level::Info,
            DiagnosticKind::EmptyGlyphProgram
            | DiagnosticKind::EmptyTableProgram
            | DiagnosticKind::EmptyCompositeProgramRemoved => Level::Debug,
        }
    }
}

impl From<Level> for log::Level {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => log::Level::Error,
            Level::Warning => log::Level::Warn,
            Level::Info => log::Level::Info,
            Level::Debug => log::Level::Debug,
        }
    }
}

impl Diagnostic {
    pub fn glyph(name: impl Into<String>, kind: DiagnosticKind) -> Self {
        Diagnostic {
            scope: Scope::Glyph(name.into()),
            kind,
        }
    }

    pub fn table(tag: Tag, kind: DiagnosticKind) -> Self {
        Diagnostic {
            scope: Scope::Table(tag),
            kind,
        }
    }

    pub fn level(&self) -> Level {
        self.kind.level()
    }

    /// Forward this diagnostic to the [`log`] crate at the matching level.
    pub fn emit(&self) {
        log::log!(target: LOG_TARGET, log::Level::from(self.level()), "{self}");
    }
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `true` if any diagnostic has [`Level::Error`].
    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.level() == Level::Error)
    }

    /// Forward every diagnostic, in order, to the [`log`] crate.
    pub fn emit(&self) {
        self.0.iter().for_each(Diagnostic::emit);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Glyph(name) => write!(f, "glyph '{name}'"),
            Scope::Table(tag) => write!(f, "table '{tag}'"),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scope = &self.scope;
        match &self.kind {
            DiagnosticKind::GlyphNotInSource => write!(
                f,
                "skipping compilation of instructions for {scope} because it is not in the source"
            ),
            DiagnosticKind::HashMissing => write!(
                f,
                "glyph hash missing, {scope} will have no instructions in font"
            ),
            DiagnosticKind::HashMismatch => write!(
                f,
                "glyph hash mismatch, {scope} will have no instructions in font"
            ),
            DiagnosticKind::UnresolvedComponent { glyph_id } => write!(
                f,
                "component glyph {glyph_id} of {scope} cannot be resolved, it will have no instructions in font"
            ),
            DiagnosticKind::AssemblyMissing => write!(
                f,
                "glyph assembly missing, {scope} will have no instructions in font"
            ),
            DiagnosticKind::EmptyGlyphProgram => write!(f, "{scope} has no instructions"),
            DiagnosticKind::EmptyTableProgram => {
                write!(f, "assembly for {scope} is empty, table not added to font")
            }
            DiagnosticKind::EmptyCompositeProgramRemoved => {
                write!(f, "removing empty program from composite {scope}")
            }
            DiagnosticKind::ComponentCountMismatch { source, compiled } => write!(
                f,
                "number of components differ between source and compiled {scope} \
                 ({source} vs. {compiled}), not setting component flags from source"
            ),
            DiagnosticKind::DuplicateUseMyMetrics {
                component,
                claimed_by,
            } => write!(
                f,
                "ignoring USE_MY_METRICS flag on component '{component}' because it has \
                 been set on component '{claimed_by}' already in {scope}"
            ),
        }
    }
}
