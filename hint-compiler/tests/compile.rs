//! Compiling the instructions of a small font, end to end.

use hint_compiler::{
    glyph_hash, CompiledGlyph, CompilerOptions, CompositeGlyph, DiagnosticKind, Diagnostics,
    Glyph, GlyphSet, InstructionCompiler, Level, Scope, SourceComponent, SourceFont,
    SourceGlyph,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use write_fonts::{
    read::{tables::glyf::CurvePoint, FontRef},
    tables::{
        glyf::{Anchor, Component, ComponentFlags, SimpleGlyph, Transform},
        maxp::Maxp,
    },
    types::{GlyphId16, Tag},
    FontBuilder,
};

fn lib(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn contour(points: &[(i16, i16, bool)]) -> SimpleGlyph {
    SimpleGlyph {
        contours: vec![points
            .iter()
            .map(|(x, y, on_curve)| CurvePoint::new(*x, *y, *on_curve))
            .collect::<Vec<_>>()
            .into()],
        ..Default::default()
    }
}

fn component(gid: GlyphId16, x: i16) -> Component {
    Component::new(
        gid,
        Anchor::Offset { x, y: 0 },
        Transform::default(),
        ComponentFlags::default(),
    )
}

/// The compiled glyphs: `.notdef`, `a`, `b` and the composite `ab`.
fn compiled_glyphs() -> GlyphSet {
    let mut glyphs = GlyphSet::new();
    glyphs.push(".notdef", CompiledGlyph::new(500, SimpleGlyph::default())).unwrap();
    let a = glyphs
        .push(
            "a",
            CompiledGlyph::new(
                500,
                contour(&[(0, 0, true), (0, 500, false), (400, 500, true), (400, 0, true)]),
            ),
        )
        .unwrap();
    let b = glyphs
        .push(
            "b",
            CompiledGlyph::new(600, contour(&[(0, 0, true), (0, 700, true), (500, 0, true)])),
        )
        .unwrap();
    glyphs
        .push(
            "ab",
            CompiledGlyph::new(
                1100,
                CompositeGlyph::new([component(a, 0), component(b, 500)]),
            ),
        )
        .unwrap();
    glyphs
}

fn glyph_record(glyphs: &GlyphSet, name: &str, assembly: &str) -> Value {
    let gid = glyphs.glyph_id(name).unwrap();
    json!({
        "formatVersion": "1",
        "id": glyph_hash(glyphs, gid).unwrap(),
        "assembly": assembly,
    })
}

fn source_font(glyphs: &GlyphSet) -> SourceFont {
    let mut source = SourceFont::new();
    source.lib = lib(json!({
        "public.truetype.instructions": {
            "formatVersion": "1",
            "fontProgram": "PUSHB[]\n0\nFDEF[]\nPOP[]\nENDF[]",
            "controlValueProgram": "PUSHW[]\n511\nSCANCTRL[]",
            "controlValue": { "1": 500, "2": 750, "3": -250 },
            "maxStorage": 1,
            "maxFunctionDefs": 1,
            "maxInstructionDefs": 1,
            "maxStackElements": 1,
            "maxSizeOfInstructions": 1,
            "maxZones": 2,
            "maxTwilightPoints": 1,
        }
    }));
    source.insert_glyph(
        "a",
        SourceGlyph {
            components: Vec::new(),
            lib: lib(json!({
                "public.truetype.instructions": glyph_record(glyphs, "a", "PUSHB[]\n0\nMDAP[1]"),
            })),
        },
    );
    source.insert_glyph(
        "b",
        SourceGlyph {
            components: Vec::new(),
            lib: lib(json!({
                "public.truetype.instructions": glyph_record(glyphs, "b", ""),
            })),
        },
    );
    source.insert_glyph(
        "ab",
        SourceGlyph {
            components: vec![
                SourceComponent::new("a", Some("component0")),
                SourceComponent::new("b", Some("component1")),
            ],
            lib: lib(json!({
                "public.truetype.overlap": true,
                "public.objectLibs": {
                    "component0": { "public.truetype.useMyMetrics": true },
                    "component1": {
                        "public.truetype.useMyMetrics": true,
                        "public.truetype.roundOffsetToGrid": false,
                    },
                },
            })),
        },
    );
    source
}

fn compile(source: &SourceFont, glyphs: &mut GlyphSet) -> (Diagnostics, Maxp, Vec<u8>) {
    let compiler = InstructionCompiler::new(source, CompilerOptions::default());
    let mut maxp = Maxp {
        num_glyphs: glyphs.len() as u16,
        ..Default::default()
    };
    let mut builder = FontBuilder::new();
    let diagnostics = compiler
        .compile(glyphs, &mut maxp, &mut builder)
        .expect("compiles");
    (diagnostics, maxp, builder.build())
}

fn kinds(diagnostics: &Diagnostics) -> Vec<(Level, DiagnosticKind)> {
    diagnostics
        .iter()
        .map(|d| (d.level(), d.kind.clone()))
        .collect()
}

#[test]
fn compile_font() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut glyphs = compiled_glyphs();
    let source = source_font(&glyphs);
    let (diagnostics, maxp, font_data) = compile(&source, &mut glyphs);
    diagnostics.emit();

    assert_eq!(
        kinds(&diagnostics),
        [
            (Level::Info, DiagnosticKind::GlyphNotInSource),
            (Level::Debug, DiagnosticKind::EmptyGlyphProgram),
            (
                Level::Warning,
                DiagnosticKind::DuplicateUseMyMetrics {
                    component: "component1".into(),
                    claimed_by: "component0".into(),
                }
            ),
        ]
    );

    let font = FontRef::new(&font_data).unwrap();
    let table = |tag: &[u8; 4]| {
        font.table_data(Tag::new(tag))
            .map(|data| data.as_bytes().to_vec())
    };
    assert_eq!(table(b"fpgm"), Some(vec![0xB0, 0x00, 0x2C, 0x21, 0x2D]));
    assert_eq!(table(b"prep"), Some(vec![0xB8, 0x01, 0xFF, 0x85]));
    assert_eq!(
        table(b"cvt "),
        Some(vec![0x00, 0x00, 0x01, 0xF4, 0x02, 0xEE, 0xFF, 0x06])
    );

    assert_eq!(maxp.max_storage, Some(1));
    assert_eq!(maxp.max_function_defs, Some(1));
    assert_eq!(maxp.max_instruction_defs, Some(1));
    assert_eq!(maxp.max_stack_elements, Some(1));
    assert_eq!(maxp.max_zones, Some(2));
    assert_eq!(maxp.max_twilight_points, Some(1));
    assert_eq!(maxp.max_size_of_instructions, Some(3));

    let program = |name: &str| glyphs.get_by_name(name).unwrap().glyph.program();
    assert_eq!(program("a"), Some([0xB0, 0x00, 0x2F].as_slice()));
    assert_eq!(program("b"), None);
    assert_eq!(program(".notdef"), None);
    assert_eq!(program("ab"), None);

    let Glyph::Composite(ab) = &glyphs.get_by_name("ab").unwrap().glyph else {
        panic!("'ab' is not a composite");
    };
    let first = ab.components[0].flags;
    let second = ab.components[1].flags;
    assert!(first.round_xy_to_grid && first.use_my_metrics && first.overlap_compound);
    assert!(!second.round_xy_to_grid && !second.use_my_metrics && !second.overlap_compound);
}

#[test]
fn compiling_twice_is_idempotent() {
    let pristine = compiled_glyphs();
    let source = source_font(&pristine);

    let mut once = pristine.clone();
    let first = compile(&source, &mut once);
    let mut twice = once.clone();
    let second = compile(&source, &mut twice);

    assert_eq!(first, second);
    assert_eq!(once, twice);
}

#[test]
fn changed_outline_drops_program() {
    let authored = compiled_glyphs();
    let source = source_font(&authored);

    // the outline of 'a' was edited after its program was written
    let mut glyphs = GlyphSet::new();
    for (_, name, glyph) in authored.iter() {
        let glyph = match name {
            "a" => CompiledGlyph::new(510, glyph.glyph.clone()),
            _ => glyph.clone(),
        };
        glyphs.push(name, glyph).unwrap();
    }

    let (diagnostics, maxp, _) = compile(&source, &mut glyphs);
    assert!(diagnostics.has_errors());
    assert!(kinds(&diagnostics).contains(&(Level::Error, DiagnosticKind::HashMismatch)));
    assert_eq!(glyphs.get_by_name("a").unwrap().glyph.program(), None);
    assert_eq!(maxp.max_size_of_instructions, Some(0));
}

#[test]
fn id_that_is_not_a_string_only_affects_its_glyph() {
    let mut glyphs = compiled_glyphs();
    let mut source = source_font(&glyphs);
    source.insert_glyph(
        "a",
        SourceGlyph {
            components: Vec::new(),
            lib: lib(json!({
                "public.truetype.instructions": {
                    "formatVersion": "1",
                    "id": 12345,
                    "assembly": "PUSHB[]\n0\nMDAP[1]",
                },
            })),
        },
    );
    source.insert_glyph(
        "b",
        SourceGlyph {
            components: Vec::new(),
            lib: lib(json!({
                "public.truetype.instructions":
                    glyph_record(&glyphs, "b", "PUSHB[]\n1\nMDAP[0]"),
            })),
        },
    );

    let (diagnostics, maxp, font_data) = compile(&source, &mut glyphs);
    assert!(diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::HashMismatch
            && d.scope == Scope::Glyph("a".into())));
    let program = |name: &str| glyphs.get_by_name(name).unwrap().glyph.program();
    assert_eq!(program("a"), None);
    assert_eq!(program("b"), Some([0xB0, 0x01, 0x2E].as_slice()));
    assert_eq!(maxp.max_size_of_instructions, Some(3));

    let font = FontRef::new(&font_data).unwrap();
    assert!(font.table_data(Tag::new(b"fpgm")).is_some());
}

#[test]
fn source_without_instructions() {
    let mut glyphs = compiled_glyphs();
    let mut source = SourceFont::new();
    for name in ["a", "b"] {
        source.insert_glyph(name, SourceGlyph::default());
    }
    source.insert_glyph(
        "ab",
        SourceGlyph {
            components: vec![SourceComponent::new("a", None), SourceComponent::new("b", None)],
            lib: Map::new(),
        },
    );

    let (diagnostics, maxp, font_data) = compile(&source, &mut glyphs);
    assert_eq!(
        kinds(&diagnostics),
        [(Level::Info, DiagnosticKind::GlyphNotInSource)]
    );
    let font = FontRef::new(&font_data).unwrap();
    for tag in [b"fpgm", b"prep", b"cvt "] {
        assert!(font.table_data(Tag::new(tag)).is_none());
    }
    assert_eq!(maxp.max_storage, None);
    assert_eq!(maxp.max_size_of_instructions, Some(0));

    let Glyph::Composite(ab) = &glyphs.get_by_name("ab").unwrap().glyph else {
        panic!("'ab' is not a composite");
    };
    assert!(ab.components.iter().all(|c| c.flags.round_xy_to_grid));
    assert!(ab.components.iter().all(|c| !c.flags.use_my_metrics));
}
