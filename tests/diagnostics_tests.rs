//! Diagnostic accumulation, ordering and rendering over whole programs.

use dyva::diagnostic::Level;
use dyva::program::Program;
use dyva::source::{SourceFile, SourceName};

fn load(text: &str) -> (Program, u32) {
    let mut program = Program::new();
    let id = program.load(SourceFile::new(SourceName::Virtual(0), text), true);
    (program, id)
}

#[test]
fn lowering_continues_past_semantic_errors() {
    let (program, id) = load("print(a)\nprint(b)\nprint(c)\n");
    let module = program.module(id);
    let messages: Vec<_> = module.syntax.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "undefined symbol 'a'",
            "undefined symbol 'b'",
            "undefined symbol 'c'",
        ]
    );
}

#[test]
fn sorting_orders_by_start_position() {
    let (program, id) = load("print(b)\nprint(a)\n");
    let module = program.module(id);
    let sorted = module.syntax.diagnostics.sorted(&program.sources);
    let starts: Vec<_> = sorted.iter().map(|d| d.site.start).collect();
    let mut expected = starts.clone();
    expected.sort_unstable();
    assert_eq!(starts, expected);
}

#[test]
fn lexical_errors_surface_as_parse_diagnostics() {
    let (program, id) = load("print(\"Hello");
    let module = program.module(id);
    assert!(module.syntax.diagnostics.contains_error());
    assert!(module
        .syntax
        .diagnostics
        .iter()
        .any(|d| d.message == "unterminated string literal"));
}

#[test]
fn unterminated_backquotes_surface_too() {
    let (program, id) = load("let `broken = 1");
    let module = program.module(id);
    assert!(module.syntax.diagnostics.contains_error());
}

#[test]
fn notes_keep_the_note_level() {
    let (program, id) = load("subscript s(x) =\n  yield x\n  yield x\n");
    let module = program.module(id);
    let diagnostic = module
        .syntax
        .diagnostics
        .iter()
        .find(|d| !d.notes.is_empty())
        .expect("expected a diagnostic with a note");
    assert_eq!(diagnostic.level, Level::Error);
    assert!(diagnostic.notes.iter().all(|n| n.level == Level::Note));
}

#[test]
fn rendering_includes_every_note_line() {
    let (program, id) = load("subscript s(x) =\n  yield x\n  yield x\n");
    let module = program.module(id);
    let rendered: String = module
        .syntax
        .diagnostics
        .sorted(&program.sources)
        .iter()
        .map(|d| d.render(&program.sources, false))
        .collect();
    assert!(rendered.contains("error: subscript cannot project more than once"));
    assert!(rendered.contains("note: the first projection is here"));
}

#[test]
fn errors_anywhere_mark_the_program() {
    let (program, _) = load("print(1)");
    assert!(!program.contains_error());
    let (program, _) = load("print(missing)");
    assert!(program.contains_error());
}
