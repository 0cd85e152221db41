//! Golden tests for the IR textual form.

use dyva::analysis::close_regions;
use dyva::ir::print_function;
use dyva::program::Program;
use dyva::source::{SourceFile, SourceName};

fn load(text: &str) -> (Program, u32) {
    let mut program = Program::new();
    let id = program.load(SourceFile::new(SourceName::Virtual(0), text), true);
    (program, id)
}

fn function_text(program: &Program, id: u32, name: &str) -> String {
    let symbol = program.interner.lookup(name).expect("function was lowered");
    let function = program.module(id).ir.function(symbol).unwrap();
    let mut out = String::new();
    print_function(&mut out, name, function, &program.interner);
    out
}

#[test]
fn the_entry_of_hello_prints_an_invoke_and_a_return() {
    let (program, id) = load("print(\"Hello\")");
    assert!(!program.contains_error());
    let expected =
        "fun $main() =\n  b0 =\n    %0 = invoke #print(\"Hello\")\n    return unit\n";
    assert_eq!(function_text(&program, id, "$main"), expected);
}

#[test]
fn operator_bodies_print_as_member_invocations() {
    let (program, id) = load("fun add(l, r) = l + r");
    assert!(!program.contains_error());
    let expected = "fun add(_:_:) =\n  b0 =\n    %0 = member %b0.0, +\n    %1 = invoke %0(%b0.1)\n    return %1\n";
    assert_eq!(function_text(&program, id, "add"), expected);
}

#[test]
fn undefined_functions_print_as_stubs() {
    let (program, id) = load("fun f(x)");
    assert_eq!(function_text(&program, id, "f"), "fun f(_:)\n");
}

#[test]
fn labeled_parameters_print_in_the_header() {
    let (program, id) = load("fun put(into x, y)");
    assert_eq!(function_text(&program, id, "put"), "fun put(into:_:)\n");
}

#[test]
fn region_closing_is_idempotent_at_the_pipeline_level() {
    let (mut program, id) = load("fun f(x) =\n  let y = x\n  print(y)\n  print(y)\n");
    assert!(!program.contains_error());
    let symbol = program.interner.lookup("f").unwrap();
    let before = function_text(&program, id, "f");
    let module = &mut program.modules[id as usize];
    close_regions(module.ir.function_mut(symbol).unwrap());
    let after = function_text(&program, id, "f");
    assert_eq!(before, after);
}
