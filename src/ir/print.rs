use std::fmt::Write;

use crate::intern::Interner;
use crate::ir::function::Function;
use crate::ir::instruction::{Instruction, Member};
use crate::ir::module::Module;
use crate::ir::value::{Constant, Value};

/// Renders every function of `module` in its textual form.
pub fn print_module(module: &Module, interner: &Interner) -> String {
    let mut out = String::new();
    for (name, function) in &module.functions {
        print_function(&mut out, interner.resolve(*name), function, interner);
    }
    out
}

/// `fun <name>(l1:l2:…) =` followed by indented block headers and one line
/// per instruction.
pub fn print_function(out: &mut String, name: &str, function: &Function, interner: &Interner) {
    let labels: String = function
        .labels
        .iter()
        .map(|l| match l {
            Some(s) => format!("{}:", interner.resolve(*s)),
            None => "_:".to_string(),
        })
        .collect();
    if !function.is_defined() {
        let _ = writeln!(out, "fun {}({})", name, labels);
        return;
    }
    let _ = writeln!(out, "fun {}({}) =", name, labels);
    for block in function.blocks() {
        let _ = writeln!(out, "  b{} =", block.index());
        for id in function.instructions_in(block) {
            let instruction = function.instruction(id);
            let rendered = render_instruction(instruction, interner);
            if instruction.produces_value() {
                let _ = writeln!(out, "    %{} = {}", id.index(), rendered);
            } else {
                let _ = writeln!(out, "    {}", rendered);
            }
        }
    }
}

fn render_instruction(instruction: &Instruction, interner: &Interner) -> String {
    match instruction {
        Instruction::Alloc { .. } => "alloc".to_string(),
        Instruction::Access { source, capability, .. } => {
            format!("access [{}] {}", capability.spelling(), render_value(source, interner))
        }
        Instruction::EndAccess { start, .. } => {
            format!("end_access {}", render_value(start, interner))
        }
        Instruction::Store { value, target, .. } => {
            format!("store {}, {}", render_value(value, interner), render_value(target, interner))
        }
        Instruction::Member { whole, member, .. } => {
            let selector = match member {
                Member::Name(s) => interner.resolve(*s).to_string(),
                Member::Index(i) => i.to_string(),
            };
            format!("member {}, {}", render_value(whole, interner), selector)
        }
        Instruction::Invoke { callee, labels, arguments, .. } => {
            format!("invoke {}", render_application(callee, labels, arguments, interner))
        }
        Instruction::Project { callee, labels, arguments, .. } => {
            format!("project {}", render_application(callee, labels, arguments, interner))
        }
        Instruction::Branch { target, arguments, .. } => {
            let arguments: Vec<String> =
                arguments.iter().map(|a| render_value(a, interner)).collect();
            format!("branch b{}({})", target.index(), arguments.join(", "))
        }
        Instruction::CondBranch { condition, success, failure, .. } => format!(
            "cond_branch {}, b{}, b{}",
            render_value(condition, interner),
            success.index(),
            failure.index()
        ),
        Instruction::Return { value, .. } => format!("return {}", render_value(value, interner)),
        Instruction::Throw { value, .. } => format!("throw {}", render_value(value, interner)),
        Instruction::Yield { value, .. } => format!("yield {}", render_value(value, interner)),
    }
}

fn render_application(
    callee: &Value,
    labels: &[Option<crate::intern::Symbol>],
    arguments: &[Value],
    interner: &Interner,
) -> String {
    let rendered: Vec<String> = arguments
        .iter()
        .enumerate()
        .map(|(i, a)| match labels.get(i).copied().flatten() {
            Some(label) => format!("{}: {}", interner.resolve(label), render_value(a, interner)),
            None => render_value(a, interner),
        })
        .collect();
    format!("{}({})", render_value(callee, interner), rendered.join(", "))
}

fn render_value(value: &Value, interner: &Interner) -> String {
    match value {
        Value::Register(id) => format!("%{}", id.index()),
        Value::Parameter(block, index) => format!("%b{}.{}", block.index(), index),
        Value::Constant(constant) => match constant {
            Constant::Unit => "unit".to_string(),
            Constant::Bool(b) => b.to_string(),
            Constant::Int(i) => i.to_string(),
            Constant::Float(f) => f.to_f64().to_string(),
            Constant::String(s) => format!("{:?}", interner.resolve(*s)),
            Constant::Function(f) => format!("@{}", interner.resolve(*f)),
            Constant::Builtin(b) => format!("#{}", b.spelling()),
        },
        Value::Poison(_) => "poison".to_string(),
    }
}
