use std::collections::{HashMap, HashSet};

use crate::ast::{AnyNodeId, FunctionDeclarationId, Module, Syntax, SyntaxTag};
use crate::intern::Symbol;
use crate::source::SourceSpan;
use crate::visitor::{traverse, Visitor};

/// Enumerates the free names of a function declaration: every unqualified
/// name occurrence whose identifier is not bound inside the function, with
/// its occurrence sites. Functions with no captures can be hoisted and
/// lowered out of line.
pub fn captures(module: &Module, function: FunctionDeclarationId) -> HashMap<Symbol, Vec<SourceSpan>> {
    enumerate(module, function, HashSet::new())
}

fn enumerate(
    module: &Module,
    function: FunctionDeclarationId,
    inherited: HashSet<Symbol>,
) -> HashMap<Symbol, Vec<SourceSpan>> {
    let mut enumerator = Enumerator {
        root: function.erased(),
        bound: inherited,
        free: HashMap::new(),
    };
    if let Some(name) = module.function(function).name {
        enumerator.bound.insert(name.stem);
    }
    traverse(module, &mut enumerator, function.erased());
    enumerator.free
}

struct Enumerator {
    root: AnyNodeId,
    bound: HashSet<Symbol>,
    free: HashMap<Symbol, Vec<SourceSpan>>,
}

impl Visitor for Enumerator {
    fn will_enter(&mut self, module: &Module, id: AnyNodeId) -> bool {
        match module.node(id) {
            Syntax::Function(declaration) if id != self.root => {
                // Nested functions get a child enumerator inheriting the
                // bound set; their free names merge into ours, and their own
                // name becomes bound like a struct or trait name.
                let nested = module.cast_to_function(id).unwrap();
                for (name, sites) in enumerate(module, nested, self.bound.clone()) {
                    self.free.entry(name).or_default().extend(sites);
                }
                if let Some(name) = declaration.name {
                    self.bound.insert(name.stem);
                }
                false
            }
            Syntax::Struct(n) => {
                self.bound.insert(n.name);
                true
            }
            Syntax::Trait(n) => {
                self.bound.insert(n.name);
                true
            }
            Syntax::Parameter(n) => {
                self.bound.insert(n.identifier);
                true
            }
            Syntax::Variable(n) => {
                self.bound.insert(n.identifier);
                true
            }
            Syntax::NameExpression(n) => {
                if n.qualification.is_none() && !self.bound.contains(&n.name.stem) {
                    self.free.entry(n.name.stem).or_default().push(n.site);
                }
                true
            }
            _ => {
                debug_assert!(id != self.root || module.tag(id) == SyntaxTag::Function);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use crate::parser::parse;
    use crate::source::{SourceFile, SourceName};

    fn first_function(text: &str) -> (Module, FunctionDeclarationId, Interner) {
        let file = SourceFile::new(SourceName::Virtual(0), text);
        let mut interner = Interner::new();
        let module = parse(&file, 0, &mut interner, true);
        assert!(module.diagnostics.is_empty());
        let function = module.cast_to_function(module.roots[0]).unwrap();
        (module, function, interner)
    }

    #[test]
    fn parameters_and_locals_are_bound() {
        let (module, function, _) = first_function("fun f(x) =\n  let y = x\n  y\n");
        assert!(captures(&module, function).is_empty());
    }

    #[test]
    fn unbound_names_are_free() {
        let (module, function, interner) = first_function("fun f(x) = x + ceiling");
        let free = captures(&module, function);
        let ceiling = interner.lookup("ceiling").unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[&ceiling].len(), 1);
    }

    #[test]
    fn qualified_names_do_not_capture() {
        let (module, function, _) = first_function("fun f(x) = x.count");
        assert!(captures(&module, function).is_empty());
    }

    #[test]
    fn recursion_through_the_own_name_is_not_a_capture() {
        let (module, function, _) = first_function("fun f(x) = f(x)");
        assert!(captures(&module, function).is_empty());
    }

    #[test]
    fn nested_functions_merge_their_captures() {
        let (module, function, interner) =
            first_function("fun f(x) =\n  fun g(y) = y + outer\n  g(x)\n");
        let free = captures(&module, function);
        let outer = interner.lookup("outer").unwrap();
        assert!(free.contains_key(&outer));
        // `g` resolves through the lexical lookup, not a capture of `f`.
        assert!(!free.contains_key(&interner.lookup("x").unwrap()));
    }

    #[test]
    fn nested_function_bodies_see_enclosing_bindings() {
        let (module, function, _) = first_function("fun f(x) =\n  fun g(y) = y + x\n  g(1)\n");
        let free = captures(&module, function);
        // `x` is bound in `f`, so even its use inside `g` is not free of `f`.
        assert!(free.is_empty());
    }
}
