use crate::ast::*;
use crate::intern::Symbol;

/// A structural pre-order traversal over one module.
///
/// `will_enter` runs before a node's children; returning `false` skips the
/// subtree (and the matching `will_exit`). Children are dispatched by tag,
/// exhaustively per kind.
pub trait Visitor {
    fn will_enter(&mut self, _module: &Module, _id: AnyNodeId) -> bool {
        true
    }

    fn will_exit(&mut self, _module: &Module, _id: AnyNodeId) {}
}

/// Visits `id` and its subtree.
pub fn traverse<V: Visitor>(module: &Module, visitor: &mut V, id: AnyNodeId) {
    if !visitor.will_enter(module, id) {
        return;
    }
    for child in children(module, id) {
        traverse(module, visitor, child);
    }
    visitor.will_exit(module, id);
}

/// Visits every root of the module.
pub fn traverse_roots<V: Visitor>(module: &Module, visitor: &mut V) {
    for &root in &module.roots {
        traverse(module, visitor, root);
    }
}

/// The direct children of `id`, in source order.
pub fn children(module: &Module, id: AnyNodeId) -> Vec<AnyNodeId> {
    let mut out = Vec::new();
    let push = |out: &mut Vec<AnyNodeId>, id: AnyNodeId| out.push(id);
    match module.node(id) {
        Syntax::Binding(n) => {
            push(&mut out, n.pattern.erased());
            if let Some(e) = n.initializer {
                push(&mut out, e.erased());
            }
        }
        Syntax::Function(n) => {
            for p in &n.parameters {
                push(&mut out, p.erased());
            }
            if let Some(body) = &n.body {
                for s in body {
                    push(&mut out, s.erased());
                }
            }
        }
        Syntax::Parameter(n) => {
            if let Some(e) = n.default {
                push(&mut out, e.erased());
            }
        }
        Syntax::Struct(n) => {
            for e in &n.interfaces {
                push(&mut out, e.erased());
            }
            for d in &n.members {
                push(&mut out, d.erased());
            }
        }
        Syntax::Trait(n) => {
            for e in &n.interfaces {
                push(&mut out, e.erased());
            }
            for d in &n.members {
                push(&mut out, d.erased());
            }
        }
        Syntax::Field(n) => {
            if let Some(e) = n.default {
                push(&mut out, e.erased());
            }
        }
        Syntax::Variable(_) | Syntax::Import(_) => {}
        Syntax::BooleanLiteral(_)
        | Syntax::IntegerLiteral(_)
        | Syntax::FloatingPointLiteral(_)
        | Syntax::StringLiteral(_) => {}
        Syntax::ArrayLiteral(n) => {
            for e in &n.elements {
                push(&mut out, e.erased());
            }
        }
        Syntax::DictionaryLiteral(n) => {
            for (k, v) in &n.elements {
                push(&mut out, k.erased());
                push(&mut out, v.erased());
            }
        }
        Syntax::TupleLiteral(n) => {
            for e in &n.elements {
                push(&mut out, e.value.erased());
            }
        }
        Syntax::NameExpression(n) => {
            if let Some(q) = n.qualification {
                push(&mut out, q.erased());
            }
        }
        Syntax::Call(n) => {
            push(&mut out, n.callee.erased());
            for a in &n.arguments {
                push(&mut out, a.value.erased());
            }
        }
        Syntax::TypeTest(n) => {
            push(&mut out, n.lhs.erased());
            push(&mut out, n.rhs.erased());
        }
        Syntax::Lambda(n) => push(&mut out, n.function.erased()),
        Syntax::Conditional(n) => {
            for c in &n.conditions {
                push(&mut out, c.erased());
            }
            push(&mut out, n.success.erased());
            if let Some(f) = n.failure {
                push(&mut out, f.erased());
            }
        }
        Syntax::Match(n) => {
            push(&mut out, n.scrutinee.erased());
            for c in &n.cases {
                push(&mut out, c.erased());
            }
        }
        Syntax::MatchCase(n) => {
            push(&mut out, n.pattern.erased());
            for s in &n.body {
                push(&mut out, s.erased());
            }
        }
        Syntax::Try(n) => {
            for s in &n.body {
                push(&mut out, s.erased());
            }
            for h in &n.handlers {
                push(&mut out, h.erased());
            }
        }
        Syntax::BindingPattern(n) => push(&mut out, n.subpattern.erased()),
        Syntax::TuplePattern(n) => {
            for e in &n.elements {
                push(&mut out, e.value.erased());
            }
        }
        Syntax::ExtractorPattern(n) => {
            push(&mut out, n.callee.erased());
            for a in &n.arguments {
                push(&mut out, a.value.erased());
            }
        }
        Syntax::TypePattern(n) => {
            push(&mut out, n.lhs.erased());
            push(&mut out, n.rhs.erased());
        }
        Syntax::Wildcard(_) => {}
        Syntax::Block(n) => {
            for s in &n.statements {
                push(&mut out, s.erased());
            }
        }
        Syntax::Break(_) | Syntax::Continue(_) => {}
        Syntax::Defer(n) => push(&mut out, n.body.erased()),
        Syntax::For(n) => {
            push(&mut out, n.pattern.erased());
            push(&mut out, n.domain.erased());
            if let Some(f) = n.filter {
                push(&mut out, f.erased());
            }
            push(&mut out, n.body.erased());
        }
        Syntax::While(n) => {
            for c in &n.conditions {
                push(&mut out, c.erased());
            }
            push(&mut out, n.body.erased());
        }
        Syntax::Return(n) => {
            if let Some(e) = n.value {
                push(&mut out, e.erased());
            }
        }
        Syntax::Throw(n) => push(&mut out, n.value.erased()),
        Syntax::Yield(n) => push(&mut out, n.value.erased()),
        Syntax::Assignment(n) => {
            push(&mut out, n.target.erased());
            push(&mut out, n.value.erased());
        }
    }
    out
}

/// A step of a tuple path leading to a pattern leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathComponent {
    Index(usize),
    Label(Symbol),
}

fn component(index: usize, label: Option<Symbol>) -> PathComponent {
    match label {
        Some(l) => PathComponent::Label(l),
        None => PathComponent::Index(index),
    }
}

/// Walks `pattern` alongside `expression`, calling `f` at each leaf with the
/// tuple path from the root. A tuple pattern aligned with a tuple literal of
/// identical labels is visited element-wise; any other pairing fires the
/// callback at the pair as a whole. Binding introducers are transparent.
pub fn walk_pattern_with_expression<F>(
    module: &Module,
    pattern: PatternId,
    expression: ExpressionId,
    f: &mut F,
) where
    F: FnMut(PatternId, ExpressionId, &[PathComponent]),
{
    let mut path = Vec::new();
    walk_pair(module, pattern, expression, &mut path, f);
}

fn walk_pair<F>(
    module: &Module,
    pattern: PatternId,
    expression: ExpressionId,
    path: &mut Vec<PathComponent>,
    f: &mut F,
) where
    F: FnMut(PatternId, ExpressionId, &[PathComponent]),
{
    match (module.node(pattern.erased()), module.node(expression.erased())) {
        (Syntax::BindingPattern(p), _) => walk_pair(module, p.subpattern, expression, path, f),
        (Syntax::TuplePattern(p), Syntax::TupleLiteral(e))
            if p.elements.len() == e.elements.len()
                && p.elements.iter().zip(&e.elements).all(|(a, b)| a.label == b.label) =>
        {
            for (i, (pe, ee)) in p.elements.iter().zip(&e.elements).enumerate() {
                path.push(component(i, pe.label));
                walk_pair(module, pe.value, ee.value, path, f);
                path.pop();
            }
        }
        _ => f(pattern, expression, path),
    }
}

/// Enumerates the variable declarations introduced by `pattern` with the
/// tuple path to each.
pub fn for_each_variable_declaration<F>(module: &Module, pattern: PatternId, f: &mut F)
where
    F: FnMut(VariableDeclarationId, &[PathComponent]),
{
    let mut path = Vec::new();
    each_variable(module, pattern, &mut path, f);
}

fn each_variable<F>(
    module: &Module,
    pattern: PatternId,
    path: &mut Vec<PathComponent>,
    f: &mut F,
) where
    F: FnMut(VariableDeclarationId, &[PathComponent]),
{
    match module.node(pattern.erased()) {
        Syntax::BindingPattern(p) => each_variable(module, p.subpattern, path, f),
        Syntax::TuplePattern(p) => {
            for (i, e) in p.elements.iter().enumerate() {
                path.push(component(i, e.label));
                each_variable(module, e.value, path, f);
                path.pop();
            }
        }
        Syntax::ExtractorPattern(p) => {
            for (i, e) in p.arguments.iter().enumerate() {
                path.push(component(i, e.label));
                each_variable(module, e.value, path, f);
                path.pop();
            }
        }
        Syntax::TypePattern(p) => each_variable(module, p.lhs, path, f),
        Syntax::Variable(_) => {
            let id = module.cast_to_variable(pattern.erased()).unwrap();
            f(id, path);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use crate::source::SourceSpan;

    struct Counter {
        entered: usize,
        exited: usize,
        skip: Option<SyntaxTag>,
    }

    impl Visitor for Counter {
        fn will_enter(&mut self, module: &Module, id: AnyNodeId) -> bool {
            if Some(module.tag(id)) == self.skip {
                return false;
            }
            self.entered += 1;
            true
        }

        fn will_exit(&mut self, _module: &Module, _id: AnyNodeId) {
            self.exited += 1;
        }
    }

    fn span() -> SourceSpan {
        SourceSpan::new(0, 0, 1)
    }

    /// `f((1, 2))`, returning (module, call id).
    fn sample() -> (Module, AnyNodeId) {
        let mut interner = Interner::new();
        let mut module = Module::new(0);
        let one = module.insert(Syntax::IntegerLiteral(LiteralExpression { site: span() }));
        let two = module.insert(Syntax::IntegerLiteral(LiteralExpression { site: span() }));
        let tuple = module.insert(Syntax::TupleLiteral(TupleLiteral {
            elements: vec![
                LabeledExpression { label: None, value: ExpressionId::new(one) },
                LabeledExpression { label: None, value: ExpressionId::new(two) },
            ],
            site: span(),
        }));
        let callee = module.insert(Syntax::NameExpression(NameExpression {
            qualification: None,
            name: Name::plain(interner.intern("f")),
            site: span(),
        }));
        let call = module.insert(Syntax::Call(CallExpression {
            callee: ExpressionId::new(callee),
            arguments: vec![LabeledExpression { label: None, value: ExpressionId::new(tuple) }],
            style: CallStyle::Parenthesized,
            site: span(),
        }));
        (module, call)
    }

    #[test]
    fn traversal_is_exhaustive_and_balanced() {
        let (module, call) = sample();
        let mut counter = Counter { entered: 0, exited: 0, skip: None };
        traverse(&module, &mut counter, call);
        assert_eq!(counter.entered, 5);
        assert_eq!(counter.exited, 5);
    }

    #[test]
    fn declining_entry_skips_the_subtree() {
        let (module, call) = sample();
        let mut counter = Counter { entered: 0, exited: 0, skip: Some(SyntaxTag::TupleLiteral) };
        traverse(&module, &mut counter, call);
        // call + callee; the tuple and its two elements are skipped.
        assert_eq!(counter.entered, 2);
        assert_eq!(counter.exited, 2);
    }

    #[test]
    fn aligned_tuples_are_walked_element_wise() {
        let mut interner = Interner::new();
        let mut module = Module::new(0);
        let x = module.insert(Syntax::Variable(VariableDeclaration {
            identifier: interner.intern("x"),
            site: span(),
        }));
        let y = module.insert(Syntax::Variable(VariableDeclaration {
            identifier: interner.intern("y"),
            site: span(),
        }));
        let pattern = module.insert(Syntax::TuplePattern(TuplePattern {
            elements: vec![
                LabeledPattern { label: None, value: PatternId::new(x) },
                LabeledPattern { label: None, value: PatternId::new(y) },
            ],
            site: span(),
        }));
        let one = module.insert(Syntax::IntegerLiteral(LiteralExpression { site: span() }));
        let two = module.insert(Syntax::IntegerLiteral(LiteralExpression { site: span() }));
        let value = module.insert(Syntax::TupleLiteral(TupleLiteral {
            elements: vec![
                LabeledExpression { label: None, value: ExpressionId::new(one) },
                LabeledExpression { label: None, value: ExpressionId::new(two) },
            ],
            site: span(),
        }));

        let mut leaves = Vec::new();
        walk_pattern_with_expression(
            &module,
            PatternId::new(pattern),
            ExpressionId::new(value),
            &mut |p, e, path| leaves.push((p.erased(), e.erased(), path.to_vec())),
        );
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].0, x);
        assert_eq!(leaves[0].1, one);
        assert_eq!(leaves[0].2, vec![PathComponent::Index(0)]);
        assert_eq!(leaves[1].2, vec![PathComponent::Index(1)]);
    }

    #[test]
    fn misaligned_tuples_fire_at_the_whole() {
        let mut interner = Interner::new();
        let mut module = Module::new(0);
        let x = module.insert(Syntax::Variable(VariableDeclaration {
            identifier: interner.intern("x"),
            site: span(),
        }));
        let pattern = module.insert(Syntax::TuplePattern(TuplePattern {
            elements: vec![LabeledPattern { label: None, value: PatternId::new(x) }],
            site: span(),
        }));
        let scrutinee = module.insert(Syntax::IntegerLiteral(LiteralExpression { site: span() }));

        let mut leaves = Vec::new();
        walk_pattern_with_expression(
            &module,
            PatternId::new(pattern),
            ExpressionId::new(scrutinee),
            &mut |p, e, path| leaves.push((p.erased(), e.erased(), path.len())),
        );
        assert_eq!(leaves, vec![(pattern, scrutinee, 0)]);
    }

    #[test]
    fn variable_enumeration_reports_paths() {
        let mut interner = Interner::new();
        let mut module = Module::new(0);
        let first = interner.intern("first");
        let x = module.insert(Syntax::Variable(VariableDeclaration {
            identifier: interner.intern("x"),
            site: span(),
        }));
        let wildcard = module.insert(Syntax::Wildcard(WildcardPattern { site: span() }));
        let tuple = module.insert(Syntax::TuplePattern(TuplePattern {
            elements: vec![
                LabeledPattern { label: Some(first), value: PatternId::new(x) },
                LabeledPattern { label: None, value: PatternId::new(wildcard) },
            ],
            site: span(),
        }));
        let binding = module.insert(Syntax::BindingPattern(BindingPattern {
            introducer: BindingIntroducer::Let,
            subpattern: PatternId::new(tuple),
            site: span(),
        }));

        let mut seen = Vec::new();
        for_each_variable_declaration(&module, PatternId::new(binding), &mut |v, path| {
            seen.push((v.erased(), path.to_vec()));
        });
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, x);
        assert_eq!(seen[0].1, vec![PathComponent::Label(first)]);
    }
}
