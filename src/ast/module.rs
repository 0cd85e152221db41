use std::collections::HashMap;

use crate::ast::ids::*;
use crate::ast::node::*;
use crate::diagnostic::DiagnosticSet;
use crate::intern::Symbol;
use crate::source::SourceSpan;

/// The arena of one source's syntax tree.
///
/// Node payloads and tags live in two parallel vectors; identities are
/// offsets into them and stay valid for the lifetime of the module (nodes are
/// never deleted). Parent pointers and the scope-to-declarations table start
/// empty and are filled by the scoper.
#[derive(Debug)]
pub struct Module {
    index: u32,
    nodes: Vec<Syntax>,
    tags: Vec<SyntaxTag>,
    parents: Vec<Option<u32>>,
    scope_declarations: HashMap<u32, Vec<DeclarationId>>,
    pub roots: Vec<AnyNodeId>,
    pub diagnostics: DiagnosticSet,
}

macro_rules! projection {
    ($fn_name:ident, $id:ty, $variant:ident, $payload:ty) => {
        pub fn $fn_name(&self, id: $id) -> &$payload {
            match self.node(id.erased()) {
                Syntax::$variant(payload) => payload,
                _ => unreachable!("typed identity with mismatched payload"),
            }
        }
    };
}

macro_rules! kind_cast {
    ($fn_name:ident, $id:ty, $tag:ident) => {
        pub fn $fn_name(&self, id: impl Into<AnyNodeId>) -> Option<$id> {
            let id = id.into();
            (self.tag(id) == SyntaxTag::$tag).then(|| <$id>::new(id))
        }
    };
}

impl Module {
    pub fn new(index: u32) -> Self {
        Module {
            index,
            nodes: Vec::new(),
            tags: Vec::new(),
            parents: Vec::new(),
            scope_declarations: HashMap::new(),
            roots: Vec::new(),
            diagnostics: DiagnosticSet::new(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The identity standing for this module as a scope.
    pub fn scope_id(&self) -> AnyNodeId {
        AnyNodeId::module_scope(self.index)
    }

    /// Appends a node, keeping payloads and tags in lockstep.
    pub fn insert(&mut self, node: Syntax) -> AnyNodeId {
        let offset = self.nodes.len() as u32;
        debug_assert!(offset < MODULE_OFFSET);
        self.tags.push(node.tag());
        self.nodes.push(node);
        self.parents.push(None);
        AnyNodeId::new(self.index, offset)
    }

    pub fn node(&self, id: AnyNodeId) -> &Syntax {
        assert_eq!(id.module(), self.index, "identity from another module");
        &self.nodes[id.offset() as usize]
    }

    pub fn tag(&self, id: impl Into<AnyNodeId>) -> SyntaxTag {
        let id = id.into();
        assert_eq!(id.module(), self.index, "identity from another module");
        self.tags[id.offset() as usize]
    }

    pub fn site(&self, id: impl Into<AnyNodeId>) -> SourceSpan {
        self.node(id.into()).site()
    }

    /// Every identity in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = AnyNodeId> + '_ {
        (0..self.nodes.len() as u32).map(|o| AnyNodeId::new(self.index, o))
    }

    // Category casts.

    pub fn cast_to_declaration(&self, id: impl Into<AnyNodeId>) -> Option<DeclarationId> {
        let id = id.into();
        self.tag(id).is_declaration().then(|| DeclarationId::new(id))
    }

    pub fn cast_to_expression(&self, id: impl Into<AnyNodeId>) -> Option<ExpressionId> {
        let id = id.into();
        self.tag(id).is_expression().then(|| ExpressionId::new(id))
    }

    pub fn cast_to_pattern(&self, id: impl Into<AnyNodeId>) -> Option<PatternId> {
        let id = id.into();
        self.tag(id).is_pattern().then(|| PatternId::new(id))
    }

    pub fn cast_to_statement(&self, id: impl Into<AnyNodeId>) -> Option<StatementId> {
        let id = id.into();
        self.tag(id).is_statement().then(|| StatementId::new(id))
    }

    pub fn cast_to_scope(&self, id: impl Into<AnyNodeId>) -> Option<ScopeId> {
        let id = id.into();
        self.tag(id).is_scope().then(|| ScopeId::new(id))
    }

    // Per-kind casts.

    kind_cast!(cast_to_function, FunctionDeclarationId, Function);
    kind_cast!(cast_to_binding, BindingDeclarationId, Binding);
    kind_cast!(cast_to_variable, VariableDeclarationId, Variable);
    kind_cast!(cast_to_import, ImportDeclarationId, Import);
    kind_cast!(cast_to_name_expression, NameExpressionId, NameExpression);
    kind_cast!(cast_to_conditional, ConditionalExpressionId, Conditional);
    kind_cast!(cast_to_block, BlockStatementId, Block);
    kind_cast!(cast_to_match_case, MatchCaseId, MatchCase);

    // Typed projections.

    projection!(binding, BindingDeclarationId, Binding, BindingDeclaration);
    projection!(function, FunctionDeclarationId, Function, FunctionDeclaration);
    projection!(parameter, ParameterId, Parameter, ParameterDeclaration);
    projection!(struct_declaration, StructDeclarationId, Struct, StructDeclaration);
    projection!(trait_declaration, TraitDeclarationId, Trait, TraitDeclaration);
    projection!(field, FieldDeclarationId, Field, FieldDeclaration);
    projection!(variable, VariableDeclarationId, Variable, VariableDeclaration);
    projection!(import, ImportDeclarationId, Import, ImportDeclaration);
    projection!(name_expression, NameExpressionId, NameExpression, NameExpression);
    projection!(conditional, ConditionalExpressionId, Conditional, ConditionalExpression);
    projection!(match_expression, MatchExpressionId, Match, MatchExpression);
    projection!(match_case, MatchCaseId, MatchCase, MatchCase);
    projection!(block, BlockStatementId, Block, BlockStatement);

    /// The argument labels of a function, for the call ABI.
    pub fn labels_of(&self, id: FunctionDeclarationId) -> Vec<Option<Symbol>> {
        self.function(id)
            .parameters
            .iter()
            .map(|p| self.parameter(*p).label)
            .collect()
    }

    // Scope relationships (filled by the scoper).

    /// The innermost scope containing `id`, or `None` before scoping. The
    /// module itself is returned as [`Module::scope_id`].
    pub fn parent(&self, id: impl Into<AnyNodeId>) -> Option<AnyNodeId> {
        let id = id.into();
        assert_eq!(id.module(), self.index, "identity from another module");
        self.parents[id.offset() as usize].map(|offset| AnyNodeId::new(self.index, offset))
    }

    pub(crate) fn set_parent(&mut self, offset: u32, parent: u32) {
        self.parents[offset as usize] = Some(parent);
    }

    pub(crate) fn seed_scope(&mut self, offset: u32) {
        self.scope_declarations.entry(offset).or_default();
    }

    pub(crate) fn append_scope_declaration(&mut self, scope: u32, declaration: DeclarationId) {
        self.scope_declarations.entry(scope).or_default().push(declaration);
    }

    /// The declarations lexically contained in a scope, in source order. The
    /// module scope resolves through the root view.
    pub fn declarations_lexically_in(&self, scope: u32) -> Vec<DeclarationId> {
        if scope == MODULE_OFFSET {
            self.roots.iter().filter_map(|&r| self.cast_to_declaration(r)).collect()
        } else {
            self.scope_declarations.get(&scope).cloned().unwrap_or_default()
        }
    }
}
