use crate::ast::ids::*;
use crate::intern::Symbol;
use crate::source::SourceSpan;

/// How a name was written at its use or declaration site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorNotation {
    None,
    Prefix,
    Infix,
    Postfix,
}

/// An unqualified name, possibly carrying an operator notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Name {
    pub stem: Symbol,
    pub notation: OperatorNotation,
}

impl Name {
    pub fn plain(stem: Symbol) -> Self {
        Name { stem, notation: OperatorNotation::None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRole {
    Unconditional,
    Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingIntroducer {
    Let,
    Var,
    Inout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionIntroducer {
    Fun,
    Subscript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassingConvention {
    Let,
    Inout,
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    Parenthesized,
    Bracketed,
}

// Declarations

/// `let p = e`, `var p = e`, `inout p = e`, at statement or condition
/// position.
#[derive(Debug, Clone)]
pub struct BindingDeclaration {
    pub pattern: PatternId,
    pub initializer: Option<ExpressionId>,
    pub role: BindingRole,
    pub site: SourceSpan,
}

/// `fun f(…) = …` or `subscript s(…) = …`; lambdas wrap an anonymous one.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub introducer: FunctionIntroducer,
    pub name: Option<Name>,
    pub parameters: Vec<ParameterId>,
    pub body: Option<Vec<StatementId>>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ParameterDeclaration {
    pub label: Option<Symbol>,
    pub identifier: Symbol,
    pub convention: Option<PassingConvention>,
    pub default: Option<ExpressionId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct StructDeclaration {
    pub name: Symbol,
    pub interfaces: Vec<ExpressionId>,
    pub members: Vec<DeclarationId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct TraitDeclaration {
    pub name: Symbol,
    pub interfaces: Vec<ExpressionId>,
    pub members: Vec<DeclarationId>,
    pub site: SourceSpan,
}

/// A stored member of a struct.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub identifier: Symbol,
    pub default: Option<ExpressionId>,
    pub site: SourceSpan,
}

/// A single variable introduced by a binding pattern.
#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub identifier: Symbol,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ImportDeclaration {
    pub name: Symbol,
    pub site: SourceSpan,
}

// Expressions

/// A literal; its value is read back from the source text it covers.
#[derive(Debug, Clone)]
pub struct LiteralExpression {
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ArrayLiteral {
    pub elements: Vec<ExpressionId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct DictionaryLiteral {
    pub elements: Vec<(ExpressionId, ExpressionId)>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone, Copy)]
pub struct LabeledExpression {
    pub label: Option<Symbol>,
    pub value: ExpressionId,
}

#[derive(Debug, Clone)]
pub struct TupleLiteral {
    pub elements: Vec<LabeledExpression>,
    pub site: SourceSpan,
}

/// A possibly-qualified name at expression position.
#[derive(Debug, Clone)]
pub struct NameExpression {
    pub qualification: Option<ExpressionId>,
    pub name: Name,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: ExpressionId,
    pub arguments: Vec<LabeledExpression>,
    pub style: CallStyle,
    pub site: SourceSpan,
}

/// `lhs is rhs`.
#[derive(Debug, Clone)]
pub struct TypeTestExpression {
    pub lhs: ExpressionId,
    pub rhs: ExpressionId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct LambdaExpression {
    pub function: FunctionDeclarationId,
    pub site: SourceSpan,
}

/// `if c1, c2 do … else …`.
#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub conditions: Vec<ConditionId>,
    pub success: BlockStatementId,
    pub failure: Option<ElseId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct MatchExpression {
    pub scrutinee: ExpressionId,
    pub cases: Vec<MatchCaseId>,
    pub site: SourceSpan,
}

/// `case p do …` inside a match or a catch clause; a scope.
#[derive(Debug, Clone)]
pub struct MatchCase {
    pub pattern: PatternId,
    pub body: Vec<StatementId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct TryExpression {
    pub body: Vec<StatementId>,
    pub handlers: Vec<MatchCaseId>,
    pub site: SourceSpan,
}

// Patterns

/// `let p`, `var p`, `inout p`; bare names below it are variable
/// declarations.
#[derive(Debug, Clone)]
pub struct BindingPattern {
    pub introducer: BindingIntroducer,
    pub subpattern: PatternId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone, Copy)]
pub struct LabeledPattern {
    pub label: Option<Symbol>,
    pub value: PatternId,
}

#[derive(Debug, Clone)]
pub struct TuplePattern {
    pub elements: Vec<LabeledPattern>,
    pub site: SourceSpan,
}

/// `.callee(p1, …)`.
#[derive(Debug, Clone)]
pub struct ExtractorPattern {
    pub callee: ExpressionId,
    pub arguments: Vec<LabeledPattern>,
    pub site: SourceSpan,
}

/// `lhs as rhs`.
#[derive(Debug, Clone)]
pub struct TypePattern {
    pub lhs: PatternId,
    pub rhs: ExpressionId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct WildcardPattern {
    pub site: SourceSpan,
}

// Statements

/// A statement list in an opened scope.
#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub statements: Vec<StatementId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct BreakStatement {
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ContinueStatement {
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct DeferStatement {
    pub body: BlockStatementId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub pattern: PatternId,
    pub domain: ExpressionId,
    pub filter: Option<ExpressionId>,
    pub body: BlockStatementId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub conditions: Vec<ConditionId>,
    pub body: BlockStatementId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<ExpressionId>,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct ThrowStatement {
    pub value: ExpressionId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct YieldStatement {
    pub value: ExpressionId,
    pub site: SourceSpan,
}

#[derive(Debug, Clone)]
pub struct AssignmentStatement {
    pub target: ExpressionId,
    pub value: ExpressionId,
    pub site: SourceSpan,
}

/// The payload of an arena slot.
#[derive(Debug, Clone)]
pub enum Syntax {
    // Declarations
    Binding(BindingDeclaration),
    Function(FunctionDeclaration),
    Parameter(ParameterDeclaration),
    Struct(StructDeclaration),
    Trait(TraitDeclaration),
    Field(FieldDeclaration),
    Variable(VariableDeclaration),
    Import(ImportDeclaration),
    // Expressions
    BooleanLiteral(LiteralExpression),
    IntegerLiteral(LiteralExpression),
    FloatingPointLiteral(LiteralExpression),
    StringLiteral(LiteralExpression),
    ArrayLiteral(ArrayLiteral),
    DictionaryLiteral(DictionaryLiteral),
    TupleLiteral(TupleLiteral),
    NameExpression(NameExpression),
    Call(CallExpression),
    TypeTest(TypeTestExpression),
    Lambda(LambdaExpression),
    Conditional(ConditionalExpression),
    Match(MatchExpression),
    MatchCase(MatchCase),
    Try(TryExpression),
    // Patterns
    BindingPattern(BindingPattern),
    TuplePattern(TuplePattern),
    ExtractorPattern(ExtractorPattern),
    TypePattern(TypePattern),
    Wildcard(WildcardPattern),
    // Statements
    Block(BlockStatement),
    Break(BreakStatement),
    Continue(ContinueStatement),
    Defer(DeferStatement),
    For(ForStatement),
    While(WhileStatement),
    Return(ReturnStatement),
    Throw(ThrowStatement),
    Yield(YieldStatement),
    Assignment(AssignmentStatement),
}

/// The discriminant of a [`Syntax`] payload, stored in a parallel vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxTag {
    Binding,
    Function,
    Parameter,
    Struct,
    Trait,
    Field,
    Variable,
    Import,
    BooleanLiteral,
    IntegerLiteral,
    FloatingPointLiteral,
    StringLiteral,
    ArrayLiteral,
    DictionaryLiteral,
    TupleLiteral,
    NameExpression,
    Call,
    TypeTest,
    Lambda,
    Conditional,
    Match,
    MatchCase,
    Try,
    BindingPattern,
    TuplePattern,
    ExtractorPattern,
    TypePattern,
    Wildcard,
    Block,
    Break,
    Continue,
    Defer,
    For,
    While,
    Return,
    Throw,
    Yield,
    Assignment,
}

impl Syntax {
    pub fn tag(&self) -> SyntaxTag {
        match self {
            Syntax::Binding(_) => SyntaxTag::Binding,
            Syntax::Function(_) => SyntaxTag::Function,
            Syntax::Parameter(_) => SyntaxTag::Parameter,
            Syntax::Struct(_) => SyntaxTag::Struct,
            Syntax::Trait(_) => SyntaxTag::Trait,
            Syntax::Field(_) => SyntaxTag::Field,
            Syntax::Variable(_) => SyntaxTag::Variable,
            Syntax::Import(_) => SyntaxTag::Import,
            Syntax::BooleanLiteral(_) => SyntaxTag::BooleanLiteral,
            Syntax::IntegerLiteral(_) => SyntaxTag::IntegerLiteral,
            Syntax::FloatingPointLiteral(_) => SyntaxTag::FloatingPointLiteral,
            Syntax::StringLiteral(_) => SyntaxTag::StringLiteral,
            Syntax::ArrayLiteral(_) => SyntaxTag::ArrayLiteral,
            Syntax::DictionaryLiteral(_) => SyntaxTag::DictionaryLiteral,
            Syntax::TupleLiteral(_) => SyntaxTag::TupleLiteral,
            Syntax::NameExpression(_) => SyntaxTag::NameExpression,
            Syntax::Call(_) => SyntaxTag::Call,
            Syntax::TypeTest(_) => SyntaxTag::TypeTest,
            Syntax::Lambda(_) => SyntaxTag::Lambda,
            Syntax::Conditional(_) => SyntaxTag::Conditional,
            Syntax::Match(_) => SyntaxTag::Match,
            Syntax::MatchCase(_) => SyntaxTag::MatchCase,
            Syntax::Try(_) => SyntaxTag::Try,
            Syntax::BindingPattern(_) => SyntaxTag::BindingPattern,
            Syntax::TuplePattern(_) => SyntaxTag::TuplePattern,
            Syntax::ExtractorPattern(_) => SyntaxTag::ExtractorPattern,
            Syntax::TypePattern(_) => SyntaxTag::TypePattern,
            Syntax::Wildcard(_) => SyntaxTag::Wildcard,
            Syntax::Block(_) => SyntaxTag::Block,
            Syntax::Break(_) => SyntaxTag::Break,
            Syntax::Continue(_) => SyntaxTag::Continue,
            Syntax::Defer(_) => SyntaxTag::Defer,
            Syntax::For(_) => SyntaxTag::For,
            Syntax::While(_) => SyntaxTag::While,
            Syntax::Return(_) => SyntaxTag::Return,
            Syntax::Throw(_) => SyntaxTag::Throw,
            Syntax::Yield(_) => SyntaxTag::Yield,
            Syntax::Assignment(_) => SyntaxTag::Assignment,
        }
    }

    pub fn site(&self) -> SourceSpan {
        match self {
            Syntax::Binding(n) => n.site,
            Syntax::Function(n) => n.site,
            Syntax::Parameter(n) => n.site,
            Syntax::Struct(n) => n.site,
            Syntax::Trait(n) => n.site,
            Syntax::Field(n) => n.site,
            Syntax::Variable(n) => n.site,
            Syntax::Import(n) => n.site,
            Syntax::BooleanLiteral(n)
            | Syntax::IntegerLiteral(n)
            | Syntax::FloatingPointLiteral(n)
            | Syntax::StringLiteral(n) => n.site,
            Syntax::ArrayLiteral(n) => n.site,
            Syntax::DictionaryLiteral(n) => n.site,
            Syntax::TupleLiteral(n) => n.site,
            Syntax::NameExpression(n) => n.site,
            Syntax::Call(n) => n.site,
            Syntax::TypeTest(n) => n.site,
            Syntax::Lambda(n) => n.site,
            Syntax::Conditional(n) => n.site,
            Syntax::Match(n) => n.site,
            Syntax::MatchCase(n) => n.site,
            Syntax::Try(n) => n.site,
            Syntax::BindingPattern(n) => n.site,
            Syntax::TuplePattern(n) => n.site,
            Syntax::ExtractorPattern(n) => n.site,
            Syntax::TypePattern(n) => n.site,
            Syntax::Wildcard(n) => n.site,
            Syntax::Block(n) => n.site,
            Syntax::Break(n) => n.site,
            Syntax::Continue(n) => n.site,
            Syntax::Defer(n) => n.site,
            Syntax::For(n) => n.site,
            Syntax::While(n) => n.site,
            Syntax::Return(n) => n.site,
            Syntax::Throw(n) => n.site,
            Syntax::Yield(n) => n.site,
            Syntax::Assignment(n) => n.site,
        }
    }
}

impl SyntaxTag {
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            SyntaxTag::Binding
                | SyntaxTag::Function
                | SyntaxTag::Parameter
                | SyntaxTag::Struct
                | SyntaxTag::Trait
                | SyntaxTag::Field
                | SyntaxTag::Variable
                | SyntaxTag::Import
        )
    }

    pub fn is_expression(self) -> bool {
        matches!(
            self,
            SyntaxTag::BooleanLiteral
                | SyntaxTag::IntegerLiteral
                | SyntaxTag::FloatingPointLiteral
                | SyntaxTag::StringLiteral
                | SyntaxTag::ArrayLiteral
                | SyntaxTag::DictionaryLiteral
                | SyntaxTag::TupleLiteral
                | SyntaxTag::NameExpression
                | SyntaxTag::Call
                | SyntaxTag::TypeTest
                | SyntaxTag::Lambda
                | SyntaxTag::Conditional
                | SyntaxTag::Match
                | SyntaxTag::Try
        )
    }

    /// Patterns proper, plus variable declarations and expressions used as
    /// equality patterns.
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            SyntaxTag::BindingPattern
                | SyntaxTag::TuplePattern
                | SyntaxTag::ExtractorPattern
                | SyntaxTag::TypePattern
                | SyntaxTag::Wildcard
                | SyntaxTag::Variable
        ) || self.is_expression()
    }

    /// Statements proper, plus declarations and expressions at statement
    /// position.
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            SyntaxTag::Block
                | SyntaxTag::Break
                | SyntaxTag::Continue
                | SyntaxTag::Defer
                | SyntaxTag::For
                | SyntaxTag::While
                | SyntaxTag::Return
                | SyntaxTag::Throw
                | SyntaxTag::Yield
                | SyntaxTag::Assignment
        ) || self.is_declaration()
            || self.is_expression()
    }

    /// Whether nodes with this tag introduce a lexical scope.
    pub fn is_scope(self) -> bool {
        matches!(
            self,
            SyntaxTag::Function
                | SyntaxTag::Conditional
                | SyntaxTag::MatchCase
                | SyntaxTag::Block
                | SyntaxTag::Struct
                | SyntaxTag::Trait
                | SyntaxTag::For
                | SyntaxTag::While
                | SyntaxTag::Try
        )
    }
}
