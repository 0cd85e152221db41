mod decl;
mod expr;
mod pattern;
mod stmt;


pub use decl::DeclarationParsing;
pub use expr::{ExpressionParsing, PrecedenceGroup};
pub use pattern::PatternParsing;
pub use stmt::StatementParsing;

use crate::ast::{
    AnyNodeId, BlockStatement, BlockStatementId, ConditionId, DeclarationId, ElseId, ExpressionId,
    Module, PatternId, StatementId, Syntax, SyntaxTag,
};
use crate::diagnostic::Diagnostic;
use crate::intern::{Interner, Symbol};
use crate::lexer::Lexer;
use crate::source::{SourceFile, SourcePosition, SourceSpan};
use crate::token::{Token, TokenTag};

pub(crate) type ParseResult<T> = Result<T, Diagnostic>;

/// Parses one source file into a fresh arena module.
///
/// The returned module carries the roots of the parse and any diagnostics.
/// At most one parse error is recorded per source: the first failure unwinds
/// to this function and stops the parse.
pub fn parse(source: &SourceFile, source_id: u32, interner: &mut Interner, as_entry: bool) -> Module {
    let tokens = Lexer::new(source, source_id).tokenize();
    let mut parser = Parser {
        source,
        source_id,
        tokens,
        current: 0,
        position: 0,
        indentation: Vec::new(),
        module: Module::new(source_id),
        interner,
    };
    match parser.parse_top(as_entry) {
        Ok(roots) => parser.module.roots = roots,
        Err(diagnostic) => parser.module.diagnostics.insert(diagnostic),
    }
    parser.module
}

/// A recursive-descent parser with one-token lookahead.
///
/// `position` is the byte index immediately after the last consumed token;
/// whitespace sensitivity (infix vs. prefix operators, same-line suffixes)
/// is decided by comparing it against the next token's span. `indentation`
/// stacks the layout runs entered but not yet closed.
pub struct Parser<'s, 'i> {
    source: &'s SourceFile,
    source_id: u32,
    tokens: Vec<Token>,
    current: usize,
    position: u32,
    indentation: Vec<(SourceSpan, usize)>,
    pub(crate) module: Module,
    pub(crate) interner: &'i mut Interner,
}

impl<'s, 'i> Parser<'s, 'i> {
    // Token plumbing.

    pub(crate) fn peek(&self) -> Option<Token> {
        self.tokens.get(self.current).copied()
    }

    pub(crate) fn peek_tag(&self) -> Option<TokenTag> {
        self.peek().map(|t| t.tag)
    }

    pub(crate) fn lookahead(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.current + n).copied()
    }

    pub(crate) fn at(&self, tag: TokenTag) -> bool {
        self.peek_tag() == Some(tag)
    }

    pub(crate) fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.current += 1;
        self.position = token.site.end;
        Some(token)
    }

    pub(crate) fn take(&mut self, tag: TokenTag) -> Option<Token> {
        if self.at(tag) {
            self.advance()
        } else {
            None
        }
    }

    pub(crate) fn expect(&mut self, tag: TokenTag, what: &str) -> ParseResult<Token> {
        self.take(tag).ok_or_else(|| self.expected(what))
    }

    pub(crate) fn expected(&self, what: &str) -> Diagnostic {
        Diagnostic::error(format!("expected \"{}\"", what), self.anchor())
    }

    pub(crate) fn unexpected(&self, token: Token) -> Diagnostic {
        Diagnostic::error(format!("unexpected token '{}'", token.tag.spelling()), token.site)
    }

    /// The site of the next token, or an empty span at the current position.
    pub(crate) fn anchor(&self) -> SourceSpan {
        self.peek().map(|t| t.site).unwrap_or_else(|| {
            SourceSpan::empty_at(SourcePosition { source: self.source_id, index: self.position })
        })
    }

    pub(crate) fn next_start(&self) -> u32 {
        self.peek().map(|t| t.site.start).unwrap_or(self.position)
    }

    pub(crate) fn span_from(&self, start: u32) -> SourceSpan {
        SourceSpan::new(self.source_id, start, self.position)
    }

    pub(crate) fn text_of(&self, token: Token) -> &str {
        self.source.text_of(token.site)
    }

    /// Interns the text of an identifier token, stripping backquotes.
    pub(crate) fn intern_token(&mut self, token: Token) -> Symbol {
        let text = self.source.text_of(token.site);
        let text = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')).unwrap_or(text);
        self.interner.intern(text)
    }

    // Whitespace sensitivity.

    /// Whether anything separates the last consumed token from the next one.
    pub(crate) fn whitespace_before_next(&self) -> bool {
        self.peek().map_or(true, |t| t.site.start > self.position)
    }

    /// Whether anything separates the next token from the one after it.
    pub(crate) fn whitespace_after_next(&self) -> bool {
        match (self.peek(), self.lookahead(1)) {
            (Some(a), Some(b)) => b.site.start > a.site.end,
            _ => true,
        }
    }

    /// Whether `token` starts on the same line as the current position.
    pub(crate) fn on_same_line(&self, token: Token) -> bool {
        !self.source.text[self.position as usize..token.site.start as usize].contains('\n')
    }

    // Arena helpers.

    pub(crate) fn insert(&mut self, node: Syntax) -> AnyNodeId {
        self.module.insert(node)
    }

    pub(crate) fn insert_expression(&mut self, node: Syntax) -> ExpressionId {
        let id = self.module.insert(node);
        self.module.cast_to_expression(id).expect("inserted node is not an expression")
    }

    pub(crate) fn insert_pattern(&mut self, node: Syntax) -> PatternId {
        let id = self.module.insert(node);
        self.module.cast_to_pattern(id).expect("inserted node is not a pattern")
    }

    pub(crate) fn insert_statement(&mut self, node: Syntax) -> StatementId {
        let id = self.module.insert(node);
        self.module.cast_to_statement(id).expect("inserted node is not a statement")
    }

    pub(crate) fn insert_declaration(&mut self, node: Syntax) -> DeclarationId {
        let id = self.module.insert(node);
        self.module.cast_to_declaration(id).expect("inserted node is not a declaration")
    }

    pub(crate) fn condition_id(&self, id: AnyNodeId) -> ConditionId {
        debug_assert!(
            self.module.tag(id).is_expression() || self.module.tag(id) == SyntaxTag::Binding
        );
        ConditionId::new(id)
    }

    pub(crate) fn else_id(&self, id: AnyNodeId) -> ElseId {
        debug_assert!(matches!(self.module.tag(id), SyntaxTag::Block | SyntaxTag::Conditional));
        ElseId::new(id)
    }

    // Layout guard.

    /// Consumes the run of indentation tokens opening a block and pushes a
    /// span summarizing them.
    pub(crate) fn enter_indented_block(&mut self) -> ParseResult<()> {
        let first = self.expect(TokenTag::Indentation, "indentation")?;
        let mut span = first.site;
        let mut count = 1;
        while let Some(token) = self.take(TokenTag::Indentation) {
            span = span.extended_to_cover(token.site);
            count += 1;
        }
        self.indentation.push((span, count));
        Ok(())
    }

    /// Consumes the dedentation tokens matching the innermost entry.
    pub(crate) fn exit_indented_block(&mut self) -> ParseResult<()> {
        let (span, count) = self.indentation.pop().expect("no indented block to exit");
        for _ in 0..count {
            if self.take(TokenTag::Dedentation).is_none() {
                let indent = self.source.text_of(span).to_string();
                return Err(Diagnostic::error(
                    "dedendation does not match the current indentation",
                    self.anchor(),
                )
                .with_note(Diagnostic::note(
                    format!("the current indentation is \"{}\"", indent),
                    span,
                )));
            }
        }
        Ok(())
    }

    // Statement sequencing.

    /// Parses the roots of the module: statements when it is the program
    /// entry, declarations otherwise.
    fn parse_top(&mut self, as_entry: bool) -> ParseResult<Vec<AnyNodeId>> {
        let mut roots = Vec::new();
        loop {
            while self.take(TokenTag::Semicolon).is_some() {}
            let Some(token) = self.peek() else { break };
            if token.tag.is_layout() {
                return Err(self.unexpected(token));
            }
            if as_entry {
                let statement = self.parse_statement()?;
                roots.push(statement.erased());
            } else {
                let declaration = self.parse_declaration()?;
                roots.push(declaration.erased());
            }
            self.check_statement_separator()?;
        }
        Ok(roots)
    }

    /// Two consecutive statements on one line must be separated by `;`.
    pub(crate) fn check_statement_separator(&mut self) -> ParseResult<()> {
        let Some(token) = self.peek() else { return Ok(()) };
        if matches!(token.tag, TokenTag::Semicolon) || token.tag.is_layout() {
            return Ok(());
        }
        if self.on_same_line(token) {
            return Err(Diagnostic::error(
                "consecutive statements on a line must be separated by ';'",
                token.site,
            ));
        }
        Ok(())
    }

    /// Statements until the end of the enclosing indented region.
    pub(crate) fn parse_statement_list(&mut self) -> ParseResult<Vec<StatementId>> {
        let mut statements = Vec::new();
        loop {
            while self.take(TokenTag::Semicolon).is_some() {}
            match self.peek_tag() {
                None | Some(TokenTag::Dedentation) | Some(TokenTag::Indentation) => break,
                _ => {}
            }
            let statement = self.parse_statement()?;
            statements.push(statement);
            self.check_statement_separator()?;
        }
        Ok(statements)
    }

    /// A block body: an indented statement sequence delimited by matching
    /// dedents, or exactly one statement on the same line.
    pub(crate) fn parse_body_statements(&mut self) -> ParseResult<Vec<StatementId>> {
        if self.at(TokenTag::Indentation) {
            self.enter_indented_block()?;
            let statements = self.parse_statement_list()?;
            self.exit_indented_block()?;
            Ok(statements)
        } else {
            match self.peek() {
                Some(token) if self.on_same_line(token) => Ok(vec![self.parse_statement()?]),
                _ => Err(self.expected("statement")),
            }
        }
    }

    /// A block body wrapped in a block node, for bodies that open a scope of
    /// their own (branches, loops, `do`, `defer`).
    pub(crate) fn parse_block_body(&mut self) -> ParseResult<BlockStatementId> {
        let start = self.next_start();
        let statements = self.parse_body_statements()?;
        let site = self.span_from(start);
        let id = self.insert(Syntax::Block(BlockStatement { statements, site }));
        Ok(self.module.cast_to_block(id).unwrap())
    }
}
