use super::{DeclarationParsing, ExpressionParsing, ParseResult, Parser, PatternParsing};
use crate::ast::{
    AssignmentStatement, BindingRole, BreakStatement, ContinueStatement, DeferStatement,
    ForStatement, ReturnStatement, StatementId, Syntax, ThrowStatement, WhileStatement,
    YieldStatement,
};
use crate::token::{Token, TokenTag};

pub trait StatementParsing {
    fn parse_statement(&mut self) -> ParseResult<StatementId>;
}

impl<'s, 'i> StatementParsing for Parser<'s, 'i> {
    fn parse_statement(&mut self) -> ParseResult<StatementId> {
        let Some(token) = self.peek() else { return Err(self.expected("statement")) };
        match token.tag {
            TokenTag::Do => {
                self.advance();
                let block = self.parse_block_body()?;
                Ok(self.module.cast_to_statement(block.erased()).unwrap())
            }
            TokenTag::Defer => {
                self.advance();
                let body = self.parse_block_body()?;
                let site = self.span_from(token.site.start);
                Ok(self.insert_statement(Syntax::Defer(DeferStatement { body, site })))
            }
            TokenTag::Break => {
                self.advance();
                Ok(self.insert_statement(Syntax::Break(BreakStatement { site: token.site })))
            }
            TokenTag::Continue => {
                self.advance();
                Ok(self.insert_statement(Syntax::Continue(ContinueStatement { site: token.site })))
            }
            TokenTag::For => self.parse_for_statement(),
            TokenTag::While => self.parse_while_statement(),
            TokenTag::Return => {
                self.advance();
                let value = if self.starts_expression_on_same_line() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                let site = self.span_from(token.site.start);
                Ok(self.insert_statement(Syntax::Return(ReturnStatement { value, site })))
            }
            TokenTag::Throw => {
                self.advance();
                let value = self.parse_expression()?;
                let site = self.span_from(token.site.start);
                Ok(self.insert_statement(Syntax::Throw(ThrowStatement { value, site })))
            }
            TokenTag::Var | TokenTag::Let | TokenTag::Inout => {
                let declaration = self.parse_binding_declaration(BindingRole::Unconditional)?;
                Ok(self.module.cast_to_statement(declaration.erased()).unwrap())
            }
            TokenTag::Fun
            | TokenTag::Subscript
            | TokenTag::Struct
            | TokenTag::Trait
            | TokenTag::Import => {
                let declaration = self.parse_declaration()?;
                Ok(self.module.cast_to_statement(declaration.erased()).unwrap())
            }
            TokenTag::Name if self.is_yield_statement(token) => {
                self.advance();
                let value = self.parse_expression()?;
                let site = self.span_from(token.site.start);
                Ok(self.insert_statement(Syntax::Yield(YieldStatement { value, site })))
            }
            _ => {
                let start = self.next_start();
                let target = self.parse_expression()?;
                if self.at(TokenTag::Assign) {
                    self.advance();
                    let value = self.parse_expression()?;
                    let site = self.span_from(start);
                    Ok(self.insert_statement(Syntax::Assignment(AssignmentStatement {
                        target,
                        value,
                        site,
                    })))
                } else {
                    Ok(self.module.cast_to_statement(target.erased()).unwrap())
                }
            }
        }
    }
}

impl<'s, 'i> Parser<'s, 'i> {
    fn parse_for_statement(&mut self) -> ParseResult<StatementId> {
        let start = self.next_start();
        self.expect(TokenTag::For, "for")?;
        let pattern = self.parse_pattern(true)?;
        self.expect(TokenTag::In, "in")?;
        let domain = self.parse_expression()?;
        let filter = if self.take(TokenTag::Where).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(TokenTag::Do, "do")?;
        let body = self.parse_block_body()?;
        let site = self.span_from(start);
        Ok(self.insert_statement(Syntax::For(ForStatement { pattern, domain, filter, body, site })))
    }

    fn parse_while_statement(&mut self) -> ParseResult<StatementId> {
        let start = self.next_start();
        self.expect(TokenTag::While, "while")?;
        let conditions = self.parse_condition_list()?;
        self.expect(TokenTag::Do, "do")?;
        let body = self.parse_block_body()?;
        let site = self.span_from(start);
        Ok(self.insert_statement(Syntax::While(WhileStatement { conditions, body, site })))
    }

    /// `yield` is not reserved; the spelling introduces a statement when an
    /// expression follows on the same line.
    fn is_yield_statement(&self, token: Token) -> bool {
        if self.text_of(token) != "yield" {
            return false;
        }
        match self.lookahead(1) {
            Some(next) => {
                !self.source.text[token.site.end as usize..next.site.start as usize]
                    .contains('\n')
                    && Self::starts_expression(next.tag)
            }
            None => false,
        }
    }

    fn starts_expression_on_same_line(&self) -> bool {
        match self.peek() {
            Some(token) => self.on_same_line(token) && Self::starts_expression(token.tag),
            None => false,
        }
    }

    pub(crate) fn starts_expression(tag: TokenTag) -> bool {
        matches!(
            tag,
            TokenTag::Name
                | TokenTag::BooleanLiteral
                | TokenTag::IntegerLiteral
                | TokenTag::FloatingPointLiteral
                | TokenTag::StringLiteral
                | TokenTag::LeftParenthesis
                | TokenTag::LeftBracket
                | TokenTag::Backslash
                | TokenTag::If
                | TokenTag::Match
                | TokenTag::Try
                | TokenTag::Operator
        )
    }
}
