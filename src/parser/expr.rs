use super::{DeclarationParsing, ParseResult, Parser, PatternParsing};
use crate::ast::{
    ArrayLiteral, CallExpression, CallStyle, ConditionId, ConditionalExpression,
    DictionaryLiteral, ExpressionId, FunctionDeclaration, FunctionIntroducer, LabeledExpression,
    LambdaExpression, LiteralExpression, MatchCase, MatchCaseId, MatchExpression, Name,
    NameExpression, OperatorNotation, Syntax, TryExpression, TupleLiteral, TypeTestExpression,
};
use crate::diagnostic::Diagnostic;
use crate::intern::Symbol;
use crate::token::{Token, TokenTag};

/// The relative binding strength of an infix operator, decided by its
/// spelling. Groups are listed loosest first; all are left-associative
/// except `Fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrecedenceGroup {
    Disjunction,
    Conjunction,
    Comparison,
    Fallback,
    Addition,
    Multiplication,
    Shift,
}

impl PrecedenceGroup {
    pub fn containing(operator: &str) -> PrecedenceGroup {
        match operator {
            "||" => return PrecedenceGroup::Disjunction,
            "&&" => return PrecedenceGroup::Conjunction,
            "<<" | ">>" => return PrecedenceGroup::Shift,
            _ => {}
        }
        match operator.chars().next() {
            Some('=' | '!' | '<' | '>') => PrecedenceGroup::Comparison,
            Some('+' | '-' | '|' | '^') => PrecedenceGroup::Addition,
            Some('*' | '/' | '%' | '&') => PrecedenceGroup::Multiplication,
            Some('?' | '~') => PrecedenceGroup::Fallback,
            _ => PrecedenceGroup::Comparison,
        }
    }

    pub fn is_right_associative(self) -> bool {
        self == PrecedenceGroup::Fallback
    }
}

pub trait ExpressionParsing {
    /// Entry point: an infix expression optionally followed by `is` tests.
    fn parse_expression(&mut self) -> ParseResult<ExpressionId>;
    fn parse_infix_expression(&mut self) -> ParseResult<ExpressionId>;
    fn parse_prefix_expression(&mut self) -> ParseResult<ExpressionId>;
    fn parse_postfix_expression(&mut self) -> ParseResult<ExpressionId>;
    /// A primary expression with `.member`, `(…)` and `[…]` suffixes.
    fn parse_compound_expression(&mut self) -> ParseResult<ExpressionId>;
    fn parse_primary_expression(&mut self) -> ParseResult<ExpressionId>;
    fn parse_argument_list(&mut self, closing: TokenTag) -> ParseResult<Vec<LabeledExpression>>;
    fn parse_condition_list(&mut self) -> ParseResult<Vec<ConditionId>>;
    fn parse_match_case(&mut self) -> ParseResult<MatchCaseId>;
}

impl<'s, 'i> ExpressionParsing for Parser<'s, 'i> {
    fn parse_expression(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        let mut lhs = self.parse_infix_expression()?;
        while self.take(TokenTag::Is).is_some() {
            let rhs = self.parse_compound_expression()?;
            let site = self.span_from(start);
            lhs = self.insert_expression(Syntax::TypeTest(TypeTestExpression { lhs, rhs, site }));
        }
        Ok(lhs)
    }

    fn parse_infix_expression(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        let lhs = self.parse_prefix_expression()?;
        self.parse_infix_tail(start, lhs, None)
    }

    fn parse_prefix_expression(&mut self) -> ParseResult<ExpressionId> {
        let Some(token) = self.peek() else { return Err(self.expected("expression")) };
        if token.tag != TokenTag::Operator {
            return self.parse_postfix_expression();
        }
        if self.whitespace_after_next() {
            let text = self.text_of(token).to_string();
            return Err(Diagnostic::error(
                format!("unary operator '{}' cannot be separated from its operand", text),
                token.site,
            ));
        }
        let start = token.site.start;
        self.advance();
        let stem = self.intern_token(token);
        let operand = self.parse_postfix_expression()?;
        Ok(self.operator_application(start, operand, stem, OperatorNotation::Prefix))
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        let operand = self.parse_compound_expression()?;
        match self.peek() {
            Some(token) if token.tag == TokenTag::Operator && !self.whitespace_before_next() => {
                self.advance();
                let stem = self.intern_token(token);
                Ok(self.operator_application(start, operand, stem, OperatorNotation::Postfix))
            }
            _ => Ok(operand),
        }
    }

    fn parse_compound_expression(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        let mut expression = self.parse_primary_expression()?;
        loop {
            let Some(token) = self.peek() else { break };
            if !self.on_same_line(token) {
                break;
            }
            match token.tag {
                TokenTag::Dot => {
                    self.advance();
                    let member = match self.peek_tag() {
                        Some(TokenTag::Name | TokenTag::IntegerLiteral | TokenTag::Operator) => {
                            self.advance().unwrap()
                        }
                        _ => return Err(self.expected("member name")),
                    };
                    let stem = self.intern_token(member);
                    let site = self.span_from(start);
                    expression = self.insert_expression(Syntax::NameExpression(NameExpression {
                        qualification: Some(expression),
                        name: Name::plain(stem),
                        site,
                    }));
                }
                TokenTag::LeftParenthesis => {
                    self.advance();
                    let arguments = self.parse_argument_list(TokenTag::RightParenthesis)?;
                    self.expect(TokenTag::RightParenthesis, ")")?;
                    let site = self.span_from(start);
                    expression = self.insert_expression(Syntax::Call(CallExpression {
                        callee: expression,
                        arguments,
                        style: CallStyle::Parenthesized,
                        site,
                    }));
                }
                TokenTag::LeftBracket => {
                    self.advance();
                    let arguments = self.parse_argument_list(TokenTag::RightBracket)?;
                    self.expect(TokenTag::RightBracket, "]")?;
                    let site = self.span_from(start);
                    expression = self.insert_expression(Syntax::Call(CallExpression {
                        callee: expression,
                        arguments,
                        style: CallStyle::Bracketed,
                        site,
                    }));
                }
                _ => break,
            }
        }
        Ok(expression)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<ExpressionId> {
        let Some(token) = self.peek() else { return Err(self.expected("expression")) };
        match token.tag {
            TokenTag::BooleanLiteral => {
                self.advance();
                Ok(self.insert_expression(Syntax::BooleanLiteral(LiteralExpression {
                    site: token.site,
                })))
            }
            TokenTag::IntegerLiteral => {
                self.advance();
                Ok(self.insert_expression(Syntax::IntegerLiteral(LiteralExpression {
                    site: token.site,
                })))
            }
            TokenTag::FloatingPointLiteral => {
                self.advance();
                Ok(self.insert_expression(Syntax::FloatingPointLiteral(LiteralExpression {
                    site: token.site,
                })))
            }
            TokenTag::StringLiteral => {
                self.advance();
                Ok(self.insert_expression(Syntax::StringLiteral(LiteralExpression {
                    site: token.site,
                })))
            }
            TokenTag::Name => {
                self.advance();
                let stem = self.intern_token(token);
                Ok(self.insert_expression(Syntax::NameExpression(NameExpression {
                    qualification: None,
                    name: Name::plain(stem),
                    site: token.site,
                })))
            }
            TokenTag::LeftParenthesis => self.parse_tuple_or_parenthesized(),
            TokenTag::LeftBracket => self.parse_array_or_dictionary(),
            TokenTag::Backslash => self.parse_lambda(),
            TokenTag::If => self.parse_conditional(),
            TokenTag::Match => self.parse_match(),
            TokenTag::Try => self.parse_try(),
            TokenTag::UnterminatedStringLiteral => {
                Err(Diagnostic::error("unterminated string literal", token.site))
            }
            TokenTag::UnterminatedBackquotedIdentifier => {
                Err(Diagnostic::error("unterminated backquoted identifier", token.site))
            }
            _ => Err(self.unexpected(token)),
        }
    }

    fn parse_argument_list(&mut self, closing: TokenTag) -> ParseResult<Vec<LabeledExpression>> {
        let mut arguments = Vec::new();
        if self.at(closing) {
            return Ok(arguments);
        }
        loop {
            let label = self.take_label();
            let value = self.parse_expression()?;
            arguments.push(LabeledExpression { label, value });
            if self.take(TokenTag::Comma).is_none() || self.at(closing) {
                break;
            }
        }
        Ok(arguments)
    }

    fn parse_condition_list(&mut self) -> ParseResult<Vec<ConditionId>> {
        let mut conditions = Vec::new();
        loop {
            let condition = match self.peek_tag() {
                Some(TokenTag::Let | TokenTag::Var | TokenTag::Inout) => {
                    let binding = self.parse_binding_condition()?;
                    self.condition_id(binding.erased())
                }
                Some(TokenTag::Case) => {
                    let binding = self.parse_case_condition()?;
                    self.condition_id(binding.erased())
                }
                _ => {
                    let expression = self.parse_expression()?;
                    self.condition_id(expression.erased())
                }
            };
            conditions.push(condition);
            if self.take(TokenTag::Comma).is_none() {
                break;
            }
        }
        Ok(conditions)
    }

    fn parse_match_case(&mut self) -> ParseResult<MatchCaseId> {
        let start = self.next_start();
        self.expect(TokenTag::Case, "case")?;
        let pattern = self.parse_pattern(false)?;
        self.expect(TokenTag::Do, "do")?;
        let body = self.parse_body_statements()?;
        let site = self.span_from(start);
        let id = self.insert(Syntax::MatchCase(MatchCase { pattern, body, site }));
        Ok(self.module.cast_to_match_case(id).unwrap())
    }
}

impl<'s, 'i> Parser<'s, 'i> {
    /// Pratt loop: consumes infix operators admitted by `min` (a group and
    /// whether equal binding strength is accepted), folding tighter
    /// right-hand sides first.
    fn parse_infix_tail(
        &mut self,
        start: u32,
        mut lhs: ExpressionId,
        min: Option<(PrecedenceGroup, bool)>,
    ) -> ParseResult<ExpressionId> {
        while let Some((token, group)) = self.peek_infix_operator() {
            if let Some((floor, allow_equal)) = min {
                if !(group > floor || (allow_equal && group == floor)) {
                    break;
                }
            }
            self.advance();
            let stem = self.intern_token(token);
            let rhs_start = self.next_start();
            let mut rhs = self.parse_prefix_expression()?;
            while let Some((_, next)) = self.peek_infix_operator() {
                if next > group {
                    rhs = self.parse_infix_tail(rhs_start, rhs, Some((group, false)))?;
                } else if next == group && next.is_right_associative() {
                    rhs = self.parse_infix_tail(rhs_start, rhs, Some((group, true)))?;
                } else {
                    break;
                }
            }
            lhs = self.infix_application(start, lhs, stem, rhs);
        }
        Ok(lhs)
    }

    /// The next token, if it is an operator in infix position: surrounded by
    /// whitespace on both sides.
    fn peek_infix_operator(&self) -> Option<(Token, PrecedenceGroup)> {
        let token = self.peek()?;
        if token.tag != TokenTag::Operator {
            return None;
        }
        if !self.whitespace_before_next() || !self.whitespace_after_next() {
            return None;
        }
        let group = PrecedenceGroup::containing(self.text_of(token));
        Some((token, group))
    }

    /// Encodes `lhs <op> rhs` as `lhs.<op>(rhs)`.
    fn infix_application(
        &mut self,
        start: u32,
        lhs: ExpressionId,
        stem: Symbol,
        rhs: ExpressionId,
    ) -> ExpressionId {
        let site = self.span_from(start);
        let callee = self.insert_expression(Syntax::NameExpression(NameExpression {
            qualification: Some(lhs),
            name: Name { stem, notation: OperatorNotation::Infix },
            site,
        }));
        self.insert_expression(Syntax::Call(CallExpression {
            callee,
            arguments: vec![LabeledExpression { label: None, value: rhs }],
            style: CallStyle::Parenthesized,
            site,
        }))
    }

    /// Encodes a unary operator as a nullary method call on its operand.
    fn operator_application(
        &mut self,
        start: u32,
        operand: ExpressionId,
        stem: Symbol,
        notation: OperatorNotation,
    ) -> ExpressionId {
        let site = self.span_from(start);
        let callee = self.insert_expression(Syntax::NameExpression(NameExpression {
            qualification: Some(operand),
            name: Name { stem, notation },
            site,
        }));
        self.insert_expression(Syntax::Call(CallExpression {
            callee,
            arguments: Vec::new(),
            style: CallStyle::Parenthesized,
            site,
        }))
    }

    /// An identifier (or `_`) directly followed by a colon.
    pub(crate) fn take_label(&mut self) -> Option<Symbol> {
        let token = self.peek()?;
        if !matches!(token.tag, TokenTag::Name | TokenTag::Underscore) {
            return None;
        }
        if self.lookahead(1).map(|t| t.tag) != Some(TokenTag::Colon) {
            return None;
        }
        self.advance();
        self.advance();
        match token.tag {
            TokenTag::Name => Some(self.intern_token(token)),
            _ => None,
        }
    }

    fn parse_tuple_or_parenthesized(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        self.expect(TokenTag::LeftParenthesis, "(")?;
        if self.take(TokenTag::RightParenthesis).is_some() {
            let site = self.span_from(start);
            return Ok(self.insert_expression(Syntax::TupleLiteral(TupleLiteral {
                elements: Vec::new(),
                site,
            })));
        }
        let mut elements = Vec::new();
        let mut trailing_comma = false;
        loop {
            let label = self.take_label();
            let value = self.parse_expression()?;
            elements.push(LabeledExpression { label, value });
            if self.take(TokenTag::Comma).is_none() {
                break;
            }
            if self.at(TokenTag::RightParenthesis) {
                trailing_comma = true;
                break;
            }
        }
        self.expect(TokenTag::RightParenthesis, ")")?;
        if elements.len() == 1 && elements[0].label.is_none() && !trailing_comma {
            return Ok(elements[0].value);
        }
        let site = self.span_from(start);
        Ok(self.insert_expression(Syntax::TupleLiteral(TupleLiteral { elements, site })))
    }

    fn parse_array_or_dictionary(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        self.expect(TokenTag::LeftBracket, "[")?;
        if self.take(TokenTag::RightBracket).is_some() {
            let site = self.span_from(start);
            return Ok(self.insert_expression(Syntax::ArrayLiteral(ArrayLiteral {
                elements: Vec::new(),
                site,
            })));
        }
        if self.take(TokenTag::Colon).is_some() {
            self.expect(TokenTag::RightBracket, "]")?;
            let site = self.span_from(start);
            return Ok(self.insert_expression(Syntax::DictionaryLiteral(DictionaryLiteral {
                elements: Vec::new(),
                site,
            })));
        }
        let first = self.parse_expression()?;
        if self.take(TokenTag::Colon).is_some() {
            let value = self.parse_expression()?;
            let mut elements = vec![(first, value)];
            while self.take(TokenTag::Comma).is_some() {
                if self.at(TokenTag::RightBracket) {
                    break;
                }
                let key = self.parse_expression()?;
                self.expect(TokenTag::Colon, ":")?;
                let value = self.parse_expression()?;
                elements.push((key, value));
            }
            self.expect(TokenTag::RightBracket, "]")?;
            let site = self.span_from(start);
            return Ok(self.insert_expression(Syntax::DictionaryLiteral(DictionaryLiteral {
                elements,
                site,
            })));
        }
        let mut elements = vec![first];
        while self.take(TokenTag::Comma).is_some() {
            if self.at(TokenTag::RightBracket) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        self.expect(TokenTag::RightBracket, "]")?;
        let site = self.span_from(start);
        Ok(self.insert_expression(Syntax::ArrayLiteral(ArrayLiteral { elements, site })))
    }

    fn parse_lambda(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        self.expect(TokenTag::Backslash, "\\")?;
        let parameters = if self.take(TokenTag::LeftParenthesis).is_some() {
            let parameters = self.parse_parameter_list()?;
            self.expect(TokenTag::RightParenthesis, ")")?;
            parameters
        } else {
            self.parse_bare_parameters()?
        };
        self.expect(TokenTag::ThickArrow, "=>")?;
        let body = self.parse_body_statements()?;
        let site = self.span_from(start);
        let function = self.insert(Syntax::Function(FunctionDeclaration {
            introducer: FunctionIntroducer::Fun,
            name: None,
            parameters,
            body: Some(body),
            site,
        }));
        let function = self.module.cast_to_function(function).unwrap();
        Ok(self.insert_expression(Syntax::Lambda(LambdaExpression { function, site })))
    }

    fn parse_conditional(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        self.expect(TokenTag::If, "if")?;
        let conditions = self.parse_condition_list()?;
        self.expect(TokenTag::Do, "do")?;
        let success = self.parse_block_body()?;
        let failure = if self.take(TokenTag::Else).is_some() {
            if self.at(TokenTag::If) {
                let nested = self.parse_conditional()?;
                Some(self.else_id(nested.erased()))
            } else {
                let block = self.parse_block_body()?;
                Some(self.else_id(block.erased()))
            }
        } else {
            None
        };
        let site = self.span_from(start);
        Ok(self.insert_expression(Syntax::Conditional(ConditionalExpression {
            conditions,
            success,
            failure,
            site,
        })))
    }

    fn parse_match(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        self.expect(TokenTag::Match, "match")?;
        let scrutinee = self.parse_expression()?;
        let mut cases = Vec::new();
        if self.at(TokenTag::Indentation) {
            self.enter_indented_block()?;
            loop {
                while self.take(TokenTag::Semicolon).is_some() {}
                match self.peek_tag() {
                    None | Some(TokenTag::Dedentation) | Some(TokenTag::Indentation) => break,
                    _ => {}
                }
                cases.push(self.parse_match_case()?);
            }
            self.exit_indented_block()?;
        } else if self.at(TokenTag::Case) {
            cases.push(self.parse_match_case()?);
        } else {
            return Err(self.expected("case"));
        }
        let site = self.span_from(start);
        Ok(self.insert_expression(Syntax::Match(MatchExpression { scrutinee, cases, site })))
    }

    fn parse_try(&mut self) -> ParseResult<ExpressionId> {
        let start = self.next_start();
        self.expect(TokenTag::Try, "try")?;
        let body = self.parse_body_statements()?;
        let mut handlers = Vec::new();
        if self.take(TokenTag::Catch).is_some() {
            if self.at(TokenTag::Indentation) {
                self.enter_indented_block()?;
                loop {
                    while self.take(TokenTag::Semicolon).is_some() {}
                    match self.peek_tag() {
                        None | Some(TokenTag::Dedentation) | Some(TokenTag::Indentation) => break,
                        _ => {}
                    }
                    handlers.push(self.parse_match_case()?);
                }
                self.exit_indented_block()?;
            } else {
                handlers.push(self.parse_match_case()?);
            }
        }
        let site = self.span_from(start);
        Ok(self.insert_expression(Syntax::Try(TryExpression { body, handlers, site })))
    }
}
