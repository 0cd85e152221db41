use super::{ExpressionParsing, ParseResult, Parser};
use crate::ast::{
    BindingIntroducer, BindingPattern, ExtractorPattern, LabeledPattern, Name, NameExpression,
    PatternId, Syntax, TuplePattern, TypePattern, VariableDeclaration, WildcardPattern,
};
use crate::token::TokenTag;

pub trait PatternParsing {
    /// A primary pattern optionally followed by `as` and a type expression.
    /// Inside a binding sub-pattern (`in_binding`), bare names declare
    /// variables; elsewhere they are read as expressions.
    fn parse_pattern(&mut self, in_binding: bool) -> ParseResult<PatternId>;
    fn parse_primary_pattern(&mut self, in_binding: bool) -> ParseResult<PatternId>;
}

impl<'s, 'i> PatternParsing for Parser<'s, 'i> {
    fn parse_pattern(&mut self, in_binding: bool) -> ParseResult<PatternId> {
        let start = self.next_start();
        let lhs = self.parse_primary_pattern(in_binding)?;
        if self.take(TokenTag::As).is_none() {
            return Ok(lhs);
        }
        let rhs = self.parse_compound_expression()?;
        let site = self.span_from(start);
        Ok(self.insert_pattern(Syntax::TypePattern(TypePattern { lhs, rhs, site })))
    }

    fn parse_primary_pattern(&mut self, in_binding: bool) -> ParseResult<PatternId> {
        let Some(token) = self.peek() else { return Err(self.expected("pattern")) };
        match token.tag {
            TokenTag::LeftParenthesis => self.parse_tuple_pattern(in_binding),
            TokenTag::Dot => self.parse_extractor_pattern(in_binding),
            TokenTag::Underscore => {
                self.advance();
                Ok(self.insert_pattern(Syntax::Wildcard(WildcardPattern { site: token.site })))
            }
            TokenTag::Let | TokenTag::Var | TokenTag::Inout => {
                let introducer = match token.tag {
                    TokenTag::Let => BindingIntroducer::Let,
                    TokenTag::Var => BindingIntroducer::Var,
                    _ => BindingIntroducer::Inout,
                };
                self.advance();
                let subpattern = self.parse_primary_pattern(true)?;
                let site = self.span_from(token.site.start);
                Ok(self.insert_pattern(Syntax::BindingPattern(BindingPattern {
                    introducer,
                    subpattern,
                    site,
                })))
            }
            TokenTag::Name if in_binding => {
                self.advance();
                let identifier = self.intern_token(token);
                Ok(self.insert_pattern(Syntax::Variable(VariableDeclaration {
                    identifier,
                    site: token.site,
                })))
            }
            TokenTag::Name => {
                let expression = self.parse_compound_expression()?;
                Ok(self.module.cast_to_pattern(expression.erased()).unwrap())
            }
            _ => {
                // Any other head is an expression used as an equality
                // pattern.
                let expression = self.parse_expression()?;
                Ok(self.module.cast_to_pattern(expression.erased()).unwrap())
            }
        }
    }
}

impl<'s, 'i> Parser<'s, 'i> {
    /// `(p)` is `p`; `(p,)` and labeled forms build a tuple pattern.
    fn parse_tuple_pattern(&mut self, in_binding: bool) -> ParseResult<PatternId> {
        let start = self.next_start();
        self.expect(TokenTag::LeftParenthesis, "(")?;
        if self.take(TokenTag::RightParenthesis).is_some() {
            let site = self.span_from(start);
            return Ok(self.insert_pattern(Syntax::TuplePattern(TuplePattern {
                elements: Vec::new(),
                site,
            })));
        }
        let mut elements = Vec::new();
        let mut trailing_comma = false;
        loop {
            let label = self.take_label();
            let value = self.parse_pattern(in_binding)?;
            elements.push(LabeledPattern { label, value });
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
        Ok(self.insert_pattern(Syntax::TuplePattern(TuplePattern { elements, site })))
    }

    /// `.callee` or `.callee(p1, …)`.
    fn parse_extractor_pattern(&mut self, in_binding: bool) -> ParseResult<PatternId> {
        let start = self.next_start();
        self.expect(TokenTag::Dot, ".")?;
        let name = self.expect(TokenTag::Name, "extractor name")?;
        let stem = self.intern_token(name);
        let callee = self.insert_expression(Syntax::NameExpression(NameExpression {
            qualification: None,
            name: Name::plain(stem),
            site: name.site,
        }));
        let mut arguments = Vec::new();
        if self.take(TokenTag::LeftParenthesis).is_some() {
            if !self.at(TokenTag::RightParenthesis) {
                loop {
                    let label = self.take_label();
                    let value = self.parse_pattern(in_binding)?;
                    arguments.push(LabeledPattern { label, value });
                    if self.take(TokenTag::Comma).is_none() || self.at(TokenTag::RightParenthesis)
                    {
                        break;
                    }
                }
            }
            self.expect(TokenTag::RightParenthesis, ")")?;
        }
        let site = self.span_from(start);
        Ok(self.insert_pattern(Syntax::ExtractorPattern(ExtractorPattern {
            callee,
            arguments,
            site,
        })))
    }
}
