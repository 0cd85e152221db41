use super::{ExpressionParsing, ParseResult, Parser, PatternParsing};
use crate::ast::{
    BindingDeclaration, BindingDeclarationId, BindingIntroducer, BindingPattern, BindingRole,
    DeclarationId, ExpressionId, FieldDeclaration, FunctionDeclaration, FunctionIntroducer,
    ImportDeclaration, Name, OperatorNotation, ParameterDeclaration, ParameterId,
    PassingConvention, StructDeclaration, Syntax, TraitDeclaration,
};
use crate::token::TokenTag;

pub trait DeclarationParsing {
    /// Dispatches on the head token; any other head is an error.
    fn parse_declaration(&mut self) -> ParseResult<DeclarationId>;
    fn parse_binding_declaration(&mut self, role: BindingRole) -> ParseResult<DeclarationId>;
    fn parse_function_declaration(&mut self) -> ParseResult<DeclarationId>;
    fn parse_struct_declaration(&mut self) -> ParseResult<DeclarationId>;
    fn parse_trait_declaration(&mut self) -> ParseResult<DeclarationId>;
    fn parse_import_declaration(&mut self) -> ParseResult<DeclarationId>;
    fn parse_parameter_list(&mut self) -> ParseResult<Vec<ParameterId>>;
}

impl<'s, 'i> DeclarationParsing for Parser<'s, 'i> {
    fn parse_declaration(&mut self) -> ParseResult<DeclarationId> {
        match self.peek_tag() {
            Some(TokenTag::Fun | TokenTag::Subscript) => self.parse_function_declaration(),
            Some(TokenTag::Struct) => self.parse_struct_declaration(),
            Some(TokenTag::Trait) => self.parse_trait_declaration(),
            Some(TokenTag::Var | TokenTag::Let | TokenTag::Inout) => {
                self.parse_binding_declaration(BindingRole::Unconditional)
            }
            Some(TokenTag::Import) => self.parse_import_declaration(),
            Some(_) => Err(self.unexpected(self.peek().unwrap())),
            None => Err(self.expected("declaration")),
        }
    }

    fn parse_binding_declaration(&mut self, role: BindingRole) -> ParseResult<DeclarationId> {
        let start = self.next_start();
        let introducer = match self.peek_tag() {
            Some(TokenTag::Let) => BindingIntroducer::Let,
            Some(TokenTag::Var) => BindingIntroducer::Var,
            Some(TokenTag::Inout) => BindingIntroducer::Inout,
            _ => return Err(self.expected("binding introducer")),
        };
        self.advance();
        let subpattern = self.parse_pattern(true)?;
        let pattern_site = self.span_from(start);
        let pattern = self.insert_pattern(Syntax::BindingPattern(BindingPattern {
            introducer,
            subpattern,
            site: pattern_site,
        }));
        let initializer = if self.take(TokenTag::Assign).is_some() {
            Some(self.parse_expression()?)
        } else {
            if role == BindingRole::Condition {
                return Err(self.expected("="));
            }
            None
        };
        let site = self.span_from(start);
        Ok(self.insert_declaration(Syntax::Binding(BindingDeclaration {
            pattern,
            initializer,
            role,
            site,
        })))
    }

    fn parse_function_declaration(&mut self) -> ParseResult<DeclarationId> {
        let start = self.next_start();
        let introducer = match self.peek_tag() {
            Some(TokenTag::Fun) => FunctionIntroducer::Fun,
            Some(TokenTag::Subscript) => FunctionIntroducer::Subscript,
            _ => return Err(self.expected("fun")),
        };
        self.advance();
        let notation = match self.peek_tag() {
            Some(TokenTag::Infix) => {
                self.advance();
                OperatorNotation::Infix
            }
            Some(TokenTag::Prefix) => {
                self.advance();
                OperatorNotation::Prefix
            }
            Some(TokenTag::Postfix) => {
                self.advance();
                OperatorNotation::Postfix
            }
            _ => OperatorNotation::None,
        };
        let name = match self.peek_tag() {
            Some(TokenTag::Name | TokenTag::Operator) => {
                let token = self.advance().unwrap();
                Name { stem: self.intern_token(token), notation }
            }
            _ => return Err(self.expected("function name")),
        };
        self.expect(TokenTag::LeftParenthesis, "(")?;
        let parameters = self.parse_parameter_list()?;
        self.expect(TokenTag::RightParenthesis, ")")?;
        let body = if self.take(TokenTag::Assign).is_some() {
            Some(self.parse_body_statements()?)
        } else {
            None
        };
        let site = self.span_from(start);
        Ok(self.insert_declaration(Syntax::Function(FunctionDeclaration {
            introducer,
            name: Some(name),
            parameters,
            body,
            site,
        })))
    }

    fn parse_struct_declaration(&mut self) -> ParseResult<DeclarationId> {
        let start = self.next_start();
        self.expect(TokenTag::Struct, "struct")?;
        let name = self.expect(TokenTag::Name, "struct name")?;
        let name = self.intern_token(name);
        let interfaces = self.parse_interface_clause()?;
        let members = self.parse_member_list()?;
        let site = self.span_from(start);
        Ok(self.insert_declaration(Syntax::Struct(StructDeclaration {
            name,
            interfaces,
            members,
            site,
        })))
    }

    fn parse_trait_declaration(&mut self) -> ParseResult<DeclarationId> {
        let start = self.next_start();
        self.expect(TokenTag::Trait, "trait")?;
        let name = self.expect(TokenTag::Name, "trait name")?;
        let name = self.intern_token(name);
        let interfaces = self.parse_interface_clause()?;
        let members = self.parse_member_list()?;
        let site = self.span_from(start);
        Ok(self.insert_declaration(Syntax::Trait(TraitDeclaration {
            name,
            interfaces,
            members,
            site,
        })))
    }

    fn parse_import_declaration(&mut self) -> ParseResult<DeclarationId> {
        let start = self.next_start();
        self.expect(TokenTag::Import, "import")?;
        let name = self.expect(TokenTag::Name, "module name")?;
        let name = self.intern_token(name);
        let site = self.span_from(start);
        Ok(self.insert_declaration(Syntax::Import(ImportDeclaration { name, site })))
    }

    fn parse_parameter_list(&mut self) -> ParseResult<Vec<ParameterId>> {
        let mut parameters = Vec::new();
        if self.at(TokenTag::RightParenthesis) {
            return Ok(parameters);
        }
        loop {
            parameters.push(self.parse_parameter()?);
            if self.take(TokenTag::Comma).is_none() || self.at(TokenTag::RightParenthesis) {
                break;
            }
        }
        Ok(parameters)
    }
}

impl<'s, 'i> Parser<'s, 'i> {
    /// `[label] [convention] identifier [= default]`.
    fn parse_parameter(&mut self) -> ParseResult<ParameterId> {
        let start = self.next_start();
        let mut label = None;
        let mut convention = self.take_convention();
        if convention.is_none() {
            if let Some(token) = self.peek() {
                let labels_next = matches!(
                    self.lookahead(1).map(|t| t.tag),
                    Some(TokenTag::Name | TokenTag::Let | TokenTag::Inout)
                );
                if matches!(token.tag, TokenTag::Name | TokenTag::Underscore) && labels_next {
                    self.advance();
                    if token.tag == TokenTag::Name {
                        label = Some(self.intern_token(token));
                    }
                    convention = self.take_convention();
                }
            }
        }
        let identifier = self.expect(TokenTag::Name, "parameter name")?;
        let identifier = self.intern_token(identifier);
        let default = if self.take(TokenTag::Assign).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let site = self.span_from(start);
        let id = self.insert(Syntax::Parameter(ParameterDeclaration {
            label,
            identifier,
            convention,
            default,
            site,
        }));
        Ok(ParameterId::new(id))
    }

    fn take_convention(&mut self) -> Option<PassingConvention> {
        match self.peek_tag() {
            Some(TokenTag::Let) => {
                self.advance();
                Some(PassingConvention::Let)
            }
            Some(TokenTag::Inout) => {
                self.advance();
                Some(PassingConvention::Inout)
            }
            Some(TokenTag::Name)
                if self.text_of(self.peek().unwrap()) == "sink"
                    && self.lookahead(1).map(|t| t.tag) == Some(TokenTag::Name) =>
            {
                self.advance();
                Some(PassingConvention::Sink)
            }
            _ => None,
        }
    }

    /// Lambda parameters without parentheses: bare identifiers.
    pub(crate) fn parse_bare_parameters(&mut self) -> ParseResult<Vec<ParameterId>> {
        let mut parameters = Vec::new();
        while self.at(TokenTag::Name) {
            let start = self.next_start();
            let token = self.advance().unwrap();
            let identifier = self.intern_token(token);
            let site = self.span_from(start);
            let id = self.insert(Syntax::Parameter(ParameterDeclaration {
                label: None,
                identifier,
                convention: None,
                default: None,
                site,
            }));
            parameters.push(ParameterId::new(id));
            if self.take(TokenTag::Comma).is_none() {
                break;
            }
        }
        Ok(parameters)
    }

    fn parse_interface_clause(&mut self) -> ParseResult<Vec<ExpressionId>> {
        let mut interfaces = Vec::new();
        if self.take(TokenTag::Colon).is_some() {
            loop {
                interfaces.push(self.parse_compound_expression()?);
                if self.take(TokenTag::Comma).is_none() {
                    break;
                }
            }
        }
        Ok(interfaces)
    }

    fn parse_member_list(&mut self) -> ParseResult<Vec<DeclarationId>> {
        let mut members = Vec::new();
        if !self.at(TokenTag::Indentation) {
            return Ok(members);
        }
        self.enter_indented_block()?;
        loop {
            while self.take(TokenTag::Semicolon).is_some() {}
            match self.peek_tag() {
                None | Some(TokenTag::Dedentation) | Some(TokenTag::Indentation) => break,
                _ => {}
            }
            members.push(self.parse_member_declaration()?);
            self.check_statement_separator()?;
        }
        self.exit_indented_block()?;
        Ok(members)
    }

    /// A member of a struct or trait body. `var`/`let` introduce fields.
    fn parse_member_declaration(&mut self) -> ParseResult<DeclarationId> {
        match self.peek_tag() {
            Some(TokenTag::Fun | TokenTag::Subscript) => self.parse_function_declaration(),
            Some(TokenTag::Struct) => self.parse_struct_declaration(),
            Some(TokenTag::Trait) => self.parse_trait_declaration(),
            Some(TokenTag::Var | TokenTag::Let) => {
                let start = self.next_start();
                self.advance();
                let identifier = self.expect(TokenTag::Name, "field name")?;
                let identifier = self.intern_token(identifier);
                let default = if self.take(TokenTag::Assign).is_some() {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                let site = self.span_from(start);
                Ok(self.insert_declaration(Syntax::Field(FieldDeclaration {
                    identifier,
                    default,
                    site,
                })))
            }
            Some(_) => Err(self.unexpected(self.peek().unwrap())),
            None => Err(self.expected("member declaration")),
        }
    }

    /// `let|var|inout <pattern> = <expr>` at condition position.
    pub(crate) fn parse_binding_condition(&mut self) -> ParseResult<BindingDeclarationId> {
        let declaration = self.parse_binding_declaration(BindingRole::Condition)?;
        Ok(self.module.cast_to_binding(declaration.erased()).unwrap())
    }

    /// `case <pattern> = <expr>` at condition position.
    pub(crate) fn parse_case_condition(&mut self) -> ParseResult<BindingDeclarationId> {
        let start = self.next_start();
        self.expect(TokenTag::Case, "case")?;
        let pattern = self.parse_pattern(false)?;
        self.expect(TokenTag::Assign, "=")?;
        let initializer = self.parse_expression()?;
        let site = self.span_from(start);
        let id = self.insert_declaration(Syntax::Binding(BindingDeclaration {
            pattern,
            initializer: Some(initializer),
            role: BindingRole::Condition,
            site,
        }));
        Ok(self.module.cast_to_binding(id.erased()).unwrap())
    }
}
