use std::collections::VecDeque;

use crate::source::{SourceFile, SourcePosition, SourceSpan};
use crate::token::{Token, TokenTag};

/// Produces the token stream of one source file, including the synthetic
/// `Indentation`/`Dedentation` tokens of the layout protocol.
///
/// At the start of every line the lexer measures the whitespace prefix and
/// compares it with the current indentation depth: a longer prefix emits one
/// `Indentation` token per extra character, a shorter one emits the matching
/// number of `Dedentation` tokens (each an empty span at the position of the
/// line's first content character). Blank lines and comment-only lines leave
/// the depth untouched. End of input closes every open level.
pub struct Lexer<'a> {
    source: &'a SourceFile,
    source_id: u32,
    index: usize,
    depth: usize,
    at_line_start: bool,
    finished: bool,
    pending: VecDeque<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a SourceFile, source_id: u32) -> Self {
        Lexer {
            source,
            source_id,
            index: 0,
            depth: 0,
            at_line_start: true,
            finished: false,
            pending: VecDeque::new(),
        }
    }

    /// Collects the whole stream.
    pub fn tokenize(self) -> Vec<Token> {
        self.collect()
    }

    fn text(&self) -> &'a str {
        &self.source.text
    }

    fn peek(&self) -> Option<char> {
        self.text()[self.index..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.text()[self.index..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += c.len_utf8();
        Some(c)
    }

    fn span_from(&self, start: usize) -> SourceSpan {
        SourceSpan::new(self.source_id, start as u32, self.index as u32)
    }

    fn position(&self) -> SourcePosition {
        SourcePosition { source: self.source_id, index: self.index as u32 }
    }

    /// Handles the layout protocol at the start of a line. Leaves
    /// `at_line_start` set when the line was blank or comment-only so the
    /// next line gets measured too.
    fn process_line_start(&mut self) {
        let text = self.text();
        let mut offsets = Vec::new();
        let mut i = self.index;
        let content = loop {
            let Some(c) = text[i..].chars().next() else {
                // Only whitespace before the end of input.
                self.index = i;
                self.at_line_start = false;
                return;
            };
            match c {
                '\n' => {
                    // Blank line: consume it and stay at a line start.
                    self.index = i + 1;
                    return;
                }
                '#' => {
                    // Comment-only line: skip to (and over) the newline.
                    while let Some(c) = text[i..].chars().next() {
                        if c == '\n' {
                            break;
                        }
                        i += c.len_utf8();
                    }
                    if i < text.len() {
                        i += 1;
                        self.index = i;
                        return;
                    }
                    self.index = i;
                    self.at_line_start = false;
                    return;
                }
                c if c.is_whitespace() => {
                    offsets.push(i);
                    i += c.len_utf8();
                }
                _ => break i,
            }
        };

        let prefix = offsets.len();
        if prefix > self.depth {
            for &o in &offsets[self.depth..] {
                let width = text[o..].chars().next().map_or(1, char::len_utf8);
                self.pending.push_back(Token::new(
                    TokenTag::Indentation,
                    SourceSpan::new(self.source_id, o as u32, (o + width) as u32),
                ));
            }
        } else {
            for _ in 0..self.depth - prefix {
                self.pending.push_back(Token::new(
                    TokenTag::Dedentation,
                    SourceSpan::new(self.source_id, content as u32, content as u32),
                ));
            }
        }
        self.depth = prefix;
        self.index = content;
        self.at_line_start = false;
    }

    /// Skips whitespace and comments up to the next token, newline, or end of
    /// input.
    fn skip_blanks(&mut self) {
        loop {
            match self.peek() {
                Some('\n') | None => return,
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            return;
                        }
                        self.index += c.len_utf8();
                    }
                }
                Some(c) if c.is_whitespace() => self.index += c.len_utf8(),
                Some(_) => return,
            }
        }
    }

    fn scan_token(&mut self) -> Token {
        let start = self.index;
        let c = self.peek().expect("scan_token at end of input");
        match c {
            '(' => self.single(start, TokenTag::LeftParenthesis),
            ')' => self.single(start, TokenTag::RightParenthesis),
            '[' => self.single(start, TokenTag::LeftBracket),
            ']' => self.single(start, TokenTag::RightBracket),
            ',' => self.single(start, TokenTag::Comma),
            '.' => self.single(start, TokenTag::Dot),
            ':' => self.single(start, TokenTag::Colon),
            ';' => self.single(start, TokenTag::Semicolon),
            '@' => self.single(start, TokenTag::At),
            '\\' => self.single(start, TokenTag::Backslash),
            '"' => self.scan_string(),
            '`' => self.scan_backquoted(),
            '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.scan_number(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if TokenTag::is_operator_character(c) => self.scan_operator(),
            c if c.is_alphabetic() || c == '_' => self.scan_identifier(),
            _ => {
                self.advance();
                Token::new(TokenTag::Error, self.span_from(start))
            }
        }
    }

    fn single(&mut self, start: usize, tag: TokenTag) -> Token {
        self.advance();
        Token::new(tag, self.span_from(start))
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.index;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.index += c.len_utf8();
            } else {
                break;
            }
        }
        let text = &self.text()[start..self.index];
        let tag = if text == "_" {
            TokenTag::Underscore
        } else {
            TokenTag::of_keyword(text).unwrap_or(TokenTag::Name)
        };
        Token::new(tag, self.span_from(start))
    }

    fn scan_operator(&mut self) -> Token {
        let start = self.index;
        while self.peek().is_some_and(TokenTag::is_operator_character) {
            self.index += 1;
        }
        let tag = match &self.text()[start..self.index] {
            "=" => TokenTag::Assign,
            "=>" => TokenTag::ThickArrow,
            _ => TokenTag::Operator,
        };
        Token::new(tag, self.span_from(start))
    }

    fn scan_number(&mut self) -> Token {
        let start = self.index;
        if self.peek() == Some('-') {
            self.advance();
        }
        if self.peek() == Some('0') {
            if let Some(radix) = self.peek_second() {
                let digits: fn(char) -> bool = match radix {
                    'x' => |c| c.is_ascii_hexdigit(),
                    'o' => |c| ('0'..='7').contains(&c),
                    'b' => |c| c == '0' || c == '1',
                    _ => |_| false,
                };
                if matches!(radix, 'x' | 'o' | 'b') {
                    self.advance();
                    self.advance();
                    let mut any = false;
                    while let Some(c) = self.peek() {
                        if digits(c) || c == '_' {
                            any |= c != '_';
                            self.index += 1;
                        } else {
                            break;
                        }
                    }
                    let tag = if any { TokenTag::IntegerLiteral } else { TokenTag::Error };
                    return Token::new(tag, self.span_from(start));
                }
            }
        }

        let mut is_float = false;
        self.scan_decimal_digits();
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            self.scan_decimal_digits();
            is_float = true;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let after_sign = match self.peek_second() {
                Some('+' | '-') => {
                    let mut chars = self.text()[self.index..].chars();
                    chars.next();
                    chars.next();
                    chars.next()
                }
                other => other,
            };
            if after_sign.is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                self.scan_decimal_digits();
                is_float = true;
            }
        }
        let tag = if is_float { TokenTag::FloatingPointLiteral } else { TokenTag::IntegerLiteral };
        Token::new(tag, self.span_from(start))
    }

    fn scan_decimal_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.index += 1;
        }
    }

    fn scan_string(&mut self) -> Token {
        let start = self.index;
        self.advance();
        loop {
            match self.advance() {
                Some('"') => return Token::new(TokenTag::StringLiteral, self.span_from(start)),
                Some('\\') => {
                    if self.advance().is_none() {
                        return Token::new(TokenTag::UnterminatedStringLiteral, self.span_from(start));
                    }
                }
                Some(_) => {}
                None => return Token::new(TokenTag::UnterminatedStringLiteral, self.span_from(start)),
            }
        }
    }

    fn scan_backquoted(&mut self) -> Token {
        let start = self.index;
        self.advance();
        loop {
            match self.advance() {
                Some('`') => {
                    let tag = if self.index - start > 2 { TokenTag::Name } else { TokenTag::Error };
                    return Token::new(tag, self.span_from(start));
                }
                Some(_) => {}
                None => {
                    return Token::new(
                        TokenTag::UnterminatedBackquotedIdentifier,
                        self.span_from(start),
                    )
                }
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            if self.at_line_start {
                self.process_line_start();
                continue;
            }
            self.skip_blanks();
            match self.peek() {
                None => {
                    if self.finished {
                        return None;
                    }
                    self.finished = true;
                    for _ in 0..self.depth {
                        self.pending.push_back(Token::new(
                            TokenTag::Dedentation,
                            SourceSpan::empty_at(Lexer::position(self)),
                        ));
                    }
                    self.depth = 0;
                }
                Some('\n') => {
                    self.index += 1;
                    self.at_line_start = true;
                }
                Some(_) => return Some(self.scan_token()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceName;

    fn lex(text: &str) -> Vec<Token> {
        let file = SourceFile::new(SourceName::Virtual(0), text);
        Lexer::new(&file, 0).tokenize()
    }

    fn tags(text: &str) -> Vec<TokenTag> {
        lex(text).into_iter().map(|t| t.tag).collect()
    }

    #[test]
    fn empty_input_produces_no_tokens() {
        assert!(lex("").is_empty());
        assert!(lex("\n\n").is_empty());
        assert!(lex("# only a comment\n").is_empty());
    }

    #[test]
    fn identifiers_and_keywords() {
        assert_eq!(
            tags("fun apply f"),
            vec![TokenTag::Fun, TokenTag::Name, TokenTag::Name]
        );
        assert_eq!(tags("_"), vec![TokenTag::Underscore]);
        assert_eq!(tags("_tmp"), vec![TokenTag::Name]);
        assert_eq!(tags("true false"), vec![TokenTag::BooleanLiteral, TokenTag::BooleanLiteral]);
    }

    #[test]
    fn yield_is_not_reserved() {
        assert_eq!(tags("yield x"), vec![TokenTag::Name, TokenTag::Name]);
    }

    #[test]
    fn comments_run_to_end_of_line() {
        assert_eq!(tags("a # b c\nd"), vec![TokenTag::Name, TokenTag::Name]);
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(tags("42"), vec![TokenTag::IntegerLiteral]);
        assert_eq!(tags("1_000"), vec![TokenTag::IntegerLiteral]);
        assert_eq!(tags("0xfF_0"), vec![TokenTag::IntegerLiteral]);
        assert_eq!(tags("0o17"), vec![TokenTag::IntegerLiteral]);
        assert_eq!(tags("0b1010"), vec![TokenTag::IntegerLiteral]);
        assert_eq!(tags("3.14"), vec![TokenTag::FloatingPointLiteral]);
        assert_eq!(tags("1e9"), vec![TokenTag::FloatingPointLiteral]);
        assert_eq!(tags("6.02e+23"), vec![TokenTag::FloatingPointLiteral]);
    }

    #[test]
    fn negative_sign_binds_only_when_adjacent_to_digits() {
        assert_eq!(tags("-1"), vec![TokenTag::IntegerLiteral]);
        assert_eq!(tags("- 1"), vec![TokenTag::Operator, TokenTag::IntegerLiteral]);
        assert_eq!(tags("-x"), vec![TokenTag::Operator, TokenTag::Name]);
    }

    #[test]
    fn trailing_dot_is_a_separate_token() {
        assert_eq!(tags("1."), vec![TokenTag::IntegerLiteral, TokenTag::Dot]);
        assert_eq!(tags("1.e"), vec![TokenTag::IntegerLiteral, TokenTag::Dot, TokenTag::Name]);
    }

    #[test]
    fn operator_runs_take_the_longest_match() {
        assert_eq!(tags("a <=> b"), vec![TokenTag::Name, TokenTag::Operator, TokenTag::Name]);
        assert_eq!(tags("="), vec![TokenTag::Assign]);
        assert_eq!(tags("=>"), vec![TokenTag::ThickArrow]);
        assert_eq!(tags("=="), vec![TokenTag::Operator]);
        assert_eq!(tags("==>"), vec![TokenTag::Operator]);
    }

    #[test]
    fn string_literals_handle_escapes() {
        assert_eq!(tags(r#""hello""#), vec![TokenTag::StringLiteral]);
        assert_eq!(tags(r#""a \" b""#), vec![TokenTag::StringLiteral]);
        assert_eq!(tags(r#""a \\""#), vec![TokenTag::StringLiteral]);
        assert_eq!(tags(r#""oops"#), vec![TokenTag::UnterminatedStringLiteral]);
    }

    #[test]
    fn backquoted_identifiers() {
        assert_eq!(tags("`if`"), vec![TokenTag::Name]);
        assert_eq!(tags("``"), vec![TokenTag::Error]);
        assert_eq!(tags("`broken"), vec![TokenTag::UnterminatedBackquotedIdentifier]);
    }

    #[test]
    fn indentation_emits_one_token_per_extra_character() {
        assert_eq!(
            tags("a\n  b\nc"),
            vec![
                TokenTag::Name,
                TokenTag::Indentation,
                TokenTag::Indentation,
                TokenTag::Name,
                TokenTag::Dedentation,
                TokenTag::Dedentation,
                TokenTag::Name,
            ]
        );
    }

    #[test]
    fn end_of_input_closes_every_open_level() {
        let stream = lex("a\n   b");
        let dedents = stream.iter().filter(|t| t.tag == TokenTag::Dedentation).count();
        assert_eq!(dedents, 3);
        assert!(stream.iter().rev().take(3).all(|t| t.tag == TokenTag::Dedentation));
        assert!(stream.iter().rev().take(3).all(|t| t.site.is_empty()));
    }

    #[test]
    fn blank_and_comment_lines_do_not_change_depth() {
        assert_eq!(
            tags("a\n  b\n\n      # note\n  c"),
            vec![
                TokenTag::Name,
                TokenTag::Indentation,
                TokenTag::Indentation,
                TokenTag::Name,
                TokenTag::Name,
            ]
        );
    }

    #[test]
    fn partial_dedent_returns_to_intermediate_level() {
        assert_eq!(
            tags("a\n    b\n  c\nd"),
            vec![
                TokenTag::Name,
                TokenTag::Indentation,
                TokenTag::Indentation,
                TokenTag::Indentation,
                TokenTag::Indentation,
                TokenTag::Name,
                TokenTag::Dedentation,
                TokenTag::Dedentation,
                TokenTag::Name,
                TokenTag::Dedentation,
                TokenTag::Dedentation,
                TokenTag::Name,
            ]
        );
    }

    #[test]
    fn indentation_tokens_span_single_characters() {
        let stream = lex("a\n  b");
        let indents: Vec<_> = stream.iter().filter(|t| t.tag == TokenTag::Indentation).collect();
        assert_eq!(indents.len(), 2);
        assert!(indents.iter().all(|t| t.site.len() == 1));
        assert_eq!(indents[0].site.start, 2);
        assert_eq!(indents[1].site.start, 3);
    }

    #[test]
    fn punctuation_and_delimiters() {
        assert_eq!(
            tags("(a, b.c): [d];"),
            vec![
                TokenTag::LeftParenthesis,
                TokenTag::Name,
                TokenTag::Comma,
                TokenTag::Name,
                TokenTag::Dot,
                TokenTag::Name,
                TokenTag::RightParenthesis,
                TokenTag::Colon,
                TokenTag::LeftBracket,
                TokenTag::Name,
                TokenTag::RightBracket,
                TokenTag::Semicolon,
            ]
        );
        assert_eq!(tags("@ \\"), vec![TokenTag::At, TokenTag::Backslash]);
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        assert_eq!(tags("a $ b"), vec![TokenTag::Name, TokenTag::Error, TokenTag::Name]);
    }

    #[test]
    fn spans_cover_the_lexeme() {
        let stream = lex("let x");
        assert_eq!(stream[0].site, SourceSpan::new(0, 0, 3));
        assert_eq!(stream[1].site, SourceSpan::new(0, 4, 5));
    }
}
