//! Parser for the `.tfspec` block language
//!
//! This module implements a recursive descent parser that produces an AST
//! from a token stream. The parser is LL(1) with one token lookahead.

pub mod ast;

use crate::errors::{SpecError, SpecResult};
use crate::lexer::token::{SourceLocation, Token, TokenKind};
use ast::*;

/// Maximum nesting of blocks, lists and objects before the parser bails out.
const MAX_PARSE_DEPTH: usize = 128;

/// Parser for spec source code
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: String,
    /// Current recursion depth
    depth: usize,
}

impl Parser {
    /// Create a new parser from a token stream
    pub fn new(tokens: Vec<Token>, source: impl Into<String>) -> Self {
        Self {
            tokens,
            pos: 0,
            source: source.into(),
            depth: 0,
        }
    }

    /// Parse the entire file
    pub fn parse(&mut self) -> SpecResult<File> {
        let start_loc = self.current_location();
        let body = self.parse_body()?;

        self.skip_newlines();
        if !self.is_at_end() {
            return Err(self.error_unexpected("block or attribute"));
        }

        let end_loc = self.current_location();
        Ok(File {
            body,
            location: start_loc.span_to(&end_loc),
        })
    }

    /// Parse body items until a closing brace or end of file
    fn parse_body(&mut self) -> SpecResult<Vec<BodyItem>> {
        let mut items = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() || self.check(&TokenKind::RightBrace) {
                break;
            }
            items.push(self.parse_body_item()?);
        }

        Ok(items)
    }

    /// Parse one attribute or block
    fn parse_body_item(&mut self) -> SpecResult<BodyItem> {
        let start_loc = self.current_location();
        let name = self.expect_ident("attribute or block name")?;

        if self.check(&TokenKind::Eq) {
            self.advance();
            let value = self.parse_expr()?;
            let location = start_loc.span_to(&self.previous_location());
            self.expect_item_end()?;
            return Ok(BodyItem::Attribute(Attribute {
                name,
                value,
                location,
            }));
        }

        if self.check(&TokenKind::Colon) {
            let loc = self.current_location();
            return Err(SpecError::unexpected_token(
                &self.source,
                &loc,
                "'=' or block",
                ":",
                format!("attributes are assigned with '=': {} = ...", name),
            ));
        }

        let mut labels = Vec::new();
        loop {
            match &self.current().kind {
                TokenKind::String(s) | TokenKind::Ident(s) => {
                    labels.push(Label {
                        value: s.clone(),
                        location: self.current_location(),
                    });
                    self.advance();
                }
                _ => break,
            }
        }

        if !self.check(&TokenKind::LeftBrace) {
            return Err(self.error_unexpected("'=' or '{'"));
        }
        self.advance();
        self.enter()?;
        let body = self.parse_body()?;
        self.leave();
        self.expect(&TokenKind::RightBrace)?;
        let location = start_loc.span_to(&self.previous_location());
        self.expect_item_end()?;

        Ok(BodyItem::Block(Block {
            kind: name,
            labels,
            body,
            location,
        }))
    }

    /// An item ends at a newline, a closing brace or the end of input
    fn expect_item_end(&mut self) -> SpecResult<()> {
        match &self.current().kind {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::RightBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.error_unexpected("newline after item")),
        }
    }

    // ========== Expressions ==========

    /// Parse a literal expression
    fn parse_expr(&mut self) -> SpecResult<Expr> {
        let loc = self.current_location();

        match self.current().kind.clone() {
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Null(loc))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true, loc))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false, loc))
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n, loc))
            }
            TokenKind::Minus => {
                self.advance();
                let next = self.current().kind.clone();
                match next {
                    TokenKind::Number(n) => {
                        let end = self.current_location();
                        self.advance();
                        Ok(Expr::Number(-n, loc.span_to(&end)))
                    }
                    _ => Err(self.error_unexpected("number after '-'")),
                }
            }
            TokenKind::String(s) | TokenKind::Heredoc(s) => {
                self.advance();
                Ok(Expr::String(s, loc))
            }
            TokenKind::LeftBracket => self.parse_list(),
            TokenKind::LeftBrace => self.parse_object(),
            TokenKind::Ident(name) => Err(SpecError::unexpected_token(
                &self.source,
                &loc,
                "literal value",
                name,
                "spec files only accept literal values; references and function calls are not evaluated",
            )),
            _ => Err(self.error_unexpected("literal value")),
        }
    }

    /// Parse a list literal `[a, b]`
    fn parse_list(&mut self) -> SpecResult<Expr> {
        let start_loc = self.current_location();
        self.expect(&TokenKind::LeftBracket)?;
        self.enter()?;

        let mut elements = Vec::new();
        loop {
            self.skip_newlines();
            if self.check(&TokenKind::RightBracket) {
                break;
            }
            elements.push(self.parse_expr()?);
            self.skip_newlines();
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                self.skip_newlines();
                if !self.check(&TokenKind::RightBracket) {
                    return Err(self.error_unexpected("',' or ']'"));
                }
            }
        }

        self.leave();
        self.expect(&TokenKind::RightBracket)?;
        Ok(Expr::List(
            elements,
            start_loc.span_to(&self.previous_location()),
        ))
    }

    /// Parse an object literal `{ a = 1, "b" = 2 }`
    fn parse_object(&mut self) -> SpecResult<Expr> {
        let start_loc = self.current_location();
        self.expect(&TokenKind::LeftBrace)?;
        self.enter()?;

        let mut items = Vec::new();
        loop {
            self.skip_separators();
            if self.check(&TokenKind::RightBrace) {
                break;
            }

            let item_loc = self.current_location();
            let key = match self.current().kind.clone() {
                TokenKind::Ident(s) | TokenKind::String(s) => s,
                kind if kind.is_keyword() => kind.to_string(),
                _ => return Err(self.error_unexpected("object key")),
            };
            self.advance();

            if self.check(&TokenKind::Eq) || self.check(&TokenKind::Colon) {
                self.advance();
            } else {
                return Err(self.error_unexpected("'=' or ':' after object key"));
            }

            let value = self.parse_expr()?;
            items.push(ObjectItem {
                key,
                value,
                location: item_loc.span_to(&self.previous_location()),
            });

            match self.current().kind {
                TokenKind::Comma | TokenKind::Newline | TokenKind::RightBrace => {}
                _ => return Err(self.error_unexpected("',' or newline between object items")),
            }
        }

        self.leave();
        self.expect(&TokenKind::RightBrace)?;
        Ok(Expr::Object(
            items,
            start_loc.span_to(&self.previous_location()),
        ))
    }

    // ========== Helpers ==========

    fn enter(&mut self) -> SpecResult<()> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(SpecError::unexpected_token(
                &self.source,
                &self.current_location(),
                "shallower nesting",
                self.current().kind.to_string(),
                format!("nesting is limited to {} levels", MAX_PARSE_DEPTH),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Skip commas and newlines between object items
    fn skip_separators(&mut self) {
        while self.check(&TokenKind::Newline) || self.check(&TokenKind::Comma) {
            self.advance();
        }
    }

    fn current(&self) -> &Token {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .expect("token stream always ends with Eof")
    }

    fn current_location(&self) -> SourceLocation {
        self.current().location.clone()
    }

    fn previous_location(&self) -> SourceLocation {
        if self.pos > 0 {
            self.tokens[self.pos - 1].location.clone()
        } else {
            self.current_location()
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> SpecResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error_unexpected(&kind.to_string()))
        }
    }

    fn expect_ident(&mut self, context: &str) -> SpecResult<String> {
        if let TokenKind::Ident(name) = &self.current().kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error_unexpected(context))
        }
    }

    fn error_unexpected(&self, expected: &str) -> SpecError {
        let token = self.current();
        let help = match token.kind {
            TokenKind::Eof => "the file ended early, check for a missing closing brace".to_string(),
            TokenKind::RightBrace => "unbalanced braces".to_string(),
            _ => format!("expected {}", expected),
        };
        SpecError::unexpected_token(
            &self.source,
            &token.location,
            expected,
            token.kind.to_string(),
            help,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> SpecResult<File> {
        let mut lexer = Lexer::new(source, None);
        let tokens = lexer.tokenize()?;
        let mut parser = Parser::new(tokens, source);
        parser.parse()
    }

    fn first_block(file: &File) -> &Block {
        match &file.body[0] {
            BodyItem::Block(block) => block,
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file() {
        let file = parse("").unwrap();
        assert!(file.body.is_empty());
        let file = parse("\n\n# only a comment\n").unwrap();
        assert!(file.body.is_empty());
    }

    #[test]
    fn test_assert_block() {
        let file = parse("assert \"aws_instance\" \"web\" {\n  ami = \"ami-123\"\n}\n").unwrap();
        let block = first_block(&file);
        assert_eq!(block.kind, "assert");
        let labels: Vec<&str> = block.labels.iter().map(|l| l.value.as_str()).collect();
        assert_eq!(labels, vec!["aws_instance", "web"]);
        match &block.body[0] {
            BodyItem::Attribute(attr) => {
                assert_eq!(attr.name, "ami");
                assert!(matches!(&attr.value, Expr::String(s, _) if s == "ami-123"));
            }
            other => panic!("expected attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let file = parse(
            r#"
assert "aws_security_group" "sg" {
  ingress {
    from_port = 80
  }
  ingress { from_port = 443 }
}
"#,
        )
        .unwrap();
        let block = first_block(&file);
        assert_eq!(block.body.len(), 2);
        for item in &block.body {
            assert!(matches!(item, BodyItem::Block(b) if b.kind == "ingress" && b.labels.is_empty()));
        }
    }

    #[test]
    fn test_single_line_block() {
        let file = parse("assert \"output\" \"ip\" { value = \"10.0.0.1\" }").unwrap();
        assert_eq!(first_block(&file).body.len(), 1);
    }

    #[test]
    fn test_list_literal() {
        let file = parse("x = [1, \"two\",\n  true,\n]").unwrap();
        match &file.body[0] {
            BodyItem::Attribute(attr) => match &attr.value {
                Expr::List(items, _) => {
                    assert_eq!(items.len(), 3);
                    assert!(matches!(items[0], Expr::Number(n, _) if n == 1.0));
                    assert!(matches!(items[2], Expr::Bool(true, _)));
                }
                other => panic!("expected list, got {:?}", other),
            },
            other => panic!("expected attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal() {
        let file = parse("tags = {\n  env = \"prod\"\n  \"team:name\": \"infra\", null = 1\n}").unwrap();
        match &file.body[0] {
            BodyItem::Attribute(attr) => match &attr.value {
                Expr::Object(items, _) => {
                    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
                    assert_eq!(keys, vec!["env", "team:name", "null"]);
                }
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_number() {
        let file = parse("delta = -5").unwrap();
        match &file.body[0] {
            BodyItem::Attribute(attr) => {
                assert!(matches!(attr.value, Expr::Number(n, _) if n == -5.0))
            }
            other => panic!("expected attribute, got {:?}", other),
        }
    }

    #[test]
    fn test_reference_rejected() {
        let err = parse("ami = local_ami").unwrap_err();
        assert!(err.message().contains("expected literal value"));
    }

    #[test]
    fn test_colon_assignment_rejected() {
        let err = parse("ami: \"x\"").unwrap_err();
        match err {
            SpecError::UnexpectedToken { help, .. } => assert!(help.contains("ami = ...")),
            other => panic!("expected unexpected token, got {:?}", other),
        }
    }

    #[test]
    fn test_two_items_on_one_line_rejected() {
        assert!(parse("a = 1 b = 2").is_err());
    }

    #[test]
    fn test_missing_closing_brace() {
        let err = parse("assert \"a\" \"b\" {\n ami = 1\n").unwrap_err();
        match err {
            SpecError::UnexpectedToken { help, .. } => assert!(help.contains("closing brace")),
            other => panic!("expected unexpected token, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let source = format!("x = {}{}", "[".repeat(200), "]".repeat(200));
        assert!(parse(&source).is_err());
    }
}
