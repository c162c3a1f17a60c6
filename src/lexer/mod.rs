//! Lexer (tokenizer) for the `.tfspec` block language.
//!
//! Converts source text into a stream of [`token::Token`]s for the parser.
//! The grammar mirrors the configuration language's literal syntax: blocks,
//! attributes, strings, heredocs, numbers, lists and objects.

pub mod token;

use std::path::PathBuf;

use crate::errors::{SpecError, SpecResult};
use token::{SourceLocation, Token, TokenKind};

/// Lexer for spec files
pub struct Lexer<'a> {
    /// Source code being lexed
    source: &'a str,
    /// Characters for iteration
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    /// Current position in bytes
    position: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start position of current token
    token_start: usize,
    /// Start line of current token
    token_start_line: usize,
    /// Start column of current token
    token_start_column: usize,
    /// File path for error reporting
    file: Option<PathBuf>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code
    pub fn new(source: &'a str, file: Option<PathBuf>) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            position: 0,
            line: 1,
            column: 1,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
            file,
        }
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> SpecResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token
    pub fn next_token(&mut self) -> SpecResult<Token> {
        self.skip_whitespace_and_comments()?;

        self.token_start = self.position;
        self.token_start_line = self.line;
        self.token_start_column = self.column;

        let Some(ch) = self.peek_char() else {
            return Ok(self.make_token(TokenKind::Eof));
        };

        match ch {
            'a'..='z' | 'A'..='Z' | '_' => self.lex_identifier(),
            '0'..='9' => self.lex_number(),
            '"' => self.lex_string(),
            '<' if self.peek_char_at(1) == Some('<') => self.lex_heredoc(),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '=' => self.single(TokenKind::Eq),
            ':' => self.single(TokenKind::Colon),
            ',' => self.single(TokenKind::Comma),
            '-' => self.single(TokenKind::Minus),
            '\n' => self.single(TokenKind::Newline),
            _ => {
                self.advance();
                Err(self.error_unexpected_char(ch))
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> SpecResult<Token> {
        self.advance();
        Ok(self.make_token(kind))
    }

    /// Peek at the current character without consuming
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Peek at a character at offset from current position
    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.source[self.position..].chars().nth(offset)
    }

    /// Advance to the next character
    fn advance(&mut self) -> Option<char> {
        let (pos, ch) = self.chars.next()?;
        self.position = pos + ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> SpecResult<()> {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('#') => self.skip_line_comment(),
                Some('/') if self.peek_char_at(1) == Some('/') => self.skip_line_comment(),
                Some('/') if self.peek_char_at(1) == Some('*') => {
                    let start = SourceLocation::new(self.file.clone(), self.line, self.column, self.position, 2);
                    self.advance(); // /
                    self.advance(); // *
                    loop {
                        match self.peek_char() {
                            None => {
                                return Err(SpecError::unterminated(
                                    self.source,
                                    &start,
                                    "block comment",
                                    "close the comment with */",
                                ));
                            }
                            Some('*') if self.peek_char_at(1) == Some('/') => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            Some(_) => {
                                self.advance();
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Skip to the end of the line, leaving the newline for the parser
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Lex an identifier or keyword
    fn lex_identifier(&mut self) -> SpecResult<Token> {
        let start = self.position;

        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '-' {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.position];

        let kind =
            TokenKind::keyword_from_str(text).unwrap_or_else(|| TokenKind::Ident(text.to_string()));

        Ok(self.make_token(kind))
    }

    /// Lex a number literal
    fn lex_number(&mut self) -> SpecResult<Token> {
        let start = self.position;

        self.eat_digits();

        if self.peek_char() == Some('.') && matches!(self.peek_char_at(1), Some('0'..='9')) {
            self.advance(); // .
            self.eat_digits();
        }

        if let Some('e' | 'E') = self.peek_char() {
            self.advance();
            if let Some('+' | '-') = self.peek_char() {
                self.advance();
            }
            self.eat_digits();
        }

        let text = &self.source[start..self.position];
        let value: f64 = text.parse().map_err(|_| {
            SpecError::unexpected_token(
                self.source,
                &self.token_location(),
                "valid number",
                text,
                "invalid number literal",
            )
        })?;

        Ok(self.make_token(TokenKind::Number(value)))
    }

    fn eat_digits(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Lex a double-quoted string. Templates are rejected, `$${` and `%%{` are
    /// the literal escapes.
    fn lex_string(&mut self) -> SpecResult<Token> {
        self.advance(); // opening "

        let mut value = String::new();

        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Err(SpecError::unterminated(
                        self.source,
                        &self.token_location(),
                        "string",
                        "add closing quote at end of string",
                    ));
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escaped = self.lex_escape_sequence()?;
                    value.push(escaped);
                }
                Some(marker @ ('$' | '%')) => {
                    self.push_template_char(marker, &mut value)?;
                }
                Some(ch) => {
                    self.advance();
                    value.push(ch);
                }
            }
        }

        Ok(self.make_token(TokenKind::String(value)))
    }

    /// Handle `$`/`%` inside a string or heredoc: `$${` is a literal `${`,
    /// a bare `${` starts a template and is rejected.
    fn push_template_char(&mut self, marker: char, value: &mut String) -> SpecResult<()> {
        if self.peek_char_at(1) == Some(marker) && self.peek_char_at(2) == Some('{') {
            self.advance();
            self.advance();
            self.advance();
            value.push(marker);
            value.push('{');
            return Ok(());
        }
        if self.peek_char_at(1) == Some('{') {
            let location = SourceLocation::new(self.file.clone(), self.line, self.column, self.position, 2);
            return Err(SpecError::template_not_supported(self.source, &location));
        }
        self.advance();
        value.push(marker);
        Ok(())
    }

    /// Lex a heredoc: `<<EOT` or `<<-EOT`, the body runs until a line holding
    /// only the delimiter.
    fn lex_heredoc(&mut self) -> SpecResult<Token> {
        self.advance(); // <
        self.advance(); // <

        let indented = if self.peek_char() == Some('-') {
            self.advance();
            true
        } else {
            false
        };

        let start = self.position;
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let delimiter = self.source[start..self.position].to_string();
        if self.peek_char() == Some('\r') && self.peek_char_at(1) == Some('\n') {
            self.advance();
        }

        if delimiter.is_empty() || self.peek_char() != Some('\n') {
            return Err(SpecError::unexpected_token(
                self.source,
                &self.token_location(),
                "heredoc delimiter followed by a newline",
                self.peek_char().map(String::from).unwrap_or_else(|| "<eof>".into()),
                "write heredocs as <<EOT on its own line, closed by EOT",
            ));
        }
        self.advance(); // newline after the delimiter

        let mut lines: Vec<String> = Vec::new();
        loop {
            if self.peek_char().is_none() {
                return Err(SpecError::unterminated(
                    self.source,
                    &self.token_location(),
                    "heredoc",
                    format!("close the heredoc with a line containing only {}", delimiter),
                ));
            }

            let mut line = String::new();
            while let Some(ch) = self.peek_char() {
                if ch == '\n' {
                    break;
                }
                if ch == '$' || ch == '%' {
                    self.push_template_char(ch, &mut line)?;
                } else {
                    self.advance();
                    line.push(ch);
                }
            }

            if line.ends_with('\r') {
                line.pop();
            }
            if line.trim() == delimiter {
                break;
            }
            lines.push(line);

            // Consume the newline ending this body line
            self.advance();
        }

        let body = if indented {
            strip_common_indent(&lines)
        } else {
            lines
        };

        let mut value = String::new();
        for line in body {
            value.push_str(&line);
            value.push('\n');
        }

        Ok(self.make_token(TokenKind::Heredoc(value)))
    }

    /// Lex an escape sequence
    fn lex_escape_sequence(&mut self) -> SpecResult<char> {
        match self.peek_char() {
            Some('n') => {
                self.advance();
                Ok('\n')
            }
            Some('r') => {
                self.advance();
                Ok('\r')
            }
            Some('t') => {
                self.advance();
                Ok('\t')
            }
            Some('\\') => {
                self.advance();
                Ok('\\')
            }
            Some('"') => {
                self.advance();
                Ok('"')
            }
            Some('u') => {
                // Unicode escape \uNNNN
                self.advance();
                let mut hex = String::new();
                for _ in 0..4 {
                    match self.peek_char() {
                        Some(ch) if ch.is_ascii_hexdigit() => {
                            hex.push(ch);
                            self.advance();
                        }
                        _ => {
                            return Err(SpecError::invalid_escape_sequence(
                                self.source,
                                &self.current_location(),
                                format!("\\u{}", hex),
                                "expected four hex digits: \\uNNNN",
                            ));
                        }
                    }
                }

                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        SpecError::invalid_escape_sequence(
                            self.source,
                            &self.current_location(),
                            format!("\\u{}", hex),
                            "invalid unicode code point",
                        )
                    })
            }
            Some(ch) => {
                let seq = format!("\\{}", ch);
                Err(SpecError::invalid_escape_sequence(
                    self.source,
                    &self.current_location(),
                    seq.clone(),
                    format!(
                        "'{}' is not a valid escape sequence. Use '\\\\' for literal backslash",
                        seq
                    ),
                ))
            }
            None => Err(SpecError::invalid_escape_sequence(
                self.source,
                &self.current_location(),
                "\\<eof>",
                "unexpected end of file in escape sequence",
            )),
        }
    }

    /// Create a token with the current token span
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.token_location())
    }

    /// Get the location for the current token
    fn token_location(&self) -> SourceLocation {
        SourceLocation::new(
            self.file.clone(),
            self.token_start_line,
            self.token_start_column,
            self.token_start,
            self.position - self.token_start,
        )
    }

    /// Get the current location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.line, self.column, self.position, 1)
    }

    /// Create an unexpected character error
    fn error_unexpected_char(&self, ch: char) -> SpecError {
        let location = SourceLocation::new(
            self.file.clone(),
            self.token_start_line,
            self.token_start_column,
            self.token_start,
            ch.len_utf8(),
        );
        SpecError::unexpected_character(self.source, &location, ch)
    }
}

/// Remove the leading whitespace shared by every non-blank line
fn strip_common_indent(lines: &[String]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| {
            if l.len() >= indent {
                l[indent..].to_string()
            } else {
                l.trim_start().to_string()
            }
        })
        .collect()
}
