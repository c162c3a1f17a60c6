use std::fmt;
use std::path::PathBuf;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File path (if known)
    pub file: Option<PathBuf>,
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
    /// Byte offset from start of file
    pub offset: usize,
    /// Length in bytes
    pub length: usize,
}

impl SourceLocation {
    pub fn new(
        file: Option<PathBuf>,
        line: usize,
        column: usize,
        offset: usize,
        length: usize,
    ) -> Self {
        Self {
            file,
            line,
            column,
            offset,
            length,
        }
    }

    /// Create a span from this location to another
    pub fn span_to(&self, other: &SourceLocation) -> SourceLocation {
        SourceLocation {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
            offset: self.offset,
            length: (other.offset + other.length).saturating_sub(self.offset),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(path) => write!(f, "{}#{},{}", path.display(), self.line, self.column),
            None => write!(f, "<input>#{},{}", self.line, self.column),
        }
    }
}

/// Token type enumeration for the spec block language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    Null,
    True,
    False,

    // Literals
    Number(f64),
    String(String),
    /// `<<EOT ... EOT` body, indentation already stripped for `<<-`
    Heredoc(String),

    // Identifiers (block types, attribute names)
    Ident(String),

    // Punctuation
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    Eq,           // =
    Colon,        // :
    Comma,        // ,
    Minus,        // -

    // Special
    Newline,
    Eof,
}

impl TokenKind {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(self, TokenKind::Null | TokenKind::True | TokenKind::False)
    }

    /// Get the keyword from a string, if it matches
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "null" => Some(TokenKind::Null),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Null => write!(f, "null"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::String(s) => write!(f, "\"{}\"", s),
            TokenKind::Heredoc(_) => write!(f, "<heredoc>"),
            TokenKind::Ident(s) => write!(f, "{}", s),
            TokenKind::LeftBrace => write!(f, "{{"),
            TokenKind::RightBrace => write!(f, "}}"),
            TokenKind::LeftBracket => write!(f, "["),
            TokenKind::RightBracket => write!(f, "]"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Newline => write!(f, "<newline>"),
            TokenKind::Eof => write!(f, "<eof>"),
        }
    }
}

/// A token with its location and kind
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.location)
    }
}
