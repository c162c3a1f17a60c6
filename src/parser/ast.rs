//! Abstract Syntax Tree (AST) definitions for spec files
//!
//! The AST represents the parsed structure of a `.tfspec` file before any
//! schema is applied. Each node carries source location information for
//! error reporting.

use crate::lexer::token::SourceLocation;

/// A complete spec file
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    /// Top-level items, in source order
    pub body: Vec<BodyItem>,
    /// Source location spanning the entire file
    pub location: SourceLocation,
}

/// Items that can appear in a body
#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    /// `name = expr`
    Attribute(Attribute),
    /// `type "label" ... { ... }`
    Block(Block),
}

impl BodyItem {
    pub fn location(&self) -> &SourceLocation {
        match self {
            BodyItem::Attribute(attr) => &attr.location,
            BodyItem::Block(block) => &block.location,
        }
    }
}

/// Attribute assignment: `name = expr`
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: Expr,
    pub location: SourceLocation,
}

/// Block: `kind "label1" "label2" { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<Label>,
    pub body: Vec<BodyItem>,
    pub location: SourceLocation,
}

/// A block label
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub value: String,
    pub location: SourceLocation,
}

/// Literal expressions. Spec files carry no operators, references or calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null(SourceLocation),
    Bool(bool, SourceLocation),
    Number(f64, SourceLocation),
    String(String, SourceLocation),
    /// `[a, b, c]`
    List(Vec<Expr>, SourceLocation),
    /// `{ key = value, ... }`
    Object(Vec<ObjectItem>, SourceLocation),
}

impl Expr {
    /// Get the source location of this expression
    pub fn location(&self) -> &SourceLocation {
        match self {
            Expr::Null(loc)
            | Expr::Bool(_, loc)
            | Expr::Number(_, loc)
            | Expr::String(_, loc)
            | Expr::List(_, loc)
            | Expr::Object(_, loc) => loc,
        }
    }

    /// Short name of the literal kind, for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Expr::Null(_) => "null",
            Expr::Bool(..) => "bool",
            Expr::Number(..) => "number",
            Expr::String(..) => "string",
            Expr::List(..) => "list",
            Expr::Object(..) => "object",
        }
    }
}

/// Object constructor item: `key = value` or `"key": value`
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectItem {
    pub key: String,
    pub value: Expr,
    pub location: SourceLocation,
}
