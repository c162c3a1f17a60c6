//! Assertion trees built from `.tfspec` files.
//!
//! A spec file is a sequence of top-level blocks:
//!
//! ```text
//! assert "aws_instance" "web" {
//!   ami = "ami-123"
//!   ebs_block_device {
//!     device_name = "/dev/sdb"
//!   }
//!   mock "aws_ami" "ubuntu" {
//!     id = "ami-123"
//!   }
//! }
//!
//! assert "output" "ip" {
//!   value = "10.0.0.1"
//! }
//!
//! mock "aws_vpc" "main" {
//!   cidr_block = "10.0.0.0/16"
//! }
//! ```
//!
//! Targets are checked against the schema registry while parsing, and every
//! literal is converted to the type its attribute declares. Problems become
//! [`Diagnostic`]s next to the partial [`SpecFile`]; nothing here panics or
//! aborts on bad input.

mod convert;

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::diagnostics::Diagnostic;
use crate::errors::did_you_mean;
use crate::lexer::token::SourceLocation;
use crate::lexer::Lexer;
use crate::parser::ast::{Block, BodyItem};
use crate::parser::Parser;
use crate::plan::{DataSourceAddress, ResourceAddress, Target};
use crate::schema::{BlockSchema, SchemaNode, SchemaRegistry};
use crate::value::{AttributePath, Value};

use convert::Converter;

const TOP_LEVEL_BLOCKS: [&str; 2] = ["assert", "mock"];

/// A stand-in read result for a data source
#[derive(Debug, Clone, PartialEq)]
pub struct MockedDataSource {
    pub address: DataSourceAddress,
    pub value: Value,
    pub location: SourceLocation,
}

/// Expectations about one resource instance or output
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub target: Target,
    /// Always a map
    pub expected: Value,
    pub location: SourceLocation,
    /// Mocks declared inside this assertion block
    pub mocks: Vec<MockedDataSource>,
}

/// Everything one spec file declares
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpecFile {
    pub assertions: Vec<Assertion>,
    /// File-scope and assertion-scope mocks, in source order
    pub mocks: Vec<MockedDataSource>,
}

impl SpecFile {
    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty() && self.mocks.is_empty()
    }
}

/// Read and parse a spec file from disk
pub fn read_spec(path: &Path, schemas: &SchemaRegistry) -> (SpecFile, Vec<Diagnostic>) {
    match std::fs::read_to_string(path) {
        Ok(source) => parse_spec(&source, Some(path), schemas),
        Err(e) => (
            SpecFile::default(),
            vec![Diagnostic::error(
                "Cannot read spec file",
                format!("{}: {}", path.display(), e),
            )],
        ),
    }
}

/// Parse spec source against the schema registry
pub fn parse_spec(
    source: &str,
    file: Option<&Path>,
    schemas: &SchemaRegistry,
) -> (SpecFile, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source, file.map(PathBuf::from));
    let parsed = lexer
        .tokenize()
        .and_then(|tokens| Parser::new(tokens, source).parse());
    let ast = match parsed {
        Ok(ast) => ast,
        Err(err) => return (SpecFile::default(), vec![Diagnostic::from(&err)]),
    };

    let mut builder = SpecBuilder {
        schemas,
        spec: SpecFile::default(),
        diagnostics: Vec::new(),
    };
    for item in &ast.body {
        match item {
            BodyItem::Block(block) if block.kind == "assert" => builder.assertion(block),
            BodyItem::Block(block) if block.kind == "mock" => {
                if let Some(mock) = builder.mock(block) {
                    builder.spec.mocks.push(mock);
                }
            }
            BodyItem::Block(block) => builder.diagnostics.push(
                Diagnostic::error(
                    "Unsupported block type",
                    format!(
                        "blocks of type \"{}\" are not expected here{}",
                        block.kind,
                        did_you_mean(&block.kind, &TOP_LEVEL_BLOCKS)
                    ),
                )
                .with_location(block.location.clone()),
            ),
            BodyItem::Attribute(attr) => builder.diagnostics.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!("an argument named \"{}\" is not expected here", attr.name),
                )
                .with_location(attr.location.clone()),
            ),
        }
    }

    debug!(
        assertions = builder.spec.assertions.len(),
        mocks = builder.spec.mocks.len(),
        "parsed spec file"
    );
    (builder.spec, builder.diagnostics)
}

struct SpecBuilder<'s> {
    schemas: &'s SchemaRegistry,
    spec: SpecFile,
    diagnostics: Vec<Diagnostic>,
}

impl<'s> SpecBuilder<'s> {
    fn two_labels<'b>(&mut self, block: &'b Block, usage: &str) -> Option<(&'b str, &'b str)> {
        match block.labels.as_slice() {
            [first, second] => Some((first.value.as_str(), second.value.as_str())),
            _ => {
                self.diagnostics.push(
                    Diagnostic::error(
                        "Wrong number of labels",
                        format!(
                            "{} blocks take two labels, found {}: {}",
                            block.kind,
                            block.labels.len(),
                            usage
                        ),
                    )
                    .with_location(block.location.clone()),
                );
                None
            }
        }
    }

    fn assertion(&mut self, block: &Block) {
        let Some((kind, name)) =
            self.two_labels(block, "assert \"<resource type>\" \"<name>\" or assert \"output\" \"<name>\"")
        else {
            return;
        };

        let resolved = if kind == "output" {
            self.output_target(block, name)
        } else {
            self.resource_target(block, kind, name)
        };
        let Some((target, schema)) = resolved else {
            return;
        };

        let node = SchemaNode::Block(schema);
        let mut mocks = Vec::new();
        let mut body = Vec::new();
        for item in &block.body {
            match item {
                // A schema block named "mock" takes precedence
                BodyItem::Block(inner) if inner.kind == "mock" && node.child("mock").is_none() => {
                    if let Some(mock) = self.mock(inner) {
                        mocks.push(mock);
                    }
                }
                other => body.push(other),
            }
        }

        let mut converter = Converter::new(&mut self.diagnostics);
        let expected = converter.body(body, node, &AttributePath::root());

        self.spec.mocks.extend(mocks.iter().cloned());
        self.spec.assertions.push(Assertion {
            target,
            expected: Value::Map(expected),
            location: block.location.clone(),
            mocks,
        });
    }

    fn output_target(&mut self, block: &Block, name: &str) -> Option<(Target, &'s BlockSchema)> {
        match self.schemas.output(name) {
            Some(schema) => Some((Target::Output(name.to_string()), schema)),
            None => {
                self.diagnostics.push(
                    Diagnostic::error(
                        "Unknown output",
                        format!(
                            "output \"{}\" is not declared by the configuration{}",
                            name,
                            did_you_mean(name, &self.schemas.output_names())
                        ),
                    )
                    .with_location(block.location.clone()),
                );
                None
            }
        }
    }

    fn resource_target(
        &mut self,
        block: &Block,
        resource_type: &str,
        name: &str,
    ) -> Option<(Target, &'s BlockSchema)> {
        let Some(schema) = self.schemas.resource(resource_type) else {
            self.diagnostics.push(
                Diagnostic::error(
                    "Unknown resource type",
                    format!(
                        "resource type \"{}\" is not supported by any provider{}",
                        resource_type,
                        did_you_mean(resource_type, &self.schemas.resource_types())
                    ),
                )
                .with_location(block.location.clone()),
            );
            return None;
        };
        match ResourceAddress::parse(resource_type, name) {
            Ok(address) => Some((Target::Resource(address), schema)),
            Err(message) => {
                self.diagnostics.push(
                    Diagnostic::error("Invalid resource name", message)
                        .with_location(block.labels[1].location.clone()),
                );
                None
            }
        }
    }

    fn mock(&mut self, block: &Block) -> Option<MockedDataSource> {
        let (data_type, name) = self.two_labels(block, "mock \"<data source type>\" \"<name>\"")?;
        let Some(schema) = self.schemas.data_source(data_type) else {
            self.diagnostics.push(
                Diagnostic::error(
                    "Unknown data source type",
                    format!(
                        "data source type \"{}\" is not supported by any provider{}",
                        data_type,
                        did_you_mean(data_type, &self.schemas.data_source_types())
                    ),
                )
                .with_location(block.location.clone()),
            );
            return None;
        };

        let mut converter = Converter::new(&mut self.diagnostics);
        let value: IndexMap<String, Value> =
            converter.body(block.body.iter(), SchemaNode::Block(schema), &AttributePath::root());
        Some(MockedDataSource {
            address: DataSourceAddress::new(data_type, name),
            value: Value::Map(value),
            location: block.location.clone(),
        })
    }
}
