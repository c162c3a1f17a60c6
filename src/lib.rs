// Rust 1.93+ triggers false positives on thiserror/miette derive macro fields
#![allow(unused_assignments)]

//! terraspec
//!
//! Unit tests for terraform configurations. A spec file states what the plan
//! must contain; terraspec plans the configuration, optionally replacing data
//! source reads with mocks, and reports every expected value that matched or
//! did not.
//!
//! # Example
//!
//! ```hcl
//! assert "aws_instance" "web" {
//!   instance_type = "t3.micro"
//!
//!   mock "aws_ami" "ubuntu" {
//!     id = "ami-123"
//!   }
//! }
//!
//! assert "output" "public_ip" {
//!   value = "10.0.0.1"
//! }
//! ```

pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod lexer;
pub mod matcher;
pub mod mock;
pub mod parser;
pub mod plan;
pub mod report;
pub mod runner;
pub mod schema;
pub mod spec;
pub mod value;

pub use diagnostics::{has_errors, Diagnostic, Severity};
pub use engine::{Engine, EngineContext, Script, ScriptedEngine, TerraformCli};
pub use errors::{RunError, SpecError, SpecResult};
pub use lexer::token::{SourceLocation, Token, TokenKind};
pub use lexer::Lexer;
pub use matcher::{validate, validate_assertion};
pub use mock::MockTable;
pub use parser::ast;
pub use parser::Parser;
pub use plan::{DataSourceAddress, InstanceKey, Plan, PlanAccessor, ResourceAddress, Target};
pub use report::{render_diagnostic, render_report};
pub use runner::{find_cases, run_all, run_case, RunOptions, RunSummary, Stage, TestCase, TestReport};
pub use schema::{AttrType, BlockSchema, Nesting, SchemaNode, SchemaRegistry};
pub use spec::{parse_spec, read_spec, Assertion, MockedDataSource, SpecFile};
pub use value::{AttributePath, PathStep, Scalar, Value};
