//! The planning engine boundary.
//!
//! Everything terraspec needs from a planner goes through these two traits:
//! one [`Engine`] shared by all cases, and one [`EngineContext`] per case.
//! Calls are blocking; the runner keeps them off the async workers.

pub mod scripted;
pub mod terraform;

use std::path::Path;
use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::mock::MockTable;
use crate::plan::{DataSourceAddress, Plan};
use crate::schema::SchemaRegistry;

pub use scripted::{Script, ScriptedEngine};
pub use terraform::TerraformCli;

/// Creates per-case planning contexts
pub trait Engine: Send + Sync {
    /// Load the configuration in `config_dir` with an optional variables file
    fn new_context(
        &self,
        config_dir: &Path,
        vars_file: Option<&Path>,
    ) -> Result<Box<dyn EngineContext>, Vec<Diagnostic>>;
}

/// One loaded configuration, driven through refresh and plan
pub trait EngineContext: Send {
    /// Schemas of every resource type, data source type and output
    fn schemas(&self) -> Arc<SchemaRegistry>;

    /// Data sources the configuration reads
    fn data_sources(&self) -> Vec<DataSourceAddress>;

    /// Replace data source reads with mocked values
    fn register_mocks(&mut self, mocks: MockTable) -> Vec<Diagnostic>;

    /// Read data sources
    fn refresh(&mut self) -> Vec<Diagnostic>;

    /// Compute the plan, including its rendered text when available
    fn plan(&mut self) -> Result<Plan, Vec<Diagnostic>>;
}
