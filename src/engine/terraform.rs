//! Engine backed by the `terraform` binary.
//!
//! Schemas come from `terraform providers schema -json`; the plan is written
//! to a temporary file and read back with `terraform show`. Outputs and data
//! sources are discovered from the `.tf` files of the configuration so that
//! spec files can be checked before anything is planned.
//!
//! Terraform offers no hook to replace data source reads from the outside, so
//! registering mocks is refused.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, OnceLock};
use tracing::debug;

use super::{Engine, EngineContext};
use crate::diagnostics::Diagnostic;
use crate::errors::{SpecError, SpecResult};
use crate::mock::MockTable;
use crate::plan::json::plan_from_json;
use crate::plan::{DataSourceAddress, Plan};
use crate::schema::provider::from_provider_json;
use crate::schema::SchemaRegistry;

/// Runs terraform as a subprocess
#[derive(Debug, Clone)]
pub struct TerraformCli {
    binary: PathBuf,
}

impl TerraformCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> SpecResult<String> {
        let command = format!("terraform {}", args.first().copied().unwrap_or_default());
        debug!(binary = %self.binary.display(), ?args, "running terraform");

        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(dir)
            .env("TF_IN_AUTOMATION", "1")
            .output()
            .map_err(|e| {
                SpecError::engine_command(
                    &command,
                    format!("cannot run {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpecError::engine_command(command, stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for TerraformCli {
    fn default() -> Self {
        Self::new("terraform")
    }
}

impl Engine for TerraformCli {
    fn new_context(
        &self,
        config_dir: &Path,
        vars_file: Option<&Path>,
    ) -> Result<Box<dyn EngineContext>, Vec<Diagnostic>> {
        let schema_json = self
            .run(config_dir, &["providers", "schema", "-json"])
            .map_err(|e| vec![Diagnostic::from(e)])?;
        let mut schemas = from_provider_json(&schema_json).map_err(|e| vec![Diagnostic::from(e)])?;

        let declared = scan_config(config_dir).map_err(|e| vec![Diagnostic::from(e)])?;
        for name in &declared.outputs {
            schemas.insert_output(name.clone());
        }

        Ok(Box::new(TerraformContext {
            cli: self.clone(),
            config_dir: config_dir.to_path_buf(),
            vars_file: vars_file.map(absolute),
            schemas: Arc::new(schemas),
            data_sources: declared.data_sources,
        }))
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

struct TerraformContext {
    cli: TerraformCli,
    config_dir: PathBuf,
    vars_file: Option<PathBuf>,
    schemas: Arc<SchemaRegistry>,
    data_sources: Vec<DataSourceAddress>,
}

impl TerraformContext {
    fn plan_files(&self) -> SpecResult<Plan> {
        let workdir = tempfile::tempdir().map_err(|e| SpecError::io_error(e.to_string()))?;
        let plan_file = workdir.path().join("terraspec.tfplan");
        let plan_arg = format!("-out={}", plan_file.display());

        let mut args = vec![
            "plan",
            "-refresh=true",
            "-lock=false",
            "-input=false",
            "-no-color",
            plan_arg.as_str(),
        ];
        let var_arg = self
            .vars_file
            .as_ref()
            .map(|p| format!("-var-file={}", p.display()));
        if let Some(var_arg) = &var_arg {
            args.push(var_arg.as_str());
        }
        self.cli.run(&self.config_dir, &args)?;

        let plan_path = plan_file.to_string_lossy();
        let json = self
            .cli
            .run(&self.config_dir, &["show", "-json", &*plan_path])?;
        let mut plan = plan_from_json(&json, &self.schemas)?;

        let rendered = self
            .cli
            .run(&self.config_dir, &["show", "-no-color", &*plan_path])?;
        plan.set_rendered(rendered);
        Ok(plan)
    }
}

impl EngineContext for TerraformContext {
    fn schemas(&self) -> Arc<SchemaRegistry> {
        self.schemas.clone()
    }

    fn data_sources(&self) -> Vec<DataSourceAddress> {
        self.data_sources.clone()
    }

    fn register_mocks(&mut self, mocks: MockTable) -> Vec<Diagnostic> {
        if mocks.is_empty() {
            return Vec::new();
        }
        vec![Diagnostic::error(
            "Mocks are not supported",
            format!(
                "the terraform CLI cannot replace data source reads; remove the {} mock block(s) or run with an engine that supports mocking",
                mocks.len()
            ),
        )]
    }

    fn refresh(&mut self) -> Vec<Diagnostic> {
        // terraform refreshes as part of `plan -refresh=true`
        Vec::new()
    }

    fn plan(&mut self) -> Result<Plan, Vec<Diagnostic>> {
        self.plan_files().map_err(|e| vec![Diagnostic::from(e)])
    }
}

#[derive(Debug, Default, PartialEq)]
struct DeclaredBlocks {
    outputs: Vec<String>,
    data_sources: Vec<DataSourceAddress>,
}

fn output_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*output\s+"?([A-Za-z0-9_-]+)"?\s*\{"#).expect("output pattern is valid")
    })
}

fn data_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?m)^\s*data\s+"?([A-Za-z0-9_-]+)"?\s+"?([A-Za-z0-9_-]+)"?\s*\{"#)
            .expect("data pattern is valid")
    })
}

/// Find top-level `output` and `data` blocks in the `.tf` files of a directory
fn scan_config(dir: &Path) -> SpecResult<DeclaredBlocks> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        SpecError::io_error(format!("cannot read {}: {}", dir.display(), e))
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "tf"))
        .collect();
    files.sort();

    let mut declared = DeclaredBlocks::default();
    for file in files {
        let source = std::fs::read_to_string(&file).map_err(|e| {
            SpecError::io_error(format!("cannot read {}: {}", file.display(), e))
        })?;
        scan_source(&source, &mut declared);
    }
    Ok(declared)
}

fn scan_source(source: &str, declared: &mut DeclaredBlocks) {
    for caps in output_regex().captures_iter(source) {
        declared.outputs.push(caps[1].to_string());
    }
    for caps in data_regex().captures_iter(source) {
        let address = DataSourceAddress::new(&caps[1], &caps[2]);
        if !declared.data_sources.contains(&address) {
            declared.data_sources.push(address);
        }
    }
}
