//! An in-memory engine that replays a scripted configuration.
//!
//! Scripts declare schemas, planned resources, outputs and the data sources
//! the configuration reads. A resource attribute can be bound to a data
//! source attribute, so mocked reads show up in the plan the same way they
//! would with a real planner. Nothing touches the network: a data source
//! with neither a mock nor a scripted live value fails refresh.

use indexmap::IndexMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use super::{Engine, EngineContext};
use crate::diagnostics::Diagnostic;
use crate::mock::MockTable;
use crate::plan::{DataSourceAddress, Plan, ResourceAddress};
use crate::schema::SchemaRegistry;
use crate::value::Value;

#[derive(Debug, Clone)]
struct Binding {
    resource: ResourceAddress,
    attribute: String,
    source: DataSourceAddress,
    source_attribute: String,
}

/// What one configuration plans to
#[derive(Debug, Clone)]
pub struct Script {
    schemas: Arc<SchemaRegistry>,
    resources: Vec<(ResourceAddress, Value)>,
    outputs: Vec<(String, Value)>,
    data_sources: IndexMap<DataSourceAddress, Option<Value>>,
    bindings: Vec<Binding>,
    config_failure: Option<Diagnostic>,
    refresh_failure: Option<Diagnostic>,
    plan_failure: Option<Diagnostic>,
    rejects_mocks: bool,
}

impl Script {
    pub fn new(schemas: SchemaRegistry) -> Self {
        Self {
            schemas: Arc::new(schemas),
            resources: Vec::new(),
            outputs: Vec::new(),
            data_sources: IndexMap::new(),
            bindings: Vec::new(),
            config_failure: None,
            refresh_failure: None,
            plan_failure: None,
            rejects_mocks: false,
        }
    }

    /// A planned resource instance
    pub fn resource(mut self, address: ResourceAddress, value: Value) -> Self {
        self.resources.push((address, value));
        self
    }

    /// A planned output; also declares it in the schema registry
    pub fn output(mut self, name: impl Into<String>, value: Value) -> Self {
        let name = name.into();
        Arc::make_mut(&mut self.schemas).insert_output(name.clone());
        self.outputs.push((name, value));
        self
    }

    /// A data source the configuration reads, with an optional live value
    pub fn data_source(mut self, address: DataSourceAddress, live: Option<Value>) -> Self {
        self.data_sources.insert(address, live);
        self
    }

    /// Plan `resource.attribute` from `source.source_attribute` as read during refresh
    pub fn bind(
        mut self,
        resource: ResourceAddress,
        attribute: impl Into<String>,
        source: DataSourceAddress,
        source_attribute: impl Into<String>,
    ) -> Self {
        self.bindings.push(Binding {
            resource,
            attribute: attribute.into(),
            source,
            source_attribute: source_attribute.into(),
        });
        self
    }

    pub fn fail_config(mut self, diagnostic: Diagnostic) -> Self {
        self.config_failure = Some(diagnostic);
        self
    }

    pub fn fail_refresh(mut self, diagnostic: Diagnostic) -> Self {
        self.refresh_failure = Some(diagnostic);
        self
    }

    pub fn fail_plan(mut self, diagnostic: Diagnostic) -> Self {
        self.plan_failure = Some(diagnostic);
        self
    }

    /// Behave like an engine that cannot intercept data source reads
    pub fn reject_mocks(mut self) -> Self {
        self.rejects_mocks = true;
        self
    }
}

/// Engine double serving [`Script`]s, chosen by variables file name
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    default: Arc<Script>,
    by_vars: IndexMap<String, Arc<Script>>,
}

impl ScriptedEngine {
    pub fn new(default: Script) -> Self {
        Self {
            default: Arc::new(default),
            by_vars: IndexMap::new(),
        }
    }

    /// Use `script` for cases whose variables file is named `file_name`
    pub fn with_vars(mut self, file_name: impl Into<String>, script: Script) -> Self {
        self.by_vars.insert(file_name.into(), Arc::new(script));
        self
    }

    fn script_for(&self, vars_file: Option<&Path>) -> Arc<Script> {
        vars_file
            .and_then(|p| p.file_name())
            .and_then(|name| self.by_vars.get(&*name.to_string_lossy()))
            .unwrap_or(&self.default)
            .clone()
    }
}

impl Engine for ScriptedEngine {
    fn new_context(
        &self,
        _config_dir: &Path,
        vars_file: Option<&Path>,
    ) -> Result<Box<dyn EngineContext>, Vec<Diagnostic>> {
        let script = self.script_for(vars_file);
        if let Some(failure) = &script.config_failure {
            return Err(vec![failure.clone()]);
        }
        Ok(Box::new(ScriptedContext {
            script,
            mocks: MockTable::new(),
            reads: None,
        }))
    }
}

struct ScriptedContext {
    script: Arc<Script>,
    mocks: MockTable,
    reads: Option<IndexMap<DataSourceAddress, Value>>,
}

impl EngineContext for ScriptedContext {
    fn schemas(&self) -> Arc<SchemaRegistry> {
        self.script.schemas.clone()
    }

    fn data_sources(&self) -> Vec<DataSourceAddress> {
        self.script.data_sources.keys().cloned().collect()
    }

    fn register_mocks(&mut self, mocks: MockTable) -> Vec<Diagnostic> {
        if self.script.rejects_mocks && !mocks.is_empty() {
            return vec![Diagnostic::error(
                "Mocks are not supported",
                "this engine cannot intercept data source reads",
            )];
        }
        self.mocks = mocks;
        Vec::new()
    }

    fn refresh(&mut self) -> Vec<Diagnostic> {
        if let Some(failure) = &self.script.refresh_failure {
            return vec![failure.clone()];
        }

        let mut diagnostics = Vec::new();
        let mut reads = IndexMap::new();
        for (address, live) in &self.script.data_sources {
            match self.mocks.get(address).or(live.as_ref()) {
                Some(value) => {
                    reads.insert(address.clone(), value.clone());
                }
                None => diagnostics.push(Diagnostic::error(
                    "Cannot read data source",
                    format!(
                        "{} has no mock and no live value; declare a mock block for it",
                        address
                    ),
                )),
            }
        }
        self.reads = Some(reads);
        diagnostics
    }

    fn plan(&mut self) -> Result<Plan, Vec<Diagnostic>> {
        if let Some(failure) = &self.script.plan_failure {
            return Err(vec![failure.clone()]);
        }
        let Some(reads) = &self.reads else {
            return Err(vec![Diagnostic::error(
                "Plan before refresh",
                "data sources must be refreshed before planning",
            )]);
        };

        let mut plan = Plan::new();
        let mut rendered = String::from("Terraform will perform the following actions:\n");
        for (address, value) in &self.script.resources {
            let mut value = value.clone();
            if let Value::Map(attributes) = &mut value {
                for binding in self.script.bindings.iter().filter(|b| &b.resource == address) {
                    let bound = reads
                        .get(&binding.source)
                        .and_then(|read| read.get(&binding.source_attribute))
                        .cloned()
                        .unwrap_or(Value::Null);
                    attributes.insert(binding.attribute.clone(), bound);
                }
            }
            let _ = write!(rendered, "\n  # {} will be created\n  + {}\n", address, value);
            plan.insert_resource(address.clone(), value);
        }
        if !self.script.outputs.is_empty() {
            rendered.push_str("\nChanges to Outputs:\n");
        }
        for (name, value) in &self.script.outputs {
            let _ = writeln!(rendered, "  + {} = {}", name, value);
            plan.insert_output(name.clone(), value.clone());
        }
        for (address, value) in reads {
            plan.insert_data_source(address.clone(), value.clone());
        }
        plan.set_rendered(rendered);
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::has_errors;
    use crate::schema::{AttrType, BlockSchema};

    fn ami() -> DataSourceAddress {
        DataSourceAddress::new("aws_ami", "ubuntu")
    }

    fn web() -> ResourceAddress {
        ResourceAddress::new("aws_instance", "web")
    }

    fn script(live: Option<Value>) -> Script {
        let schemas = SchemaRegistry::new()
            .with_resource("aws_instance", BlockSchema::new().attribute("ami", AttrType::String))
            .with_data_source("aws_ami", BlockSchema::new().attribute("id", AttrType::String));
        Script::new(schemas)
            .resource(web(), Value::map([("instance_type", Value::string("t3.micro"))]))
            .data_source(ami(), live)
            .bind(web(), "ami", ami(), "id")
            .output("instance_type", Value::string("t3.micro"))
    }

    #[test]
    fn test_mock_flows_into_plan() {
        let engine = ScriptedEngine::new(script(None));
        let mut ctx = engine.new_context(Path::new("."), None).unwrap();
        let mut mocks = MockTable::new();
        mocks.insert(ami(), Value::map([("id", Value::string("ami-mocked"))]));
        assert!(ctx.register_mocks(mocks).is_empty());
        assert!(ctx.refresh().is_empty());

        let plan = ctx.plan().unwrap();
        assert_eq!(
            plan.resource(&web()).and_then(|v| v.get("ami")),
            Some(&Value::string("ami-mocked"))
        );
        assert!(plan.rendered().unwrap().contains("# aws_instance.web will be created"));
        assert!(ctx.schemas().output("instance_type").is_some());
    }

    #[test]
    fn test_live_value_used_without_mock() {
        let engine = ScriptedEngine::new(script(Some(Value::map([("id", Value::string("ami-live"))]))));
        let mut ctx = engine.new_context(Path::new("."), None).unwrap();
        assert!(ctx.refresh().is_empty());
        let plan = ctx.plan().unwrap();
        assert_eq!(
            plan.data_source(&ami()).and_then(|v| v.get("id")),
            Some(&Value::string("ami-live"))
        );
    }

    #[test]
    fn test_unmocked_data_source_fails_refresh() {
        let engine = ScriptedEngine::new(script(None));
        let mut ctx = engine.new_context(Path::new("."), None).unwrap();
        let diags = ctx.refresh();
        assert!(has_errors(&diags));
        assert!(diags[0].detail.starts_with("data.aws_ami.ubuntu has no mock"));
    }

    #[test]
    fn test_script_selected_by_vars_file() {
        let failing = script(None).fail_config(Diagnostic::error("Invalid configuration", "boom"));
        let engine = ScriptedEngine::new(script(None)).with_vars("broken.tfvars", failing);
        assert!(engine
            .new_context(Path::new("."), Some(Path::new("spec/broken/broken.tfvars")))
            .is_err());
        assert!(engine
            .new_context(Path::new("."), Some(Path::new("spec/ok/ok.tfvars")))
            .is_ok());
    }

    #[test]
    fn test_rejecting_engine() {
        let engine = ScriptedEngine::new(script(None).reject_mocks());
        let mut ctx = engine.new_context(Path::new("."), None).unwrap();
        let mut mocks = MockTable::new();
        mocks.insert(ami(), Value::Null);
        assert!(has_errors(&ctx.register_mocks(mocks)));
        assert!(ctx.register_mocks(MockTable::new()).is_empty());
    }
}
