//! Plan snapshots and the read-only accessor the matcher resolves targets through.

pub mod json;

use indexmap::IndexMap;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use crate::schema::{SchemaNode, SchemaRegistry};
use crate::value::Value;

/// Instance key of a resource created with `count` or `for_each`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InstanceKey {
    Index(usize),
    Key(String),
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceKey::Index(i) => write!(f, "[{}]", i),
            InstanceKey::Key(k) => write!(f, "[{:?}]", k),
        }
    }
}

/// `aws_instance.web`, `aws_instance.web[0]`, `aws_instance.web["blue"]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceAddress {
    pub resource_type: String,
    pub name: String,
    pub key: Option<InstanceKey>,
}

fn instance_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^([A-Za-z_][A-Za-z0-9_-]*)(?:\[(?:(\d+)|"([^"]*)")\])?$"#)
            .expect("instance name pattern is valid")
    })
}

impl ResourceAddress {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            key: None,
        }
    }

    pub fn with_key(mut self, key: InstanceKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Parse a block label naming an instance: `web`, `web[0]` or `web["k"]`
    pub fn parse(resource_type: &str, label: &str) -> Result<Self, String> {
        let caps = instance_name_regex()
            .captures(label)
            .ok_or_else(|| format!("'{}' is not a valid resource name", label))?;
        let address = Self::new(resource_type, &caps[1]);
        if let Some(index) = caps.get(2) {
            let index = index
                .as_str()
                .parse()
                .map_err(|_| format!("instance index in '{}' is out of range", label))?;
            Ok(address.with_key(InstanceKey::Index(index)))
        } else if let Some(key) = caps.get(3) {
            Ok(address.with_key(InstanceKey::Key(key.as_str().to_string())))
        } else {
            Ok(address)
        }
    }
}

impl fmt::Display for ResourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)?;
        if let Some(key) = &self.key {
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

/// `data.<type>.<name>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataSourceAddress {
    pub data_type: String,
    pub name: String,
}

impl DataSourceAddress {
    pub fn new(data_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for DataSourceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data.{}.{}", self.data_type, self.name)
    }
}

/// What an assertion is about
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Resource(ResourceAddress),
    Output(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Resource(address) => write!(f, "{}", address),
            Target::Output(name) => write!(f, "output.{}", name),
        }
    }
}

/// An immutable computed plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    resources: IndexMap<ResourceAddress, Value>,
    outputs: IndexMap<String, Value>,
    data_sources: IndexMap<DataSourceAddress, Value>,
    rendered: Option<String>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_resource(&mut self, address: ResourceAddress, value: Value) {
        self.resources.insert(address, value);
    }

    pub fn insert_output(&mut self, name: impl Into<String>, value: Value) {
        self.outputs.insert(name.into(), value);
    }

    pub fn insert_data_source(&mut self, address: DataSourceAddress, value: Value) {
        self.data_sources.insert(address, value);
    }

    pub fn set_rendered(&mut self, text: impl Into<String>) {
        self.rendered = Some(text.into());
    }

    pub fn resource(&self, address: &ResourceAddress) -> Option<&Value> {
        self.resources.get(address)
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Value read for a data source during refresh
    pub fn data_source(&self, address: &DataSourceAddress) -> Option<&Value> {
        self.data_sources.get(address)
    }

    pub fn rendered(&self) -> Option<&str> {
        self.rendered.as_deref()
    }
}

/// Read-only view of a plan, paired with the schemas of its targets
#[derive(Debug, Clone, Copy)]
pub struct PlanAccessor<'a> {
    plan: &'a Plan,
    schemas: &'a SchemaRegistry,
}

impl<'a> PlanAccessor<'a> {
    pub fn new(plan: &'a Plan, schemas: &'a SchemaRegistry) -> Self {
        Self { plan, schemas }
    }

    /// Attribute tree of a target. Outputs resolve to `{ value = <v> }`.
    pub fn resolve(&self, target: &Target) -> Option<Cow<'a, Value>> {
        match target {
            Target::Resource(address) => self.plan.resource(address).map(Cow::Borrowed),
            Target::Output(name) => self
                .plan
                .output(name)
                .map(|v| Cow::Owned(Value::map([("value", v.clone())]))),
        }
    }

    pub fn exists(&self, target: &Target) -> bool {
        match target {
            Target::Resource(address) => self.plan.resource(address).is_some(),
            Target::Output(name) => self.plan.output(name).is_some(),
        }
    }

    /// Schema of a target's root value
    pub fn schema_for(&self, target: &Target) -> SchemaNode<'a> {
        let block = match target {
            Target::Resource(address) => self.schemas.resource(&address.resource_type),
            Target::Output(name) => self.schemas.output(name),
        };
        block.map(SchemaNode::Block).unwrap_or(SchemaNode::Dynamic)
    }
}
