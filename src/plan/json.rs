//! Conversion of `terraform show -json` plan documents into [`Plan`]s.
//!
//! Attribute values are decoded against the provider schemas so that nested
//! block lists become [`Value::BlockSet`] and attribute lists stay lists.
//! Attributes the plan marks as unknown are simply absent from
//! `planned_values` and therefore missing from the decoded value.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value as Json;

use super::{DataSourceAddress, InstanceKey, Plan, ResourceAddress};
use crate::errors::{SpecError, SpecResult};
use crate::schema::{SchemaNode, SchemaRegistry};
use crate::value::Value;

#[derive(Debug, Deserialize)]
struct PlanDoc {
    #[serde(default)]
    planned_values: Option<ValuesDoc>,
    #[serde(default)]
    prior_state: Option<StateDoc>,
}

#[derive(Debug, Deserialize)]
struct StateDoc {
    #[serde(default)]
    values: Option<ValuesDoc>,
}

#[derive(Debug, Deserialize)]
struct ValuesDoc {
    #[serde(default)]
    outputs: IndexMap<String, OutputDoc>,
    #[serde(default)]
    root_module: Option<ModuleDoc>,
}

#[derive(Debug, Deserialize)]
struct OutputDoc {
    #[serde(default)]
    value: Option<Json>,
}

#[derive(Debug, Default, Deserialize)]
struct ModuleDoc {
    #[serde(default)]
    resources: Vec<ResourceDoc>,
    #[serde(default)]
    child_modules: Vec<ModuleDoc>,
}

#[derive(Debug, Deserialize)]
struct ResourceDoc {
    mode: String,
    #[serde(rename = "type")]
    resource_type: String,
    name: String,
    #[serde(default)]
    index: Option<Json>,
    #[serde(default)]
    values: Option<Json>,
}

/// Build a plan from a JSON plan document
pub fn plan_from_json(json: &str, schemas: &SchemaRegistry) -> SpecResult<Plan> {
    let doc: PlanDoc =
        serde_json::from_str(json).map_err(|e| SpecError::invalid_plan(e.to_string()))?;
    let mut plan = Plan::new();

    if let Some(planned) = &doc.planned_values {
        for (name, output) in &planned.outputs {
            let value = output.value.as_ref().map(Value::from_json).unwrap_or(Value::Null);
            plan.insert_output(name.clone(), value);
        }
        if let Some(root) = &planned.root_module {
            collect_resources(root, schemas, &mut plan)?;
        }
    }

    if let Some(root) = doc
        .prior_state
        .as_ref()
        .and_then(|s| s.values.as_ref())
        .and_then(|v| v.root_module.as_ref())
    {
        collect_data_sources(root, schemas, &mut plan);
    }

    Ok(plan)
}

fn collect_resources(module: &ModuleDoc, schemas: &SchemaRegistry, plan: &mut Plan) -> SpecResult<()> {
    for resource in module.resources.iter().filter(|r| r.mode == "managed") {
        let mut address = ResourceAddress::new(&resource.resource_type, &resource.name);
        if let Some(index) = &resource.index {
            address = address.with_key(instance_key(index)?);
        }
        // Root module instances shadow same-named module instances
        if plan.resource(&address).is_some() {
            continue;
        }
        let node = schemas
            .resource(&resource.resource_type)
            .map(SchemaNode::Block)
            .unwrap_or(SchemaNode::Dynamic);
        let value = resource
            .values
            .as_ref()
            .map(|v| decode(v, node))
            .unwrap_or_else(|| Value::Map(IndexMap::new()));
        plan.insert_resource(address, value);
    }
    for child in &module.child_modules {
        collect_resources(child, schemas, plan)?;
    }
    Ok(())
}

fn collect_data_sources(module: &ModuleDoc, schemas: &SchemaRegistry, plan: &mut Plan) {
    for resource in module.resources.iter().filter(|r| r.mode == "data") {
        let node = schemas
            .data_source(&resource.resource_type)
            .map(SchemaNode::Block)
            .unwrap_or(SchemaNode::Dynamic);
        let value = resource.values.as_ref().map(|v| decode(v, node)).unwrap_or(Value::Null);
        plan.insert_data_source(
            DataSourceAddress::new(&resource.resource_type, &resource.name),
            value,
        );
    }
    for child in &module.child_modules {
        collect_data_sources(child, schemas, plan);
    }
}

fn instance_key(index: &Json) -> SpecResult<InstanceKey> {
    match index {
        Json::Number(n) => n
            .as_u64()
            .map(|i| InstanceKey::Index(i as usize))
            .ok_or_else(|| SpecError::invalid_plan(format!("invalid instance index {}", n))),
        Json::String(s) => Ok(InstanceKey::Key(s.clone())),
        other => Err(SpecError::invalid_plan(format!(
            "invalid instance key {}",
            other
        ))),
    }
}

/// Decode a JSON value, guided by the schema node it sits at
pub fn decode(json: &Json, node: SchemaNode<'_>) -> Value {
    match json {
        Json::Array(items) => {
            if let SchemaNode::BlockList(block) = node {
                let blocks: Option<Vec<_>> = items
                    .iter()
                    .map(|item| match decode(item, SchemaNode::Block(block)) {
                        Value::Map(map) => Some(map),
                        _ => None,
                    })
                    .collect();
                if let Some(blocks) = blocks {
                    return Value::BlockSet(blocks);
                }
            }
            Value::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| decode(item, node.element(i)))
                    .collect(),
            )
        }
        Json::Object(fields) => Value::Map(
            fields
                .iter()
                .map(|(key, field)| {
                    let child = node.child(key).unwrap_or(SchemaNode::Dynamic);
                    (key.clone(), decode(field, child))
                })
                .collect(),
        ),
        scalar => Value::from_json(scalar),
    }
}
