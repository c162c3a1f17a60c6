//! Loader for the document printed by `terraform providers schema -json`.

use indexmap::IndexMap;
use serde::Deserialize;

use super::{AttrType, BlockSchema, Nesting, SchemaRegistry};
use crate::errors::{SpecError, SpecResult};

#[derive(Debug, Deserialize)]
struct ProviderSchemasDoc {
    #[serde(default)]
    provider_schemas: IndexMap<String, ProviderDoc>,
}

#[derive(Debug, Deserialize)]
struct ProviderDoc {
    #[serde(default)]
    resource_schemas: IndexMap<String, SchemaDoc>,
    #[serde(default)]
    data_source_schemas: IndexMap<String, SchemaDoc>,
}

#[derive(Debug, Deserialize)]
struct SchemaDoc {
    block: BlockDoc,
}

#[derive(Debug, Default, Deserialize)]
struct BlockDoc {
    #[serde(default)]
    attributes: IndexMap<String, AttributeDoc>,
    #[serde(default)]
    block_types: IndexMap<String, BlockTypeDoc>,
}

#[derive(Debug, Deserialize)]
struct AttributeDoc {
    #[serde(rename = "type")]
    attr_type: Option<serde_json::Value>,
    nested_type: Option<NestedTypeDoc>,
}

#[derive(Debug, Deserialize)]
struct NestedTypeDoc {
    #[serde(default)]
    attributes: IndexMap<String, AttributeDoc>,
    nesting_mode: String,
}

#[derive(Debug, Deserialize)]
struct BlockTypeDoc {
    nesting_mode: String,
    #[serde(default)]
    block: BlockDoc,
}

/// Build a registry from provider schema JSON.
///
/// Outputs are not part of this document; callers add them from the
/// configuration.
pub fn from_provider_json(json: &str) -> SpecResult<SchemaRegistry> {
    let doc: ProviderSchemasDoc =
        serde_json::from_str(json).map_err(|e| SpecError::invalid_schema(e.to_string()))?;

    let mut registry = SchemaRegistry::new();
    for (provider, schemas) in &doc.provider_schemas {
        for (name, schema) in &schemas.resource_schemas {
            let block = convert_block(&schema.block)
                .map_err(|e| SpecError::invalid_schema(format!("{} {}: {}", provider, name, e)))?;
            registry.insert_resource(name.clone(), block);
        }
        for (name, schema) in &schemas.data_source_schemas {
            let block = convert_block(&schema.block)
                .map_err(|e| SpecError::invalid_schema(format!("{} {}: {}", provider, name, e)))?;
            registry.insert_data_source(name.clone(), block);
        }
    }
    Ok(registry)
}

fn convert_block(doc: &BlockDoc) -> Result<BlockSchema, String> {
    let mut block = BlockSchema::new();
    for (name, attr) in &doc.attributes {
        block.attributes.insert(name.clone(), convert_attribute(attr)?);
    }
    for (name, nested) in &doc.block_types {
        let nesting = Nesting::parse(&nested.nesting_mode)
            .ok_or_else(|| format!("unknown nesting mode '{}'", nested.nesting_mode))?;
        block = block.block(name.clone(), nesting, convert_block(&nested.block)?);
    }
    Ok(block)
}

fn convert_attribute(doc: &AttributeDoc) -> Result<AttrType, String> {
    if let Some(t) = &doc.attr_type {
        return parse_type(t);
    }
    let Some(nested) = &doc.nested_type else {
        return Ok(AttrType::Dynamic);
    };

    let mut fields = IndexMap::new();
    for (name, attr) in &nested.attributes {
        fields.insert(name.clone(), convert_attribute(attr)?);
    }
    let object = AttrType::Object(fields);
    match Nesting::parse(&nested.nesting_mode) {
        Some(Nesting::Single) | Some(Nesting::Group) => Ok(object),
        Some(Nesting::List) => Ok(AttrType::list(object)),
        Some(Nesting::Set) => Ok(AttrType::set(object)),
        Some(Nesting::Map) => Ok(AttrType::map(object)),
        None => Err(format!("unknown nesting mode '{}'", nested.nesting_mode)),
    }
}

/// Parse a type expression: `"string"` or `["list", "string"]` and friends
pub fn parse_type(json: &serde_json::Value) -> Result<AttrType, String> {
    use serde_json::Value as Json;

    match json {
        Json::String(s) => match s.as_str() {
            "string" => Ok(AttrType::String),
            "number" => Ok(AttrType::Number),
            "bool" => Ok(AttrType::Bool),
            "dynamic" => Ok(AttrType::Dynamic),
            other => Err(format!("unknown type '{}'", other)),
        },
        Json::Array(parts) => {
            let (Some(Json::String(kind)), Some(arg)) = (parts.first(), parts.get(1)) else {
                return Err(format!("malformed type {}", json));
            };
            match kind.as_str() {
                "list" => Ok(AttrType::list(parse_type(arg)?)),
                "set" => Ok(AttrType::set(parse_type(arg)?)),
                "map" => Ok(AttrType::map(parse_type(arg)?)),
                "object" => {
                    let Json::Object(fields) = arg else {
                        return Err(format!("malformed object type {}", json));
                    };
                    let mut converted = IndexMap::new();
                    for (name, field) in fields {
                        converted.insert(name.clone(), parse_type(field)?);
                    }
                    Ok(AttrType::Object(converted))
                }
                "tuple" => {
                    let Json::Array(elems) = arg else {
                        return Err(format!("malformed tuple type {}", json));
                    };
                    Ok(AttrType::Tuple(
                        elems.iter().map(parse_type).collect::<Result<_, _>>()?,
                    ))
                }
                other => Err(format!("unknown type constructor '{}'", other)),
            }
        }
        _ => Err(format!("malformed type {}", json)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_primitive_and_collection_types() {
        assert_eq!(parse_type(&json!("string")), Ok(AttrType::String));
        assert_eq!(
            parse_type(&json!(["list", ["map", "number"]])),
            Ok(AttrType::list(AttrType::map(AttrType::Number)))
        );
        assert_eq!(
            parse_type(&json!(["tuple", ["string", "bool"]])),
            Ok(AttrType::Tuple(vec![AttrType::String, AttrType::Bool]))
        );
        assert!(parse_type(&json!("decimal")).is_err());
    }

    #[test]
    fn test_from_provider_json() {
        let doc = json!({
            "format_version": "1.0",
            "provider_schemas": {
                "registry.terraform.io/hashicorp/aws": {
                    "provider": {"version": 0, "block": {}},
                    "resource_schemas": {
                        "aws_instance": {
                            "version": 1,
                            "block": {
                                "attributes": {
                                    "ami": {"type": "string", "optional": true},
                                    "tags": {"type": ["map", "string"], "optional": true}
                                },
                                "block_types": {
                                    "ebs_block_device": {
                                        "nesting_mode": "set",
                                        "block": {
                                            "attributes": {
                                                "volume_size": {"type": "number", "optional": true}
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "data_source_schemas": {
                        "aws_ami": {
                            "version": 0,
                            "block": {"attributes": {"id": {"type": "string", "computed": true}}}
                        }
                    }
                }
            }
        });

        let registry = from_provider_json(&doc.to_string()).unwrap();
        let instance = registry.resource("aws_instance").unwrap();
        assert_eq!(instance.attributes.get("ami"), Some(&AttrType::String));
        assert_eq!(
            instance.blocks.get("ebs_block_device").map(|b| b.nesting),
            Some(Nesting::Set)
        );
        assert!(registry.data_source("aws_ami").is_some());
    }

    #[test]
    fn test_nested_type_attribute() {
        let attr: AttributeDoc = serde_json::from_value(json!({
            "nested_type": {
                "attributes": {"name": {"type": "string"}},
                "nesting_mode": "list"
            }
        }))
        .unwrap();
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), AttrType::String);
        assert_eq!(
            convert_attribute(&attr),
            Ok(AttrType::list(AttrType::Object(fields)))
        );
    }

    #[test]
    fn test_invalid_document() {
        let err = from_provider_json("not json").unwrap_err();
        assert!(err.message().starts_with("invalid provider schema"));
    }
}
