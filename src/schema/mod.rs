//! Attribute schemas per resource type, data source type and output.
//!
//! The registry is produced by the planning engine and shared read-only by
//! every test case. The matcher walks it alongside the expected value through
//! [`SchemaNode`] so it can tell "null in the plan" from "not an attribute of
//! this resource type", and compare scalars by their declared type.

pub mod provider;

use indexmap::{IndexMap, IndexSet};
use std::fmt;

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttrType {
    String,
    Number,
    Bool,
    List(Box<AttrType>),
    Set(Box<AttrType>),
    Map(Box<AttrType>),
    Object(IndexMap<String, AttrType>),
    Tuple(Vec<AttrType>),
    /// Any type, decided at plan time
    Dynamic,
}

impl AttrType {
    pub fn list(elem: AttrType) -> Self {
        AttrType::List(Box::new(elem))
    }

    pub fn set(elem: AttrType) -> Self {
        AttrType::Set(Box::new(elem))
    }

    pub fn map(elem: AttrType) -> Self {
        AttrType::Map(Box::new(elem))
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, AttrType::String | AttrType::Number | AttrType::Bool)
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::String => write!(f, "string"),
            AttrType::Number => write!(f, "number"),
            AttrType::Bool => write!(f, "bool"),
            AttrType::List(e) => write!(f, "list({})", e),
            AttrType::Set(e) => write!(f, "set({})", e),
            AttrType::Map(e) => write!(f, "map({})", e),
            AttrType::Object(fields) => {
                write!(f, "object({{")?;
                for (i, (k, t)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", k, t)?;
                }
                write!(f, "}})")
            }
            AttrType::Tuple(types) => {
                write!(f, "tuple([")?;
                for (i, t) in types.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, "])")
            }
            AttrType::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// How a nested block may repeat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nesting {
    /// At most one, value is a map
    Single,
    /// Exactly one, always present
    Group,
    List,
    Set,
    /// One per label, value is a map keyed by label
    Map,
}

impl Nesting {
    pub fn parse(mode: &str) -> Option<Nesting> {
        match mode {
            "single" => Some(Nesting::Single),
            "group" => Some(Nesting::Group),
            "list" => Some(Nesting::List),
            "set" => Some(Nesting::Set),
            "map" => Some(Nesting::Map),
            _ => None,
        }
    }
}

/// A nested block type declared inside a block
#[derive(Debug, Clone, PartialEq)]
pub struct NestedBlock {
    pub nesting: Nesting,
    pub block: BlockSchema,
}

/// Attributes and nested block types of a resource, data source or block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockSchema {
    pub attributes: IndexMap<String, AttrType>,
    pub blocks: IndexMap<String, NestedBlock>,
}

impl BlockSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add an attribute
    pub fn attribute(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.attributes.insert(name.into(), attr_type);
        self
    }

    /// Builder: add a nested block type
    pub fn block(mut self, name: impl Into<String>, nesting: Nesting, block: BlockSchema) -> Self {
        self.blocks.insert(name.into(), NestedBlock { nesting, block });
        self
    }

    /// Schema of an output: a single dynamic `value` attribute
    pub fn output() -> Self {
        Self::new().attribute("value", AttrType::Dynamic)
    }

    /// Every attribute and block name, for suggestions
    pub fn names(&self) -> Vec<String> {
        self.attributes
            .keys()
            .chain(self.blocks.keys())
            .cloned()
            .collect()
    }
}

/// A position in a schema, walked in step with a value tree
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'s> {
    /// A resource, data source, output or single nested block
    Block(&'s BlockSchema),
    /// A list or set of nested blocks
    BlockList(&'s BlockSchema),
    /// Map-nested blocks keyed by label
    BlockMap(&'s BlockSchema),
    Type(&'s AttrType),
    /// No schema information
    Dynamic,
}

impl<'s> SchemaNode<'s> {
    /// Schema of a map key below this node. `None` means the key is not
    /// defined at all (only possible when [`Self::defines_keys`] holds).
    pub fn child(&self, key: &str) -> Option<SchemaNode<'s>> {
        match self {
            SchemaNode::Block(block) => {
                if let Some(attr_type) = block.attributes.get(key) {
                    return Some(SchemaNode::Type(attr_type));
                }
                block.blocks.get(key).map(|nested| match nested.nesting {
                    Nesting::Single | Nesting::Group => SchemaNode::Block(&nested.block),
                    Nesting::List | Nesting::Set => SchemaNode::BlockList(&nested.block),
                    Nesting::Map => SchemaNode::BlockMap(&nested.block),
                })
            }
            SchemaNode::BlockMap(block) => Some(SchemaNode::Block(block)),
            SchemaNode::Type(AttrType::Object(fields)) => fields.get(key).map(SchemaNode::Type),
            SchemaNode::Type(AttrType::Map(elem)) => Some(SchemaNode::Type(elem)),
            SchemaNode::BlockList(_) | SchemaNode::Type(_) | SchemaNode::Dynamic => {
                Some(SchemaNode::Dynamic)
            }
        }
    }

    /// Schema of the element at `index` below this node
    pub fn element(&self, index: usize) -> SchemaNode<'s> {
        match self {
            SchemaNode::BlockList(block) => SchemaNode::Block(block),
            SchemaNode::Type(AttrType::List(elem)) | SchemaNode::Type(AttrType::Set(elem)) => {
                SchemaNode::Type(elem)
            }
            SchemaNode::Type(AttrType::Tuple(types)) => types
                .get(index)
                .map(SchemaNode::Type)
                .unwrap_or(SchemaNode::Dynamic),
            _ => SchemaNode::Dynamic,
        }
    }

    /// Whether the set of keys below this node is fixed by the schema
    pub fn defines_keys(&self) -> bool {
        matches!(
            self,
            SchemaNode::Block(_) | SchemaNode::Type(AttrType::Object(_))
        )
    }

    /// Known key names below this node, for suggestions
    pub fn key_names(&self) -> Vec<String> {
        match self {
            SchemaNode::Block(block) => block.names(),
            SchemaNode::Type(AttrType::Object(fields)) => fields.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Declared primitive type, if this node is a primitive attribute
    pub fn primitive(&self) -> Option<&'s AttrType> {
        match self {
            SchemaNode::Type(t) if t.is_primitive() => Some(t),
            _ => None,
        }
    }
}

/// Schemas of everything a configuration can be asserted on
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    resources: IndexMap<String, BlockSchema>,
    data_sources: IndexMap<String, BlockSchema>,
    outputs: IndexSet<String>,
    output_schema: BlockSchema,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self {
            output_schema: BlockSchema::output(),
            ..Self::default()
        }
    }

    pub fn insert_resource(&mut self, resource_type: impl Into<String>, schema: BlockSchema) {
        self.resources.insert(resource_type.into(), schema);
    }

    pub fn insert_data_source(&mut self, data_type: impl Into<String>, schema: BlockSchema) {
        self.data_sources.insert(data_type.into(), schema);
    }

    pub fn insert_output(&mut self, name: impl Into<String>) {
        self.outputs.insert(name.into());
    }

    /// Builder form of [`Self::insert_resource`]
    pub fn with_resource(mut self, resource_type: impl Into<String>, schema: BlockSchema) -> Self {
        self.insert_resource(resource_type, schema);
        self
    }

    /// Builder form of [`Self::insert_data_source`]
    pub fn with_data_source(mut self, data_type: impl Into<String>, schema: BlockSchema) -> Self {
        self.insert_data_source(data_type, schema);
        self
    }

    /// Builder form of [`Self::insert_output`]
    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.insert_output(name);
        self
    }

    pub fn resource(&self, resource_type: &str) -> Option<&BlockSchema> {
        self.resources.get(resource_type)
    }

    pub fn data_source(&self, data_type: &str) -> Option<&BlockSchema> {
        self.data_sources.get(data_type)
    }

    /// Schema of a declared output
    pub fn output(&self, name: &str) -> Option<&BlockSchema> {
        self.outputs.contains(name).then_some(&self.output_schema)
    }

    pub fn resource_types(&self) -> Vec<String> {
        self.resources.keys().cloned().collect()
    }

    pub fn data_source_types(&self) -> Vec<String> {
        self.data_sources.keys().cloned().collect()
    }

    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance_schema() -> BlockSchema {
        BlockSchema::new()
            .attribute("ami", AttrType::String)
            .attribute("tags", AttrType::map(AttrType::String))
            .attribute("count", AttrType::Number)
            .block(
                "ebs_block_device",
                Nesting::Set,
                BlockSchema::new().attribute("device_name", AttrType::String),
            )
            .block(
                "root_block_device",
                Nesting::Single,
                BlockSchema::new().attribute("volume_size", AttrType::Number),
            )
    }

    #[test]
    fn test_child_of_block() {
        let schema = instance_schema();
        let root = SchemaNode::Block(&schema);
        assert!(matches!(root.child("ami"), Some(SchemaNode::Type(AttrType::String))));
        assert!(matches!(root.child("ebs_block_device"), Some(SchemaNode::BlockList(_))));
        assert!(matches!(root.child("root_block_device"), Some(SchemaNode::Block(_))));
        assert!(root.child("nope").is_none());
        assert!(root.defines_keys());
    }

    #[test]
    fn test_map_attribute_accepts_any_key() {
        let schema = instance_schema();
        let tags = SchemaNode::Block(&schema).child("tags").unwrap();
        assert!(!tags.defines_keys());
        assert!(matches!(tags.child("env"), Some(SchemaNode::Type(AttrType::String))));
    }

    #[test]
    fn test_element_of_block_list() {
        let schema = instance_schema();
        let devices = SchemaNode::Block(&schema).child("ebs_block_device").unwrap();
        let element = devices.element(3);
        assert!(matches!(element, SchemaNode::Block(_)));
        assert!(matches!(
            element.child("device_name"),
            Some(SchemaNode::Type(AttrType::String))
        ));
    }

    #[test]
    fn test_tuple_elements() {
        let tuple = AttrType::Tuple(vec![AttrType::String, AttrType::Number]);
        let node = SchemaNode::Type(&tuple);
        assert!(matches!(node.element(1), SchemaNode::Type(AttrType::Number)));
        assert!(matches!(node.element(2), SchemaNode::Dynamic));
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SchemaRegistry::new()
            .with_resource("aws_instance", instance_schema())
            .with_output("ip");
        assert!(registry.resource("aws_instance").is_some());
        assert!(registry.resource("aws_vpc").is_none());
        assert_eq!(
            registry.output("ip").map(|s| s.names()),
            Some(vec!["value".to_string()])
        );
        assert!(registry.output("missing").is_none());
    }

    #[test]
    fn test_type_display() {
        assert_eq!(AttrType::list(AttrType::String).to_string(), "list(string)");
        let mut fields = IndexMap::new();
        fields.insert("a".to_string(), AttrType::Number);
        assert_eq!(AttrType::Object(fields).to_string(), "object({a=number})");
    }
}
