//! Conversion of parsed bodies and literals into typed [`Value`] trees.

use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::diagnostics::Diagnostic;
use crate::parser::ast::{Block, BodyItem, Expr};
use crate::schema::{AttrType, SchemaNode};
use crate::value::{format_number, AttributePath, Value};

pub(super) struct Converter<'d> {
    diagnostics: &'d mut Vec<Diagnostic>,
}

impl<'d> Converter<'d> {
    pub(super) fn new(diagnostics: &'d mut Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }

    /// Convert a block body. Attributes and blocks the schema does not define
    /// are kept untyped so validation can report them.
    pub(super) fn body<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a BodyItem>,
        node: SchemaNode<'_>,
        path: &AttributePath,
    ) -> IndexMap<String, Value> {
        let mut map = IndexMap::new();
        for item in items {
            match item {
                BodyItem::Attribute(attr) => {
                    let attr_path = path.attr(&attr.name);
                    if map.contains_key(&attr.name) {
                        self.diagnostics.push(
                            Diagnostic::error(
                                "Duplicate argument",
                                format!("{} is already set in this block", attr_path),
                            )
                            .with_path(attr_path)
                            .with_location(attr.location.clone()),
                        );
                        continue;
                    }
                    let child = node.child(&attr.name).unwrap_or(SchemaNode::Dynamic);
                    if let Some(value) = self.expr(&attr.value, child, &attr_path) {
                        map.insert(attr.name.clone(), value);
                    }
                }
                BodyItem::Block(block) => self.nested_block(&mut map, block, node, path),
            }
        }
        map
    }

    fn nested_block(
        &mut self,
        map: &mut IndexMap<String, Value>,
        block: &Block,
        node: SchemaNode<'_>,
        path: &AttributePath,
    ) {
        let block_path = path.attr(&block.kind);
        let child = node.child(&block.kind);

        if let Some(SchemaNode::BlockMap(inner)) = child {
            let [label] = block.labels.as_slice() else {
                self.label_error(block, &block_path, "exactly one label");
                return;
            };
            let entry_path = block_path.attr(&label.value);
            let body = self.body(&block.body, SchemaNode::Block(inner), &entry_path);
            match map
                .entry(block.kind.clone())
                .or_insert_with(|| Value::Map(IndexMap::new()))
            {
                Value::Map(entries) => {
                    entries.insert(label.value.clone(), Value::Map(body));
                }
                _ => self.conflict(block, &block_path),
            }
            return;
        }

        if !block.labels.is_empty() {
            self.label_error(block, &block_path, "no labels");
            return;
        }

        match child {
            Some(SchemaNode::Block(inner)) => match map.entry(block.kind.clone()) {
                Entry::Occupied(_) => self.diagnostics.push(
                    Diagnostic::error(
                        "Duplicate block",
                        format!("only one {} block is allowed", block.kind),
                    )
                    .with_path(block_path)
                    .with_location(block.location.clone()),
                ),
                Entry::Vacant(slot) => {
                    let body = self.body(&block.body, SchemaNode::Block(inner), &block_path);
                    slot.insert(Value::Map(body));
                }
            },
            // Repeated blocks, and blocks the schema does not know, append
            other => {
                let inner = match other {
                    Some(SchemaNode::BlockList(inner)) => SchemaNode::Block(inner),
                    _ => SchemaNode::Dynamic,
                };
                let index = match map.get(&block.kind) {
                    Some(Value::BlockSet(blocks)) => blocks.len(),
                    Some(_) => {
                        self.conflict(block, &block_path);
                        return;
                    }
                    None => 0,
                };
                let body = self.body(&block.body, inner, &block_path.index(index));
                match map
                    .entry(block.kind.clone())
                    .or_insert_with(|| Value::BlockSet(Vec::new()))
                {
                    Value::BlockSet(blocks) => blocks.push(body),
                    _ => self.conflict(block, &block_path),
                }
            }
        }
    }

    fn label_error(&mut self, block: &Block, path: &AttributePath, wanted: &str) {
        self.diagnostics.push(
            Diagnostic::error(
                "Wrong number of labels",
                format!(
                    "{} blocks take {}, found {}",
                    block.kind,
                    wanted,
                    block.labels.len()
                ),
            )
            .with_path(path.clone())
            .with_location(block.location.clone()),
        );
    }

    fn conflict(&mut self, block: &Block, path: &AttributePath) {
        self.diagnostics.push(
            Diagnostic::error(
                "Conflicting definitions",
                format!("{} is set both as an argument and as a block", path),
            )
            .with_path(path.clone())
            .with_location(block.location.clone()),
        );
    }

    /// Convert a literal to the type declared at `node`. `None` means the
    /// literal was rejected and a diagnostic recorded.
    pub(super) fn expr(
        &mut self,
        expr: &Expr,
        node: SchemaNode<'_>,
        path: &AttributePath,
    ) -> Option<Value> {
        match expr {
            Expr::Null(_) => Some(Value::Null),
            Expr::Bool(..) | Expr::Number(..) | Expr::String(..) => self.scalar(expr, node, path),
            Expr::List(items, _) => {
                if !accepts_list(node) {
                    return self.reject(expr, node, path);
                }
                let mut values = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    values.push(self.expr(item, node.element(i), &path.index(i))?);
                }
                if matches!(node, SchemaNode::BlockList(_)) {
                    let blocks: Option<Vec<_>> = values
                        .iter()
                        .map(|v| v.as_map().cloned())
                        .collect();
                    if let Some(blocks) = blocks {
                        return Some(Value::BlockSet(blocks));
                    }
                }
                Some(Value::List(values))
            }
            Expr::Object(items, _) => {
                if !accepts_map(node) {
                    return self.reject(expr, node, path);
                }
                let mut map = IndexMap::new();
                for item in items {
                    let child = node.child(&item.key).unwrap_or(SchemaNode::Dynamic);
                    if let Some(value) = self.expr(&item.value, child, &path.attr(&item.key)) {
                        map.insert(item.key.clone(), value);
                    }
                }
                Some(Value::Map(map))
            }
        }
    }

    fn scalar(&mut self, expr: &Expr, node: SchemaNode<'_>, path: &AttributePath) -> Option<Value> {
        let converted = match (node, expr) {
            (SchemaNode::Type(AttrType::String), Expr::String(s, _)) => Some(Value::string(s)),
            (SchemaNode::Type(AttrType::String), Expr::Number(n, _)) => {
                Some(Value::string(format_number(*n)))
            }
            (SchemaNode::Type(AttrType::String), Expr::Bool(b, _)) => Some(Value::string(b.to_string())),
            (SchemaNode::Type(AttrType::Number), Expr::Number(n, _)) => Some(Value::number(*n)),
            (SchemaNode::Type(AttrType::Number), Expr::String(s, _)) => {
                s.trim().parse::<f64>().ok().map(Value::number)
            }
            (SchemaNode::Type(AttrType::Bool), Expr::Bool(b, _)) => Some(Value::bool(*b)),
            (SchemaNode::Type(AttrType::Bool), Expr::String(s, _)) => match s.as_str() {
                "true" => Some(Value::bool(true)),
                "false" => Some(Value::bool(false)),
                _ => None,
            },
            (SchemaNode::Type(AttrType::Dynamic) | SchemaNode::Dynamic, _) => Some(literal(expr)),
            _ => None,
        };
        match converted {
            Some(value) => Some(value),
            None => self.reject(expr, node, path),
        }
    }

    fn reject(&mut self, expr: &Expr, node: SchemaNode<'_>, path: &AttributePath) -> Option<Value> {
        let got = match expr {
            Expr::String(s, _) => format!("{:?}", s),
            other => other.kind_name().to_string(),
        };
        self.diagnostics.push(
            Diagnostic::error(
                "Invalid value",
                format!("{}: {} is required, got {}", path, describe(node), got),
            )
            .with_path(path.clone())
            .with_location(expr.location().clone()),
        );
        None
    }
}

fn literal(expr: &Expr) -> Value {
    match expr {
        Expr::Null(_) => Value::Null,
        Expr::Bool(b, _) => Value::bool(*b),
        Expr::Number(n, _) => Value::number(*n),
        Expr::String(s, _) => Value::string(s),
        Expr::List(items, _) => Value::List(items.iter().map(literal).collect()),
        Expr::Object(items, _) => Value::Map(
            items
                .iter()
                .map(|item| (item.key.clone(), literal(&item.value)))
                .collect(),
        ),
    }
}

fn accepts_list(node: SchemaNode<'_>) -> bool {
    matches!(
        node,
        SchemaNode::BlockList(_)
            | SchemaNode::Dynamic
            | SchemaNode::Type(AttrType::List(_) | AttrType::Set(_) | AttrType::Tuple(_) | AttrType::Dynamic)
    )
}

fn accepts_map(node: SchemaNode<'_>) -> bool {
    matches!(
        node,
        SchemaNode::Block(_)
            | SchemaNode::BlockMap(_)
            | SchemaNode::Dynamic
            | SchemaNode::Type(AttrType::Map(_) | AttrType::Object(_) | AttrType::Dynamic)
    )
}

fn describe(node: SchemaNode<'_>) -> &'static str {
    match node {
        SchemaNode::Type(AttrType::String) => "a string",
        SchemaNode::Type(AttrType::Number) => "a number",
        SchemaNode::Type(AttrType::Bool) => "a bool",
        SchemaNode::Type(AttrType::List(_) | AttrType::Set(_) | AttrType::Tuple(_)) => "a list",
        SchemaNode::Type(AttrType::Map(_) | AttrType::Object(_)) => "a map",
        SchemaNode::BlockList(_) => "a list of blocks",
        SchemaNode::Block(_) | SchemaNode::BlockMap(_) => "a block",
        SchemaNode::Type(AttrType::Dynamic) | SchemaNode::Dynamic => "a value",
    }
}
