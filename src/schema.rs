//! Schema model consumed by the generator
//!
//! These trees are produced by the loader (or by callers that parse schemas
//! themselves) and are read-only from then on. Codegen only derives facts
//! from them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Names
// =============================================================================

/// A schema name with its optional dotted namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    pub name: String,
    pub namespace: Option<String>,
}

impl QualifiedName {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        }
    }

    /// Parse `a.b.Name` into namespace `a.b` and name `Name`
    pub fn parse(full_name: &str) -> Self {
        match full_name.rsplit_once('.') {
            Some((namespace, name)) => Self::new(name, Some(namespace)),
            None => Self::new(full_name, None),
        }
    }

    /// Namespace-qualified name, e.g. `orders.LineItem`
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

// =============================================================================
// Annotations
// =============================================================================

/// Free-form annotations attached to a field or record, in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(IndexMap<String, Value>);

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    /// Look up a key. Dotted keys (`sql.table`) are matched verbatim first,
    /// then as a path into nested objects (`"sql": {"table": ..}`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(key) {
            return Some(value);
        }
        let (head, rest) = key.split_once('.')?;
        let mut current = self.0.get(head)?;
        for segment in rest.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Annotations {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Schema Nodes
// =============================================================================

/// Primitive schema kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl Primitive {
    /// Schema-language name of the primitive
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Null => "null",
            Primitive::Boolean => "boolean",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Bytes => "bytes",
            Primitive::String => "string",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Primitive::Null,
            "boolean" => Primitive::Boolean,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            "bytes" => Primitive::Bytes,
            "string" => Primitive::String,
            _ => return None,
        })
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Primitive::Int | Primitive::Long)
    }
}

/// A record with ordered fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSchema {
    pub name: QualifiedName,
    pub doc: Option<String>,
    pub fields: Vec<Field>,
    /// Record-level annotations (e.g. `foreign_references`)
    pub annotations: Annotations,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: QualifiedName::new(name, namespace),
            doc: None,
            fields: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: Value) -> Self {
        self.annotations.insert(key, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnumSchema {
    pub name: QualifiedName,
    pub doc: Option<String>,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedSchema {
    pub name: QualifiedName,
    pub doc: Option<String>,
    pub size: usize,
}

/// Abstract schema tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaNode {
    Primitive { primitive: Primitive },
    Record(RecordSchema),
    Enum(EnumSchema),
    Fixed(FixedSchema),
    Array { items: Box<SchemaNode> },
    Map { values: Box<SchemaNode> },
    Union { members: Vec<SchemaNode> },
    /// A named type defined elsewhere in the shared import context
    Reference { name: QualifiedName },
}

impl SchemaNode {
    pub fn primitive(primitive: Primitive) -> Self {
        SchemaNode::Primitive { primitive }
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array {
            items: Box::new(items),
        }
    }

    pub fn map(values: SchemaNode) -> Self {
        SchemaNode::Map {
            values: Box::new(values),
        }
    }

    pub fn union(members: Vec<SchemaNode>) -> Self {
        SchemaNode::Union { members }
    }

    /// `["null", inner]`
    pub fn optional(inner: SchemaNode) -> Self {
        SchemaNode::union(vec![SchemaNode::primitive(Primitive::Null), inner])
    }

    pub fn reference(full_name: &str) -> Self {
        SchemaNode::Reference {
            name: QualifiedName::parse(full_name),
        }
    }

    /// Short kind label used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Primitive { primitive } => primitive.name(),
            SchemaNode::Record(_) => "record",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Fixed(_) => "fixed",
            SchemaNode::Array { .. } => "array",
            SchemaNode::Map { .. } => "map",
            SchemaNode::Union { .. } => "union",
            SchemaNode::Reference { .. } => "reference",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SchemaNode::Primitive { primitive: Primitive::Null })
    }

    /// Name of a record, enum, fixed or reference
    pub fn name(&self) -> Option<&QualifiedName> {
        match self {
            SchemaNode::Record(r) => Some(&r.name),
            SchemaNode::Enum(e) => Some(&e.name),
            SchemaNode::Fixed(f) => Some(&f.name),
            SchemaNode::Reference { name } => Some(name),
            _ => None,
        }
    }

    /// The non-null arm of a two-member `{null, X}` union
    pub fn nullable_arm(&self) -> Option<&SchemaNode> {
        match self {
            SchemaNode::Union { members } if members.len() == 2 => {
                match (members[0].is_null(), members[1].is_null()) {
                    (true, false) => Some(&members[1]),
                    (false, true) => Some(&members[0]),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Whether this is a union used only to express optionality
    pub fn is_optional(&self) -> bool {
        self.nullable_arm().is_some()
    }

    /// This node with a nullable union elided to its non-null arm
    pub fn base(&self) -> &SchemaNode {
        self.nullable_arm().unwrap_or(self)
    }

    /// All records, enums and fixed types defined in this tree, each once,
    /// in first-seen (pre-order) order.
    pub fn named_types(&self) -> Vec<&SchemaNode> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        self.collect_named(&mut seen, &mut out);
        out
    }

    fn collect_named<'a>(
        &'a self,
        seen: &mut std::collections::HashSet<String>,
        out: &mut Vec<&'a SchemaNode>,
    ) {
        match self {
            SchemaNode::Record(record) => {
                if seen.insert(record.name.full_name()) {
                    out.push(self);
                    for field in &record.fields {
                        field.schema.collect_named(seen, out);
                    }
                }
            }
            SchemaNode::Enum(e) => {
                if seen.insert(e.name.full_name()) {
                    out.push(self);
                }
            }
            SchemaNode::Fixed(f) => {
                if seen.insert(f.name.full_name()) {
                    out.push(self);
                }
            }
            SchemaNode::Array { items } => items.collect_named(seen, out),
            SchemaNode::Map { values } => values.collect_named(seen, out),
            SchemaNode::Union { members } => {
                for member in members {
                    member.collect_named(seen, out);
                }
            }
            SchemaNode::Primitive { .. } | SchemaNode::Reference { .. } => {}
        }
    }
}

// =============================================================================
// Fields
// =============================================================================

/// A record field (or a protocol message parameter)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub schema: SchemaNode,
    pub default: Option<Value>,
    pub doc: Option<String>,
    pub annotations: Annotations,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: SchemaNode) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
            annotations: Annotations::new(),
        }
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: Value) -> Self {
        self.annotations.insert(key, value);
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

// =============================================================================
// Protocols
// =============================================================================

/// A protocol message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub name: String,
    pub doc: Option<String>,
    pub request: Vec<Field>,
    pub response: SchemaNode,
    pub one_way: bool,
}

/// A protocol: named types plus ordered messages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Protocol {
    pub name: QualifiedName,
    pub doc: Option<String>,
    pub types: Vec<SchemaNode>,
    pub messages: Vec<Message>,
}

/// One parsed source file
#[derive(Debug, Clone, PartialEq)]
pub enum CompilationUnit {
    Schema(SchemaNode),
    Protocol(Protocol),
}

/// A compilation unit together with the file it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub path: std::path::PathBuf,
    pub unit: CompilationUnit,
}
