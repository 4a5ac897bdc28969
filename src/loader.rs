//! Schema and Protocol Loading
//!
//! Adapts parsed Avro definitions into the generator's schema model:
//! - `.avsc` files are parsed by `apache-avro` against a shared import
//!   context, so named types defined in imports resolve as references
//! - `.avpr` protocols are read as JSON; their types go through the same
//!   Avro parser, their messages are converted here
//! - input discovery walks directories for one file extension

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use apache_avro::schema::{Name, RecordField};
use apache_avro::Schema as AvroSchema;
use serde_json::{Map, Value};
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{CodegenError, Result};
use crate::schema::{
    Annotations, CompilationUnit, EnumSchema, Field, FixedSchema, Message, Primitive, Protocol,
    QualifiedName, RecordSchema, SchemaNode, SourceUnit,
};

/// Keys of a message parameter that are not annotations
const PARAMETER_KEYS: &[&str] = &["name", "type", "doc", "default", "order", "aliases"];

/// An import preloaded into the shared context
#[derive(Debug, Clone)]
struct Import {
    path: PathBuf,
    text: String,
}

/// Parses source files against a shared import context
#[derive(Debug, Clone, Default)]
pub struct SchemaLoader {
    imports: Vec<Import>,
}

impl SchemaLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a named type that later files may reference
    pub fn add_import(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        self.add_import_str(path, text);
        Ok(())
    }

    pub fn add_import_str(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.imports.push(Import {
            path: path.into(),
            text: text.into(),
        });
    }

    pub fn import_count(&self) -> usize {
        self.imports.len()
    }

    /// Load a file as a schema or protocol depending on its extension
    pub fn load(&self, path: &Path) -> Result<SourceUnit> {
        let text = fs::read_to_string(path).map_err(|e| CodegenError::io(path, e))?;
        let unit = if path.extension().map(|e| e == "avpr").unwrap_or(false) {
            CompilationUnit::Protocol(self.parse_protocol(path, &text)?)
        } else {
            CompilationUnit::Schema(self.parse_schema(path, &text)?)
        };
        debug!(path = %path.display(), "Loaded source unit");
        Ok(SourceUnit {
            path: path.to_path_buf(),
            unit,
        })
    }

    /// Parse `.avsc` text. `path` names the source in errors.
    pub fn parse_schema(&self, path: &Path, text: &str) -> Result<SchemaNode> {
        let imports = self.import_texts(path);
        let parsed = if imports.is_empty() || !is_named_definition(text) {
            AvroSchema::parse_str(text).map_err(|e| parse_error(path, e))?
        } else {
            let mut inputs = imports;
            inputs.push(text);
            let mut schemas = AvroSchema::parse_list(&inputs).map_err(|e| parse_error(path, e))?;
            match schemas.pop() {
                Some(schema) => schema,
                None => {
                    return Err(CodegenError::unsupported(
                        "empty",
                        format!("no schema parsed from {}", path.display()),
                    ))
                }
            }
        };
        convert(&parsed)
    }

    /// Parse `.avpr` text
    pub fn parse_protocol(&self, path: &Path, text: &str) -> Result<Protocol> {
        let invalid = |reason: String| CodegenError::InvalidProtocol {
            path: path.to_path_buf(),
            reason,
        };

        let json: Value = serde_json::from_str(text)?;
        let object = json
            .as_object()
            .ok_or_else(|| invalid("protocol must be a JSON object".to_string()))?;
        let name = object
            .get("protocol")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("missing 'protocol' name".to_string()))?;
        let namespace = object.get("namespace").and_then(Value::as_str);
        let doc = object.get("doc").and_then(Value::as_str).map(str::to_string);

        let types = match object.get("types") {
            None => Vec::new(),
            Some(Value::Array(types)) => self.parse_protocol_types(path, types, namespace)?,
            Some(_) => return Err(invalid("'types' must be an array".to_string())),
        };

        let messages = match object.get("messages") {
            None => Vec::new(),
            Some(Value::Object(messages)) => messages
                .iter()
                .map(|(name, body)| parse_message(name, body, namespace).map_err(&invalid))
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(invalid("'messages' must be an object".to_string())),
        };

        Ok(Protocol {
            name: QualifiedName::new(name, namespace),
            doc,
            types,
            messages,
        })
    }

    fn parse_protocol_types(
        &self,
        path: &Path,
        types: &[Value],
        namespace: Option<&str>,
    ) -> Result<Vec<SchemaNode>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }
        let texts = types
            .iter()
            .map(|t| serde_json::to_string(&with_default_namespace(t, namespace)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut inputs = self.import_texts(path);
        let skip = inputs.len();
        inputs.extend(texts.iter().map(String::as_str));
        let schemas = AvroSchema::parse_list(&inputs).map_err(|e| parse_error(path, e))?;
        schemas.iter().skip(skip).map(convert).collect()
    }

    fn import_texts(&self, path: &Path) -> Vec<&str> {
        self.imports
            .iter()
            .filter(|import| import.path != path)
            .map(|import| import.text.as_str())
            .collect()
    }
}

fn parse_error(path: &Path, source: apache_avro::Error) -> CodegenError {
    CodegenError::SchemaParse {
        path: path.to_path_buf(),
        source,
    }
}

/// Top-level record, enum or fixed definition
fn is_named_definition(text: &str) -> bool {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|v| v.get("type").and_then(Value::as_str).map(str::to_string))
        .map(|t| matches!(t.as_str(), "record" | "error" | "enum" | "fixed"))
        .unwrap_or(false)
}

/// Protocol types inherit the protocol namespace
fn with_default_namespace(value: &Value, namespace: Option<&str>) -> Value {
    let mut value = value.clone();
    if let (Some(ns), Value::Object(map)) = (namespace, &mut value) {
        let dotted = map
            .get("name")
            .and_then(Value::as_str)
            .map(|n| n.contains('.'))
            .unwrap_or(false);
        if !dotted && !map.contains_key("namespace") {
            map.insert("namespace".to_string(), Value::String(ns.to_string()));
        }
    }
    value
}

// =============================================================================
// Avro Conversion
// =============================================================================

fn qualified(name: &Name) -> QualifiedName {
    QualifiedName::new(name.name.clone(), name.namespace.as_deref())
}

fn convert(schema: &AvroSchema) -> Result<SchemaNode> {
    Ok(match schema {
        AvroSchema::Null => SchemaNode::primitive(Primitive::Null),
        AvroSchema::Boolean => SchemaNode::primitive(Primitive::Boolean),
        AvroSchema::Int | AvroSchema::Date | AvroSchema::TimeMillis => {
            SchemaNode::primitive(Primitive::Int)
        }
        AvroSchema::Long
        | AvroSchema::TimeMicros
        | AvroSchema::TimestampMillis
        | AvroSchema::TimestampMicros => SchemaNode::primitive(Primitive::Long),
        AvroSchema::Float => SchemaNode::primitive(Primitive::Float),
        AvroSchema::Double => SchemaNode::primitive(Primitive::Double),
        AvroSchema::Bytes => SchemaNode::primitive(Primitive::Bytes),
        AvroSchema::String | AvroSchema::Uuid => SchemaNode::primitive(Primitive::String),
        AvroSchema::Decimal(decimal) => convert(&decimal.inner)?,
        AvroSchema::Array(items) => SchemaNode::array(convert(items)?),
        AvroSchema::Map(values) => SchemaNode::map(convert(values)?),
        AvroSchema::Union(union) => SchemaNode::union(
            union
                .variants()
                .iter()
                .map(convert)
                .collect::<Result<Vec<_>>>()?,
        ),
        AvroSchema::Record(record) => SchemaNode::Record(RecordSchema {
            name: qualified(&record.name),
            doc: record.doc.clone(),
            fields: record
                .fields
                .iter()
                .map(convert_field)
                .collect::<Result<Vec<_>>>()?,
            annotations: record
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }),
        AvroSchema::Enum(e) => SchemaNode::Enum(EnumSchema {
            name: qualified(&e.name),
            doc: e.doc.clone(),
            symbols: e.symbols.clone(),
        }),
        AvroSchema::Fixed(f) => SchemaNode::Fixed(FixedSchema {
            name: qualified(&f.name),
            doc: f.doc.clone(),
            size: f.size,
        }),
        AvroSchema::Ref { name } => SchemaNode::Reference {
            name: qualified(name),
        },
        other => {
            return Err(CodegenError::unsupported(
                format!("{:?}", apache_avro::schema::SchemaKind::from(other)),
                "no generator mapping",
            ))
        }
    })
}

fn convert_field(field: &RecordField) -> Result<Field> {
    Ok(Field {
        name: field.name.clone(),
        schema: convert(&field.schema)?,
        default: field.default.clone(),
        doc: field.doc.clone(),
        annotations: field
            .custom_attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    })
}

// =============================================================================
// Protocol Messages
// =============================================================================

fn parse_message(
    name: &str,
    body: &Value,
    namespace: Option<&str>,
) -> std::result::Result<Message, String> {
    let body = body
        .as_object()
        .ok_or_else(|| format!("message '{}' must be an object", name))?;

    let request = match body.get("request") {
        None => Vec::new(),
        Some(Value::Array(params)) => params
            .iter()
            .map(|p| parse_parameter(name, p, namespace))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        Some(_) => return Err(format!("message '{}': 'request' must be an array", name)),
    };

    let one_way = body.get("one-way").and_then(Value::as_bool).unwrap_or(false);
    let response = match body.get("response") {
        Some(response) => message_type(response, namespace)
            .map_err(|e| format!("message '{}' response: {}", name, e))?,
        None => SchemaNode::primitive(Primitive::Null),
    };
    if one_way && !response.is_null() {
        return Err(format!("one-way message '{}' must have a null response", name));
    }

    Ok(Message {
        name: name.to_string(),
        doc: body.get("doc").and_then(Value::as_str).map(str::to_string),
        request,
        response,
        one_way,
    })
}

fn parse_parameter(
    message: &str,
    param: &Value,
    namespace: Option<&str>,
) -> std::result::Result<Field, String> {
    let param = param
        .as_object()
        .ok_or_else(|| format!("message '{}': parameters must be objects", message))?;
    let name = param
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("message '{}': parameter without a name", message))?;
    let schema = param
        .get("type")
        .ok_or_else(|| format!("message '{}': parameter '{}' has no type", message, name))
        .and_then(|t| {
            message_type(t, namespace)
                .map_err(|e| format!("message '{}' parameter '{}': {}", message, name, e))
        })?;

    Ok(Field {
        name: name.to_string(),
        schema,
        default: param.get("default").cloned(),
        doc: param.get("doc").and_then(Value::as_str).map(str::to_string),
        annotations: parameter_annotations(param),
    })
}

fn parameter_annotations(param: &Map<String, Value>) -> Annotations {
    param
        .iter()
        .filter(|(k, _)| !PARAMETER_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Message types may only name types, never define them
fn message_type(value: &Value, namespace: Option<&str>) -> std::result::Result<SchemaNode, String> {
    match value {
        Value::String(name) => Ok(type_name(name, namespace)),
        Value::Array(members) => members
            .iter()
            .map(|m| message_type(m, namespace))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(SchemaNode::union),
        Value::Object(map) => match map.get("type") {
            Some(Value::String(kind)) if kind == "array" => map
                .get("items")
                .ok_or_else(|| "array without items".to_string())
                .and_then(|items| message_type(items, namespace))
                .map(SchemaNode::array),
            Some(Value::String(kind)) if kind == "map" => map
                .get("values")
                .ok_or_else(|| "map without values".to_string())
                .and_then(|values| message_type(values, namespace))
                .map(SchemaNode::map),
            Some(Value::String(kind)) if matches!(kind.as_str(), "record" | "error" | "enum" | "fixed") => {
                Err(format!("inline {} definitions belong in 'types'", kind))
            }
            // Logical types and annotated primitives: `{"type": "long", ...}`
            Some(inner) => message_type(inner, namespace),
            None => Err("type object without 'type'".to_string()),
        },
        other => Err(format!("unexpected type {}", other)),
    }
}

fn type_name(name: &str, namespace: Option<&str>) -> SchemaNode {
    if let Some(primitive) = Primitive::from_name(name) {
        return SchemaNode::primitive(primitive);
    }
    if name.contains('.') {
        return SchemaNode::reference(name);
    }
    SchemaNode::Reference {
        name: QualifiedName::new(name, namespace),
    }
}

// =============================================================================
// Input Discovery
// =============================================================================

/// Expand files and directories into source files with `extension`.
///
/// Directories are walked recursively in file-name order. Explicit files are
/// kept whatever their extension. The first occurrence of a path wins.
pub fn discover_inputs(inputs: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                if path.extension().map(|e| e != extension).unwrap_or(true) {
                    continue;
                }
                if seen.insert(path.to_path_buf()) {
                    found.push(path.to_path_buf());
                }
            }
        } else if input.is_file() {
            if seen.insert(input.clone()) {
                found.push(input.clone());
            }
        } else {
            return Err(CodegenError::io(
                input,
                std::io::Error::new(std::io::ErrorKind::NotFound, "input not found"),
            ));
        }
    }

    Ok(found)
}
