//! Field Metadata Extraction
//!
//! Reads the free-form annotation map of a field once, through a fixed key
//! table, into a typed `FieldMetadata`. Missing or malformed annotations
//! degrade to their defaults; unknown keys are ignored.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::config::GenerationProfile;
use super::names::{camel_to_snake, constant_name};
use crate::schema::{Annotations, Field, Primitive, SchemaNode};

// =============================================================================
// Annotation Keys
// =============================================================================

/// Annotation keys understood by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationKey {
    ReadOnly,
    RequiredOnCreate,
    Length,
    Min,
    Max,
    SqlTable,
    SqlName,
    ForeignReferences,
    RenamedFrom,
    Url,
}

impl AnnotationKey {
    pub const ALL: [AnnotationKey; 10] = [
        AnnotationKey::ReadOnly,
        AnnotationKey::RequiredOnCreate,
        AnnotationKey::Length,
        AnnotationKey::Min,
        AnnotationKey::Max,
        AnnotationKey::SqlTable,
        AnnotationKey::SqlName,
        AnnotationKey::ForeignReferences,
        AnnotationKey::RenamedFrom,
        AnnotationKey::Url,
    ];

    /// The exact key as written in schemas
    pub fn key(&self) -> &'static str {
        match self {
            AnnotationKey::ReadOnly => "readonly",
            AnnotationKey::RequiredOnCreate => "requiredOnCreate",
            AnnotationKey::Length => "length",
            AnnotationKey::Min => "min",
            AnnotationKey::Max => "max",
            AnnotationKey::SqlTable => "sql.table",
            AnnotationKey::SqlName => "sql.name",
            AnnotationKey::ForeignReferences => "foreign_references",
            AnnotationKey::RenamedFrom => "renamed_from",
            AnnotationKey::Url => "url",
        }
    }

    fn lookup<'a>(&self, annotations: &'a Annotations) -> Option<&'a Value> {
        annotations.get(self.key())
    }
}

// =============================================================================
// Field Metadata
// =============================================================================

/// One entry of a `foreign_references` map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignReference {
    pub name: String,
    /// Enumerant name, `camel_to_snake(name)` upper-cased
    pub constant: String,
    pub reference: Value,
}

/// Typed view of a field's annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldMetadata {
    pub read_only: bool,
    pub required_on_create: bool,
    /// Only set on string fields
    pub max_length: Option<i64>,
    /// Only set on int/long fields
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// Upper-cased table name
    pub sql_table: Option<String>,
    pub sql_name: String,
    pub foreign_references: Vec<ForeignReference>,
    pub renamed_from: Option<String>,
    /// Java string expression with `{id}` replaced by the id accessor call
    pub relative_url: Option<String>,
}

/// Extracts field metadata for one profile
#[derive(Debug, Clone, Copy)]
pub struct MetadataExtractor<'a> {
    profile: &'a GenerationProfile,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(profile: &'a GenerationProfile) -> Self {
        Self { profile }
    }

    pub fn extract(&self, field: &Field) -> FieldMetadata {
        let annotations = &field.annotations;
        let base = field.schema.base();
        let is_string = matches!(base, SchemaNode::Primitive { primitive: Primitive::String });
        let is_integral = matches!(base, SchemaNode::Primitive { primitive } if primitive.is_integral());

        let int_for = |key: AnnotationKey, applies: bool| -> Option<i64> {
            let value = key.lookup(annotations)?;
            if !applies {
                warn!(field = %field.name, key = key.key(), kind = base.kind(), "annotation ignored for field type");
                return None;
            }
            let parsed = as_long(value);
            if parsed.is_none() {
                warn!(field = %field.name, key = key.key(), "malformed integer annotation ignored");
            }
            parsed
        };

        FieldMetadata {
            read_only: is_read_only(field),
            required_on_create: is_required_on_create(field),
            max_length: int_for(AnnotationKey::Length, is_string),
            min: int_for(AnnotationKey::Min, is_integral),
            max: int_for(AnnotationKey::Max, is_integral),
            sql_table: text(annotations, AnnotationKey::SqlTable).map(|t| t.to_uppercase()),
            sql_name: text(annotations, AnnotationKey::SqlName)
                .unwrap_or_else(|| camel_to_snake(&field.name)),
            foreign_references: foreign_references(annotations),
            renamed_from: text(annotations, AnnotationKey::RenamedFrom),
            relative_url: text(annotations, AnnotationKey::Url)
                .map(|template| url_expression(&template, &self.id_accessor_call())),
        }
    }

    /// `getUuid()` when the profile renames `id`, `getId()` otherwise
    pub fn id_accessor_call(&self) -> String {
        format!("{}()", self.profile.naming.getter_name("id"))
    }
}

/// `readonly` flag of a field
pub fn is_read_only(field: &Field) -> bool {
    flag(&field.annotations, AnnotationKey::ReadOnly)
}

/// `requiredOnCreate` flag of a field
pub fn is_required_on_create(field: &Field) -> bool {
    flag(&field.annotations, AnnotationKey::RequiredOnCreate)
}

/// `foreign_references` entries in source order
pub fn foreign_references(annotations: &Annotations) -> Vec<ForeignReference> {
    let Some(value) = AnnotationKey::ForeignReferences.lookup(annotations) else {
        return Vec::new();
    };
    match value.as_object() {
        Some(map) => map
            .iter()
            .map(|(name, reference)| ForeignReference {
                name: name.clone(),
                constant: constant_name(name),
                reference: reference.clone(),
            })
            .collect(),
        None => {
            warn!("foreign_references is not a map; ignored");
            Vec::new()
        }
    }
}

/// Turn `/v3/items/{id}/lines` into `"/v3/items/" + getUuid() + "/lines"`
pub fn url_expression(template: &str, id_expression: &str) -> String {
    let mut pieces = Vec::new();
    for (i, part) in template.split("{id}").enumerate() {
        if i > 0 {
            pieces.push(id_expression.to_string());
        }
        if !part.is_empty() {
            pieces.push(java_string_literal(part));
        }
    }
    if pieces.is_empty() {
        return java_string_literal("");
    }
    pieces.join(" + ")
}

pub(crate) fn java_string_literal(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

// =============================================================================
// Lenient Coercion
// =============================================================================

fn flag(annotations: &Annotations, key: AnnotationKey) -> bool {
    key.lookup(annotations).and_then(as_bool).unwrap_or(false)
}

fn text(annotations: &Annotations, key: AnnotationKey) -> Option<String> {
    match key.lookup(annotations)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse::<bool>().ok(),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}

fn as_long(value: &Value) -> Option<i64> {
    match value {
        // Whole floats such as `10.0` pass; fractions and out-of-range values do not
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}
