//! Validity Rules
//!
//! Derives a guard expression per field from its type and constraints, and
//! the record-level listings templates need (required/settable fields,
//! field and table enumerations).
//!
//! Rules describe *generated* checks. A violated rule is reported by the
//! generated code at its own runtime, never by the generator.

use serde::Serialize;

use super::config::{ErrorStyle, GenerationProfile, RangeCombinator};
use super::metadata::{foreign_references, is_read_only, is_required_on_create, FieldMetadata, ForeignReference};
use super::names::constant_name;
use crate::schema::{Field, Primitive, RecordSchema, SchemaNode};

/// A generated validity check for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidityRule {
    pub field_name: String,
    /// Boolean expression that is true when the value is invalid
    pub guard: String,
    pub message: String,
}

/// Builds validity rules for one profile
#[derive(Debug, Clone, Copy)]
pub struct RuleGenerator<'a> {
    profile: &'a GenerationProfile,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(profile: &'a GenerationProfile) -> Self {
        Self { profile }
    }

    /// Rule for a field, or `None` when its type/constraints need no check.
    ///
    /// Only bare string and int/long fields carry rules; unions (including
    /// nullable ones) never do.
    pub fn rule_for(&self, field: &Field, metadata: &FieldMetadata) -> Option<ValidityRule> {
        let var = self.profile.naming.mangle(&field.name);
        match &field.schema {
            SchemaNode::Primitive { primitive: Primitive::String } => {
                let limit = metadata.max_length?;
                Some(ValidityRule {
                    guard: format!("{var} != null && {var}.length() > {limit}"),
                    message: format!("Maximum string length exceeded for '{var}'"),
                    field_name: var,
                })
            }
            SchemaNode::Primitive { primitive } if primitive.is_integral() => {
                let mut bounds = Vec::new();
                if let Some(min) = metadata.min {
                    bounds.push(format!("{var} < {min}"));
                }
                if let Some(max) = metadata.max {
                    bounds.push(format!("{var} > {max}"));
                }
                if bounds.is_empty() {
                    return None;
                }
                // Both bounds present: joined with the profile's combinator (AND by default)
                let combinator = self.profile.range_combinator;
                let mut joined = bounds.join(combinator.operator());
                if bounds.len() > 1 && combinator == RangeCombinator::Any {
                    // `||` binds looser than the null test
                    joined = format!("({joined})");
                }
                Some(ValidityRule {
                    guard: format!("{var} != null && {joined}"),
                    message: format!("Invalid value for '{var}'"),
                    field_name: var,
                })
            }
            _ => None,
        }
    }

    /// Java statement enforcing a rule in the profile's error style
    pub fn render_check(&self, rule: &ValidityRule) -> String {
        self.render_check_in(rule, &self.profile.error_style)
    }

    /// `render_check` with an explicit error style
    pub fn render_check_in(&self, rule: &ValidityRule, style: &ErrorStyle) -> String {
        let message = rule.message.replace('"', "\\\"");
        match style {
            ErrorStyle::Throw { exception } => {
                format!("if ({}) throw new {}(\"{}\");", rule.guard, exception, message)
            }
            ErrorStyle::Collect { collector } => {
                format!("if ({}) {}.add(\"{}\");", rule.guard, collector, message)
            }
        }
    }
}

// =============================================================================
// Record Listings
// =============================================================================

/// Fields annotated `requiredOnCreate`, in declaration order
pub fn required_fields(record: &RecordSchema) -> Vec<&Field> {
    record.fields.iter().filter(|f| is_required_on_create(f)).collect()
}

/// Fields not annotated `readonly`, in declaration order
pub fn settable_fields(record: &RecordSchema) -> Vec<&Field> {
    record.fields.iter().filter(|f| !is_read_only(f)).collect()
}

/// `NAME, EMPLOYEE_ID, ...` for every field; `None` without fields
pub fn field_enum(record: &RecordSchema) -> Option<String> {
    join_constants(record.fields.iter().map(|f| constant_name(&f.name)))
}

/// Record-level `foreign_references` entries in map order
pub fn table_pairs(record: &RecordSchema) -> Vec<ForeignReference> {
    foreign_references(&record.annotations)
}

/// Constants for the keys of the record's `foreign_references`;
/// `None` when none are annotated
pub fn table_enum(record: &RecordSchema) -> Option<String> {
    join_constants(table_pairs(record).into_iter().map(|r| r.constant))
}

fn join_constants(constants: impl Iterator<Item = String>) -> Option<String> {
    let constants: Vec<String> = constants.collect();
    if constants.is_empty() {
        None
    } else {
        Some(constants.join(", "))
    }
}

/// Trailing fallback argument for a JSON `opt*` call:
/// `, <default>` (quotes kept only for strings), `, null` for strings
/// without a default, empty otherwise.
pub fn json_fallback(field: &Field) -> String {
    let is_string = matches!(field.schema, SchemaNode::Primitive { primitive: Primitive::String });
    match &field.default {
        Some(default) => {
            let rendered = format!(", {}", default);
            if is_string {
                rendered
            } else {
                rendered.replace('"', "")
            }
        }
        None if is_string => ", null".to_string(),
        None => String::new(),
    }
}
