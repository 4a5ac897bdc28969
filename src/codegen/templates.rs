//! Render Contexts and Template Engines
//!
//! The driver hands every entity to a `TemplateEngine` as a read-only,
//! serializable `RenderContext`. All type, naming and metadata decisions are
//! made while building the context; engines only lay out text.
//!
//! Key constraints:
//! - Engines never see raw annotations, only `FieldMetadata`
//! - Type names come from `TypeDescriptor` (already resolved)
//! - Checks come pre-rendered in the profile's error style
//!
//! `BuiltinTemplates` is the shipped engine. It knows the four template
//! names (`record.vm`, `enum.vm`, `fixed.vm`, `handler.vm`) and renders Java
//! directly; any other template name fails to load.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::config::{
    AccessorVocabulary, ErrorStyle, GenerationProfile, ProfileKind, TemplateLogging,
};
use super::metadata::{java_string_literal, FieldMetadata, ForeignReference, MetadataExtractor};
use super::names::{constant_name, to_upper_initial};
use super::rules::{
    field_enum, json_fallback, required_fields, settable_fields, table_enum, table_pairs,
    RuleGenerator, ValidityRule,
};
use super::types::{TypeDescriptor, TypeResolver};
use crate::error::{CodegenError, Result};
use crate::schema::{EnumSchema, Field, FixedSchema, Message, Primitive, Protocol, RecordSchema, SchemaNode};

pub const RECORD_TEMPLATE: &str = "record.vm";
pub const ENUM_TEMPLATE: &str = "enum.vm";
pub const FIXED_TEMPLATE: &str = "fixed.vm";
pub const HANDLER_TEMPLATE: &str = "handler.vm";

// =============================================================================
// Render Context
// =============================================================================

/// Everything a template may read for one artifact
#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub profile: ProfileKind,
    pub header: String,
    /// Java package; empty for the default package
    pub package: String,
    /// Simple name of the generated class
    pub class_name: String,
    /// Source-level name (`orders.Order`, `payments.Payments.charge`)
    pub full_name: String,
    pub doc: Option<String>,
    pub error_style: ErrorStyle,
    /// Fields are read through a JSON store instead of typed members
    pub json_backed: bool,
    pub create_setters: bool,
    #[serde(skip)]
    pub template_logging: TemplateLogging,
    pub entity: EntityContext,
}

impl RenderContext {
    /// Template file this context is rendered with
    pub fn template_name(&self) -> &'static str {
        self.entity.template_name()
    }

    /// Dotted name of the generated class
    pub fn qualified_class_name(&self) -> String {
        if self.package.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}.{}", self.package, self.class_name)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "entity", rename_all = "lowercase")]
pub enum EntityContext {
    Record(RecordContext),
    Enum(EnumContext),
    Fixed(FixedContext),
    Message(MessageContext),
}

impl EntityContext {
    pub fn template_name(&self) -> &'static str {
        match self {
            EntityContext::Record(_) => RECORD_TEMPLATE,
            EntityContext::Enum(_) => ENUM_TEMPLATE,
            EntityContext::Fixed(_) => FIXED_TEMPLATE,
            EntityContext::Message(_) => HANDLER_TEMPLATE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordContext {
    pub fields: Vec<FieldContext>,
    /// Source names of `requiredOnCreate` fields
    pub required_fields: Vec<String>,
    /// Source names of fields without `readonly`
    pub settable_fields: Vec<String>,
    pub field_enum: Option<String>,
    pub table_enum: Option<String>,
    pub table_pairs: Vec<ForeignReference>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumContext {
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FixedContext {
    pub size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub message: String,
    pub request: Vec<FieldContext>,
    /// `void` for null responses
    pub response_type: String,
    pub one_way: bool,
}

/// Resolved facts for one field or message parameter
#[derive(Debug, Clone, Serialize)]
pub struct FieldContext {
    pub name: String,
    /// Name as a Java identifier
    pub mangled: String,
    /// `EMPLOYEE_ID`
    pub constant: String,
    pub doc: Option<String>,
    pub descriptor: TypeDescriptor,
    pub metadata: FieldMetadata,
    pub rule: Option<ValidityRule>,
    /// `rule` rendered as a statement
    pub check: Option<String>,
    pub getter: String,
    pub setter: String,
    pub builder: String,
    pub accessor: String,
    pub json_fallback: String,
    pub default: Option<Value>,
}

// =============================================================================
// Context Builder
// =============================================================================

/// Resolves schema entities into render contexts for one profile
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder<'a> {
    profile: &'a GenerationProfile,
    resolver: TypeResolver<'a>,
    extractor: MetadataExtractor<'a>,
    rules: RuleGenerator<'a>,
}

impl<'a> ContextBuilder<'a> {
    pub fn new(profile: &'a GenerationProfile) -> Self {
        Self {
            profile,
            resolver: TypeResolver::new(profile),
            extractor: MetadataExtractor::new(profile),
            rules: RuleGenerator::new(profile),
        }
    }

    /// Context for a record, enum or fixed node
    pub fn named(&self, node: &SchemaNode) -> Result<RenderContext> {
        match node {
            SchemaNode::Record(record) => self.record(record),
            SchemaNode::Enum(e) => Ok(self.enumeration(e)),
            SchemaNode::Fixed(f) => Ok(self.fixed(f)),
            other => Err(CodegenError::unsupported(other.kind(), "not a generated type")),
        }
    }

    pub fn record(&self, record: &RecordSchema) -> Result<RenderContext> {
        let error_style = self.error_style_for(&record.fields);
        let fields = record
            .fields
            .iter()
            .map(|f| self.field_in(f, &error_style))
            .collect::<Result<Vec<_>>>()?;

        let entity = EntityContext::Record(RecordContext {
            fields,
            required_fields: names(required_fields(record)),
            settable_fields: names(settable_fields(record)),
            field_enum: field_enum(record),
            table_enum: table_enum(record),
            table_pairs: table_pairs(record),
        });

        debug!(record = %record.name.full_name(), profile = %self.profile.kind, "Resolved record");
        Ok(RenderContext {
            error_style,
            ..self.context(
                self.resolver.package_of(&record.name),
                self.class_name(&record.name.name),
                record.name.full_name(),
                record.doc.clone(),
                entity,
            )
        })
    }

    pub fn enumeration(&self, schema: &EnumSchema) -> RenderContext {
        self.context(
            self.resolver.package_of(&schema.name),
            self.class_name(&schema.name.name),
            schema.name.full_name(),
            schema.doc.clone(),
            EntityContext::Enum(EnumContext {
                symbols: schema.symbols.clone(),
            }),
        )
    }

    pub fn fixed(&self, schema: &FixedSchema) -> RenderContext {
        self.context(
            self.resolver.package_of(&schema.name),
            self.class_name(&schema.name.name),
            schema.name.full_name(),
            schema.doc.clone(),
            EntityContext::Fixed(FixedContext { size: schema.size }),
        )
    }

    /// Context for one protocol message handler
    pub fn message(&self, protocol: &Protocol, message: &Message) -> Result<RenderContext> {
        let error_style = self.error_style_for(&message.request);
        let request = message
            .request
            .iter()
            .map(|f| self.field_in(f, &error_style))
            .collect::<Result<Vec<_>>>()?;
        let response_type = if message.one_way || message.response.is_null() {
            "void".to_string()
        } else {
            self.resolver.type_name(&message.response)?
        };

        debug!(protocol = %protocol.name.full_name(), message = %message.name, "Resolved message");
        Ok(RenderContext {
            error_style,
            ..self.context(
                self.message_package(protocol),
                format!("{}{}", to_upper_initial(&message.name), self.profile.artifact_suffix),
                format!("{}.{}", protocol.name.full_name(), message.name),
                message.doc.clone(),
                EntityContext::Message(MessageContext {
                    message: message.name.clone(),
                    request,
                    response_type,
                    one_way: message.one_way,
                }),
            )
        })
    }

    /// Resolved facts for one field
    pub fn field(&self, field: &Field) -> Result<FieldContext> {
        self.field_in(field, &self.profile.error_style)
    }

    fn field_in(&self, field: &Field, error_style: &ErrorStyle) -> Result<FieldContext> {
        let naming = &self.profile.naming;
        let descriptor = self.resolver.resolve(&field.schema)?;
        let metadata = self.extractor.extract(field);
        let rule = self.rules.rule_for(field, &metadata);
        let check = rule.as_ref().map(|r| self.rules.render_check_in(r, error_style));

        Ok(FieldContext {
            name: field.name.clone(),
            mangled: naming.mangle(&field.name),
            constant: constant_name(&field.name),
            doc: field.doc.clone(),
            accessor: self.resolver.accessor(&field.name, &field.schema)?,
            json_fallback: json_fallback(field),
            getter: naming.getter_name(&field.name),
            setter: naming.setter_name(&field.name),
            builder: naming.builder_name(&field.name),
            default: field.default.clone(),
            descriptor,
            metadata,
            rule,
            check,
        })
    }

    /// The profile's error style with a collector that no field shadows
    fn error_style_for(&self, fields: &[Field]) -> ErrorStyle {
        let mangled: Vec<String> = fields.iter().map(|f| self.profile.naming.mangle(&f.name)).collect();
        self.profile
            .error_style
            .avoiding(mangled.iter().map(String::as_str))
    }

    fn class_name(&self, name: &str) -> String {
        format!("{}{}", self.profile.naming.escape_reserved(name), self.profile.artifact_suffix)
    }

    fn message_package(&self, protocol: &Protocol) -> String {
        match &self.profile.artifact_namespace {
            Some(prefix) => {
                let package = match &protocol.name.namespace {
                    Some(ns) => format!("{}.{}", prefix, ns),
                    None => prefix.clone(),
                };
                self.profile.naming.mangle_qualified(&package)
            }
            None => self.resolver.package_of(&protocol.name),
        }
    }

    fn context(
        &self,
        package: String,
        class_name: String,
        full_name: String,
        doc: Option<String>,
        entity: EntityContext,
    ) -> RenderContext {
        RenderContext {
            profile: self.profile.kind,
            header: self.profile.file_header(),
            package,
            class_name,
            full_name,
            doc,
            error_style: self.profile.error_style.clone(),
            json_backed: matches!(self.profile.accessors, AccessorVocabulary::Json(_)),
            create_setters: self.profile.create_setters,
            template_logging: self.profile.template_logging,
            entity,
        }
    }
}

fn names(fields: Vec<&Field>) -> Vec<String> {
    fields.into_iter().map(|f| f.name.clone()).collect()
}

// =============================================================================
// Template Engine
// =============================================================================

/// Renders a context through a named template
pub trait TemplateEngine: Send + Sync {
    fn render(&self, template: &Path, context: &RenderContext) -> Result<String>;
}

/// Built-in Java templates
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateEngine for BuiltinTemplates {
    fn render(&self, template: &Path, context: &RenderContext) -> Result<String> {
        let name = template
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let rendered = match (name, &context.entity) {
            (RECORD_TEMPLATE, EntityContext::Record(record)) => render_record(context, record),
            (ENUM_TEMPLATE, EntityContext::Enum(e)) => render_enum(context, e),
            (FIXED_TEMPLATE, EntityContext::Fixed(f)) => render_fixed(context, f),
            (HANDLER_TEMPLATE, EntityContext::Message(m)) => render_handler(context, m),
            (RECORD_TEMPLATE | ENUM_TEMPLATE | FIXED_TEMPLATE | HANDLER_TEMPLATE, entity) => {
                return Err(CodegenError::TemplateRender {
                    template: template.to_path_buf(),
                    reason: format!("template cannot render a {} context", entity.template_name()),
                });
            }
            _ => {
                return Err(CodegenError::TemplateLoad {
                    template: template.to_path_buf(),
                    reason: "no built-in template with this name".to_string(),
                });
            }
        };

        if context.template_logging == TemplateLogging::Tracing {
            debug!(template = %template.display(), class = %context.qualified_class_name(), bytes = rendered.len(), "Rendered template");
        }
        Ok(rendered)
    }
}

// =============================================================================
// Shared Emission
// =============================================================================

fn emit_preamble(output: &mut String, ctx: &RenderContext) {
    output.push_str(&ctx.header);
    output.push_str("\n\n");
    if !ctx.package.is_empty() {
        output.push_str(&format!("package {};\n\n", ctx.package));
    }
}

fn emit_doc(output: &mut String, indent: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    output.push_str(&format!("{}/**\n", indent));
    for line in lines {
        let line = line.replace("*/", "*&#47;");
        if line.is_empty() {
            output.push_str(&format!("{} *\n", indent));
        } else {
            output.push_str(&format!("{} * {}\n", indent, line));
        }
    }
    output.push_str(&format!("{} */\n", indent));
}

fn doc_lines(doc: Option<&str>) -> Vec<String> {
    doc.map(|d| d.lines().map(|l| l.trim().to_string()).collect())
        .unwrap_or_default()
}

fn emit_validate(output: &mut String, ctx: &RenderContext, fields: &[FieldContext]) {
    let checks: Vec<(&FieldContext, &String)> = fields
        .iter()
        .filter_map(|f| f.check.as_ref().map(|c| (f, c)))
        .collect();

    match &ctx.error_style {
        ErrorStyle::Throw { .. } => {
            output.push_str("  public void validate() {\n");
            emit_check_lines(output, ctx, &checks);
            output.push_str("  }\n");
        }
        ErrorStyle::Collect { collector } => {
            output.push_str("  public java.util.List<java.lang.String> validate() {\n");
            output.push_str(&format!(
                "    java.util.List<java.lang.String> {} = new java.util.ArrayList<java.lang.String>();\n",
                collector
            ));
            emit_check_lines(output, ctx, &checks);
            output.push_str(&format!("    return {};\n", collector));
            output.push_str("  }\n");
        }
    }
}

fn emit_check_lines(output: &mut String, ctx: &RenderContext, checks: &[(&FieldContext, &String)]) {
    for (field, check) in checks {
        // JSON-backed objects have no members to test; read into a local first
        if ctx.json_backed {
            output.push_str(&format!(
                "    {} {} = {}();\n",
                field.descriptor.type_name, field.mangled, field.getter
            ));
        }
        output.push_str(&format!("    {}\n", check));
    }
}

fn emit_string_list(output: &mut String, constant: &str, values: &[String]) {
    let quoted: Vec<String> = values.iter().map(|v| java_string_literal(v)).collect();
    output.push_str(&format!(
        "  public static final java.util.List<java.lang.String> {} =\n      java.util.Collections.unmodifiableList(java.util.Arrays.asList({}));\n\n",
        constant,
        quoted.join(", ")
    ));
}

// =============================================================================
// record.vm
// =============================================================================

fn render_record(ctx: &RenderContext, record: &RecordContext) -> String {
    let mut output = String::new();
    emit_preamble(&mut output, ctx);
    emit_doc(&mut output, "", &doc_lines(ctx.doc.as_deref()));
    output.push_str(&format!("public class {} {{\n\n", ctx.class_name));

    if let Some(fields) = &record.field_enum {
        output.push_str(&format!("  public enum Field {{\n    {}\n  }}\n\n", fields));
    }
    if let Some(tables) = &record.table_enum {
        emit_table_enum(&mut output, tables, &record.table_pairs);
    }
    emit_string_list(&mut output, "REQUIRED_ON_CREATE", &record.required_fields);
    emit_string_list(&mut output, "SETTABLE_FIELDS", &record.settable_fields);

    if ctx.profile == ProfileKind::ServerObject {
        emit_sql_constants(&mut output, &record.fields);
    }

    if ctx.json_backed {
        emit_json_members(&mut output, ctx);
    } else {
        emit_typed_members(&mut output, ctx, &record.fields);
    }

    for field in &record.fields {
        let settable = ctx.create_setters && record.settable_fields.contains(&field.name);
        if ctx.json_backed {
            emit_json_accessors(&mut output, ctx, field, settable);
        } else {
            emit_typed_accessors(&mut output, ctx, field, settable);
        }
        if let Some(url) = &field.metadata.relative_url {
            output.push_str(&format!(
                "  public java.lang.String {}RelativeUrl() {{\n    return {};\n  }}\n\n",
                field.getter, url
            ));
        }
    }

    emit_validate(&mut output, ctx, &record.fields);
    output.push_str("}\n");
    output
}

fn emit_table_enum(output: &mut String, tables: &str, pairs: &[ForeignReference]) {
    output.push_str(&format!("  public enum Table {{\n    {}\n  }}\n\n", tables));
    output.push_str("  public static java.lang.String reference(Table table) {\n");
    output.push_str("    switch (table) {\n");
    for pair in pairs {
        let reference = match &pair.reference {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        output.push_str(&format!(
            "      case {}: return {};\n",
            pair.constant,
            java_string_literal(&reference)
        ));
    }
    output.push_str("      default: return null;\n    }\n  }\n\n");
}

fn emit_sql_constants(output: &mut String, fields: &[FieldContext]) {
    for field in fields {
        output.push_str(&format!(
            "  public static final java.lang.String COLUMN_{} = {};\n",
            field.constant,
            java_string_literal(&field.metadata.sql_name)
        ));
        if let Some(table) = &field.metadata.sql_table {
            output.push_str(&format!(
                "  public static final java.lang.String TABLE_{} = {};\n",
                field.constant,
                java_string_literal(table)
            ));
        }
    }
    if !fields.is_empty() {
        output.push('\n');
    }
}

fn field_doc(field: &FieldContext) -> Vec<String> {
    let mut lines = doc_lines(field.doc.as_deref());
    if let Some(previous) = &field.metadata.renamed_from {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push(format!("Formerly {{@code {}}}.", previous));
    }
    lines
}

fn emit_typed_members(output: &mut String, ctx: &RenderContext, fields: &[FieldContext]) {
    for field in fields {
        output.push_str(&format!("  private {} {};\n", field.descriptor.type_name, field.mangled));
    }
    if !fields.is_empty() {
        output.push('\n');
    }
    output.push_str(&format!("  public {}() {{\n  }}\n\n", ctx.class_name));
}

fn emit_typed_accessors(output: &mut String, ctx: &RenderContext, field: &FieldContext, settable: bool) {
    let ty = &field.descriptor.type_name;
    let var = &field.mangled;

    emit_doc(output, "  ", &field_doc(field));
    output.push_str(&format!("  public {} {}() {{\n    return {};\n  }}\n\n", ty, field.getter, var));

    if settable {
        output.push_str(&format!(
            "  public void {}({} {}) {{\n    this.{} = {};\n  }}\n\n",
            field.setter, ty, var, var, var
        ));
        output.push_str(&format!(
            "  public {} {}({} {}) {{\n    this.{} = {};\n    return this;\n  }}\n\n",
            ctx.class_name, field.builder, ty, var, var, var
        ));
    }
}

// =============================================================================
// JSON-backed records
// =============================================================================

fn emit_json_members(output: &mut String, ctx: &RenderContext) {
    let class = &ctx.class_name;
    output.push_str("  private org.json.JSONObject jsonObject;\n\n");
    output.push_str(&format!(
        "  public {}() {{\n    jsonObject = new org.json.JSONObject();\n  }}\n\n",
        class
    ));
    output.push_str(&format!(
        "  public {}(org.json.JSONObject jsonObject) {{\n    this.jsonObject = jsonObject;\n  }}\n\n",
        class
    ));
    output.push_str("  public org.json.JSONObject getJSONObject() {\n    return jsonObject;\n  }\n\n");
}

/// Java type a JSON getter returns: the resolved scalar type for primitives,
/// the raw `org.json` container otherwise
fn json_return_type(field: &FieldContext) -> String {
    match &field.descriptor.underlying {
        SchemaNode::Primitive { .. } => field.descriptor.type_name.clone(),
        SchemaNode::Array { .. } => "org.json.JSONArray".to_string(),
        _ => "org.json.JSONObject".to_string(),
    }
}

fn emit_json_accessors(output: &mut String, ctx: &RenderContext, field: &FieldContext, settable: bool) {
    let ty = json_return_type(field);
    let key = java_string_literal(&field.name);
    let var = &field.mangled;
    // optDouble widens floats
    let cast = match field.descriptor.underlying {
        SchemaNode::Primitive { primitive: Primitive::Float } => "(float) ",
        _ => "",
    };

    let mut doc = field_doc(field);
    if ty != field.descriptor.type_name {
        doc.push(format!("@return {}", field.descriptor.type_name));
    }
    emit_doc(output, "  ", &doc);
    output.push_str(&format!(
        "  public {} {}() {{\n    return {}getJSONObject().{}({}{});\n  }}\n\n",
        ty, field.getter, cast, field.accessor, key, field.json_fallback
    ));
    output.push_str(&format!(
        "  public boolean has{}() {{\n    return getJSONObject().has({});\n  }}\n\n",
        field.getter.strip_prefix("get").unwrap_or(&field.getter),
        key
    ));

    if settable {
        let put = format!(
            "    try {{\n      getJSONObject().put({}, {});\n    }} catch (org.json.JSONException e) {{\n      throw new java.lang.IllegalArgumentException(e);\n    }}\n",
            key, var
        );
        output.push_str(&format!("  public void {}({} {}) {{\n{}  }}\n\n", field.setter, ty, var, put));
        output.push_str(&format!(
            "  public {} {}({} {}) {{\n{}    return this;\n  }}\n\n",
            ctx.class_name, field.builder, ty, var, put
        ));
    }
}

// =============================================================================
// enum.vm / fixed.vm
// =============================================================================

fn render_enum(ctx: &RenderContext, schema: &EnumContext) -> String {
    let mut output = String::new();
    emit_preamble(&mut output, ctx);
    emit_doc(&mut output, "", &doc_lines(ctx.doc.as_deref()));
    output.push_str(&format!("public enum {} {{\n", ctx.class_name));
    output.push_str(
        &schema
            .symbols
            .iter()
            .map(|s| format!("  {}", s))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    if !schema.symbols.is_empty() {
        output.push('\n');
    }
    output.push_str("}\n");
    output
}

fn render_fixed(ctx: &RenderContext, schema: &FixedContext) -> String {
    let mut output = String::new();
    let class = &ctx.class_name;
    emit_preamble(&mut output, ctx);
    emit_doc(&mut output, "", &doc_lines(ctx.doc.as_deref()));
    output.push_str(&format!("public class {} {{\n\n", class));
    output.push_str(&format!("  public static final int SIZE = {};\n\n", schema.size));
    output.push_str("  private final byte[] bytes;\n\n");
    output.push_str(&format!("  public {}(byte[] bytes) {{\n", class));
    output.push_str(&format!(
        "    if (bytes == null || bytes.length != SIZE) throw new java.lang.IllegalArgumentException(\"{} requires exactly \" + SIZE + \" bytes\");\n",
        class
    ));
    output.push_str("    this.bytes = bytes.clone();\n  }\n\n");
    output.push_str("  public byte[] bytes() {\n    return bytes.clone();\n  }\n");
    output.push_str("}\n");
    output
}

// =============================================================================
// handler.vm
// =============================================================================

fn render_handler(ctx: &RenderContext, message: &MessageContext) -> String {
    let mut output = String::new();
    emit_preamble(&mut output, ctx);

    let mut doc = doc_lines(ctx.doc.as_deref());
    if message.one_way {
        if !doc.is_empty() {
            doc.push(String::new());
        }
        doc.push("One-way message: no response is sent.".to_string());
    }
    emit_doc(&mut output, "", &doc);
    output.push_str(&format!("public abstract class {} {{\n\n", ctx.class_name));
    output.push_str(&format!(
        "  public static final java.lang.String MESSAGE = {};\n\n",
        java_string_literal(&message.message)
    ));

    let params: Vec<String> = message
        .request
        .iter()
        .map(|p| format!("{} {}", p.descriptor.type_name, p.mangled))
        .collect();
    let args: Vec<&str> = message.request.iter().map(|p| p.mangled.as_str()).collect();

    for param in &message.request {
        let doc = doc_lines(param.doc.as_deref());
        if !doc.is_empty() {
            output.push_str(&format!("  // {}: {}\n", param.name, doc.join(" ")));
        }
    }
    output.push_str(&format!(
        "  public abstract {} handle({}) throws java.lang.Exception;\n\n",
        message.response_type,
        params.join(", ")
    ));

    let checks: Vec<&String> = message.request.iter().filter_map(|p| p.check.as_ref()).collect();
    if !checks.is_empty() {
        match &ctx.error_style {
            ErrorStyle::Throw { .. } => {
                output.push_str(&format!("  protected void validateRequest({}) {{\n", params.join(", ")));
                for check in &checks {
                    output.push_str(&format!("    {}\n", check));
                }
                output.push_str("  }\n\n");
            }
            ErrorStyle::Collect { collector } => {
                output.push_str(&format!(
                    "  protected java.util.List<java.lang.String> validateRequest({}) {{\n",
                    params.join(", ")
                ));
                output.push_str(&format!(
                    "    java.util.List<java.lang.String> {} = new java.util.ArrayList<java.lang.String>();\n",
                    collector
                ));
                for check in &checks {
                    output.push_str(&format!("    {}\n", check));
                }
                output.push_str(&format!("    return {};\n  }}\n\n", collector));
            }
        }
    }

    let returns = if message.response_type == "void" { "" } else { "return " };
    output.push_str(&format!(
        "  public final {} invoke({}) throws java.lang.Exception {{\n",
        message.response_type,
        params.join(", ")
    ));
    if !checks.is_empty() {
        output.push_str(&format!("    validateRequest({});\n", args.join(", ")));
    }
    output.push_str(&format!("    {}handle({});\n  }}\n", returns, args.join(", ")));
    output.push_str("}\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::QualifiedName;
    use serde_json::json;

    fn order() -> RecordSchema {
        let mut record = RecordSchema::new("Order", Some("orders"))
            .with_field(
                Field::new("id", SchemaNode::primitive(Primitive::String))
                    .with_annotation("readonly", json!(true)),
            )
            .with_field(
                Field::new("title", SchemaNode::primitive(Primitive::String))
                    .with_annotation("length", json!(127))
                    .with_annotation("requiredOnCreate", json!(true)),
            )
            .with_field(
                Field::new("quantity", SchemaNode::optional(SchemaNode::primitive(Primitive::Int)))
                    .with_annotation("sql", json!({"name": "qty"})),
            )
            .with_field(
                Field::new("href", SchemaNode::primitive(Primitive::String))
                    .with_annotation("url", json!("/v3/orders/{id}")),
            )
            .with_annotation("foreign_references", json!({"lineItems": "line_items"}));
        record.doc = Some("A customer order".to_string());
        record
    }

    fn render(profile: &GenerationProfile, node: &SchemaNode) -> String {
        let ctx = ContextBuilder::new(profile).named(node).unwrap();
        BuiltinTemplates
            .render(&profile.template_path(ctx.template_name()), &ctx)
            .unwrap()
    }

    #[test]
    fn test_record_context() {
        let profile = GenerationProfile::json_object("com.clover.sdk.v3");
        let ctx = ContextBuilder::new(&profile).record(&order()).unwrap();
        assert_eq!(ctx.package, "com.clover.sdk.v3.orders");
        assert_eq!(ctx.class_name, "Order");
        assert_eq!(ctx.template_name(), "record.vm");
        assert!(ctx.json_backed);

        let EntityContext::Record(record) = &ctx.entity else {
            panic!("Expected record context");
        };
        assert_eq!(record.required_fields, vec!["title"]);
        assert_eq!(record.settable_fields, vec!["title", "quantity", "href"]);
        assert_eq!(record.field_enum.as_deref(), Some("ID, TITLE, QUANTITY, HREF"));
        assert_eq!(record.table_enum.as_deref(), Some("LINE_ITEMS"));

        let id = &record.fields[0];
        assert_eq!(id.mangled, "uuid");
        assert_eq!(id.getter, "getUuid");
        assert_eq!(id.builder, "uuid");
        assert_eq!(id.accessor, "optString");

        let quantity = &record.fields[2];
        assert!(quantity.descriptor.nullable_union);
        assert_eq!(quantity.accessor, "optInt");
        assert_eq!(quantity.metadata.sql_name, "qty");
    }

    #[test]
    fn test_context_is_serializable() {
        let profile = GenerationProfile::plain_object();
        let ctx = ContextBuilder::new(&profile).record(&order()).unwrap();
        let value = serde_json::to_value(&ctx).unwrap();
        assert_eq!(value["entity"]["entity"], json!("record"));
        assert_eq!(value["entity"]["fields"][1]["rule"]["field_name"], json!("title"));
        assert_eq!(value["profile"], json!("plain-object"));
    }

    #[test]
    fn test_plain_record_output() {
        let profile = GenerationProfile::plain_object();
        let java = render(&profile, &SchemaNode::Record(order()));

        assert!(java.starts_with(GENERATED_HEADER_START));
        assert!(java.contains("package com.clover.core.data.orders;"));
        assert!(java.contains(" * A customer order\n"));
        assert!(java.contains("public class Order {"));
        assert!(java.contains("  public enum Field {\n    ID, TITLE, QUANTITY, HREF\n  }"));
        assert!(java.contains("case LINE_ITEMS: return \"line_items\";"));
        assert!(java.contains("  private java.lang.Integer quantity;"));
        assert!(java.contains("public java.lang.String getId()"));
        // read-only: getter only
        assert!(!java.contains("setId("));
        assert!(java.contains("public Order title(java.lang.String title)"));
        assert!(java.contains(
            "    if (title != null && title.length() > 127) throw new IllegalArgumentException(\"Maximum string length exceeded for 'title'\");"
        ));
        assert!(java.contains("return \"/v3/orders/\" + getId();"));
        assert!(!java.contains("COLUMN_"));
    }

    const GENERATED_HEADER_START: &str = "/**\n * Autogenerated";

    #[test]
    fn test_server_record_output() {
        let profile = GenerationProfile::server_object();
        let java = render(&profile, &SchemaNode::Record(order()));
        assert!(java.contains("public java.util.List<java.lang.String> validate() {"));
        assert!(java.contains("errors.add(\"Maximum string length exceeded for 'title'\");"));
        assert!(!java.contains("throw new IllegalArgumentException(\"Max"));
        assert!(java.contains("COLUMN_QUANTITY = \"qty\";"));
        assert!(java.contains("COLUMN_TITLE = \"title\";"));
        assert!(java.contains("public java.lang.String getUuid()"));
    }

    #[test]
    fn test_json_record_output() {
        let profile = GenerationProfile::json_object("com.clover.sdk.v3")
            .with_copyright_notice("/* Copyright (C) 2026 Clover Network, Inc. */");
        let java = render(&profile, &SchemaNode::Record(order()));
        assert!(java.starts_with("/* Copyright (C) 2026 Clover Network, Inc. */\n\n/**"));
        assert!(java.contains("return getJSONObject().optString(\"title\", null);"));
        assert!(java.contains("return getJSONObject().optInt(\"quantity\");"));
        assert!(java.contains("public boolean hasUuid()"));
        assert!(java.contains("public Order quantity(java.lang.Integer quantity)"));
        assert!(java.contains("    java.lang.String title = getTitle();\n    if (title != null"));
    }

    #[test]
    fn test_no_setters_when_disabled() {
        let mut profile = GenerationProfile::plain_object();
        profile.create_setters = false;
        let java = render(&profile, &SchemaNode::Record(order()));
        assert!(!java.contains("public void setTitle"));
        assert!(java.contains("public java.lang.String getTitle()"));
    }

    #[test]
    fn test_enum_and_fixed_output() {
        let profile = GenerationProfile::plain_object();
        let status = SchemaNode::Enum(EnumSchema {
            name: QualifiedName::new("Status", Some("orders")),
            doc: None,
            symbols: vec!["OPEN".into(), "PAID".into()],
        });
        let java = render(&profile, &status);
        assert!(java.contains("public enum Status {\n  OPEN,\n  PAID\n}\n"));

        let digest = SchemaNode::Fixed(FixedSchema {
            name: QualifiedName::new("Md5", Some("crypto")),
            doc: Some("MD5 digest".into()),
            size: 16,
        });
        let java = render(&profile, &digest);
        assert!(java.contains("package com.clover.core.data.crypto;"));
        assert!(java.contains("public static final int SIZE = 16;"));
    }

    #[test]
    fn test_handler_output() {
        let profile = GenerationProfile::protocol_handler();
        let protocol = Protocol {
            name: QualifiedName::new("Payments", Some("payments")),
            doc: None,
            types: vec![],
            messages: vec![Message {
                name: "charge".to_string(),
                doc: Some("Charge a card".to_string()),
                request: vec![
                    Field::new("amount", SchemaNode::primitive(Primitive::Long))
                        .with_annotation("min", json!(1)),
                    Field::new("note", SchemaNode::optional(SchemaNode::primitive(Primitive::String))),
                ],
                response: SchemaNode::reference("payments.Receipt"),
                one_way: false,
            }],
        };

        let ctx = ContextBuilder::new(&profile)
            .message(&protocol, &protocol.messages[0])
            .unwrap();
        assert_eq!(ctx.package, "com.clover.server.handlers.api.payments");
        assert_eq!(ctx.class_name, "ChargeHandler");
        assert_eq!(ctx.template_name(), "handler.vm");

        let java = BuiltinTemplates
            .render(&profile.template_path(HANDLER_TEMPLATE), &ctx)
            .unwrap();
        assert!(java.contains("public abstract class ChargeHandler {"));
        assert!(java.contains(
            "public abstract com.clover.core.data.payments.Receipt handle(java.lang.Long amount, java.lang.String note) throws java.lang.Exception;"
        ));
        assert!(java.contains("if (amount != null && amount < 1) throw new IllegalArgumentException"));
        assert!(java.contains("    validateRequest(amount, note);\n    return handle(amount, note);"));
    }

    #[test]
    fn test_collector_renamed_around_field() {
        let profile = GenerationProfile::server_object();
        let record = RecordSchema::new("Batch", Some("jobs")).with_field(
            Field::new("errors", SchemaNode::primitive(Primitive::String))
                .with_annotation("length", json!(255)),
        );
        let java = render(&profile, &SchemaNode::Record(record));
        assert!(java.contains(
            "    java.util.List<java.lang.String> errors$ = new java.util.ArrayList<java.lang.String>();"
        ));
        assert!(java.contains(
            "if (errors != null && errors.length() > 255) errors$.add(\"Maximum string length exceeded for 'errors'\");"
        ));
        assert!(java.contains("    return errors$;"));
    }

    #[test]
    fn test_record_named_id_keeps_its_name() {
        let profile = GenerationProfile::server_object();
        let record = RecordSchema::new("Id", Some("orders.id"))
            .with_field(Field::new("id", SchemaNode::primitive(Primitive::String)));
        let ctx = ContextBuilder::new(&profile).record(&record).unwrap();
        assert_eq!(ctx.class_name, "Id");
        assert_eq!(ctx.package, "com.clover.core.data.orders.id");

        let EntityContext::Record(fields) = &ctx.entity else {
            panic!("Expected record context");
        };
        assert_eq!(fields.fields[0].mangled, "uuid");

        let holder = RecordSchema::new("Holder", Some("orders"))
            .with_field(Field::new("key", SchemaNode::reference("orders.id.Id")));
        let ctx = ContextBuilder::new(&profile).record(&holder).unwrap();
        let EntityContext::Record(holder) = &ctx.entity else {
            panic!("Expected record context");
        };
        assert_eq!(holder.fields[0].descriptor.type_name, "com.clover.core.data.orders.id.Id");
    }

    #[test]
    fn test_template_failures() {
        let profile = GenerationProfile::plain_object();
        let ctx = ContextBuilder::new(&profile).record(&order()).unwrap();

        let err = BuiltinTemplates
            .render(&profile.template_path("missing.vm"), &ctx)
            .unwrap_err();
        assert!(matches!(err, CodegenError::TemplateLoad { .. }));

        let err = BuiltinTemplates
            .render(&profile.template_path(ENUM_TEMPLATE), &ctx)
            .unwrap_err();
        assert!(matches!(err, CodegenError::TemplateRender { .. }));
    }

    #[test]
    fn test_json_profile_rejects_bytes() {
        let profile = GenerationProfile::json_object("");
        let record = RecordSchema::new("Blob", None)
            .with_field(Field::new("data", SchemaNode::primitive(Primitive::Bytes)));
        let err = ContextBuilder::new(&profile).record(&record).unwrap_err();
        assert!(matches!(err, CodegenError::UnsupportedSchemaKind { .. }));
    }
}
