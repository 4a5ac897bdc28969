//! Generation Profiles
//!
//! A profile is plain data: scalar-type table, container patterns, accessor
//! vocabulary, error-reporting style and naming rules. One generic
//! resolver/renderer pipeline reads it; nothing dispatches on subclasses.
//!
//! Built-in profiles:
//! - `plain-object`: typed Java data objects
//! - `json-object`: Java objects backed by a JSON store (`opt*` accessors)
//! - `server-object`: relationally-annotated server objects
//! - `protocol-handler`: one handler stub per protocol message

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::names::NamingTable;
use crate::error::CodegenError;
use crate::schema::Primitive;

/// Header placed above every generated file
pub const GENERATED_HEADER: &str = "/**\n * Autogenerated by avro-objectgen\n *\n * DO NOT EDIT DIRECTLY\n */";

/// Namespace that data types live under in the typed profiles
pub const CORE_DATA_NAMESPACE: &str = "com.clover.core.data";

/// Namespace prefix for protocol handlers
pub const HANDLER_NAMESPACE: &str = "com.clover.server.handlers.api";

// =============================================================================
// Profile Kind
// =============================================================================

/// Named generation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileKind {
    PlainObject,
    JsonObject,
    ServerObject,
    ProtocolHandler,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 4] = [
        ProfileKind::PlainObject,
        ProfileKind::JsonObject,
        ProfileKind::ServerObject,
        ProfileKind::ProtocolHandler,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ProfileKind::PlainObject => "plain-object",
            ProfileKind::JsonObject => "json-object",
            ProfileKind::ServerObject => "server-object",
            ProfileKind::ProtocolHandler => "protocol-handler",
        }
    }

    /// Source file extension this profile compiles
    pub fn source_extension(&self) -> &'static str {
        match self {
            ProfileKind::ProtocolHandler => "avpr",
            _ => "avsc",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProfileKind {
    type Err = CodegenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain-object" | "java" => Ok(ProfileKind::PlainObject),
            "json-object" | "json" => Ok(ProfileKind::JsonObject),
            "server-object" | "server" => Ok(ProfileKind::ServerObject),
            "protocol-handler" | "handler" => Ok(ProfileKind::ProtocolHandler),
            other => Err(CodegenError::UnknownProfile(other.to_string())),
        }
    }
}

// =============================================================================
// Type Tables
// =============================================================================

/// Java representation of schema strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringKind {
    #[default]
    String,
    CharSequence,
    Utf8,
}

impl StringKind {
    pub fn java_type(&self) -> &'static str {
        match self {
            StringKind::String => "java.lang.String",
            StringKind::CharSequence => "java.lang.CharSequence",
            StringKind::Utf8 => "org.apache.avro.util.Utf8",
        }
    }
}

impl FromStr for StringKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(StringKind::String),
            "charsequence" | "char_sequence" => Ok(StringKind::CharSequence),
            "utf8" => Ok(StringKind::Utf8),
            other => Err(format!("unknown string type '{}'", other)),
        }
    }
}

/// Canonical scalar types. `None` marks a kind the profile cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalarTypes {
    pub string: String,
    pub bytes: Option<String>,
    pub int: String,
    pub long: String,
    pub float: String,
    pub double: String,
    pub boolean: String,
    pub null: Option<String>,
}

impl ScalarTypes {
    /// Boxed Java scalar types
    pub fn java(string_kind: StringKind) -> Self {
        Self {
            string: string_kind.java_type().to_string(),
            bytes: Some("java.nio.ByteBuffer".to_string()),
            int: "java.lang.Integer".to_string(),
            long: "java.lang.Long".to_string(),
            float: "java.lang.Float".to_string(),
            double: "java.lang.Double".to_string(),
            boolean: "java.lang.Boolean".to_string(),
            null: Some("java.lang.Void".to_string()),
        }
    }

    pub fn lookup(&self, primitive: Primitive) -> Option<&str> {
        match primitive {
            Primitive::String => Some(&self.string),
            Primitive::Bytes => self.bytes.as_deref(),
            Primitive::Int => Some(&self.int),
            Primitive::Long => Some(&self.long),
            Primitive::Float => Some(&self.float),
            Primitive::Double => Some(&self.double),
            Primitive::Boolean => Some(&self.boolean),
            Primitive::Null => self.null.as_deref(),
        }
    }
}

/// Container type patterns; `{}` is replaced by the element type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerTypes {
    pub array: String,
    pub map: String,
    /// Type used for unions that are not plain optionals
    pub opaque: String,
}

impl ContainerTypes {
    pub fn java() -> Self {
        Self {
            array: "java.util.List<{}>".to_string(),
            map: "java.util.Map<java.lang.String,{}>".to_string(),
            opaque: "java.lang.Object".to_string(),
        }
    }

    pub fn wrap_array(&self, element: &str) -> String {
        self.array.replace("{}", element)
    }

    pub fn wrap_map(&self, value: &str) -> String {
        self.map.replace("{}", value)
    }
}

// =============================================================================
// Accessor Vocabulary
// =============================================================================

/// How generated code reads a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorVocabulary {
    /// Direct typed getters (`getName()`)
    Typed,
    /// Loosely-typed backing store (`optString("name")`)
    Json(JsonAccessors),
}

/// `org.json` optional-get accessors. Bytes and null have none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonAccessors {
    pub named: String,
    pub array: String,
    pub map: String,
    pub opaque: String,
    pub string: String,
    pub int: String,
    pub long: String,
    pub float: String,
    pub double: String,
    pub boolean: String,
}

impl Default for JsonAccessors {
    fn default() -> Self {
        Self {
            named: "optJSONObject".to_string(),
            array: "optJSONArray".to_string(),
            map: "optJSONObject".to_string(),
            opaque: "optJSONObject".to_string(),
            string: "optString".to_string(),
            int: "optInt".to_string(),
            long: "optLong".to_string(),
            float: "optDouble".to_string(),
            double: "optDouble".to_string(),
            boolean: "optBoolean".to_string(),
        }
    }
}

impl JsonAccessors {
    pub fn lookup(&self, primitive: Primitive) -> Option<&str> {
        match primitive {
            Primitive::String => Some(&self.string),
            Primitive::Int => Some(&self.int),
            Primitive::Long => Some(&self.long),
            Primitive::Float => Some(&self.float),
            Primitive::Double => Some(&self.double),
            Primitive::Boolean => Some(&self.boolean),
            Primitive::Bytes | Primitive::Null => None,
        }
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Where a generated validity check sends its violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStyle {
    /// `throw new <exception>("..")` at construction time
    Throw { exception: String },
    /// `<collector>.add("..")` into an error list
    Collect { collector: String },
}

impl ErrorStyle {
    pub fn throw() -> Self {
        ErrorStyle::Throw {
            exception: "IllegalArgumentException".to_string(),
        }
    }

    pub fn collect() -> Self {
        ErrorStyle::Collect {
            collector: "errors".to_string(),
        }
    }

    /// This style with the collector renamed (`errors$`, `errors$$`, ...)
    /// until it clashes with none of `taken`
    pub fn avoiding<'a>(&self, taken: impl IntoIterator<Item = &'a str>) -> Self {
        match self {
            ErrorStyle::Throw { .. } => self.clone(),
            ErrorStyle::Collect { collector } => {
                let taken: Vec<&str> = taken.into_iter().collect();
                let mut name = collector.clone();
                while taken.contains(&name.as_str()) {
                    name.push('$');
                }
                ErrorStyle::Collect { collector: name }
            }
        }
    }
}

/// How `min` and `max` violations combine in one guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeCombinator {
    /// Both bounds must be violated (`&&`)
    #[default]
    All,
    /// Either bound violated (`||`)
    Any,
}

impl RangeCombinator {
    pub fn operator(&self) -> &'static str {
        match self {
            RangeCombinator::All => " && ",
            RangeCombinator::Any => " || ",
        }
    }
}

/// Whether template engines report render events through `tracing`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateLogging {
    #[default]
    Tracing,
    Silent,
}

// =============================================================================
// Generation Profile
// =============================================================================

/// Immutable generation configuration, created once per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationProfile {
    pub kind: ProfileKind,

    /// Directory the profile's templates are loaded from
    pub template_dir: PathBuf,

    /// Prefix for generated type names (`com.clover.core.data`)
    pub base_namespace: Option<String>,

    /// Namespace prefix for artifacts that are not schema types (handlers)
    pub artifact_namespace: Option<String>,

    /// Subdirectory of the output root (`server`)
    pub output_subdir: Option<PathBuf>,

    /// Appended to the artifact name (`Handler`)
    pub artifact_suffix: String,

    pub file_extension: String,

    pub string_kind: StringKind,
    pub scalars: ScalarTypes,
    pub containers: ContainerTypes,
    pub accessors: AccessorVocabulary,
    pub error_style: ErrorStyle,
    pub range_combinator: RangeCombinator,
    pub naming: NamingTable,

    /// Notice placed above the generated header
    pub copyright_notice: Option<String>,

    /// Emit setters and builder methods
    pub create_setters: bool,

    pub template_logging: TemplateLogging,
}

impl GenerationProfile {
    /// Typed data objects
    pub fn plain_object() -> Self {
        Self {
            kind: ProfileKind::PlainObject,
            template_dir: PathBuf::from("templates/java/core"),
            base_namespace: Some(CORE_DATA_NAMESPACE.to_string()),
            artifact_namespace: None,
            output_subdir: None,
            artifact_suffix: String::new(),
            file_extension: "java".to_string(),
            string_kind: StringKind::String,
            scalars: ScalarTypes::java(StringKind::String),
            containers: ContainerTypes::java(),
            accessors: AccessorVocabulary::Typed,
            error_style: ErrorStyle::throw(),
            range_combinator: RangeCombinator::All,
            naming: NamingTable::java(),
            copyright_notice: None,
            create_setters: true,
            template_logging: TemplateLogging::Tracing,
        }
    }

    /// JSON-backed accessor objects under a configurable base package
    pub fn json_object(base_package: &str) -> Self {
        Self {
            kind: ProfileKind::JsonObject,
            template_dir: PathBuf::from("templates/jsonobject"),
            base_namespace: Some(base_package.to_string()).filter(|p| !p.is_empty()),
            accessors: AccessorVocabulary::Json(JsonAccessors::default()),
            naming: NamingTable::java().with_uuid_override(),
            ..Self::plain_object()
        }
    }

    /// Relationally-annotated server objects
    pub fn server_object() -> Self {
        Self {
            kind: ProfileKind::ServerObject,
            template_dir: PathBuf::from("templates/java/server"),
            output_subdir: Some(PathBuf::from("server")),
            error_style: ErrorStyle::collect(),
            naming: NamingTable::java().with_uuid_override(),
            ..Self::plain_object()
        }
    }

    /// One handler per protocol message
    pub fn protocol_handler() -> Self {
        Self {
            kind: ProfileKind::ProtocolHandler,
            template_dir: PathBuf::from("templates/server"),
            artifact_namespace: Some(HANDLER_NAMESPACE.to_string()),
            artifact_suffix: "Handler".to_string(),
            ..Self::plain_object()
        }
    }

    pub fn for_kind(kind: ProfileKind, base_package: &str) -> Self {
        match kind {
            ProfileKind::PlainObject => Self::plain_object(),
            ProfileKind::JsonObject => Self::json_object(base_package),
            ProfileKind::ServerObject => Self::server_object(),
            ProfileKind::ProtocolHandler => Self::protocol_handler(),
        }
    }

    pub fn with_string_kind(mut self, kind: StringKind) -> Self {
        self.string_kind = kind;
        self.scalars.string = kind.java_type().to_string();
        self
    }

    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    pub fn with_copyright_notice(mut self, notice: impl Into<String>) -> Self {
        self.copyright_notice = Some(notice.into());
        self
    }

    pub fn with_uuid_override(mut self, enabled: bool) -> Self {
        self.naming.overrides.shift_remove("id");
        if enabled {
            self.naming = self.naming.with_uuid_override();
        }
        self
    }

    pub fn with_template_logging(mut self, logging: TemplateLogging) -> Self {
        self.template_logging = logging;
        self
    }

    /// Full path of a named template
    pub fn template_path(&self, template: &str) -> PathBuf {
        self.template_dir.join(template)
    }

    /// Text placed at the top of every artifact
    pub fn file_header(&self) -> String {
        match &self.copyright_notice {
            Some(notice) => format!("{}\n\n{}", notice, GENERATED_HEADER),
            None => GENERATED_HEADER.to_string(),
        }
    }
}
