//! Naming Mangler
//!
//! Converts identifiers between conventions and applies the profile's
//! reserved-word and override tables:
//! - lowerCamel <-> UpperCamel (initial-character case only)
//! - camelCase -> snake_case (one-hop boundary detection)
//! - reserved words escaped per profile
//! - table-driven overrides (`id` -> `uuid`)
//!
//! Accessor names (getter, setter, fluent builder) are derived here so every
//! caller sees the same overrides.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Lowercase letter or digit immediately followed by an uppercase letter
static CAMEL_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new("([a-z0-9])([A-Z])").expect("static regex"));

// =============================================================================
// Case Helpers
// =============================================================================

/// `employeeId` -> `EmployeeId`
pub fn to_upper_initial(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// `EmployeeId` -> `employeeId`
pub fn to_lower_initial(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// `employeeId` -> `employee_id`
///
/// Only a lowercase letter or digit followed by an uppercase letter counts as
/// a word boundary, so uppercase runs stay together: `URLPath` -> `urlpath`.
pub fn camel_to_snake(s: &str) -> String {
    CAMEL_BOUNDARY.replace_all(s, "${1}_${2}").to_lowercase()
}

/// `employeeId` -> `EMPLOYEE_ID`
pub fn constant_name(s: &str) -> String {
    camel_to_snake(s).to_uppercase()
}

// =============================================================================
// Naming Table
// =============================================================================

/// How a reserved word is escaped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservedEscape {
    /// `class` -> `class$`
    Suffix(String),
    /// `class` -> `_class`
    Prefix(String),
}

/// Profile-supplied naming rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingTable {
    /// Target-language reserved words
    pub reserved: BTreeSet<String>,

    /// Escape applied to reserved words
    pub escape: ReservedEscape,

    /// Whole-identifier renames, keyed by lowercase identifier
    pub overrides: IndexMap<String, String>,
}

impl NamingTable {
    /// Java reserved words, escaped with a `$` suffix, no overrides
    pub fn java() -> Self {
        Self {
            reserved: JAVA_RESERVED.iter().map(|s| s.to_string()).collect(),
            escape: ReservedEscape::Suffix("$".to_string()),
            overrides: IndexMap::new(),
        }
    }

    /// Add the primary-identifier override (`id` -> `uuid`)
    pub fn with_uuid_override(mut self) -> Self {
        self.overrides.insert("id".to_string(), "uuid".to_string());
        self
    }

    pub fn has_uuid_override(&self) -> bool {
        self.overrides.get("id").map(String::as_str) == Some("uuid")
    }

    /// Apply overrides, then reserved-word escaping. For field names only;
    /// type and package names go through `escape_reserved`.
    pub fn mangle(&self, identifier: &str) -> String {
        match self.overrides.get(&identifier.to_lowercase()) {
            Some(renamed) => renamed.clone(),
            None => self.escape_reserved(identifier),
        }
    }

    /// Reserved-word escaping alone
    pub fn escape_reserved(&self, identifier: &str) -> String {
        if self.reserved.contains(identifier) {
            return match &self.escape {
                ReservedEscape::Suffix(suffix) => format!("{}{}", identifier, suffix),
                ReservedEscape::Prefix(prefix) => format!("{}{}", prefix, identifier),
            };
        }
        identifier.to_string()
    }

    /// Escape every segment of a dotted type or package name
    pub fn mangle_qualified(&self, dotted: &str) -> String {
        dotted
            .split('.')
            .filter(|segment| !segment.is_empty())
            .map(|segment| self.escape_reserved(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// `name` -> `getName`
    pub fn getter_name(&self, field_name: &str) -> String {
        format!("get{}", to_upper_initial(&self.mangle(field_name)))
    }

    /// `name` -> `setName`
    pub fn setter_name(&self, field_name: &str) -> String {
        format!("set{}", to_upper_initial(&self.mangle(field_name)))
    }

    /// Fluent builder name: the setter without `set`, lower-initial.
    /// Overrides are applied again to the derived name.
    pub fn builder_name(&self, field_name: &str) -> String {
        let setter = self.setter_name(field_name);
        let base = to_lower_initial(setter.strip_prefix("set").unwrap_or(&setter));
        self.mangle(&base)
    }
}

const JAVA_RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char",
    "class", "const", "continue", "default", "do", "double", "else", "enum",
    "extends", "false", "final", "finally", "float", "for", "goto", "if",
    "implements", "import", "instanceof", "int", "interface", "long", "native",
    "new", "null", "package", "private", "protected", "public", "return",
    "short", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "true", "try", "void", "volatile", "while",
];
