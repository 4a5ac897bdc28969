//! Type Resolver
//!
//! Maps schema nodes to target-language type descriptors using the
//! profile's tables. Two-armed `{null, X}` unions resolve to `X` with the
//! nullable flag set; wider unions resolve to the profile's opaque type.

use serde::Serialize;

use super::config::{AccessorVocabulary, GenerationProfile, JsonAccessors};
use crate::error::{CodegenError, Result};
use crate::schema::{QualifiedName, SchemaNode};

/// Resolved type of a schema node. Derived per use, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeDescriptor {
    /// Target-language type, e.g. `java.util.List<java.lang.String>`
    pub type_name: String,

    /// The node was a `{null, X}` union
    pub nullable_union: bool,

    /// The node the type was resolved from (the non-null arm for optionals)
    pub underlying: SchemaNode,
}

/// Resolves schema nodes against one profile
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    profile: &'a GenerationProfile,
}

impl<'a> TypeResolver<'a> {
    pub fn new(profile: &'a GenerationProfile) -> Self {
        Self { profile }
    }

    pub fn resolve(&self, node: &SchemaNode) -> Result<TypeDescriptor> {
        if let Some(arm) = node.nullable_arm() {
            return Ok(TypeDescriptor {
                type_name: self.type_name(arm)?,
                nullable_union: true,
                underlying: arm.clone(),
            });
        }

        Ok(TypeDescriptor {
            type_name: self.type_name(node)?,
            nullable_union: false,
            underlying: node.clone(),
        })
    }

    /// Target type name only
    pub fn type_name(&self, node: &SchemaNode) -> Result<String> {
        let containers = &self.profile.containers;
        match node {
            SchemaNode::Record(_)
            | SchemaNode::Enum(_)
            | SchemaNode::Fixed(_)
            | SchemaNode::Reference { .. } => {
                // name() is always Some for these kinds
                let name = node
                    .name()
                    .ok_or_else(|| CodegenError::unsupported(node.kind(), "unnamed type"))?;
                Ok(self.named_type(name))
            }
            SchemaNode::Array { items } => Ok(containers.wrap_array(&self.type_name(items)?)),
            SchemaNode::Map { values } => Ok(containers.wrap_map(&self.type_name(values)?)),
            SchemaNode::Union { .. } => match node.nullable_arm() {
                Some(arm) => self.type_name(arm),
                None => Ok(containers.opaque.clone()),
            },
            SchemaNode::Primitive { primitive } => self
                .profile
                .scalars
                .lookup(*primitive)
                .map(str::to_string)
                .ok_or_else(|| {
                    CodegenError::unsupported(
                        primitive.name(),
                        format!("no scalar type in profile {}", self.profile.kind),
                    )
                }),
        }
    }

    /// Base namespace + qualified name, every segment mangled
    pub fn named_type(&self, name: &QualifiedName) -> String {
        let full_name = match &self.profile.base_namespace {
            Some(base) => format!("{}.{}", base, name.full_name()),
            None => name.full_name(),
        };
        self.profile.naming.mangle_qualified(&full_name)
    }

    /// Package the generated type for `name` lives in
    pub fn package_of(&self, name: &QualifiedName) -> String {
        let package = match (&self.profile.base_namespace, &name.namespace) {
            (Some(base), Some(ns)) => format!("{}.{}", base, ns),
            (Some(base), None) => base.clone(),
            (None, Some(ns)) => ns.clone(),
            (None, None) => String::new(),
        };
        self.profile.naming.mangle_qualified(&package)
    }

    /// Expression fragment that reads a field: the typed getter for direct
    /// profiles, the `opt*` accessor name for JSON-backed ones.
    pub fn accessor(&self, field_name: &str, node: &SchemaNode) -> Result<String> {
        match &self.profile.accessors {
            AccessorVocabulary::Typed => Ok(self.profile.naming.getter_name(field_name)),
            AccessorVocabulary::Json(json) => json_accessor(json, node).map(str::to_string),
        }
    }
}

fn json_accessor<'j>(json: &'j JsonAccessors, node: &SchemaNode) -> Result<&'j str> {
    match node {
        SchemaNode::Record(_)
        | SchemaNode::Enum(_)
        | SchemaNode::Fixed(_)
        | SchemaNode::Reference { .. } => Ok(&json.named),
        SchemaNode::Array { .. } => Ok(&json.array),
        SchemaNode::Map { .. } => Ok(&json.map),
        SchemaNode::Union { .. } => match node.nullable_arm() {
            Some(arm) => json_accessor(json, arm),
            None => Ok(&json.opaque),
        },
        SchemaNode::Primitive { primitive } => json.lookup(*primitive).ok_or_else(|| {
            CodegenError::unsupported(primitive.name(), "no JSON accessor")
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumSchema, Field, Primitive, RecordSchema};

    fn string() -> SchemaNode {
        SchemaNode::primitive(Primitive::String)
    }

    fn order_record() -> SchemaNode {
        SchemaNode::Record(
            RecordSchema::new("Order", Some("orders")).with_field(Field::new("title", string())),
        )
    }

    #[test]
    fn test_primitive_types() {
        let profile = GenerationProfile::plain_object();
        let resolver = TypeResolver::new(&profile);
        let cases = [
            (Primitive::String, "java.lang.String"),
            (Primitive::Bytes, "java.nio.ByteBuffer"),
            (Primitive::Int, "java.lang.Integer"),
            (Primitive::Long, "java.lang.Long"),
            (Primitive::Float, "java.lang.Float"),
            (Primitive::Double, "java.lang.Double"),
            (Primitive::Boolean, "java.lang.Boolean"),
            (Primitive::Null, "java.lang.Void"),
        ];
        for (primitive, expected) in cases {
            let descriptor = resolver.resolve(&SchemaNode::primitive(primitive)).unwrap();
            assert_eq!(descriptor.type_name, expected);
            assert!(!descriptor.nullable_union);
        }
    }

    #[test]
    fn test_named_types_use_base_namespace() {
        let profile = GenerationProfile::plain_object();
        let resolver = TypeResolver::new(&profile);
        assert_eq!(
            resolver.type_name(&order_record()).unwrap(),
            "com.clover.core.data.orders.Order"
        );

        let json = GenerationProfile::json_object("");
        let resolver = TypeResolver::new(&json);
        assert_eq!(resolver.type_name(&order_record()).unwrap(), "orders.Order");
        assert_eq!(
            resolver.type_name(&SchemaNode::reference("orders.Status")).unwrap(),
            "orders.Status"
        );
    }

    #[test]
    fn test_named_types_are_mangled() {
        let profile = GenerationProfile::json_object("com.example");
        let resolver = TypeResolver::new(&profile);
        let node = SchemaNode::Enum(EnumSchema {
            name: QualifiedName::new("Kind", Some("catalog.package")),
            doc: None,
            symbols: vec![],
        });
        assert_eq!(
            resolver.type_name(&node).unwrap(),
            "com.example.catalog.package$.Kind"
        );
        assert_eq!(
            resolver.package_of(&QualifiedName::new("Kind", Some("catalog"))),
            "com.example.catalog"
        );
    }

    #[test]
    fn test_containers() {
        let profile = GenerationProfile::plain_object();
        let resolver = TypeResolver::new(&profile);
        let node = SchemaNode::map(SchemaNode::array(SchemaNode::primitive(Primitive::Long)));
        assert_eq!(
            resolver.type_name(&node).unwrap(),
            "java.util.Map<java.lang.String,java.util.List<java.lang.Long>>"
        );
    }

    #[test]
    fn test_nullable_union_collapses() {
        let profile = GenerationProfile::plain_object();
        let resolver = TypeResolver::new(&profile);
        for inner in [string(), order_record(), SchemaNode::array(string())] {
            let optional = SchemaNode::optional(inner.clone());
            let descriptor = resolver.resolve(&optional).unwrap();
            assert!(descriptor.nullable_union);
            assert_eq!(descriptor.type_name, resolver.resolve(&inner).unwrap().type_name);
            assert_eq!(descriptor.underlying, inner);
        }
    }

    #[test]
    fn test_wide_unions_are_opaque() {
        let profile = GenerationProfile::plain_object();
        let resolver = TypeResolver::new(&profile);
        let wide = SchemaNode::union(vec![
            SchemaNode::primitive(Primitive::Null),
            string(),
            SchemaNode::primitive(Primitive::Int),
        ]);
        let descriptor = resolver.resolve(&wide).unwrap();
        assert_eq!(descriptor.type_name, "java.lang.Object");
        assert!(!descriptor.nullable_union);

        let no_null = SchemaNode::union(vec![string(), SchemaNode::primitive(Primitive::Int)]);
        assert_eq!(resolver.resolve(&no_null).unwrap().type_name, "java.lang.Object");

        let two_nulls = SchemaNode::union(vec![
            SchemaNode::primitive(Primitive::Null),
            SchemaNode::primitive(Primitive::Null),
        ]);
        assert!(!resolver.resolve(&two_nulls).unwrap().nullable_union);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let profile = GenerationProfile::server_object();
        let resolver = TypeResolver::new(&profile);
        let node = SchemaNode::optional(SchemaNode::map(order_record()));
        assert_eq!(resolver.resolve(&node).unwrap(), resolver.resolve(&node).unwrap());
    }

    #[test]
    fn test_unsupported_scalar() {
        let mut profile = GenerationProfile::plain_object();
        profile.scalars.bytes = None;
        let resolver = TypeResolver::new(&profile);
        let err = resolver
            .resolve(&SchemaNode::primitive(Primitive::Bytes))
            .unwrap_err();
        assert!(matches!(err, CodegenError::UnsupportedSchemaKind { .. }));
    }

    #[test]
    fn test_accessors() {
        let json = GenerationProfile::json_object("");
        let resolver = TypeResolver::new(&json);
        assert_eq!(resolver.accessor("title", &string()).unwrap(), "optString");
        assert_eq!(
            resolver
                .accessor("count", &SchemaNode::optional(SchemaNode::primitive(Primitive::Int)))
                .unwrap(),
            "optInt"
        );
        assert_eq!(
            resolver.accessor("price", &SchemaNode::primitive(Primitive::Float)).unwrap(),
            "optDouble"
        );
        assert_eq!(resolver.accessor("lines", &SchemaNode::array(string())).unwrap(), "optJSONArray");
        assert_eq!(resolver.accessor("order", &order_record()).unwrap(), "optJSONObject");
        assert!(resolver
            .accessor("blob", &SchemaNode::primitive(Primitive::Bytes))
            .is_err());

        let plain = GenerationProfile::plain_object();
        let resolver = TypeResolver::new(&plain);
        assert_eq!(resolver.accessor("title", &string()).unwrap(), "getTitle");
    }
}
