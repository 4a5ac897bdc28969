//! Code Generation
//!
//! Turns schema nodes into Java sources through a generation profile.
//!
//! Architecture:
//! - Type Resolver / Naming / Metadata / Rules: derive generation facts
//!   from schema nodes, never mutating them
//! - GenerationProfile: plain data selecting type tables, accessors, error
//!   style and naming rules
//! - ContextBuilder: freezes the derived facts into a serializable
//!   `RenderContext` per entity
//! - Generator: incremental render-and-emit through a `TemplateEngine` and
//!   an `OutputSink`
//!
//! The key constraint: templates NEVER read raw annotations or schema nodes
//! to make decisions, only the resolved context.

pub mod config;
pub mod emit;
pub mod metadata;
pub mod names;
pub mod rules;
pub mod templates;
pub mod types;

pub use config::{
    AccessorVocabulary, ContainerTypes, ErrorStyle, GenerationProfile, JsonAccessors, ProfileKind,
    RangeCombinator, ScalarTypes, StringKind, TemplateLogging,
};
pub use emit::{EmitReport, Generator, LocalFs, OutputArtifact, OutputSink, UnitOutcome};
pub use metadata::{AnnotationKey, FieldMetadata, ForeignReference, MetadataExtractor};
pub use names::{camel_to_snake, constant_name, to_lower_initial, to_upper_initial, NamingTable};
pub use rules::{RuleGenerator, ValidityRule};
pub use templates::{BuiltinTemplates, ContextBuilder, EntityContext, RenderContext, TemplateEngine};
pub use types::{TypeDescriptor, TypeResolver};
