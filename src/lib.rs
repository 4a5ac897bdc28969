//! Avro Object Generator
//!
//! Generates Java data objects, JSON-backed accessor objects, relational
//! server objects and protocol handler stubs from annotated Avro schemas.
//!
//! ## Features
//!
//! - **Type Resolution**: Avro types map to Java types per profile, with
//!   `["null", X]` unions collapsed to an optional `X`
//! - **Annotation Metadata**: `readonly`, `requiredOnCreate`, `length`,
//!   `min`/`max`, `sql.*`, `foreign_references`, `renamed_from`, `url`
//! - **Validation Code**: generated guards that throw or collect errors
//! - **Incremental Builds**: artifacts newer than their source are skipped
//!
//! ## Pipeline
//!
//! ```text
//! .avsc / .avpr
//!   └── loader ──> SchemaNode / Protocol
//!         └── codegen::ContextBuilder ──> RenderContext
//!               └── TemplateEngine ──> OutputSink
//!                     └── <output>/<package dirs>/<Name>.java
//! ```

pub mod codegen;
pub mod config;
pub mod error;
pub mod loader;
pub mod schema;

pub use codegen::{EmitReport, GenerationProfile, Generator, ProfileKind, UnitOutcome};
pub use config::ObjectgenConfig;
pub use error::{CodegenError, Result};
pub use loader::{discover_inputs, SchemaLoader};
pub use schema::{CompilationUnit, Field, Protocol, SchemaNode, SourceUnit};
