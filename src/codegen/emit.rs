//! Render-and-Emit Driver
//!
//! Feeds compilation units through a profile and a template engine and
//! writes one artifact per generated entity:
//! - every record, enum and fixed type reachable from a schema, once each
//! - one handler per message for the protocol-handler profile
//!
//! The incremental check runs before rendering: an artifact whose
//! destination is not older than its source is neither rendered nor written.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::config::{GenerationProfile, ProfileKind};
use super::templates::{BuiltinTemplates, ContextBuilder, RenderContext, TemplateEngine};
use crate::error::{CodegenError, Result};
use crate::schema::{CompilationUnit, SchemaNode, SourceUnit};

// =============================================================================
// Output Sink
// =============================================================================

/// A rendered file and where it goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub contents: String,
}

/// Timestamp queries and writes, kept behind a trait so the driver never
/// touches the filesystem directly
pub trait OutputSink: Send + Sync {
    /// Modification time, or `None` when the file does not exist
    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>>;

    fn write(&self, artifact: &OutputArtifact) -> io::Result<()>;
}

/// Local filesystem; parent directories are created on write
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl OutputSink for LocalFs {
    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        match fs::metadata(path) {
            Ok(metadata) => metadata.modified().map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, artifact: &OutputArtifact) -> io::Result<()> {
        if let Some(parent) = artifact.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&artifact.path, &artifact.contents)
    }
}

// =============================================================================
// Emit Report
// =============================================================================

/// Destinations touched by one run. In dry-run mode `written` lists the
/// destinations that would have been written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EmitReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Outcome of one source unit. `report` keeps the artifacts of entities that
/// succeeded even when `error` is set.
#[derive(Debug)]
pub struct UnitOutcome {
    pub path: PathBuf,
    pub report: EmitReport,
    /// First entity failure
    pub error: Option<CodegenError>,
}

impl UnitOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl EmitReport {
    pub fn merge(&mut self, other: EmitReport) {
        self.written.extend(other.written);
        self.skipped.extend(other.skipped);
    }

    pub fn is_empty(&self) -> bool {
        self.written.is_empty() && self.skipped.is_empty()
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Drives one profile through an engine into a sink
#[derive(Debug, Clone)]
pub struct Generator<E = BuiltinTemplates, S = LocalFs> {
    profile: GenerationProfile,
    engine: E,
    sink: S,
    dry_run: bool,
}

impl Generator {
    /// Built-in templates writing to the local filesystem
    pub fn new(profile: GenerationProfile) -> Self {
        Self {
            profile,
            engine: BuiltinTemplates,
            sink: LocalFs,
            dry_run: false,
        }
    }
}

impl<E: TemplateEngine, S: OutputSink> Generator<E, S> {
    pub fn with_engine<E2: TemplateEngine>(self, engine: E2) -> Generator<E2, S> {
        Generator {
            profile: self.profile,
            engine,
            sink: self.sink,
            dry_run: self.dry_run,
        }
    }

    pub fn with_sink<S2: OutputSink>(self, sink: S2) -> Generator<E, S2> {
        Generator {
            profile: self.profile,
            engine: self.engine,
            sink,
            dry_run: self.dry_run,
        }
    }

    /// Resolve destinations and run incremental checks without rendering
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    pub fn profile(&self) -> &GenerationProfile {
        &self.profile
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Render contexts for every artifact a unit produces, in emit order
    pub fn contexts(&self, unit: &CompilationUnit) -> Result<Vec<RenderContext>> {
        self.entity_contexts(unit).into_iter().collect()
    }

    /// Output root + profile subdirectory + package directories + class file
    pub fn destination(&self, dst: &Path, context: &RenderContext) -> PathBuf {
        let mut path = dst.to_path_buf();
        if let Some(subdir) = &self.profile.output_subdir {
            path.push(subdir);
        }
        for segment in context.package.split('.').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path.push(format!("{}.{}", context.class_name, self.profile.file_extension));
        path
    }

    /// Generate every artifact of `unit`, read from `src`, under `dst`.
    ///
    /// A failing entity does not stop its siblings; the first failure is
    /// returned once every entity has been attempted. Use `compile_unit` to
    /// keep the siblings' report alongside the failure.
    pub fn compile_to_destination(
        &self,
        src: &Path,
        dst: &Path,
        unit: &CompilationUnit,
    ) -> Result<EmitReport> {
        let (report, error) = self.compile_unit(src, dst, unit);
        match error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    /// Like `compile_to_destination`, returning the partial report with the
    /// first failure
    pub fn compile_unit(
        &self,
        src: &Path,
        dst: &Path,
        unit: &CompilationUnit,
    ) -> (EmitReport, Option<CodegenError>) {
        let mut report = EmitReport::default();
        let source_modified = match self.sink.modified(src) {
            Ok(modified) => modified,
            Err(e) => return (report, Some(CodegenError::io(src, e))),
        };

        let mut first_error = None;
        for entity in self.entity_contexts(unit) {
            let outcome = entity.and_then(|context| {
                self.emit(&context, dst, source_modified, &mut report)
            });
            if let Err(e) = outcome {
                warn!(source = %src.display(), error = %e, "Entity generation failed");
                first_error.get_or_insert(e);
            }
        }

        (report, first_error)
    }

    /// Compile independent source units in parallel. Outcomes keep input order.
    pub fn compile_all(&self, units: &[SourceUnit], dst: &Path) -> Vec<UnitOutcome> {
        units
            .par_iter()
            .map(|source| {
                let (report, error) = self.compile_unit(&source.path, dst, &source.unit);
                UnitOutcome {
                    path: source.path.clone(),
                    report,
                    error,
                }
            })
            .collect()
    }

    /// One context result per entity so a failing entity leaves its
    /// siblings intact
    fn entity_contexts(&self, unit: &CompilationUnit) -> Vec<Result<RenderContext>> {
        let builder = ContextBuilder::new(&self.profile);
        match unit {
            CompilationUnit::Protocol(protocol) if self.profile.kind == ProfileKind::ProtocolHandler => {
                protocol
                    .messages
                    .iter()
                    .map(|message| builder.message(protocol, message))
                    .collect()
            }
            CompilationUnit::Protocol(protocol) => named_types(&protocol.types)
                .into_iter()
                .map(|node| builder.named(node))
                .collect(),
            CompilationUnit::Schema(schema) => {
                if self.profile.kind == ProfileKind::ProtocolHandler {
                    warn!("protocol-handler profile given a schema without messages");
                }
                schema
                    .named_types()
                    .into_iter()
                    .map(|node| builder.named(node))
                    .collect()
            }
        }
    }

    fn emit(
        &self,
        context: &RenderContext,
        dst: &Path,
        source_modified: Option<SystemTime>,
        report: &mut EmitReport,
    ) -> Result<()> {
        let destination = self.destination(dst, context);

        if let Some(source_time) = source_modified {
            let existing = self
                .sink
                .modified(&destination)
                .map_err(|e| CodegenError::io(&destination, e))?;
            if matches!(existing, Some(dest_time) if dest_time >= source_time) {
                debug!(destination = %destination.display(), "Up to date, skipping");
                report.skipped.push(destination);
                return Ok(());
            }
        }

        if self.dry_run {
            info!(destination = %destination.display(), "Would write");
            report.written.push(destination);
            return Ok(());
        }

        let template = self.profile.template_path(context.template_name());
        let contents = self.engine.render(&template, context)?;
        let artifact = OutputArtifact {
            path: destination,
            contents,
        };
        self.sink
            .write(&artifact)
            .map_err(|e| CodegenError::io(&artifact.path, e))?;

        info!(destination = %artifact.path.display(), class = %context.qualified_class_name(), "Wrote artifact");
        report.written.push(artifact.path);
        Ok(())
    }
}

/// Named types of several roots, deduplicated across roots
fn named_types(roots: &[SchemaNode]) -> Vec<&SchemaNode> {
    let mut seen = HashSet::new();
    roots
        .iter()
        .flat_map(|root| root.named_types())
        .filter(|node| {
            node.name()
                .map(|name| seen.insert(name.full_name()))
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumSchema, Field, Message, Primitive, Protocol, QualifiedName, RecordSchema};
    use serde_json::json;
    use std::collections::HashMap;
    use std::fs::File;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Builtin templates that count render calls
    #[derive(Default)]
    struct CountingEngine {
        renders: AtomicUsize,
    }

    impl TemplateEngine for CountingEngine {
        fn render(&self, template: &Path, context: &RenderContext) -> Result<String> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            BuiltinTemplates.render(template, context)
        }
    }

    /// Fails every record template
    struct FailingRecords;

    impl TemplateEngine for FailingRecords {
        fn render(&self, template: &Path, context: &RenderContext) -> Result<String> {
            if context.template_name() == "record.vm" {
                return Err(CodegenError::TemplateRender {
                    template: template.to_path_buf(),
                    reason: "boom".to_string(),
                });
            }
            BuiltinTemplates.render(template, context)
        }
    }

    /// In-memory sink with controllable timestamps
    #[derive(Default)]
    struct MemorySink {
        times: Mutex<HashMap<PathBuf, SystemTime>>,
        writes: Mutex<Vec<OutputArtifact>>,
    }

    impl MemorySink {
        fn touch(&self, path: impl Into<PathBuf>, time: SystemTime) {
            self.times.lock().unwrap().insert(path.into(), time);
        }

        fn written_paths(&self) -> Vec<PathBuf> {
            self.writes.lock().unwrap().iter().map(|a| a.path.clone()).collect()
        }
    }

    impl OutputSink for MemorySink {
        fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
            Ok(self.times.lock().unwrap().get(path).copied())
        }

        fn write(&self, artifact: &OutputArtifact) -> io::Result<()> {
            self.writes.lock().unwrap().push(artifact.clone());
            Ok(())
        }
    }

    fn status() -> SchemaNode {
        SchemaNode::Enum(EnumSchema {
            name: QualifiedName::new("Status", Some("orders")),
            doc: None,
            symbols: vec!["OPEN".into(), "PAID".into()],
        })
    }

    fn order_unit() -> CompilationUnit {
        let line = SchemaNode::Record(
            RecordSchema::new("LineItem", Some("orders"))
                .with_field(Field::new("status", status())),
        );
        CompilationUnit::Schema(SchemaNode::Record(
            RecordSchema::new("Order", Some("orders"))
                .with_field(
                    Field::new("title", SchemaNode::primitive(Primitive::String))
                        .with_annotation("length", json!(64)),
                )
                .with_field(Field::new("lines", SchemaNode::array(line)))
                .with_field(Field::new("status", status())),
        ))
    }

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_one_artifact_per_named_type() {
        let generator = Generator::new(GenerationProfile::plain_object()).with_sink(MemorySink::default());
        let report = generator
            .compile_to_destination(Path::new("order.avsc"), Path::new("out"), &order_unit())
            .unwrap();

        let expected: Vec<PathBuf> = ["Order", "LineItem", "Status"]
            .iter()
            .map(|n| PathBuf::from(format!("out/com/clover/core/data/orders/{}.java", n)))
            .collect();
        assert_eq!(report.written, expected);
        assert!(report.skipped.is_empty());
        assert_eq!(generator.sink().written_paths(), expected);
    }

    #[test]
    fn test_newer_destination_is_skipped() {
        let sink = MemorySink::default();
        sink.touch("order.avsc", t(100));
        sink.touch("out/com/clover/core/data/orders/Order.java", t(200));
        sink.touch("out/com/clover/core/data/orders/Status.java", t(100));
        sink.touch("out/com/clover/core/data/orders/LineItem.java", t(50));

        let generator = Generator::new(GenerationProfile::plain_object())
            .with_engine(CountingEngine::default())
            .with_sink(sink);
        let report = generator
            .compile_to_destination(Path::new("order.avsc"), Path::new("out"), &order_unit())
            .unwrap();

        // equal timestamps count as up to date
        assert_eq!(
            report.skipped,
            vec![
                PathBuf::from("out/com/clover/core/data/orders/Order.java"),
                PathBuf::from("out/com/clover/core/data/orders/Status.java"),
            ]
        );
        assert_eq!(
            report.written,
            vec![PathBuf::from("out/com/clover/core/data/orders/LineItem.java")]
        );
        assert_eq!(generator.engine().renders.load(Ordering::SeqCst), 1);
        assert_eq!(generator.sink().written_paths(), report.written);
    }

    #[test]
    fn test_older_destination_is_regenerated() {
        let sink = MemorySink::default();
        sink.touch("order.avsc", t(300));
        for name in ["Order", "LineItem", "Status"] {
            sink.touch(format!("out/com/clover/core/data/orders/{}.java", name), t(299));
        }
        let generator = Generator::new(GenerationProfile::plain_object())
            .with_engine(CountingEngine::default())
            .with_sink(sink);
        let report = generator
            .compile_to_destination(Path::new("order.avsc"), Path::new("out"), &order_unit())
            .unwrap();
        assert_eq!(report.written.len(), 3);
        assert_eq!(generator.engine().renders.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_profile_destinations() {
        let unit = CompilationUnit::Schema(status());
        let dst = Path::new("gen");

        let server = Generator::new(GenerationProfile::server_object()).with_sink(MemorySink::default());
        let report = server.compile_to_destination(Path::new("s.avsc"), dst, &unit).unwrap();
        assert_eq!(
            report.written,
            vec![PathBuf::from("gen/server/com/clover/core/data/orders/Status.java")]
        );

        let json = Generator::new(GenerationProfile::json_object("com.clover.sdk.v3"))
            .with_sink(MemorySink::default());
        let report = json.compile_to_destination(Path::new("s.avsc"), dst, &unit).unwrap();
        assert_eq!(
            report.written,
            vec![PathBuf::from("gen/com/clover/sdk/v3/orders/Status.java")]
        );
    }

    #[test]
    fn test_handler_destinations() {
        let protocol = Protocol {
            name: QualifiedName::new("Payments", Some("payments")),
            doc: None,
            types: vec![status()],
            messages: vec![
                Message {
                    name: "charge".to_string(),
                    doc: None,
                    request: vec![Field::new("amount", SchemaNode::primitive(Primitive::Long))],
                    response: SchemaNode::primitive(Primitive::String),
                    one_way: false,
                },
                Message {
                    name: "ping".to_string(),
                    doc: None,
                    request: vec![],
                    response: SchemaNode::primitive(Primitive::Null),
                    one_way: true,
                },
            ],
        };
        let unit = CompilationUnit::Protocol(protocol);

        let handlers = Generator::new(GenerationProfile::protocol_handler()).with_sink(MemorySink::default());
        let report = handlers
            .compile_to_destination(Path::new("payments.avpr"), Path::new("out"), &unit)
            .unwrap();
        assert_eq!(
            report.written,
            vec![
                PathBuf::from("out/com/clover/server/handlers/api/payments/ChargeHandler.java"),
                PathBuf::from("out/com/clover/server/handlers/api/payments/PingHandler.java"),
            ]
        );

        // Other profiles generate the protocol's types
        let objects = Generator::new(GenerationProfile::plain_object()).with_sink(MemorySink::default());
        let report = objects
            .compile_to_destination(Path::new("payments.avpr"), Path::new("out"), &unit)
            .unwrap();
        assert_eq!(
            report.written,
            vec![PathBuf::from("out/com/clover/core/data/orders/Status.java")]
        );
    }

    #[test]
    fn test_failed_entity_writes_nothing_but_siblings_proceed() {
        let generator = Generator::new(GenerationProfile::plain_object())
            .with_engine(FailingRecords)
            .with_sink(MemorySink::default());
        let err = generator
            .compile_to_destination(Path::new("order.avsc"), Path::new("out"), &order_unit())
            .unwrap_err();
        assert!(err.is_template_failure());
        assert_eq!(
            generator.sink().written_paths(),
            vec![PathBuf::from("out/com/clover/core/data/orders/Status.java")]
        );
    }

    #[test]
    fn test_dry_run_renders_nothing() {
        let generator = Generator::new(GenerationProfile::plain_object())
            .with_engine(CountingEngine::default())
            .with_sink(MemorySink::default())
            .dry_run(true);
        let report = generator
            .compile_to_destination(Path::new("order.avsc"), Path::new("out"), &order_unit())
            .unwrap();
        assert_eq!(report.written.len(), 3);
        assert_eq!(generator.engine().renders.load(Ordering::SeqCst), 0);
        assert!(generator.sink().written_paths().is_empty());
    }

    #[test]
    fn test_contexts_follow_emit_order() {
        let generator = Generator::new(GenerationProfile::plain_object());
        let names: Vec<String> = generator
            .contexts(&order_unit())
            .unwrap()
            .into_iter()
            .map(|c| c.class_name)
            .collect();
        assert_eq!(names, vec!["Order", "LineItem", "Status"]);
    }

    #[test]
    fn test_compile_all_isolates_failures() {
        let mut bad_profile_record = RecordSchema::new("Blob", Some("files"));
        bad_profile_record
            .fields
            .push(Field::new("data", SchemaNode::primitive(Primitive::Bytes)));

        let units = vec![
            SourceUnit {
                path: PathBuf::from("order.avsc"),
                unit: order_unit(),
            },
            SourceUnit {
                path: PathBuf::from("blob.avsc"),
                unit: CompilationUnit::Schema(SchemaNode::Record(bad_profile_record)),
            },
        ];

        // JSON accessors have no bytes form
        let generator = Generator::new(GenerationProfile::json_object("")).with_sink(MemorySink::default());
        let results = generator.compile_all(&units, Path::new("out"));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].path, PathBuf::from("order.avsc"));
        assert!(results[0].is_ok());
        assert_eq!(results[0].report.written.len(), 3);
        assert!(matches!(
            results[1].error,
            Some(CodegenError::UnsupportedSchemaKind { .. })
        ));
    }

    #[test]
    fn test_partial_report_survives_failure() {
        let generator = Generator::new(GenerationProfile::plain_object())
            .with_engine(FailingRecords)
            .with_sink(MemorySink::default());
        let (report, error) =
            generator.compile_unit(Path::new("order.avsc"), Path::new("out"), &order_unit());
        assert!(error.unwrap().is_template_failure());
        assert_eq!(
            report.written,
            vec![PathBuf::from("out/com/clover/core/data/orders/Status.java")]
        );

        let units = vec![SourceUnit {
            path: PathBuf::from("order.avsc"),
            unit: order_unit(),
        }];
        let outcome = generator.compile_all(&units, Path::new("out")).remove(0);
        assert!(!outcome.is_ok());
        assert_eq!(outcome.report.written.len(), 1);
    }

    #[test]
    fn test_id_named_type_destination() {
        let unit = CompilationUnit::Schema(SchemaNode::Record(
            RecordSchema::new("Id", Some("orders.id"))
                .with_field(Field::new("id", SchemaNode::primitive(Primitive::String))),
        ));
        let generator = Generator::new(GenerationProfile::server_object()).with_sink(MemorySink::default());
        let report = generator
            .compile_to_destination(Path::new("id.avsc"), Path::new("out"), &unit)
            .unwrap();
        assert_eq!(
            report.written,
            vec![PathBuf::from("out/server/com/clover/core/data/orders/id/Id.java")]
        );
    }

    #[test]
    fn test_local_fs_incremental() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("status.avsc");
        fs::write(&src, "{}").unwrap();
        let out = dir.path().join("out");
        let unit = CompilationUnit::Schema(status());

        let generator = Generator::new(GenerationProfile::plain_object());
        let report = generator.compile_to_destination(&src, &out, &unit).unwrap();
        let artifact = out.join("com/clover/core/data/orders/Status.java");
        assert_eq!(report.written, vec![artifact.clone()]);
        let contents = fs::read_to_string(&artifact).unwrap();
        assert!(contents.contains("public enum Status {"));

        // Destination newer than source: skipped
        File::options().write(true).open(&src).unwrap().set_modified(t(1_000)).unwrap();
        File::options().write(true).open(&artifact).unwrap().set_modified(t(2_000)).unwrap();
        let report = generator.compile_to_destination(&src, &out, &unit).unwrap();
        assert_eq!(report.skipped, vec![artifact.clone()]);
        assert!(report.written.is_empty());

        // Source touched after the destination: regenerated
        File::options().write(true).open(&src).unwrap().set_modified(t(3_000)).unwrap();
        let report = generator.compile_to_destination(&src, &out, &unit).unwrap();
        assert_eq!(report.written, vec![artifact]);
    }

    #[test]
    fn test_missing_source_always_generates() {
        let sink = MemorySink::default();
        sink.touch("out/com/clover/core/data/orders/Status.java", t(10));
        let generator = Generator::new(GenerationProfile::plain_object()).with_sink(sink);
        let report = generator
            .compile_to_destination(Path::new("memory.avsc"), Path::new("out"), &CompilationUnit::Schema(status()))
            .unwrap();
        assert_eq!(report.written.len(), 1);
    }
}
