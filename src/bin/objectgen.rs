//! Object Generator CLI
//!
//! Compiles annotated Avro schemas (`.avsc`) or protocols (`.avpr`) into Java
//! sources with one of the generation profiles.

use std::path::PathBuf;

use anyhow::{bail, Context};
use avro_objectgen::codegen::StringKind;
use avro_objectgen::{
    discover_inputs, EmitReport, Generator, ObjectgenConfig, ProfileKind, SchemaLoader,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "objectgen")]
#[command(about = "Generate Java objects from annotated Avro schemas")]
struct Cli {
    /// Generation profile: plain-object, json-object, server-object, protocol-handler
    profile: String,

    /// Schema files or directories to compile
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output root (defaults to the configured output)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Schemas preloaded so inputs can reference their types
    #[arg(short, long = "import")]
    imports: Vec<PathBuf>,

    /// Base package for JSON-backed objects
    #[arg(long)]
    base_package: Option<String>,

    /// Java string representation: string, char_sequence, utf8
    #[arg(long)]
    string_type: Option<String>,

    /// Template directory overriding the profile's default
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Configuration file layered over the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dry run - report destinations without rendering or writing
    #[arg(long)]
    dry_run: bool,
}

fn main() {
    let cli = Cli::parse();

    let config = match ObjectgenConfig::load_from(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli, mut config: ObjectgenConfig) -> anyhow::Result<()> {
    let kind: ProfileKind = cli.profile.parse()?;

    if let Some(base_package) = cli.base_package {
        config.generator.base_package = base_package;
    }
    if let Some(string_type) = &cli.string_type {
        config.generator.string_type = string_type
            .parse::<StringKind>()
            .map_err(anyhow::Error::msg)?;
    }
    if let Some(dir) = cli.template_dir {
        config.generator.template_dir = Some(dir);
    }
    let output = cli.output.unwrap_or_else(|| config.generator.output.clone());
    let profile = config.to_profile(Some(kind));

    let mut loader = SchemaLoader::new();
    for import in &cli.imports {
        loader
            .add_import(import)
            .with_context(|| format!("loading import {}", import.display()))?;
    }

    let sources = discover_inputs(&cli.inputs, kind.source_extension())?;
    if sources.is_empty() {
        bail!("no .{} inputs found", kind.source_extension());
    }

    println!("🔧 {} -> {} ({} sources)", kind, output.display(), sources.len());

    let mut failures = 0;
    let mut units = Vec::with_capacity(sources.len());
    for path in &sources {
        match loader.load(path) {
            Ok(unit) => units.push(unit),
            Err(e) => {
                println!("  ❌ {} - {}", path.display(), e);
                failures += 1;
            }
        }
    }

    let generator = Generator::new(profile).dry_run(cli.dry_run);
    let mut total = EmitReport::default();
    for outcome in generator.compile_all(&units, &output) {
        if cli.dry_run {
            for destination in &outcome.report.written {
                println!("  📄 {}", destination.display());
            }
        }
        if let Some(e) = &outcome.error {
            println!("  ❌ {} - {}", outcome.path.display(), e);
            failures += 1;
        }
        total.merge(outcome.report);
    }

    println!();
    let verb = if cli.dry_run { "Would write" } else { "Wrote" };
    println!(
        "✅ {} {} files, {} up to date",
        verb,
        total.written.len(),
        total.skipped.len()
    );

    if failures > 0 {
        bail!("{} of {} sources failed", failures, sources.len());
    }
    Ok(())
}
