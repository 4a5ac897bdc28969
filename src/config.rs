//! Configuration management for the object generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (objectgen.toml)
//! - Environment variables (OBJECTGEN__*)
//!
//! ## Example config file (objectgen.toml):
//! ```toml
//! [generator]
//! profile = "json-object"
//! base_package = "com.clover.sdk.v3"
//! output = "target/generated-sources"
//! string_type = "string"
//! copyright_notice = "/* Copyright (C) 2026 Clover Network, Inc. */"
//!
//! [naming]
//! uuid_override = true
//!
//! [logging]
//! filter = "avro_objectgen=info"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::codegen::{GenerationProfile, ProfileKind, StringKind};

/// Main configuration for the generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectgenConfig {
    /// Generation settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Naming overrides
    #[serde(default)]
    pub naming: NamingConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Profile used when the command line names none
    #[serde(default = "default_profile")]
    pub profile: ProfileKind,

    /// Base package for JSON-backed objects
    #[serde(default)]
    pub base_package: String,

    /// Template directory overriding the profile's default
    #[serde(default)]
    pub template_dir: Option<PathBuf>,

    /// Java representation of schema strings
    #[serde(default)]
    pub string_type: StringKind,

    /// Output root
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Notice placed above the generated-file header
    #[serde(default)]
    pub copyright_notice: Option<String>,

    /// Emit setters and builder methods
    #[serde(default = "default_true")]
    pub create_setters: bool,
}

/// Naming configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Force the `id` -> `uuid` override on or off; unset keeps the
    /// profile's own choice
    #[serde(default)]
    pub uuid_override: Option<bool>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_filter")]
    pub filter: String,
}

// Default value functions
fn default_profile() -> ProfileKind {
    ProfileKind::PlainObject
}

fn default_output() -> PathBuf {
    PathBuf::from("generated")
}

fn default_true() -> bool {
    true
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            base_package: String::new(),
            template_dir: None,
            string_type: StringKind::default(),
            output: default_output(),
            copyright_notice: None,
            create_setters: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl ObjectgenConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering a specific file over the defaults
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = [
            "objectgen.toml",
            ".objectgen.toml",
            "config/objectgen.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("com", "clover", "objectgen") {
            let xdg_config = config_dir.config_dir().join("objectgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // Load from environment variables (OBJECTGEN__GENERATOR__PROFILE, ...)
        builder = builder.add_source(
            Environment::with_prefix("OBJECTGEN")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Build the generation profile for `kind` (or the configured default)
    pub fn to_profile(&self, kind: Option<ProfileKind>) -> GenerationProfile {
        let generator = &self.generator;
        let kind = kind.unwrap_or(generator.profile);

        let mut profile = GenerationProfile::for_kind(kind, &generator.base_package)
            .with_string_kind(generator.string_type);
        if let Some(dir) = &generator.template_dir {
            profile = profile.with_template_dir(dir);
        }
        if let Some(notice) = &generator.copyright_notice {
            profile = profile.with_copyright_notice(notice);
        }
        if let Some(enabled) = self.naming.uuid_override {
            profile = profile.with_uuid_override(enabled);
        }
        profile.create_setters = generator.create_setters;
        profile
    }
}
