use anyhow::Result;
use clap::ArgMatches;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const DEFAULT_CONFIG_FILE: &str = "./handover.toml";

/// Complete configuration that merges CLI args, env vars, config files, and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HandoverConfig {
    /// Where to read and write
    pub build: BuildConfig,
    /// Mode and page settings (from handover-core)
    #[serde(flatten)]
    pub site: handover_core::Config,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Directory of markdown sources
    pub source: String,
    /// Directory the pages are written to
    pub output: String,
    /// Page template every document is wrapped in
    pub template: String,
    /// Configuration file path
    pub config: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            source: "./src".to_string(),
            output: "./dist".to_string(),
            template: "./template.html".to_string(),
            config: DEFAULT_CONFIG_FILE.to_string(),
        }
    }
}

impl HandoverConfig {
    /// Load configuration with cascading precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables (HANDOVER_*, so HANDOVER_MODE selects the mode)
    /// 3. Configuration file
    /// 4. Defaults (lowest priority)
    pub fn load(args: &ArgMatches) -> Result<Self> {
        let config_file = args
            .try_get_one::<String>("config")
            .unwrap_or(None)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let mut builder = ConfigBuilder::builder();

        // 1. Start with defaults
        builder = builder.add_source(ConfigBuilder::try_from(&Self::default())?);

        // 2. Add configuration file if it exists
        if Path::new(&config_file).exists() {
            builder = builder.add_source(File::from(Path::new(&config_file)));
        }

        // 3. Add environment variables with HANDOVER_ prefix
        builder = builder.add_source(
            Environment::with_prefix("HANDOVER")
                .prefix_separator("_")
                .separator("__") // Use double underscore for nested keys
                .ignore_empty(true), // HANDOVER_MODE="" counts as unset
        );

        // 4. Override with CLI arguments that were actually given
        let mut cli_overrides = HashMap::new();
        for key in ["source", "output", "template"] {
            if let Some(value) = args.try_get_one::<String>(key).unwrap_or(None) {
                cli_overrides.insert(format!("build.{key}"), value.clone());
            }
        }
        cli_overrides.insert("build.config".to_string(), config_file);

        builder = builder.add_source(ConfigBuilder::try_from(&cli_overrides)?);

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Get the build configuration
    pub fn build_config(&self) -> &BuildConfig {
        &self.build
    }
}
