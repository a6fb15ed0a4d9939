use crate::error::{KitError, Result};
use serde::Deserialize;
use stagehand_duplex::DuplexConfig;
use stagehand_events::ReporterKind;
use stagehand_harness::TeardownPolicy;
use std::path::Path;
use validator::Validate;

pub const CONFIG_FILE: &str = "stagehand.toml";
pub const ENV_PREFIX: &str = "STAGEHAND";

fn default_level() -> String {
    "debug".into()
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Validate)]
pub struct LoggingConfig {
    /// Install a test-writer subscriber when a kit is built.
    #[serde(default, alias = "CAPTURE")]
    pub capture: bool,

    #[serde(default = "default_level", alias = "LEVEL")]
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            capture: false,
            level: default_level(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq, Validate)]
pub struct KitConfig {
    #[serde(default, alias = "DUPLEX")]
    #[validate(nested)]
    pub duplex: DuplexConfig,

    #[serde(default, alias = "LOGGING")]
    #[validate(nested)]
    pub logging: LoggingConfig,

    #[serde(default, alias = "TEARDOWN")]
    pub teardown: TeardownPolicy,

    /// Where teardown failures go unless the builder supplies a reporter.
    #[serde(default, alias = "REPORTER")]
    pub reporter: ReporterKind,
}

impl KitConfig {
    /// Reads `stagehand.toml` from `dir` (the working directory when `None`)
    /// if present, then applies `STAGEHAND_*` environment overrides, e.g.
    /// `STAGEHAND_DUPLEX__BACKLOG=8`.
    pub fn load<P: AsRef<Path>>(dir: Option<P>) -> Result<Self> {
        Self::load_with_env(dir, None)
    }

    /// As [`KitConfig::load`], reading overrides from `env` instead of the
    /// process environment when given.
    pub fn load_with_env<P: AsRef<Path>>(
        dir: Option<P>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let path = match dir {
            Some(dir) => dir.as_ref().join(CONFIG_FILE),
            None => Path::new("./").join(CONFIG_FILE),
        };
        let file_name = path.display().to_string();

        let this: Self = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()
            .map_err(KitError::config(&file_name))?
            .try_deserialize()
            .map_err(KitError::config(&file_name))?;

        this.validate()?;

        tracing::debug!(path = %file_name, "loaded kit configuration");
        Ok(this)
    }
}
