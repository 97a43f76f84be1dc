use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Main application configuration: strongly-typed global sections plus a
/// flexible per-plugin configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub app: AppSection,
    /// Logging configuration (defaults apply if absent).
    pub logging: Option<LoggingSection>,
    /// Per-plugin configuration bag: plugin name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub plugins: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppSection {
    /// Directory for logs and per-user state; empty means platform default.
    pub home_dir: String,
    /// Seconds granted to plugins with deferred async stops.
    #[serde(default = "default_stop_deadline_sec")]
    pub stop_deadline_sec: u64,
}

fn default_stop_deadline_sec() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Console level: "trace" | "debug" | "info" | "warn" | "error" | "off".
    pub console_level: String,
    /// Optional log file path, relative to home_dir.
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_level: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            console_level: "info".to_string(),
            file: None,
            file_level: None,
        }
    }
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            stop_deadline_sec: default_stop_deadline_sec(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: AppSection::default(),
            logging: Some(LoggingSection::default()),
            plugins: HashMap::new(),
        }
    }
}

/// CLI arguments that flow into the config merge.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub verbose: u8,
    pub print_config: bool,
}

impl AppConfig {
    /// Layered load: defaults → YAML file (if provided) → env
    /// (`WORKBENCH__*`). Missing file with an explicit path is an error;
    /// no path at all silently uses defaults + env.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!("config file not found: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }

        let mut config: AppConfig = figment
            .merge(Env::prefixed("WORKBENCH__").split("__"))
            .extract()
            .context("failed to load configuration")?;

        config.normalize_home_dir()?;
        Ok(config)
    }

    /// CLI flags beat file and environment.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if args.verbose > 0 {
            let level = match args.verbose {
                1 => "info",
                2 => "debug",
                _ => "trace",
            };
            self.logging.get_or_insert_with(Default::default).console_level = level.to_string();
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("failed to serialize configuration")
    }

    pub fn stop_deadline(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.app.stop_deadline_sec)
    }

    fn normalize_home_dir(&mut self) -> Result<()> {
        if self.app.home_dir.is_empty() {
            let base = dirs::home_dir().context("cannot resolve user home directory")?;
            self.app.home_dir = base.join(".workbench").to_string_lossy().into_owned();
        }
        std::fs::create_dir_all(&self.app.home_dir).with_context(|| {
            format!("cannot create home directory '{}'", self.app.home_dir)
        })?;
        Ok(())
    }
}
