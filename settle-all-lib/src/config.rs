//! Configuration file parsing and management.
//!
//! This module handles loading benchmark configuration from TOML files and
//! `SA_*` environment variables, and merging configurations with proper
//! precedence rules.

use crate::error::SettleError;
use crate::types::ConcurrencyLimit;
use crate::utils::{has_placeholder, parse_timeout};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Where benchmark inputs come from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceConfig>,

    /// Benchmark run settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Default concurrency ("max" or a number)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<String>,

    /// Default per-request timeout (as string, e.g., "5s", "30s")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Dotted path of the JSON field to extract
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Input generation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SourceConfig {
    /// URL template with a `{n}` placeholder
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_template: Option<String>,

    /// Number of URLs to generate from the template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    /// File with one URL per line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Benchmark run configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BenchmarkConfig {
    /// Concurrency of each run, in order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runs: Option<Vec<String>>,

    /// Run workers as spawned tasks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// Emit JSON instead of text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Pretty-print JSON
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_pretty: Option<bool>,
}

impl FileConfig {
    /// Concurrency of every configured run, skipping entries that fail to parse.
    pub fn runs(&self) -> Option<Vec<ConcurrencyLimit>> {
        let runs = self.benchmark.as_ref()?.runs.as_ref()?;
        Some(runs.iter().filter_map(|r| r.parse().ok()).collect())
    }
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to report config discovery details
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The parsed configuration or an error if reading, parsing, or validation fails.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, SettleError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(SettleError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            SettleError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            SettleError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        // Validate the loaded configuration
        self.validate_config(&config)?;

        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is loaded first, then the home directory file, then the
    /// local file; later files override earlier ones field by field.
    pub fn discover_and_load(&self) -> Result<FileConfig, SettleError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring configuration file");
                }
            }
        }

        if self.verbose && loaded_files.len() > 1 {
            for (i, path) in loaded_files.iter().enumerate() {
                let status = if i == loaded_files.len() - 1 {
                    "highest precedence"
                } else {
                    "overridden where set later"
                };
                tracing::info!(path = %path.display(), status, "multiple config files found");
            }
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    ///
    /// Looks for configuration files in the current directory.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./settle-all.toml", "./.settle-all.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the global configuration file path.
    ///
    /// Looks for configuration files in the user's home directory.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        let candidates = [".settle-all.toml", "settle-all.toml"];

        candidates
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    ///
    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("settle-all").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations with proper precedence.
    ///
    /// Values from `higher` take precedence over values from `lower`.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.field.is_some() {
                        lower_defaults.field = higher_defaults.field;
                    }
                    Some(lower_defaults)
                }
                (lower_defaults, higher_defaults) => higher_defaults.or(lower_defaults),
            },
            source: match (lower.source, higher.source) {
                (Some(mut lower_source), Some(higher_source)) => {
                    if higher_source.url_template.is_some() {
                        lower_source.url_template = higher_source.url_template;
                    }
                    if higher_source.count.is_some() {
                        lower_source.count = higher_source.count;
                    }
                    if higher_source.file.is_some() {
                        lower_source.file = higher_source.file;
                    }
                    Some(lower_source)
                }
                (lower_source, higher_source) => higher_source.or(lower_source),
            },
            benchmark: match (lower.benchmark, higher.benchmark) {
                (Some(mut lower_bench), Some(higher_bench)) => {
                    if higher_bench.runs.is_some() {
                        lower_bench.runs = higher_bench.runs;
                    }
                    if higher_bench.parallel.is_some() {
                        lower_bench.parallel = higher_bench.parallel;
                    }
                    Some(lower_bench)
                }
                (lower_bench, higher_bench) => higher_bench.or(lower_bench),
            },
            output: higher.output.or(lower.output),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), SettleError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = &defaults.concurrency {
                concurrency
                    .parse::<ConcurrencyLimit>()
                    .map_err(SettleError::config)?;
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout(timeout_str).is_none() {
                    return Err(SettleError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }
        }

        if let Some(source) = &config.source {
            if source.count == Some(0) {
                return Err(SettleError::config("Source count must be at least 1"));
            }

            if let Some(template) = &source.url_template {
                if !has_placeholder(template) {
                    return Err(SettleError::config(format!(
                        "URL template '{}' must contain a '{{n}}' placeholder",
                        template
                    )));
                }
            }
        }

        if let Some(runs) = config.benchmark.as_ref().and_then(|b| b.runs.as_ref()) {
            if runs.is_empty() {
                return Err(SettleError::config("Benchmark runs cannot be empty"));
            }
            for run in runs {
                run.parse::<ConcurrencyLimit>().map_err(SettleError::config)?;
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via SA_* environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub concurrency: Option<ConcurrencyLimit>,
    pub runs: Option<Vec<ConcurrencyLimit>>,
    pub timeout: Option<String>,
    pub field: Option<String>,
    pub url_template: Option<String>,
    pub count: Option<usize>,
    pub parallel: Option<bool>,
    pub json: Option<bool>,
    pub file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from environment variables.
///
/// Parses all SA_* environment variables and returns a structured configuration.
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|key| env::var(key).ok())
}

/// Same as [`load_env_config`], reading variables through `lookup`.
pub fn load_env_config_from<L>(lookup: L) -> EnvConfig
where
    L: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // SA_CONCURRENCY - concurrency of a single run
    if let Some(val) = lookup("SA_CONCURRENCY") {
        match val.parse::<ConcurrencyLimit>() {
            Ok(limit) => {
                tracing::debug!(value = %limit, "using SA_CONCURRENCY");
                env_config.concurrency = Some(limit);
            }
            Err(e) => tracing::warn!(value = %val, error = %e, "ignoring invalid SA_CONCURRENCY"),
        }
    }

    // SA_RUNS - comma-separated concurrency per run
    if let Some(val) = lookup("SA_RUNS") {
        let parsed: Result<Vec<ConcurrencyLimit>, String> = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect();
        match parsed {
            Ok(runs) if !runs.is_empty() => {
                tracing::debug!(value = %val, "using SA_RUNS");
                env_config.runs = Some(runs);
            }
            _ => tracing::warn!(value = %val, "ignoring invalid SA_RUNS"),
        }
    }

    // SA_TIMEOUT - per-request timeout
    if let Some(val) = lookup("SA_TIMEOUT") {
        if parse_timeout(&val).is_some() {
            tracing::debug!(value = %val, "using SA_TIMEOUT");
            env_config.timeout = Some(val);
        } else {
            tracing::warn!(value = %val, "ignoring invalid SA_TIMEOUT, use format like '5s', '30s', '2m'");
        }
    }

    // SA_FIELD - JSON field path
    if let Some(val) = lookup("SA_FIELD") {
        env_config.field = Some(val.trim().to_string());
    }

    // SA_URL_TEMPLATE - URL template
    if let Some(val) = lookup("SA_URL_TEMPLATE") {
        if has_placeholder(&val) {
            env_config.url_template = Some(val);
        } else {
            tracing::warn!(value = %val, "ignoring SA_URL_TEMPLATE without placeholder");
        }
    }

    // SA_COUNT - number of generated URLs
    if let Some(val) = lookup("SA_COUNT") {
        match val.trim().parse::<usize>() {
            Ok(count) if count > 0 => env_config.count = Some(count),
            _ => tracing::warn!(value = %val, "ignoring invalid SA_COUNT, must be >= 1"),
        }
    }

    env_config.parallel = lookup("SA_PARALLEL").and_then(|v| parse_env_bool("SA_PARALLEL", &v));
    env_config.json = lookup("SA_JSON").and_then(|v| parse_env_bool("SA_JSON", &v));

    // SA_FILE - default input file
    env_config.file = lookup("SA_FILE").filter(|v| !v.trim().is_empty());

    // SA_CONFIG - default config file
    env_config.config = lookup("SA_CONFIG").filter(|v| !v.trim().is_empty());

    env_config
}

fn parse_env_bool(key: &str, val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %val, "ignoring invalid boolean, use true/false");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[defaults]
concurrency = "25"
timeout = "5s"
field = "title"

[source]
url_template = "https://example.com/todos/{n}"
count = 50

[benchmark]
runs = ["max", "10"]
parallel = true
"#,
        );

        let manager = ConfigManager::new(false);
        let config = manager.load_file(temp_file.path()).unwrap();

        let defaults = config.defaults.clone().unwrap();
        assert_eq!(defaults.concurrency.as_deref(), Some("25"));
        assert_eq!(defaults.field.as_deref(), Some("title"));

        let source = config.source.clone().unwrap();
        assert_eq!(source.count, Some(50));

        assert_eq!(
            config.runs(),
            Some(vec![
                ConcurrencyLimit::Unbounded,
                ConcurrencyLimit::Requested(10)
            ])
        );
        assert_eq!(config.benchmark.unwrap().parallel, Some(true));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let manager = ConfigManager::new(false);

        for content in [
            "[defaults]\nconcurrency = \"lots\"\n",
            "[defaults]\ntimeout = \"soon\"\n",
            "[source]\ncount = 0\n",
            "[source]\nurl_template = \"https://example.com/todos\"\n",
            "[benchmark]\nruns = []\n",
            "[benchmark]\nruns = [\"10\", \"fast\"]\n",
        ] {
            let temp_file = write_config(content);
            assert!(
                manager.load_file(temp_file.path()).is_err(),
                "expected error for {:?}",
                content
            );
        }
    }

    #[test]
    fn test_missing_file() {
        let manager = ConfigManager::new(false);
        let err = manager.load_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, SettleError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new(false);

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some("10".to_string()),
                field: Some("title".to_string()),
                ..Default::default()
            }),
            source: Some(SourceConfig {
                count: Some(200),
                ..Default::default()
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            defaults: Some(DefaultsConfig {
                concurrency: Some("max".to_string()),
                ..Default::default()
            }),
            benchmark: Some(BenchmarkConfig {
                parallel: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let defaults = merged.defaults.unwrap();

        assert_eq!(defaults.concurrency.as_deref(), Some("max")); // Higher wins
        assert_eq!(defaults.field.as_deref(), Some("title")); // Lower preserved
        assert_eq!(merged.source.unwrap().count, Some(200));
        assert_eq!(merged.benchmark.unwrap().parallel, Some(true));
    }

    #[test]
    fn test_env_config_parsing() {
        let vars: HashMap<&str, &str> = [
            ("SA_CONCURRENCY", "0"),
            ("SA_RUNS", "max, 4 ,1"),
            ("SA_TIMEOUT", "3s"),
            ("SA_COUNT", "12"),
            ("SA_PARALLEL", "yes"),
            ("SA_JSON", "maybe"),
            ("SA_URL_TEMPLATE", "https://example.com/static"),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(env_config.concurrency, Some(ConcurrencyLimit::Requested(0)));
        assert_eq!(
            env_config.runs,
            Some(vec![
                ConcurrencyLimit::Unbounded,
                ConcurrencyLimit::Requested(4),
                ConcurrencyLimit::Requested(1)
            ])
        );
        assert_eq!(env_config.timeout.as_deref(), Some("3s"));
        assert_eq!(env_config.count, Some(12));
        assert_eq!(env_config.parallel, Some(true));
        assert_eq!(env_config.json, None);
        assert_eq!(env_config.url_template, None);
    }

    #[test]
    fn test_env_config_empty() {
        assert_eq!(load_env_config_from(|_| None), EnvConfig::default());
    }
}
