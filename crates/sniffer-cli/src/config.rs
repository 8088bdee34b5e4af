//! Configuration file support for sniffer
//!
//! Loads `.sniffer.toml` from current directory or parent directories.

use anyhow::{Context, Result};
use serde::Deserialize;
use sniffer_core::{Severity, SinkOptions};
use sniffer_engine::{EngineConfig, DEFAULT_MAX_PASSES};
use sniffer_rules::RulesConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".sniffer.toml";

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rules: RulesConfig,
    pub paths: PathsConfig,
    pub output: OutputConfig,
    pub engine: EngineSection,
    pub report: ReportConfig,
    /// Severity overrides keyed by rule code or full diagnostic code
    pub severity: BTreeMap<String, Severity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Glob patterns to exclude from processing
    pub exclude: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "text", "json" or "diff"
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Fix passes before giving up on convergence
    pub max_passes: Option<usize>,
    /// Comment prefixes recognised in suppression directives
    pub suppression_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Report warnings (default true)
    pub warnings: Option<bool>,
}

/// Engine settings given on the command line
#[derive(Debug, Default, Clone, Copy)]
pub struct EngineOverrides {
    pub fix: bool,
    pub max_passes: Option<usize>,
    pub no_warnings: bool,
}

impl Config {
    /// Load config from `.sniffer.toml` searching from current directory upward
    pub fn load() -> Result<Option<(Config, PathBuf)>> {
        Self::load_from(std::env::current_dir()?)
    }

    /// Load config searching from the given directory upward
    pub fn load_from(start_dir: PathBuf) -> Result<Option<(Config, PathBuf)>> {
        let mut current = Some(start_dir.as_path());

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                let config = Self::load_path(&config_path)?;
                return Ok(Some((config, config_path)));
            }
            current = dir.parent();
        }

        Ok(None)
    }

    /// Load config from a specific path
    pub fn load_path(path: &Path) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Rule selection with `--rule` flags applied
    pub fn effective_rules(&self, cli_rules: &[String]) -> RulesConfig {
        let mut rules = self.rules.clone();
        // CLI rules override the config's selection completely
        if !cli_rules.is_empty() {
            rules.enabled = Some(cli_rules.to_vec());
            rules.disabled.clear();
        }
        rules
    }

    /// Engine configuration from this file plus command-line flags
    pub fn engine_config(&self, cli: EngineOverrides) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            fix: cli.fix,
            max_passes: cli
                .max_passes
                .or(self.engine.max_passes)
                .unwrap_or(DEFAULT_MAX_PASSES),
            suppression_prefixes: self
                .engine
                .suppression_prefixes
                .clone()
                .unwrap_or(defaults.suppression_prefixes),
            sink: SinkOptions {
                report_warnings: !cli.no_warnings && self.report.warnings.unwrap_or(true),
                severity_overrides: self
                    .severity
                    .iter()
                    .map(|(code, severity)| (code.clone(), *severity))
                    .collect(),
            },
        }
    }

    /// Check if a path should be excluded based on config patterns
    pub fn should_exclude(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        for pattern in &self.paths.exclude {
            if let Ok(glob_pattern) = glob::Pattern::new(pattern) {
                if glob_pattern.matches(&path_str) {
                    return true;
                }
                if let Some(file_name) = path.file_name() {
                    if glob_pattern.matches(&file_name.to_string_lossy()) {
                        return true;
                    }
                }
            }

            // `vendor/` excludes that directory at any depth
            if pattern.ends_with('/') {
                let dir_pattern = pattern.trim_end_matches('/');
                if path_str.contains(&format!("/{}/", dir_pattern))
                    || path_str.starts_with(&format!("{}/", dir_pattern))
                    || path_str.ends_with(&format!("/{}", dir_pattern))
                    || path_str == dir_pattern
                {
                    return true;
                }
            }
        }

        false
    }
}
