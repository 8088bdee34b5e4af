//! File processing logic for sniffer

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sniffer_core::Tokenizer;
use sniffer_engine::{Dispatcher, Engine, EngineConfig, FileReport};
use sniffer_rules::{RuleOptions, RuleRegistry, RulesConfig};
use sniffer_tokenizer::PhpTokenizer;

/// Extensions checked when walking directories
pub const PHP_EXTENSIONS: &[&str] = &["php", "inc"];

/// Everything a worker needs to check one file. Shared read-only across threads.
pub struct Settings {
    pub registry: RuleRegistry,
    pub rules: RulesConfig,
    pub options: RuleOptions,
    pub engine: EngineConfig,
    pub tokenizer: Arc<dyn Tokenizer>,
}

impl Settings {
    pub fn new(rules: RulesConfig, engine: EngineConfig) -> Result<Self> {
        let registry = RuleRegistry::new();
        let options = RuleOptions::from_config(&rules.options).context("Invalid rule options")?;
        // Surface unknown rule codes before any file is read
        let selected = registry.selected_codes(&rules)?;
        if selected.is_empty() {
            anyhow::bail!("No rules enabled");
        }

        Ok(Self {
            registry,
            rules,
            options,
            engine,
            tokenizer: Arc::new(PhpTokenizer),
        })
    }

    pub fn selected_codes(&self) -> Vec<&'static str> {
        self.registry.selected_codes(&self.rules).unwrap_or_default()
    }

    /// A fresh engine: rule instances are never shared between files
    pub fn engine(&self) -> Result<Engine> {
        let rules = self.registry.build_with(&self.rules, &self.options)?;
        let dispatcher = Dispatcher::new(rules)?;
        Ok(Engine::new(
            Arc::clone(&self.tokenizer),
            dispatcher,
            self.engine.clone(),
        ))
    }
}

/// Result of processing a single file
pub struct ProcessResult {
    /// Original source code
    pub old_source: String,
    pub report: FileReport,
}

impl ProcessResult {
    /// Source after fixes, when fixing changed anything
    pub fn new_source(&self) -> Option<&str> {
        self.report.fixed_source.as_deref()
    }
}

/// Check (and in fix mode, fix) a single PHP file
pub fn process_file(path: &Path, settings: &Settings) -> Result<ProcessResult> {
    let source_code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let mut engine = settings.engine()?;
    let report = engine
        .run(&source_code)
        .with_context(|| format!("Failed to check {}", path.display()))?;

    Ok(ProcessResult {
        old_source: source_code,
        report,
    })
}

/// Write the processed result to the file
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}

fn is_php_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PHP_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Expand the given paths into PHP files, honoring `exclude`.
///
/// Returns the files (sorted, deduplicated) and the paths that do not exist.
pub fn collect_files(
    paths: &[PathBuf],
    exclude: impl Fn(&Path) -> bool,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut file_paths: Vec<PathBuf> = Vec::new();
    let mut missing_paths: Vec<PathBuf> = Vec::new();

    for path in paths {
        if path.is_file() {
            // Explicitly named files are checked whatever their extension
            file_paths.push(path.clone());
        } else if path.is_dir() {
            for entry in walkdir::WalkDir::new(path)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !exclude(e.path()))
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_php_file(e.path()))
            {
                file_paths.push(entry.into_path());
            }
        } else {
            missing_paths.push(path.clone());
        }
    }

    file_paths.sort();
    file_paths.dedup();
    (file_paths, missing_paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn settings(fix: bool) -> Settings {
        let engine = EngineConfig {
            fix,
            ..Default::default()
        };
        Settings::new(RulesConfig::default(), engine).unwrap()
    }

    #[test]
    fn test_process_file_reports() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page.php");
        fs::write(&path, "<?php\n/** Page. */\necho $title;\n").unwrap();

        let result = process_file(&path, &settings(false)).unwrap();
        assert_eq!(result.report.error_count(), 1);
        assert_eq!(result.report.diagnostics[0].rule, "Security.EscapeOutput");
        assert!(result.new_source().is_none());
    }

    #[test]
    fn test_process_file_fixes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("page.php");
        fs::write(&path, "<?php\n/** Page. */\nECHO 'hi' ;\n").unwrap();

        let result = process_file(&path, &settings(true)).unwrap();
        assert_eq!(result.new_source(), Some("<?php\n/** Page. */\necho 'hi';\n"));
        assert!(result.report.is_clean());
        // Nothing is written until the caller asks
        assert_eq!(fs::read_to_string(&path).unwrap(), result.old_source);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = process_file(&temp.path().join("nope.php"), &settings(false));
        assert!(err.is_err());
    }

    #[test]
    fn test_unknown_rule_rejected_up_front() {
        let rules = RulesConfig {
            enabled: Some(vec!["Made.Up".into()]),
            ..Default::default()
        };
        assert!(Settings::new(rules, EngineConfig::default()).is_err());
    }

    #[test]
    fn test_collect_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("vendor/lib")).unwrap();
        fs::write(root.join("src/a.php"), "").unwrap();
        fs::write(root.join("src/b.inc"), "").unwrap();
        fs::write(root.join("src/c.txt"), "").unwrap();
        fs::write(root.join("vendor/lib/d.php"), "").unwrap();

        let (files, missing) = collect_files(
            &[root.to_path_buf(), root.join("gone")],
            |p| p.ends_with("vendor"),
        );

        assert_eq!(files, vec![root.join("src/a.php"), root.join("src/b.inc")]);
        assert_eq!(missing, vec![root.join("gone")]);
    }
}
