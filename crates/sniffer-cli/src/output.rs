//! Output formatting for sniffer
//!
//! Supports text (colored terminal), JSON and unified diff output formats.

use colored::*;
use serde::Serialize;
use sniffer_core::{Diagnostic, Severity};
use sniffer_engine::FileReport;
use std::path::Path;

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Diff,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<OutputFormat> {
        match s.to_lowercase().as_str() {
            "text" => Some(OutputFormat::Text),
            "json" => Some(OutputFormat::Json),
            "diff" => Some(OutputFormat::Diff),
            _ => None,
        }
    }
}

/// Result of processing a single file
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
    /// True when fixes were written (or, without --fix, would be)
    pub fixed: bool,
    pub passes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn checked(path: &Path, report: &FileReport) -> Self {
        Self {
            path: path.display().to_string(),
            diagnostics: report.diagnostics.clone(),
            fixed: report.fixed_source.is_some(),
            passes: report.passes,
            error: None,
        }
    }

    pub fn error(path: &Path, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            diagnostics: Vec::new(),
            fixed: false,
            passes: 0,
            error: Some(error),
        }
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub files_processed: usize,
    pub files_with_issues: usize,
    pub files_fixed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub fixable: usize,
    /// Files that could not be read or checked
    pub failures: usize,
}

impl Summary {
    /// Process exit code: 0 clean, 1 warnings only, 2 errors or failures
    pub fn exit_code(&self) -> u8 {
        if self.errors > 0 || self.failures > 0 {
            2
        } else if self.warnings > 0 {
            1
        } else {
            0
        }
    }
}

/// Full JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    pub version: String,
    pub summary: Summary,
    pub files: Vec<FileResult>,
}

/// Reporter for accumulating and outputting results
pub struct Reporter {
    format: OutputFormat,
    verbose: bool,
    fix_mode: bool,
    results: Vec<FileResult>,
    summary: Summary,
}

impl Reporter {
    pub fn new(format: OutputFormat, verbose: bool, fix_mode: bool) -> Self {
        Self {
            format,
            verbose,
            fix_mode,
            results: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Report the outcome of checking one file
    pub fn report_file(&mut self, path: &Path, report: &FileReport, old_source: &str) {
        self.summary.files_processed += 1;
        self.summary.errors += report.error_count();
        self.summary.warnings += report.warning_count();
        self.summary.fixable += report.fixable_count();
        if !report.diagnostics.is_empty() {
            self.summary.files_with_issues += 1;
        }
        if report.fixed_source.is_some() {
            self.summary.files_fixed += 1;
        }

        match self.format {
            OutputFormat::Text => self.print_text(path, report),
            OutputFormat::Diff => {
                if let Some(new_source) = &report.fixed_source {
                    print_unified_diff(path, old_source, new_source);
                }
            }
            OutputFormat::Json => {
                // JSON output is handled in finish()
            }
        }

        self.results.push(FileResult::checked(path, report));
    }

    fn print_text(&self, path: &Path, report: &FileReport) {
        if report.diagnostics.is_empty() && report.fixed_source.is_none() {
            if self.verbose {
                println!("{}: No issues found", path.display());
            }
            return;
        }

        println!("{}", path.display().to_string().bold());
        for diagnostic in &report.diagnostics {
            println!("  {}", format_diagnostic(diagnostic));
        }
        if self.fix_mode && report.fixed_source.is_some() {
            println!(
                "  {} Applied {} change(s) in {} pass(es)",
                "OK".green(),
                report.changesets_applied,
                report.passes
            );
        }
        println!();
    }

    /// Report an error processing a file
    pub fn report_error(&mut self, path: &Path, error: &str) {
        self.summary.files_processed += 1;
        self.summary.failures += 1;

        if self.format == OutputFormat::Text {
            eprintln!("{}: {} - {}", "Error".red(), path.display(), error);
        }

        self.results.push(FileResult::error(path, error.to_string()));
    }

    /// Print final summary/output
    pub fn finish(self) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Text => {
                println!("{}", "Summary".bold().underline());
                println!("  Files processed: {}", self.summary.files_processed);
                println!("  Files with issues: {}", self.summary.files_with_issues);
                println!("  Errors: {}", self.summary.errors);
                println!("  Warnings: {}", self.summary.warnings);
                if self.fix_mode {
                    println!("  Files fixed: {}", self.summary.files_fixed);
                }
                if self.summary.failures > 0 {
                    println!("  Failures: {}", self.summary.failures);
                }

                if !self.fix_mode && self.summary.fixable > 0 {
                    println!();
                    println!(
                        "{}",
                        format!(
                            "{} issue(s) can be fixed automatically, run with --fix",
                            self.summary.fixable
                        )
                        .yellow()
                    );
                }
            }
            OutputFormat::Json => {
                let output = JsonOutput {
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    summary: self.summary,
                    files: self.results,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
            OutputFormat::Diff => {
                // Patch-compatible output carries no summary
            }
        }
        Ok(())
    }

    /// Get summary for exit code determination
    pub fn summary(&self) -> &Summary {
        &self.summary
    }
}

/// One diagnostic as a line of text output
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let severity = match diagnostic.severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warning => "WARNING".yellow().bold(),
    };
    let fixable = if diagnostic.fixable { " [x]" } else { "" };
    format!(
        "{:>4}:{:<3} {} {}{} ({})",
        diagnostic.line,
        diagnostic.column,
        severity,
        diagnostic.message,
        fixable,
        diagnostic.full_code().dimmed()
    )
}

/// Print unified diff format (standard diff -u compatible)
fn print_unified_diff(path: &Path, old: &str, new: &str) {
    print!("{}", unified_diff(path, old, new));
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    use similar::{ChangeTag, TextDiff};

    let diff = TextDiff::from_lines(old, new);
    let path_str = path.display().to_string();
    let mut out = format!("--- a/{path_str}\n+++ b/{path_str}\n");

    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            };
            out.push_str(&format!("{}{}", sign, change));
            if change.missing_newline() {
                out.push('\n');
            }
        }
    }
    out
}
