//! sniffer CLI - token-stream coding standard checker for PHP
//!
//! Available sniffs:
//! - Security.EscapeOutput: echo/print/<?= output must be escaped
//! - PHP.RestrictedFunctions: configurable groups of forbidden functions
//! - WhiteSpace.SemicolonSpacing: no whitespace before `;`
//! - Commenting.FileComment: files start with a doc comment
//! - Formatting.KeywordCase: keywords are lowercase

mod config;
mod output;
mod process;

use anyhow::Result;
use clap::Parser;
use colored::*;
use log::{debug, info};
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

use config::{Config, EngineOverrides};
use output::{OutputFormat, Reporter};
use process::{collect_files, process_file, write_file, ProcessResult, Settings};
use sniffer_engine::{is_firing_rule, PassStats};
use sniffer_rules::RuleRegistry;

#[derive(Parser)]
#[command(name = "sniffer")]
#[command(version)]
#[command(about = "A token-stream coding standard checker for PHP")]
struct Cli {
    /// Files or directories to check
    #[arg(required_unless_present = "list_rules")]
    paths: Vec<PathBuf>,

    /// Apply fixes to files
    #[arg(long)]
    fix: bool,

    /// Show verbose output and debug logging
    #[arg(long, short = 'v')]
    verbose: bool,

    /// Rules to run (can be specified multiple times). Overrides config file.
    #[arg(long, short = 'r', value_name = "RULE")]
    rule: Vec<String>,

    /// Output format: text, json, diff (default: config file, then text)
    #[arg(long, value_name = "FORMAT")]
    format: Option<String>,

    /// Path to config file (default: auto-detect .sniffer.toml)
    #[arg(long, value_name = "PATH", conflicts_with = "no_config")]
    config: Option<PathBuf>,

    /// Ignore config files
    #[arg(long)]
    no_config: bool,

    /// Fix passes before giving up on convergence
    #[arg(long, value_name = "N")]
    max_passes: Option<usize>,

    /// Report errors only
    #[arg(long)]
    no_warnings: bool,

    /// Print per-rule timings after the run
    #[arg(long)]
    timings: bool,

    /// List available rules and exit
    #[arg(long)]
    list_rules: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
    install_panic_hook();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red(), e);
            ExitCode::from(2)
        }
    }
}

/// Rule panics are already reported as fault diagnostics; keep them off stderr
fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if is_firing_rule() {
            debug!("Contained rule panic: {info}");
        } else {
            default_hook(info);
        }
    }));
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.list_rules {
        println!("{}", "Available rules:".bold());
        for info in RuleRegistry::new().list_rules() {
            let fixable = if info.fixable { " [fixable]" } else { "" };
            println!("  {} - {}{}", info.code.green(), info.description, fixable.dimmed());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let config = if cli.no_config {
        Config::default()
    } else if let Some(config_path) = &cli.config {
        info!("Using config {}", config_path.display());
        Config::load_path(config_path)?
    } else {
        match Config::load()? {
            Some((cfg, path)) => {
                info!("Using config {}", path.display());
                cfg
            }
            None => Config::default(),
        }
    };

    let format_name = cli
        .format
        .clone()
        .or_else(|| config.output.format.clone())
        .unwrap_or_else(|| "text".to_string());
    let output_format = OutputFormat::from_str(&format_name).ok_or_else(|| {
        anyhow::anyhow!(
            "Invalid output format '{}'. Valid options: text, json, diff",
            format_name
        )
    })?;

    // The diff format needs the fixed text even when nothing is written
    let engine = config.engine_config(EngineOverrides {
        fix: cli.fix || output_format == OutputFormat::Diff,
        max_passes: cli.max_passes,
        no_warnings: cli.no_warnings,
    });
    let settings = Settings::new(config.effective_rules(&cli.rule), engine)?;

    if cli.verbose && output_format == OutputFormat::Text {
        println!("{}: {}", "Mode".bold(), if cli.fix { "fix" } else { "check" });
        println!("{}: {}", "Rules".bold(), settings.selected_codes().join(", "));
        println!();
    }

    let (file_paths, missing_paths) = collect_files(&cli.paths, |p| config.should_exclude(p));
    debug!("Checking {} file(s)", file_paths.len());

    // Each worker builds its own engine and rule instances
    let results: Vec<Result<ProcessResult>> = file_paths
        .par_iter()
        .map(|path| process_file(path, &settings))
        .collect();

    let mut reporter = Reporter::new(output_format, cli.verbose, cli.fix);
    for path in &missing_paths {
        reporter.report_error(path, "Path does not exist");
    }

    let mut stats = PassStats::default();
    for (path, result) in file_paths.iter().zip(results) {
        match result {
            Ok(result) => {
                if cli.fix {
                    if let Some(new_source) = result.new_source() {
                        write_file(path, new_source)?;
                    }
                }
                stats.merge(&result.report.stats);
                reporter.report_file(path, &result.report, &result.old_source);
            }
            Err(e) => reporter.report_error(path, &format!("{:#}", e)),
        }
    }

    let exit_code = reporter.summary().exit_code();
    reporter.finish()?;

    if cli.timings {
        eprintln!();
        eprintln!("{}", stats.format_timings().trim_end());
    }

    Ok(ExitCode::from(exit_code))
}
