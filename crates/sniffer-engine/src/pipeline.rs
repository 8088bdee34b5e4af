//! The per-file fix loop
//!
//! Each pass tokenizes the current text, reads suppression directives,
//! resets the rules and runs one dispatcher pass. In fix mode any staged
//! changesets are applied and, if the text changed, the pass's diagnostics
//! are discarded and a new pass starts over the rewritten text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use sniffer_core::{
    apply_changesets, Diagnostic, DiagnosticSink, EditError, Fixer, SinkOptions, Suppressions,
    TokenStream, Tokenizer, DEFAULT_PREFIXES,
};
use thiserror::Error;

use crate::dispatcher::Dispatcher;
use crate::timing::PassStats;

/// Code of the diagnostic raised when the fix loop hits its pass cap
pub const NOT_CONVERGED: &str = "Fixer.NotConverged";

/// Passes allowed before the fix loop gives up
pub const DEFAULT_MAX_PASSES: usize = 50;

/// Errors that end a run without a report
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to apply fixes: {0}")]
    Edit(#[from] EditError),

    #[error("Run cancelled after {passes} passes")]
    Cancelled { passes: usize },
}

/// How a file is processed
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Apply fixes (otherwise only report)
    pub fix: bool,
    pub max_passes: usize,
    /// Prefixes recognised in suppression comments
    pub suppression_prefixes: Vec<String>,
    pub sink: SinkOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fix: false,
            max_passes: DEFAULT_MAX_PASSES,
            suppression_prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            sink: SinkOptions::default(),
        }
    }
}

/// Outcome of processing one file
#[derive(Debug, Clone, Default)]
pub struct FileReport {
    /// Diagnostics of the final pass
    pub diagnostics: Vec<Diagnostic>,
    /// Rewritten text, when fixes changed the source
    pub fixed_source: Option<String>,
    pub passes: usize,
    /// False when the pass cap was reached with fixes still pending
    pub converged: bool,
    pub changesets_applied: usize,
    pub changesets_deferred: usize,
    pub stats: PassStats,
}

impl FileReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    pub fn fixable_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.fixable).count()
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Runs the rules of one dispatcher over files
pub struct Engine {
    tokenizer: Arc<dyn Tokenizer>,
    dispatcher: Dispatcher,
    config: EngineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Engine {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, dispatcher: Dispatcher, config: EngineConfig) -> Self {
        Self {
            tokenizer,
            dispatcher,
            config,
            cancel: None,
        }
    }

    /// Stop between passes once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Check (and in fix mode, fix) one source text
    pub fn run(&mut self, source: &str) -> Result<FileReport, EngineError> {
        let max_passes = self.config.max_passes.max(1);
        let mut text = source.to_string();
        let mut report = FileReport::default();

        loop {
            if self.is_cancelled() {
                return Err(EngineError::Cancelled {
                    passes: report.passes,
                });
            }
            report.passes += 1;

            let stream = TokenStream::tokenize(self.tokenizer.as_ref(), &text);
            if stream.is_live_coding() {
                debug!("Pass {}: unbalanced brackets, structure is partial", report.passes);
            }
            let suppressions = Suppressions::from_stream(&stream, &self.config.suppression_prefixes);

            self.dispatcher.reset();
            let mut sink = DiagnosticSink::new(&stream, suppressions, self.config.sink.clone());
            let mut fixer = Fixer::new(self.config.fix, stream.len());
            let stats = self.dispatcher.run_pass(&stream, &mut sink, &mut fixer);
            report.stats.merge(&stats);

            let changesets = fixer.into_changesets();
            report.diagnostics = sink.into_diagnostics();
            debug!(
                "Pass {}: {} tokens, {} firings, {} diagnostics, {} changesets staged",
                report.passes,
                stream.len(),
                stats.firings,
                report.diagnostics.len(),
                changesets.len()
            );

            if changesets.is_empty() {
                report.converged = true;
                break;
            }

            let outcome = apply_changesets(&stream, &changesets)?;
            if outcome.source == text {
                report.converged = true;
                break;
            }

            // At the cap the diagnostics must keep describing the returned text
            if report.passes >= max_passes {
                warn!("Fixes did not converge after {max_passes} passes");
                report.diagnostics.push(Diagnostic::engine(
                    0,
                    NOT_CONVERGED,
                    format!("Fixes did not converge after {max_passes} passes"),
                ));
                break;
            }

            report.changesets_applied += outcome.applied;
            report.changesets_deferred += outcome.deferred;
            text = outcome.source;
        }

        if text != source {
            report.fixed_source = Some(text);
        }
        Ok(report)
    }
}
