//! Diagnostics and the per-pass diagnostic sink

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::suppression::Suppressions;
use crate::token::TokenStream;

/// Severity level for diagnostics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Potential issue
    Warning,
    /// Definite violation
    #[default]
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{0}' (expected 'error' or 'warning')")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// Who produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A finding reported by a rule
    #[default]
    Rule,
    /// A rule firing that failed or panicked
    RuleFault,
    /// The engine itself, e.g. a fix loop that did not converge
    Engine,
}

/// A single finding at a token position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Token index the finding is attached to
    pub position: usize,
    /// Line number (1-based, 0 when unknown)
    pub line: usize,
    /// Column number (1-based, 0 when unknown)
    pub column: usize,
    pub severity: Severity,
    /// Code of the rule that reported this (e.g. "Security.EscapeOutput")
    pub rule: String,
    /// Rule-local code (e.g. "NoEscaping")
    pub code: String,
    pub message: String,
    pub fixable: bool,
    #[serde(default)]
    pub origin: Origin,
}

/// Rule name used for diagnostics raised by the engine itself
pub const ENGINE_RULE: &str = "Internal";

/// Code of the diagnostic recorded when a rule firing fails
pub const FAULT_CODE: &str = "Internal.RuleFault";

impl Diagnostic {
    /// Engine-level diagnostic, not attached to any rule
    pub fn engine(position: usize, code: &str, message: impl Into<String>) -> Self {
        Self {
            position,
            line: 0,
            column: 0,
            severity: Severity::Error,
            rule: ENGINE_RULE.to_string(),
            code: code.to_string(),
            message: message.into(),
            fixable: false,
            origin: Origin::Engine,
        }
    }

    /// `rule.code`, the name suppression directives match against
    pub fn full_code(&self) -> String {
        format!("{}.{}", self.rule, self.code)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    /// Faults and engine diagnostics, as opposed to rule findings
    pub fn is_internal(&self) -> bool {
        self.origin != Origin::Rule
    }
}

/// Reporting options applied while diagnostics are added
#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// When false, warnings are dropped
    pub report_warnings: bool,
    /// Severity overrides keyed by rule code or full code
    pub severity_overrides: HashMap<String, Severity>,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            report_warnings: true,
            severity_overrides: HashMap::new(),
        }
    }
}

impl SinkOptions {
    fn severity_for(&self, rule: &str, full_code: &str) -> Option<Severity> {
        self.severity_overrides
            .get(full_code)
            .or_else(|| self.severity_overrides.get(rule))
            .copied()
    }
}

/// Collects the diagnostics of one pass over one file
///
/// The dispatcher names the active rule before each firing; every diagnostic
/// added during that firing is tagged with it.
#[derive(Debug)]
pub struct DiagnosticSink<'s> {
    stream: &'s TokenStream,
    suppressions: Suppressions,
    options: SinkOptions,
    active_rule: String,
    diagnostics: Vec<Diagnostic>,
    suppressed: usize,
}

impl<'s> DiagnosticSink<'s> {
    pub fn new(stream: &'s TokenStream, suppressions: Suppressions, options: SinkOptions) -> Self {
        Self {
            stream,
            suppressions,
            options,
            active_rule: String::new(),
            diagnostics: Vec::new(),
            suppressed: 0,
        }
    }

    /// Sink without suppressions and with default options
    pub fn for_stream(stream: &'s TokenStream) -> Self {
        Self::new(stream, Suppressions::default(), SinkOptions::default())
    }

    pub fn set_active_rule(&mut self, rule: &str) {
        if self.active_rule != rule {
            self.active_rule.clear();
            self.active_rule.push_str(rule);
        }
    }

    pub fn active_rule(&self) -> &str {
        &self.active_rule
    }

    /// Record a finding for the active rule.
    ///
    /// Returns false when nothing was recorded: the position is suppressed by
    /// an inline directive, or the finding is a warning and warnings are not
    /// reported. Rules use the return value to skip fixer work.
    pub fn add(
        &mut self,
        position: usize,
        severity: Severity,
        code: &str,
        message: impl Into<String>,
        fixable: bool,
    ) -> bool {
        let full_code = format!("{}.{}", self.active_rule, code);
        if self.suppressions.is_suppressed(position, &full_code) {
            self.suppressed += 1;
            return false;
        }

        let severity = self
            .options
            .severity_for(&self.active_rule, &full_code)
            .unwrap_or(severity);
        if severity == Severity::Warning && !self.options.report_warnings {
            return false;
        }

        let (line, column) = self.location(position);
        self.diagnostics.push(Diagnostic {
            position,
            line,
            column,
            severity,
            rule: self.active_rule.clone(),
            code: code.to_string(),
            message: message.into(),
            fixable,
            origin: Origin::Rule,
        });
        true
    }

    pub fn add_error(&mut self, position: usize, code: &str, message: impl Into<String>) -> bool {
        self.add(position, Severity::Error, code, message, false)
    }

    pub fn add_warning(&mut self, position: usize, code: &str, message: impl Into<String>) -> bool {
        self.add(position, Severity::Warning, code, message, false)
    }

    pub fn add_fixable_error(
        &mut self,
        position: usize,
        code: &str,
        message: impl Into<String>,
    ) -> bool {
        self.add(position, Severity::Error, code, message, true)
    }

    pub fn add_fixable_warning(
        &mut self,
        position: usize,
        code: &str,
        message: impl Into<String>,
    ) -> bool {
        self.add(position, Severity::Warning, code, message, true)
    }

    /// Like `add`, but refuses a second finding with the same code at the same position
    pub fn add_unique(
        &mut self,
        position: usize,
        severity: Severity,
        code: &str,
        message: impl Into<String>,
        fixable: bool,
    ) -> bool {
        if self.contains(position, code) {
            return false;
        }
        self.add(position, severity, code, message, fixable)
    }

    /// Whether the active rule already reported `code` at `position`
    pub fn contains(&self, position: usize, code: &str) -> bool {
        self.diagnostics.iter().any(|d| {
            d.position == position && d.code == code && d.rule == self.active_rule
        })
    }

    /// Record that a rule firing failed. Faults are never suppressed.
    pub fn add_fault(&mut self, position: usize, rule: &str, message: impl Into<String>) {
        let (line, column) = self.location(position);
        self.diagnostics.push(Diagnostic {
            position,
            line,
            column,
            severity: Severity::Error,
            rule: rule.to_string(),
            code: FAULT_CODE.to_string(),
            message: message.into(),
            fixable: false,
            origin: Origin::RuleFault,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of findings dropped by inline directives
    pub fn suppressed_count(&self) -> usize {
        self.suppressed
    }

    fn location(&self, position: usize) -> (usize, usize) {
        self.stream
            .get(position)
            .map_or((0, 0), |t| (t.line, t.column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suppression::{SuppressionRange, SuppressionScope};
    use crate::token::{RawToken, TokenKind};

    fn stream() -> TokenStream {
        TokenStream::new(vec![
            RawToken::new(TokenKind::Echo, "echo"),
            RawToken::new(TokenKind::Whitespace, " "),
            RawToken::new(TokenKind::Variable, "$x"),
            RawToken::new(TokenKind::Semicolon, ";"),
        ])
    }

    #[test]
    fn test_severity_ordering_and_parsing() {
        assert!(Severity::Error > Severity::Warning);
        assert_eq!("warn".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("ERROR".parse::<Severity>(), Ok(Severity::Error));
        assert!("info".parse::<Severity>().is_err());
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_add_records_location_and_rule() {
        let stream = stream();
        let mut sink = DiagnosticSink::for_stream(&stream);
        sink.set_active_rule("Security.EscapeOutput");

        assert!(sink.add_error(2, "NoEscaping", "All output should be escaped"));

        let diag = &sink.diagnostics()[0];
        assert_eq!(diag.position, 2);
        assert_eq!((diag.line, diag.column), (1, 6));
        assert_eq!(diag.full_code(), "Security.EscapeOutput.NoEscaping");
        assert!(!diag.fixable);
        assert_eq!(diag.origin, Origin::Rule);
    }

    #[test]
    fn test_duplicates_allowed_unless_unique() {
        let stream = stream();
        let mut sink = DiagnosticSink::for_stream(&stream);
        sink.set_active_rule("A");

        assert!(sink.add_warning(2, "Found", "first"));
        assert!(sink.add_warning(2, "Found", "second"));
        assert!(!sink.add_unique(2, Severity::Warning, "Found", "third", false));
        assert!(sink.add_unique(3, Severity::Warning, "Found", "fourth", false));
        assert_eq!(sink.len(), 3);
    }

    #[test]
    fn test_suppressed_add_returns_false() {
        let stream = stream();
        let mut suppressions = Suppressions::default();
        suppressions.push(SuppressionRange::new(0, 3, SuppressionScope::All));
        let mut sink = DiagnosticSink::new(&stream, suppressions, SinkOptions::default());
        sink.set_active_rule("A");

        assert!(!sink.add_error(2, "Found", "hidden"));
        assert!(sink.is_empty());
        assert_eq!(sink.suppressed_count(), 1);
    }

    #[test]
    fn test_faults_bypass_suppression() {
        let stream = stream();
        let mut suppressions = Suppressions::default();
        suppressions.push(SuppressionRange::new(0, 3, SuppressionScope::All));
        let mut sink = DiagnosticSink::new(&stream, suppressions, SinkOptions::default());

        sink.add_fault(2, "A", "rule panicked");
        assert_eq!(sink.len(), 1);
        assert!(sink.diagnostics()[0].is_internal());
        assert_eq!(sink.diagnostics()[0].code, FAULT_CODE);
        assert_eq!(sink.diagnostics()[0].rule, "A");
    }

    #[test]
    fn test_options_override_severity_and_hide_warnings() {
        let stream = stream();
        let mut options = SinkOptions {
            report_warnings: false,
            ..SinkOptions::default()
        };
        options
            .severity_overrides
            .insert("A.Promoted".to_string(), Severity::Error);
        let mut sink = DiagnosticSink::new(&stream, Suppressions::default(), options);
        sink.set_active_rule("A");

        assert!(!sink.add_warning(0, "Hidden", "dropped"));
        assert!(sink.add_warning(0, "Promoted", "kept as error"));
        assert_eq!(sink.diagnostics()[0].severity, Severity::Error);
    }
}
