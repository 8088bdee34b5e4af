//! The contract between the dispatcher and a rule

use thiserror::Error;

use crate::diagnostic::DiagnosticSink;
use crate::edit::EditError;
use crate::fixer::Fixer;
use crate::token::{TokenKind, TokenStream};

/// What a firing returns: an optional index to resume the walk at
pub type RuleResult = Result<Option<usize>, RuleError>;

/// A rule firing that could not complete
#[derive(Error, Debug)]
pub enum RuleError {
    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("Malformed input: {0}")]
    Malformed(String),
}

/// A check that listens for token kinds and reports diagnostics
///
/// The dispatcher calls `process` for every token whose kind is in
/// `register()`, passing the stream, the diagnostic sink and the fixer as
/// separate collaborators.
pub trait Rule: Send {
    /// Dotted rule code, e.g. "Security.EscapeOutput"
    fn code(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Token kinds this rule listens for; fixed for the run
    fn register(&self) -> Vec<TokenKind>;

    /// Called at the start of every pass
    fn reset(&mut self) {}

    /// Inspect the token at `position`.
    ///
    /// `Ok(Some(n))` asks the dispatcher to continue the walk at `n`;
    /// `Ok(None)` continues at the next token.
    fn process(
        &mut self,
        position: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        fixer: &mut Fixer,
    ) -> RuleResult;
}
