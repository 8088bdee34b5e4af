//! sniffer-core: Core abstractions for token-stream rule checking
//!
//! This crate provides:
//! - `TokenStream`: A lossless, structurally linked token sequence
//! - Cursor queries over the stream (`find`, `end_of_statement`, ...)
//! - `DiagnosticSink`: Where rules report findings, honoring suppressions
//! - `Fixer`: Where rules stage changesets for the fix loop
//! - `Rule`: The trait every rule implements

pub mod cursor;
pub mod diagnostic;
mod edit;
pub mod fixer;
pub mod rule;
pub mod suppression;
pub mod token;

pub use cursor::Direction;
pub use diagnostic::{
    Diagnostic, DiagnosticSink, Origin, Severity, SinkOptions, UnknownSeverity, ENGINE_RULE,
    FAULT_CODE,
};
pub use edit::{apply_changesets, ApplyOutcome, Change, ChangeOp, Changeset, EditError};
pub use fixer::Fixer;
pub use rule::{Rule, RuleError, RuleResult};
pub use suppression::{code_matches, SuppressionRange, SuppressionScope, Suppressions, DEFAULT_PREFIXES};
pub use token::{RawToken, Token, TokenKind, TokenStream, Tokenizer, UnknownTokenKind};
