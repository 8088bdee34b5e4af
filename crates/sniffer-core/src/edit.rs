//! Token-level changes and their application to a token stream

use std::collections::HashSet;

use log::debug;
use thiserror::Error;

use crate::token::TokenStream;

/// Errors that can occur while staging or applying changes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Token index {index} out of range for stream of {len} tokens")]
    TokenOutOfRange { index: usize, len: usize },
}

/// What a change does to its token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOp {
    /// Replace the token's text
    Replace(String),
    /// Insert text before the token
    InsertBefore(String),
    /// Insert text after the token
    InsertAfter(String),
    /// Remove the token's text
    Delete,
}

/// A single change to one token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub token: usize,
    pub op: ChangeOp,
}

impl Change {
    pub fn new(token: usize, op: ChangeOp) -> Self {
        Self { token, op }
    }
}

/// Changes that must be applied together or not at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    /// Code of the rule that staged this changeset
    pub rule: String,
    pub changes: Vec<Change>,
}

impl Changeset {
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            changes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Distinct token indices this changeset touches
    pub fn tokens(&self) -> HashSet<usize> {
        self.changes.iter().map(|c| c.token).collect()
    }
}

/// Result of applying one pass worth of changesets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The rewritten source text
    pub source: String,
    /// Changesets that were applied
    pub applied: usize,
    /// Changesets skipped because they conflicted with an earlier one
    pub deferred: usize,
}

#[derive(Debug, Default)]
struct Slot {
    before: Vec<String>,
    /// `None` keeps the original text, `Some(None)` deletes it
    content: Option<Option<String>>,
    after: Vec<String>,
}

/// Apply changesets to a stream and render the new source
///
/// Changesets are taken in order. One that touches a token already touched by
/// an accepted changeset is deferred whole; the rule will see the rewritten
/// source on the next pass and can stage it again.
///
/// # Returns
/// * `Ok(ApplyOutcome)` - The new source and how many changesets were applied
/// * `Err(EditError)` - If any change refers to a token outside the stream
pub fn apply_changesets(
    stream: &TokenStream,
    changesets: &[Changeset],
) -> Result<ApplyOutcome, EditError> {
    let len = stream.len();
    if let Some(change) = changesets
        .iter()
        .flat_map(|c| &c.changes)
        .find(|c| c.token >= len)
    {
        return Err(EditError::TokenOutOfRange {
            index: change.token,
            len,
        });
    }

    let mut slots: Vec<Slot> = (0..len).map(|_| Slot::default()).collect();
    let mut touched: HashSet<usize> = HashSet::new();
    let mut applied = 0;
    let mut deferred = 0;

    for changeset in changesets.iter().filter(|c| !c.is_empty()) {
        let tokens = changeset.tokens();
        if !touched.is_disjoint(&tokens) {
            debug!(
                "Deferring changeset from {} ({} changes): conflicts with an earlier changeset",
                changeset.rule,
                changeset.changes.len()
            );
            deferred += 1;
            continue;
        }

        for change in &changeset.changes {
            let slot = &mut slots[change.token];
            match &change.op {
                ChangeOp::Replace(text) => slot.content = Some(Some(text.clone())),
                ChangeOp::Delete => slot.content = Some(None),
                ChangeOp::InsertBefore(text) => slot.before.push(text.clone()),
                ChangeOp::InsertAfter(text) => slot.after.push(text.clone()),
            }
        }
        touched.extend(tokens);
        applied += 1;
    }

    let mut source = String::with_capacity(stream.iter().map(|t| t.text.len()).sum());
    for (token, slot) in stream.iter().zip(&slots) {
        for text in &slot.before {
            source.push_str(text);
        }
        match &slot.content {
            None => source.push_str(&token.text),
            Some(Some(text)) => source.push_str(text),
            Some(None) => {}
        }
        for text in &slot.after {
            source.push_str(text);
        }
    }

    Ok(ApplyOutcome {
        source,
        applied,
        deferred,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{RawToken, TokenKind};

    fn stream() -> TokenStream {
        TokenStream::new(vec![
            RawToken::new(TokenKind::Echo, "echo"),
            RawToken::new(TokenKind::Whitespace, " "),
            RawToken::new(TokenKind::Variable, "$x"),
            RawToken::new(TokenKind::Semicolon, ";"),
        ])
    }

    fn changeset(rule: &str, changes: Vec<(usize, ChangeOp)>) -> Changeset {
        Changeset {
            rule: rule.to_string(),
            changes: changes
                .into_iter()
                .map(|(token, op)| Change::new(token, op))
                .collect(),
        }
    }

    #[test]
    fn test_no_changesets_reproduces_source() {
        let s = stream();
        let outcome = apply_changesets(&s, &[]).unwrap();
        assert_eq!(outcome.source, "echo $x;");
        assert_eq!(outcome.applied, 0);
    }

    #[test]
    fn test_wrap_expression() {
        let s = stream();
        let wrap = changeset(
            "Security.EscapeOutput",
            vec![
                (2, ChangeOp::InsertBefore("esc_html(".into())),
                (2, ChangeOp::InsertAfter(")".into())),
            ],
        );

        let outcome = apply_changesets(&s, &[wrap]).unwrap();
        assert_eq!(outcome.source, "echo esc_html($x);");
        assert_eq!(outcome.applied, 1);
    }

    #[test]
    fn test_replace_and_delete() {
        let s = stream();
        let cs = changeset(
            "A",
            vec![(0, ChangeOp::Replace("print".into())), (1, ChangeOp::Delete)],
        );
        let outcome = apply_changesets(&s, &[cs]).unwrap();
        assert_eq!(outcome.source, "print$x;");
    }

    #[test]
    fn test_conflicting_changeset_is_deferred_whole() {
        let s = stream();
        let first = changeset("A", vec![(2, ChangeOp::Replace("$y".into()))]);
        let second = changeset(
            "B",
            vec![
                (0, ChangeOp::Replace("print".into())),
                (2, ChangeOp::Replace("$z".into())),
            ],
        );

        let outcome = apply_changesets(&s, &[first, second]).unwrap();
        assert_eq!(outcome.source, "echo $y;");
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.deferred, 1);
    }

    #[test]
    fn test_disjoint_changesets_compose() {
        let s = stream();
        let first = changeset("A", vec![(0, ChangeOp::Replace("print".into()))]);
        let second = changeset("B", vec![(3, ChangeOp::InsertAfter("\n".into()))]);

        let outcome = apply_changesets(&s, &[first, second]).unwrap();
        assert_eq!(outcome.source, "print $x;\n");
        assert_eq!(outcome.applied, 2);
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let s = stream();
        let bad = changeset("A", vec![(9, ChangeOp::Delete)]);
        assert_eq!(
            apply_changesets(&s, &[bad]),
            Err(EditError::TokenOutOfRange { index: 9, len: 4 })
        );
    }
}
