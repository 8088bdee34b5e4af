//! Staging area for the changes rules propose during a pass

use crate::edit::{Change, ChangeOp, Changeset, EditError};

/// Collects changesets for one pass; nothing is applied until the pass ends
///
/// In check mode (`enabled == false`) staging calls are validated but
/// recorded nowhere, so rules can share one code path for both modes.
#[derive(Debug, Default)]
pub struct Fixer {
    enabled: bool,
    token_count: usize,
    active_rule: String,
    open: Option<Changeset>,
    depth: usize,
    staged: Vec<Changeset>,
}

impl Fixer {
    pub fn new(enabled: bool, token_count: usize) -> Self {
        Self {
            enabled,
            token_count,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Name the rule that owns subsequently staged changes
    pub fn set_active_rule(&mut self, rule: &str) {
        if self.active_rule != rule {
            self.active_rule.clear();
            self.active_rule.push_str(rule);
        }
    }

    /// Open a changeset. A nested call joins the changeset already open.
    pub fn begin_changeset(&mut self) {
        self.depth += 1;
        if self.open.is_none() {
            self.open = Some(Changeset::new(self.active_rule.as_str()));
        }
    }

    /// Close the innermost changeset; the outermost close stages it
    pub fn end_changeset(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.commit_open();
        }
    }

    /// Drop the open changeset and everything staged into it
    pub fn rollback_changeset(&mut self) {
        self.open = None;
        self.depth = 0;
    }

    /// Position in the staged list, for `rollback_to`
    pub fn mark(&self) -> usize {
        self.staged.len()
    }

    /// Discard the open changeset and everything staged after `mark`
    pub fn rollback_to(&mut self, mark: usize) {
        self.rollback_changeset();
        self.staged.truncate(mark);
    }

    pub fn has_open_changeset(&self) -> bool {
        self.open.is_some()
    }

    /// Stage a changeset a rule left open at the end of its firing
    pub fn commit_open(&mut self) {
        self.depth = 0;
        if let Some(changeset) = self.open.take() {
            if !changeset.is_empty() {
                self.staged.push(changeset);
            }
        }
    }

    pub fn replace(&mut self, token: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.stage(token, ChangeOp::Replace(text.into()))
    }

    pub fn insert_before(&mut self, token: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.stage(token, ChangeOp::InsertBefore(text.into()))
    }

    pub fn insert_after(&mut self, token: usize, text: impl Into<String>) -> Result<(), EditError> {
        self.stage(token, ChangeOp::InsertAfter(text.into()))
    }

    pub fn delete(&mut self, token: usize) -> Result<(), EditError> {
        self.stage(token, ChangeOp::Delete)
    }

    fn stage(&mut self, token: usize, op: ChangeOp) -> Result<(), EditError> {
        if token >= self.token_count {
            return Err(EditError::TokenOutOfRange {
                index: token,
                len: self.token_count,
            });
        }
        if !self.enabled {
            return Ok(());
        }

        let change = Change::new(token, op);
        match self.open.as_mut() {
            Some(open) => open.changes.push(change),
            None => self.staged.push(Changeset {
                rule: self.active_rule.clone(),
                changes: vec![change],
            }),
        }
        Ok(())
    }

    /// Changesets staged so far, in staging order
    pub fn changesets(&self) -> &[Changeset] {
        &self.staged
    }

    pub fn into_changesets(mut self) -> Vec<Changeset> {
        self.commit_open();
        self.staged
    }
}
