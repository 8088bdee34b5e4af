//! Single-pass rule dispatch over a token stream
//!
//! The dispatcher walks the stream once. At each token it fires every rule
//! that registered for the token's kind, in registration order, then moves
//! the shared cursor past the furthest resume index any of them returned.

use std::any::Any;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Instant;

use log::{trace, warn};
use sniffer_core::{DiagnosticSink, Fixer, Rule, TokenKind, TokenStream};
use thiserror::Error;

use crate::timing::{PassStats, RuleTiming};

thread_local! {
    static FIRING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is inside a rule's `process` call.
///
/// Panic hooks use this to tell contained rule panics from real crashes.
pub fn is_firing_rule() -> bool {
    FIRING.with(Cell::get)
}

/// Errors raised while building a dispatcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Rule {0} does not register for any token kind")]
    NoTokens(String),

    #[error("Rule {0} is registered more than once")]
    Duplicate(String),
}

/// Routes tokens to the rules listening for them
pub struct Dispatcher {
    rules: Vec<Box<dyn Rule>>,
    codes: Vec<String>,
    listeners: HashMap<TokenKind, Vec<usize>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("rules", &self.codes)
            .finish()
    }
}

impl Dispatcher {
    /// Build a dispatcher from rules in the order they should fire
    pub fn new(rules: Vec<Box<dyn Rule>>) -> Result<Self, RegistrationError> {
        let mut codes: Vec<String> = Vec::with_capacity(rules.len());
        let mut listeners: HashMap<TokenKind, Vec<usize>> = HashMap::new();

        for (idx, rule) in rules.iter().enumerate() {
            let code = rule.code().to_string();
            if codes.contains(&code) {
                return Err(RegistrationError::Duplicate(code));
            }

            let mut kinds = rule.register();
            if kinds.is_empty() {
                return Err(RegistrationError::NoTokens(code));
            }
            kinds.sort();
            kinds.dedup();
            for kind in kinds {
                listeners.entry(kind).or_default().push(idx);
            }
            codes.push(code);
        }

        Ok(Self {
            rules,
            codes,
            listeners,
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Codes of the registered rules, in registration order
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Rules listening for `kind`
    pub fn listeners(&self, kind: TokenKind) -> impl Iterator<Item = &str> {
        self.listeners
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&idx| self.codes[idx].as_str())
    }

    /// Tell every rule a new pass is starting
    pub fn reset(&mut self) {
        for rule in &mut self.rules {
            rule.reset();
        }
    }

    /// Walk `stream` once, firing listeners at every token
    pub fn run_pass(
        &mut self,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        fixer: &mut Fixer,
    ) -> PassStats {
        let mut stats = PassStats::default();
        let mut i = 0;

        while i < stream.len() {
            stats.tokens_visited += 1;
            let mut next = i + 1;

            if let Some(listeners) = self.listeners.get(&stream[i].kind) {
                for &idx in listeners {
                    let code = self.codes[idx].as_str();
                    let rule = &mut self.rules[idx];

                    sink.set_active_rule(code);
                    fixer.set_active_rule(code);
                    let found_before = sink.len();
                    let mark = fixer.mark();

                    trace!("Firing {code} at token {i}");
                    let started = Instant::now();
                    FIRING.with(|firing| firing.set(true));
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| rule.process(i, stream, sink, fixer)));
                    FIRING.with(|firing| firing.set(false));
                    let elapsed = started.elapsed();

                    stats.firings += 1;
                    let timing = stats
                        .timings
                        .entry(code.to_string())
                        .or_insert_with(|| RuleTiming::new(code));
                    timing.total_time += elapsed;
                    timing.firings += 1;
                    timing.matches += sink.len().saturating_sub(found_before);

                    let fault = match outcome {
                        Ok(Ok(None)) => None,
                        Ok(Ok(Some(resume))) if resume > i => {
                            trace!("{code} resumes walk at {resume} (from {i})");
                            next = next.max(resume);
                            None
                        }
                        Ok(Ok(Some(resume))) => Some(format!(
                            "Rule returned resume index {resume}, which does not advance past token {i}"
                        )),
                        Ok(Err(err)) => {
                            fixer.rollback_to(mark);
                            Some(err.to_string())
                        }
                        Err(payload) => {
                            fixer.rollback_to(mark);
                            Some(format!("Rule panicked: {}", panic_message(payload.as_ref())))
                        }
                    };
                    fixer.commit_open();

                    if let Some(message) = fault {
                        warn!(
                            "{code} failed at token {i} (line {}): {message}",
                            stream[i].line
                        );
                        stats.faults += 1;
                        sink.add_fault(i, code, message);
                    }
                }
            }

            i = next;
        }

        stats
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
