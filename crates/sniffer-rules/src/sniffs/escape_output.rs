//! Sniff: Security.EscapeOutput
//!
//! Everything written by `echo`, `print` or `<?=` must pass through an
//! escaping function. Variables, interpolated strings and calls to other
//! functions are reported; literals, constants and `(int)`-style casts are
//! safe.
//!
//! Example:
//! ```php
//! echo $title;            // reported
//! echo esc_html($title);  // ok
//! ```
//!
//! With `autofix` configured the offending expression is wrapped in that
//! function. A `print` nested in an `echo` is walked twice; each expression
//! is still reported once.

use sniffer_core::{
    DiagnosticSink, Fixer, Rule, RuleResult, Severity, TokenKind, TokenStream,
};

use crate::config::RuleOptions;
use crate::pattern::{first_match, Pattern};

pub struct EscapeOutputSniff {
    escaping_functions: Vec<Pattern>,
    autofix: Option<String>,
}

impl EscapeOutputSniff {
    pub const CODE: &'static str = "Security.EscapeOutput";

    pub fn new(options: &RuleOptions) -> Self {
        let mut escaping_functions = options.escaping_functions.clone();
        if let Some(function) = &options.escape_autofix {
            // The fix must produce output this sniff accepts
            if first_match(&escaping_functions, function).is_none() {
                escaping_functions.push(Pattern::Exact(function.to_ascii_lowercase()));
            }
        }
        Self {
            escaping_functions,
            autofix: options.escape_autofix.clone(),
        }
    }

    fn report(
        &self,
        start: usize,
        end: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        fixer: &mut Fixer,
    ) -> RuleResult {
        let found = stream.text_between(start, end);
        let message = format!(
            "All output should be run through an escaping function, found '{}'",
            found.trim()
        );
        let recorded = sink.add_unique(
            start,
            Severity::Error,
            "NoEscaping",
            message,
            self.autofix.is_some(),
        );

        if !recorded || !fixer.is_enabled() {
            return Ok(None);
        }
        if let Some(function) = &self.autofix {
            fixer.begin_changeset();
            fixer.insert_before(start, format!("{function}("))?;
            fixer.insert_after(end, ")")?;
            fixer.end_changeset();
        }
        Ok(None)
    }
}

/// Last token of the expression starting at `start`: trailing `[...]`,
/// `(...)` and `->member` / `::member` accesses are included
fn expression_end(stream: &TokenStream, start: usize) -> usize {
    let mut end = start;
    while let Some(next) = stream.next_non_empty(end) {
        match stream[next].kind {
            TokenKind::OpenSquareBracket | TokenKind::OpenParenthesis => {
                match stream.matching_bracket(next) {
                    Some(close) => end = close,
                    None => break,
                }
            }
            TokenKind::ObjectOperator
            | TokenKind::NullsafeObjectOperator
            | TokenKind::DoubleColon => match stream.next_non_empty(next) {
                Some(member)
                    if stream[member].is_any(&[TokenKind::Identifier, TokenKind::Variable])
                        || stream[member].kind.is_keyword() =>
                {
                    end = member
                }
                _ => break,
            },
            _ => break,
        }
    }
    end
}

/// The `?` ending a ternary condition that starts at `start`, if any.
///
/// The condition must reach the `?` without leaving its argument or
/// bracketed group; nested brackets are stepped over.
fn ternary_condition_end(stream: &TokenStream, start: usize, end: usize) -> Option<usize> {
    let mut i = start;
    while i < end {
        let kind = stream[i].kind;
        if kind.is_opener() {
            i = stream.matching_bracket(i)? + 1;
            continue;
        }
        if kind.is_closer() || kind == TokenKind::Comma || kind == TokenKind::Semicolon {
            return None;
        }
        if kind == TokenKind::InlineThen {
            return Some(i);
        }
        i += 1;
    }
    None
}

impl Rule for EscapeOutputSniff {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "Output from echo, print and <?= must be escaped"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::Echo, TokenKind::Print, TokenKind::OpenTagWithEcho]
    }

    fn process(
        &mut self,
        position: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        fixer: &mut Fixer,
    ) -> RuleResult {
        let Some(end) = stream.end_of_statement(position) else {
            return Ok(None);
        };

        let mut i = position + 1;
        let mut after_cast = false;
        // Start of an argument or bracketed group, where a ternary condition may begin
        let mut group_start = true;

        while i < end {
            let token = &stream[i];
            if token.is_empty() {
                i += 1;
                continue;
            }

            // Only the branches of a ternary are output, not its condition
            if std::mem::take(&mut group_start) {
                if let Some(inline_then) = ternary_condition_end(stream, i, end) {
                    i = inline_then + 1;
                    after_cast = false;
                    continue;
                }
            }

            match token.kind {
                TokenKind::IntCast
                | TokenKind::DoubleCast
                | TokenKind::BoolCast
                | TokenKind::UnsetCast => {
                    after_cast = true;
                    i += 1;
                    continue;
                }
                TokenKind::OpenParenthesis if after_cast => {
                    i = stream.skip_bracket(i).unwrap_or(end);
                }
                TokenKind::Variable => {
                    let expr_end = expression_end(stream, i);
                    if !after_cast {
                        self.report(i, expr_end, stream, sink, fixer)?;
                    }
                    i = expr_end + 1;
                }
                TokenKind::Identifier | TokenKind::NsSeparator
                    if stream.call_parenthesis(stream.name_end(i)).is_some() =>
                {
                    let name = stream.name_end(i);
                    let expr_end = expression_end(stream, name);
                    let escaped = first_match(&self.escaping_functions, &stream.qualified_name(name));
                    if escaped.is_none() && !after_cast {
                        self.report(i, expr_end, stream, sink, fixer)?;
                    }
                    i = expr_end + 1;
                }
                TokenKind::Identifier | TokenKind::NsSeparator
                    if stream
                        .next_non_empty(stream.name_end(i))
                        .is_some_and(|next| stream[next].is(TokenKind::DoubleColon)) =>
                {
                    // Static calls are output like any other call; class constants are safe
                    let expr_end = expression_end(stream, stream.name_end(i));
                    if stream[expr_end].is(TokenKind::CloseParenthesis) && !after_cast {
                        self.report(i, expr_end, stream, sink, fixer)?;
                    }
                    i = expr_end + 1;
                }
                TokenKind::Comma | TokenKind::OpenParenthesis | TokenKind::OpenSquareBracket => {
                    group_start = true;
                    i += 1;
                }
                TokenKind::DoubleQuotedString => {
                    if !after_cast {
                        self.report(i, i, stream, sink, fixer)?;
                    }
                    i += 1;
                }
                _ => i += 1,
            }
            after_cast = false;
        }

        // Other sniffs still visit the tokens of this statement
        Ok(None)
    }
}
