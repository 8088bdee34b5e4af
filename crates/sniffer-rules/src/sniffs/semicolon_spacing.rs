//! Sniff: WhiteSpace.SemicolonSpacing
//!
//! No whitespace before a semicolon: `$a = 1 ;` becomes `$a = 1;`.
//! Semicolons inside `for (...)` headers are left alone.

use sniffer_core::{
    Direction, DiagnosticSink, Fixer, Rule, RuleResult, TokenKind, TokenStream,
};

pub struct SemicolonSpacingSniff;

impl SemicolonSpacingSniff {
    pub const CODE: &'static str = "WhiteSpace.SemicolonSpacing";
}

impl Rule for SemicolonSpacingSniff {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "Semicolons must not be preceded by whitespace"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::Semicolon]
    }

    fn process(
        &mut self,
        position: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        fixer: &mut Fixer,
    ) -> RuleResult {
        let Some(prev) = position.checked_sub(1) else {
            return Ok(None);
        };
        if !stream[prev].is(TokenKind::Whitespace) || stream.is_in_parentheses(position) {
            return Ok(None);
        }

        let Some(code) = stream.find_not_kind(&[TokenKind::Whitespace], prev, None, Direction::Backward)
        else {
            return Ok(None);
        };
        let before = &stream[code];
        if before.kind.is_comment()
            || before.is_any(&[
                TokenKind::OpenTag,
                TokenKind::Semicolon,
                TokenKind::OpenCurlyBracket,
                TokenKind::CloseCurlyBracket,
            ])
        {
            return Ok(None);
        }

        let expected = format!("{};", before.text);
        let found = stream.text_between(code, position);
        let message = format!(
            "Space found before semicolon; expected \"{}\" but found \"{}\"",
            expected.escape_debug(),
            found.escape_debug()
        );

        if sink.add_fixable_error(position, "Incorrect", message) && fixer.is_enabled() {
            fixer.begin_changeset();
            for whitespace in code + 1..position {
                fixer.delete(whitespace)?;
            }
            fixer.end_changeset();
        }
        Ok(None)
    }
}
