//! Sniff: Formatting.KeywordCase
//!
//! `IF ($a) { ECHO $b; }` becomes `if ($a) { echo $b; }`.

use sniffer_core::{DiagnosticSink, Fixer, Rule, RuleResult, TokenKind, TokenStream};

pub struct KeywordCaseSniff;

impl KeywordCaseSniff {
    pub const CODE: &'static str = "Formatting.KeywordCase";
}

impl Rule for KeywordCaseSniff {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "PHP keywords must be lowercase"
    }

    fn register(&self) -> Vec<TokenKind> {
        TokenKind::ALL
            .iter()
            .copied()
            .filter(|kind| kind.is_keyword())
            .collect()
    }

    fn process(
        &mut self,
        position: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        fixer: &mut Fixer,
    ) -> RuleResult {
        let found = &stream[position].text;
        let expected = found.to_ascii_lowercase();
        if *found == expected {
            return Ok(None);
        }

        let message =
            format!("PHP keywords must be lowercase; expected \"{expected}\" but found \"{found}\"");
        if sink.add_fixable_error(position, "Found", message) && fixer.is_enabled() {
            fixer.replace(position, expected)?;
        }
        Ok(None)
    }
}
