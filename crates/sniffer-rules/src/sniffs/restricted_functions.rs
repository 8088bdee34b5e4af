//! Sniff: PHP.RestrictedFunctions (Configurable)
//!
//! Reports calls to functions listed in rule groups. Each group carries its
//! own severity and message; the group name is the diagnostic code.
//!
//! Configuration:
//! ```toml
//! [rules.options.restricted_functions.debug]
//! severity = "warning"
//! message = "{name}() is debug code"
//! functions = ["var_dump", "print_r"]
//! ```

use sniffer_core::{DiagnosticSink, Fixer, Rule, RuleResult, TokenKind, TokenStream};

use crate::config::{RuleGroup, RuleOptions};

pub struct RestrictedFunctionsSniff {
    groups: Vec<RuleGroup>,
}

impl RestrictedFunctionsSniff {
    pub const CODE: &'static str = "PHP.RestrictedFunctions";

    pub fn new(options: &RuleOptions) -> Self {
        Self {
            groups: options.restricted_groups.clone(),
        }
    }
}

impl Rule for RestrictedFunctionsSniff {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "Disallow calls to restricted functions such as eval() and mysql_*()"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::Identifier, TokenKind::Eval]
    }

    fn process(
        &mut self,
        position: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        _fixer: &mut Fixer,
    ) -> RuleResult {
        if stream.call_parenthesis(position).is_none() {
            return Ok(None);
        }

        let name = stream.qualified_name(position);
        if let Some(group) = self.groups.iter().find(|g| g.matches(&name)) {
            let called = &stream[position].text;
            sink.add(position, group.severity, &group.name, group.message(called), false);
        }
        Ok(None)
    }
}
