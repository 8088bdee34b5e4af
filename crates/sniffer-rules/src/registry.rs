//! Registry of the built-in sniffs
//!
//! The registry holds factories, not rule instances: every file gets fresh
//! rules built from the compiled options, so no state leaks between files.

use std::collections::HashSet;

use log::debug;
use sniffer_core::Rule;

use crate::config::{ConfigError, RuleOptions, RulesConfig};
use crate::sniffs::{
    EscapeOutputSniff, FileCommentSniff, KeywordCaseSniff, RestrictedFunctionsSniff,
    SemicolonSpacingSniff,
};

/// Builds one rule instance from compiled options
pub type RuleFactory = fn(&RuleOptions) -> Box<dyn Rule>;

/// Static facts about a rule, for `--list-rules`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleInfo {
    pub code: &'static str,
    pub description: &'static str,
    /// True when the rule can stage fixes (possibly only with options set)
    pub fixable: bool,
}

struct Entry {
    info: RuleInfo,
    factory: RuleFactory,
}

/// Registry of all available sniffs
pub struct RuleRegistry {
    entries: Vec<Entry>,
}

impl RuleRegistry {
    /// Create a new registry with all built-in sniffs
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::new(),
        };

        registry.register(
            RuleInfo {
                code: EscapeOutputSniff::CODE,
                description: "Output from echo, print and <?= must be escaped",
                fixable: true,
            },
            |options| Box::new(EscapeOutputSniff::new(options)),
        );
        registry.register(
            RuleInfo {
                code: RestrictedFunctionsSniff::CODE,
                description: "Disallow calls to restricted functions such as eval() and mysql_*()",
                fixable: false,
            },
            |options| Box::new(RestrictedFunctionsSniff::new(options)),
        );
        registry.register(
            RuleInfo {
                code: SemicolonSpacingSniff::CODE,
                description: "Semicolons must not be preceded by whitespace",
                fixable: true,
            },
            |_| Box::new(SemicolonSpacingSniff),
        );
        registry.register(
            RuleInfo {
                code: FileCommentSniff::CODE,
                description: "Files must start with a doc comment",
                fixable: false,
            },
            |_| Box::new(FileCommentSniff::new()),
        );
        registry.register(
            RuleInfo {
                code: KeywordCaseSniff::CODE,
                description: "PHP keywords must be lowercase",
                fixable: true,
            },
            |_| Box::new(KeywordCaseSniff),
        );

        registry
    }

    /// Register a new rule factory
    pub fn register(&mut self, info: RuleInfo, factory: RuleFactory) {
        self.entries.push(Entry { info, factory });
    }

    /// Get all rule codes, in registration order
    pub fn codes(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.info.code).collect()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.iter().any(|e| e.info.code == code)
    }

    /// Get all rules with their descriptions (for --list-rules)
    pub fn list_rules(&self) -> Vec<RuleInfo> {
        self.entries.iter().map(|e| e.info).collect()
    }

    /// Codes selected by `config`: `enabled` (or every rule) minus `disabled`
    pub fn selected_codes(&self, config: &RulesConfig) -> Result<Vec<&'static str>, ConfigError> {
        let known = |code: &String| {
            if self.contains(code) {
                Ok(())
            } else {
                Err(ConfigError::UnknownRule(code.clone()))
            }
        };
        if let Some(enabled) = &config.enabled {
            enabled.iter().try_for_each(known)?;
        }
        config.disabled.iter().try_for_each(known)?;

        let enabled: Option<HashSet<&str>> = config
            .enabled
            .as_ref()
            .map(|codes| codes.iter().map(String::as_str).collect());
        let disabled: HashSet<&str> = config.disabled.iter().map(String::as_str).collect();

        Ok(self
            .entries
            .iter()
            .map(|e| e.info.code)
            .filter(|code| enabled.as_ref().map_or(true, |set| set.contains(code)))
            .filter(|code| !disabled.contains(code))
            .collect())
    }

    /// Build fresh instances of the selected rules
    pub fn build(&self, config: &RulesConfig) -> Result<Vec<Box<dyn Rule>>, ConfigError> {
        let options = RuleOptions::from_config(&config.options)?;
        self.build_with(config, &options)
    }

    /// Build fresh instances from already compiled options
    pub fn build_with(
        &self,
        config: &RulesConfig,
        options: &RuleOptions,
    ) -> Result<Vec<Box<dyn Rule>>, ConfigError> {
        let selected = self.selected_codes(config)?;
        debug!("Building {} of {} rules", selected.len(), self.entries.len());
        Ok(self
            .entries
            .iter()
            .filter(|e| selected.contains(&e.info.code))
            .map(|e| (e.factory)(options))
            .collect())
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_registered() {
        let registry = RuleRegistry::new();
        assert_eq!(
            registry.codes(),
            vec![
                "Security.EscapeOutput",
                "PHP.RestrictedFunctions",
                "WhiteSpace.SemicolonSpacing",
                "Commenting.FileComment",
                "Formatting.KeywordCase",
            ]
        );
    }

    #[test]
    fn test_info_matches_instances() {
        let registry = RuleRegistry::new();
        let rules = registry.build(&RulesConfig::default()).unwrap();
        for (info, rule) in registry.list_rules().iter().zip(&rules) {
            assert_eq!(info.code, rule.code());
            assert_eq!(info.description, rule.description());
        }
    }

    #[test]
    fn test_enabled_and_disabled() {
        let registry = RuleRegistry::new();
        let config = RulesConfig {
            enabled: Some(vec![
                "Formatting.KeywordCase".into(),
                "PHP.RestrictedFunctions".into(),
            ]),
            disabled: vec!["PHP.RestrictedFunctions".into()],
            ..Default::default()
        };
        let rules = registry.build(&config).unwrap();
        let codes: Vec<_> = rules.iter().map(|r| r.code()).collect();
        assert_eq!(codes, vec!["Formatting.KeywordCase"]);
    }

    #[test]
    fn test_unknown_rule_rejected() {
        let registry = RuleRegistry::new();
        let config = RulesConfig {
            disabled: vec!["Nope.Nothing".into()],
            ..Default::default()
        };
        assert_eq!(
            registry.build(&config).err(),
            Some(ConfigError::UnknownRule("Nope.Nothing".into()))
        );
    }
}
