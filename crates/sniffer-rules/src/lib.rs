//! sniffer-rules: Built-in sniffs and their configuration
//!
//! Available sniffs:
//! - Security.EscapeOutput: echo/print/<?= output must be escaped
//! - PHP.RestrictedFunctions: configurable groups of forbidden functions
//! - WhiteSpace.SemicolonSpacing: no whitespace before `;`
//! - Commenting.FileComment: files start with a doc comment
//! - Formatting.KeywordCase: keywords are lowercase

pub mod config;
pub mod pattern;
pub mod registry;
pub mod sniffs;

pub use config::{
    ConfigError, EscapeOutputConfig, MessageTemplate, OptionsConfig, RuleGroup, RuleGroupConfig,
    RuleOptions, RulesConfig,
};
pub use pattern::Pattern;
pub use registry::{RuleFactory, RuleInfo, RuleRegistry};
