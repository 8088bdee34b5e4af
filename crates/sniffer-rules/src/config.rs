//! Rule configuration: the deserializable `[rules]` table and the compiled
//! options each sniff instance owns

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use sniffer_core::Severity;
use thiserror::Error;

use crate::pattern::Pattern;

/// Errors found while compiling rule configuration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Unknown placeholder '{{{placeholder}}}' in message of group '{group}'")]
    UnknownPlaceholder { group: String, placeholder: String },

    #[error("Rule group '{0}' has no matchers")]
    EmptyGroup(String),

    #[error("Invalid rule group name '{0}'")]
    InvalidGroupName(String),

    #[error("Invalid autofix function '{0}'")]
    InvalidAutofix(String),

    #[error("Unknown rule '{0}'")]
    UnknownRule(String),
}

/// The `[rules]` table of the configuration file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// If set, only these rules run
    pub enabled: Option<Vec<String>>,
    /// Rules to exclude (applied after `enabled`)
    pub disabled: Vec<String>,
    pub options: OptionsConfig,
}

/// `[rules.options]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub escape_output: EscapeOutputConfig,
    /// Replaces the built-in groups when present
    pub restricted_functions: Option<BTreeMap<String, RuleGroupConfig>>,
}

/// `[rules.options.escape_output]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EscapeOutputConfig {
    /// Replaces the built-in escaping functions when present
    pub escaping_functions: Option<Vec<String>>,
    /// Added to the escaping functions in effect
    pub extra_escaping_functions: Vec<String>,
    /// Function used to wrap unescaped output when fixing
    pub autofix: Option<String>,
}

/// A named group of matchers sharing a severity and message
#[derive(Debug, Clone, Deserialize)]
pub struct RuleGroupConfig {
    #[serde(default)]
    pub severity: Severity,
    #[serde(default = "default_group_message", alias = "message")]
    pub message_template: String,
    #[serde(alias = "functions")]
    pub matchers: Vec<String>,
}

fn default_group_message() -> String {
    "{name}() is restricted by the '{group}' group".to_string()
}

const DEFAULT_ESCAPING_FUNCTIONS: &[&str] = &[
    "esc_*",
    "wp_kses*",
    "htmlspecialchars",
    "htmlentities",
    "intval",
    "absint",
    "floatval",
    "boolval",
    "json_encode",
    "wp_json_encode",
    "number_format",
    "count",
];

fn default_restricted_groups() -> BTreeMap<String, RuleGroupConfig> {
    let group = |severity, message: &str, matchers: &[&str]| RuleGroupConfig {
        severity,
        message_template: message.to_string(),
        matchers: matchers.iter().map(|m| m.to_string()).collect(),
    };

    BTreeMap::from([
        (
            "eval".to_string(),
            group(
                Severity::Error,
                "{name}() is a security risk and is not allowed",
                &["eval"],
            ),
        ),
        (
            "create_function".to_string(),
            group(
                Severity::Error,
                "{name}() is deprecated, use a closure instead",
                &["create_function"],
            ),
        ),
        (
            "mysql".to_string(),
            group(
                Severity::Error,
                "{name}() was removed in PHP 7, use PDO or mysqli instead",
                &["mysql_*"],
            ),
        ),
        (
            "extract".to_string(),
            group(
                Severity::Warning,
                "{name}() hides where variables come from, assign them explicitly",
                &["extract"],
            ),
        ),
    ])
}

/// A message with `{name}` and `{group}` placeholders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate(String);

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([^{}]*)\}").unwrap())
}

impl MessageTemplate {
    pub fn parse(group: &str, template: &str) -> Result<Self, ConfigError> {
        for caps in placeholder_regex().captures_iter(template) {
            let placeholder = &caps[1];
            if placeholder != "name" && placeholder != "group" {
                return Err(ConfigError::UnknownPlaceholder {
                    group: group.to_string(),
                    placeholder: placeholder.to_string(),
                });
            }
        }
        Ok(Self(template.to_string()))
    }

    pub fn render(&self, name: &str, group: &str) -> String {
        placeholder_regex()
            .replace_all(&self.0, |caps: &regex::Captures| match &caps[1] {
                "name" => name.to_string(),
                _ => group.to_string(),
            })
            .into_owned()
    }
}

/// A compiled rule group
#[derive(Debug, Clone)]
pub struct RuleGroup {
    pub name: String,
    pub severity: Severity,
    pub template: MessageTemplate,
    pub matchers: Vec<Pattern>,
}

impl RuleGroup {
    pub fn compile(name: &str, config: &RuleGroupConfig) -> Result<Self, ConfigError> {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::InvalidGroupName(name.to_string()));
        }
        if config.matchers.is_empty() {
            return Err(ConfigError::EmptyGroup(name.to_string()));
        }
        let matchers = config
            .matchers
            .iter()
            .map(|m| m.parse())
            .collect::<Result<Vec<Pattern>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            severity: config.severity,
            template: MessageTemplate::parse(name, &config.message_template)?,
            matchers,
        })
    }

    pub fn matches(&self, function: &str) -> bool {
        self.matchers.iter().any(|m| m.matches(function))
    }

    pub fn message(&self, function: &str) -> String {
        self.template.render(function, &self.name)
    }
}

/// Options shared by the sniffs, compiled once per run
#[derive(Debug, Clone)]
pub struct RuleOptions {
    pub escaping_functions: Vec<Pattern>,
    pub escape_autofix: Option<String>,
    pub restricted_groups: Vec<RuleGroup>,
}

impl RuleOptions {
    pub fn from_config(config: &OptionsConfig) -> Result<Self, ConfigError> {
        let escape = &config.escape_output;
        let base: Vec<String> = match &escape.escaping_functions {
            Some(functions) => functions.clone(),
            None => DEFAULT_ESCAPING_FUNCTIONS.iter().map(|f| f.to_string()).collect(),
        };
        let escaping_functions = base
            .iter()
            .chain(&escape.extra_escaping_functions)
            .map(|f| f.parse())
            .collect::<Result<Vec<Pattern>, _>>()?;

        let escape_autofix = match &escape.autofix {
            Some(function) => match function.parse::<Pattern>() {
                Ok(Pattern::Exact(_)) => Some(function.trim().to_string()),
                _ => return Err(ConfigError::InvalidAutofix(function.clone())),
            },
            None => None,
        };

        let groups = match &config.restricted_functions {
            Some(groups) => groups.clone(),
            None => default_restricted_groups(),
        };
        let restricted_groups = groups
            .iter()
            .map(|(name, group)| RuleGroup::compile(name, group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            escaping_functions,
            escape_autofix,
            restricted_groups,
        })
    }

    /// Built-in options
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::from_config(&OptionsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_compile() {
        let options = RuleOptions::defaults().unwrap();
        assert!(options.escaping_functions.iter().any(|p| p.matches("esc_html")));
        assert!(options.escape_autofix.is_none());
        let names: Vec<_> = options.restricted_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["create_function", "eval", "extract", "mysql"]);
    }

    #[test]
    fn test_template_rendering() {
        let template = MessageTemplate::parse("mysql", "{name}() is banned ({group})").unwrap();
        assert_eq!(template.render("mysql_query", "mysql"), "mysql_query() is banned (mysql)");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        assert_eq!(
            MessageTemplate::parse("g", "{function} is banned"),
            Err(ConfigError::UnknownPlaceholder {
                group: "g".into(),
                placeholder: "function".into()
            })
        );
    }

    #[test]
    fn test_group_validation() {
        let empty = RuleGroupConfig {
            severity: Severity::Error,
            message_template: default_group_message(),
            matchers: vec![],
        };
        assert_eq!(
            RuleGroup::compile("g", &empty).unwrap_err(),
            ConfigError::EmptyGroup("g".into())
        );
        assert!(matches!(
            RuleGroup::compile("bad name", &empty),
            Err(ConfigError::InvalidGroupName(_))
        ));
    }

    #[test]
    fn test_custom_options() {
        let config = OptionsConfig {
            escape_output: EscapeOutputConfig {
                escaping_functions: Some(vec!["my_escape".into()]),
                extra_escaping_functions: vec!["*_safe".into()],
                autofix: Some("my_escape".into()),
            },
            restricted_functions: Some(BTreeMap::from([(
                "debug".to_string(),
                RuleGroupConfig {
                    severity: Severity::Warning,
                    message_template: default_group_message(),
                    matchers: vec!["var_dump".into(), "print_r".into()],
                },
            )])),
        };
        let options = RuleOptions::from_config(&config).unwrap();

        assert!(!options.escaping_functions.iter().any(|p| p.matches("esc_html")));
        assert!(options.escaping_functions.iter().any(|p| p.matches("render_safe")));
        assert_eq!(options.escape_autofix.as_deref(), Some("my_escape"));
        let group = &options.restricted_groups[0];
        assert!(group.matches("VAR_DUMP"));
        assert_eq!(group.message("var_dump"), "var_dump() is restricted by the 'debug' group");
    }

    #[test]
    fn test_autofix_must_be_a_plain_name() {
        let config = OptionsConfig {
            escape_output: EscapeOutputConfig {
                autofix: Some("esc_*".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            RuleOptions::from_config(&config).unwrap_err(),
            ConfigError::InvalidAutofix("esc_*".into())
        );
    }
}
