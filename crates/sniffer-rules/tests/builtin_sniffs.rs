//! The built-in sniffs run through the full engine with the PHP tokenizer

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use sniffer_core::{Severity, SinkOptions, TokenKind, TokenStream};
use sniffer_engine::{Dispatcher, Engine, EngineConfig, FileReport};
use sniffer_rules::{EscapeOutputConfig, OptionsConfig, RuleRegistry, RulesConfig};
use sniffer_tokenizer::PhpTokenizer;

fn engine_with(rules: &RulesConfig, config: EngineConfig) -> Engine {
    let rules = RuleRegistry::new().build(rules).unwrap();
    Engine::new(Arc::new(PhpTokenizer), Dispatcher::new(rules).unwrap(), config)
}

fn check(source: &str) -> FileReport {
    engine_with(&RulesConfig::default(), EngineConfig::default())
        .run(source)
        .unwrap()
}

fn only(code: &str) -> RulesConfig {
    RulesConfig {
        enabled: Some(vec![code.to_string()]),
        ..Default::default()
    }
}

fn autofixing() -> RulesConfig {
    RulesConfig {
        options: OptionsConfig {
            escape_output: EscapeOutputConfig {
                autofix: Some("esc_html".into()),
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

fn full_codes(report: &FileReport) -> Vec<String> {
    let mut codes: Vec<_> = report.diagnostics.iter().map(|d| d.full_code()).collect();
    codes.sort();
    codes
}

#[test]
fn test_every_sniff_reports() {
    let report = check("<?php\n/**\n * Template.\n */\n\nECHO $title ;\necho esc_html( $name );\neval( $code );\n");

    assert_eq!(
        full_codes(&report),
        vec![
            "Formatting.KeywordCase.Found",
            "PHP.RestrictedFunctions.eval",
            "Security.EscapeOutput.NoEscaping",
            "WhiteSpace.SemicolonSpacing.Incorrect",
        ]
    );
    assert_eq!(report.error_count(), 4);
    assert_eq!(report.fixed_source, None);
}

#[test]
fn test_unescaped_echo_scenario() {
    let source = "<?php echo $x;";
    let stream = TokenStream::tokenize(&PhpTokenizer, source);
    let report = engine_with(&only("Security.EscapeOutput"), EngineConfig::default())
        .run(source)
        .unwrap();

    assert_eq!(report.diagnostics.len(), 1);
    let diag = &report.diagnostics[0];
    assert!(stream[diag.position].is(TokenKind::Variable));
    assert_eq!(diag.code, "NoEscaping");
    assert_eq!(diag.severity, Severity::Error);
    assert!(!diag.fixable);
}

#[test]
fn test_suppressed_echo_scenario() {
    let source = "<?php /* sniffer:disable Security.EscapeOutput */ echo $x; /* sniffer:enable Security.EscapeOutput */";
    let report = engine_with(&only("Security.EscapeOutput"), EngineConfig::default())
        .run(source)
        .unwrap();
    assert!(report.diagnostics.is_empty());

    let trailing = "<?php echo $x; // phpcs:ignore Security.EscapeOutput.NoEscaping\necho $y;";
    let report = engine_with(&only("Security.EscapeOutput"), EngineConfig::default())
        .run(trailing)
        .unwrap();
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].line, 2);
}

#[test]
fn test_wrap_fix_scenario() {
    let source = "<?php echo $x;";
    let config = RulesConfig {
        enabled: Some(vec!["Security.EscapeOutput".into()]),
        ..autofixing()
    };
    let fixing = EngineConfig {
        fix: true,
        ..Default::default()
    };
    let report = engine_with(&config, fixing.clone()).run(source).unwrap();

    let fixed = report.fixed_source.unwrap();
    assert_eq!(fixed, "<?php echo esc_html($x);");
    let before = TokenStream::tokenize(&PhpTokenizer, source).len();
    let after = TokenStream::tokenize(&PhpTokenizer, &fixed).len();
    assert_eq!(after, before + 3);
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.passes, 2);

    let again = engine_with(&config, fixing).run(&fixed).unwrap();
    assert_eq!(again.fixed_source, None);
    assert!(again.diagnostics.is_empty());
}

#[test]
fn test_fixes_from_several_sniffs_in_one_pass() {
    let fixing = EngineConfig {
        fix: true,
        ..Default::default()
    };
    let report = engine_with(&autofixing(), fixing)
        .run("<?php\n/** Page header. */\nECHO $title ;\n")
        .unwrap();

    assert_eq!(
        report.fixed_source.as_deref(),
        Some("<?php\n/** Page header. */\necho esc_html($title);\n")
    );
    assert_eq!(report.changesets_applied, 3);
    assert!(report.converged);
    assert!(report.is_clean());
}

#[test]
fn test_unfixable_findings_survive_fixing() {
    let fixing = EngineConfig {
        fix: true,
        ..Default::default()
    };
    let report = engine_with(&RulesConfig::default(), fixing)
        .run("<?php\nEVAL($code) ;\n")
        .unwrap();

    assert_eq!(report.fixed_source.as_deref(), Some("<?php\neval($code);\n"));
    assert_eq!(
        full_codes(&report),
        vec!["Commenting.FileComment.Missing", "PHP.RestrictedFunctions.eval"]
    );
}

#[test]
fn test_short_echo_template() {
    let report = check("<ul>\n<li><?= $item ?></li>\n<li><?= esc_html($other) ?></li>\n</ul>\n");
    assert_eq!(full_codes(&report), vec!["Security.EscapeOutput.NoEscaping"]);
    assert_eq!(report.diagnostics[0].line, 2);
}

#[test]
fn test_severity_overrides_and_hidden_warnings() {
    let source = "<?php\n/** Import. */\nextract($data);\n";
    assert_eq!(check(source).warning_count(), 1);

    let escalated = EngineConfig {
        sink: SinkOptions {
            severity_overrides: HashMap::from([(
                "PHP.RestrictedFunctions.extract".to_string(),
                Severity::Error,
            )]),
            ..Default::default()
        },
        ..Default::default()
    };
    let report = engine_with(&RulesConfig::default(), escalated).run(source).unwrap();
    assert_eq!(report.error_count(), 1);

    let quiet = EngineConfig {
        sink: SinkOptions {
            report_warnings: false,
            ..Default::default()
        },
        ..Default::default()
    };
    let report = engine_with(&RulesConfig::default(), quiet).run(source).unwrap();
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_file_comment_checked_once_per_run() {
    let mut engine = engine_with(&only("Commenting.FileComment"), EngineConfig::default());
    for _ in 0..2 {
        let report = engine.run("<?php\n$a = 1;\n").unwrap();
        assert_eq!(full_codes(&report), vec!["Commenting.FileComment.Missing"]);
    }
}
