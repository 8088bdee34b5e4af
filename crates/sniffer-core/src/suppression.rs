//! Inline suppression directives
//!
//! Directives live in comment tokens and start with a configurable prefix:
//! - `// sniffer:disable` ... `// sniffer:enable` - suppress everything in between
//! - `// sniffer:disable Security.EscapeOutput` - suppress only matching codes
//! - `// sniffer:ignore` - suppress the next line (or this line, when trailing code)
//! - `// sniffer:ignoreFile` - suppress the whole file
//!
//! Everything after ` -- ` is a free-form note and is ignored.

use std::collections::BTreeSet;

use crate::token::TokenStream;

/// Prefixes recognised when no others are configured
pub const DEFAULT_PREFIXES: &[&str] = &["sniffer", "phpcs"];

/// Which codes a range applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressionScope {
    All,
    Codes(BTreeSet<String>),
}

/// A suppressed span of token positions (inclusive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionRange {
    pub start: usize,
    pub end: usize,
    pub scope: SuppressionScope,
    /// Codes re-enabled inside the span
    pub exempt: BTreeSet<String>,
}

impl SuppressionRange {
    pub fn new(start: usize, end: usize, scope: SuppressionScope) -> Self {
        Self {
            start,
            end,
            scope,
            exempt: BTreeSet::new(),
        }
    }

    pub fn covers(&self, position: usize, full_code: &str) -> bool {
        position >= self.start
            && position <= self.end
            && self.scope_matches(full_code)
            && !self.exempt.iter().any(|e| code_matches(e, full_code))
    }

    fn scope_matches(&self, full_code: &str) -> bool {
        match &self.scope {
            SuppressionScope::All => true,
            SuppressionScope::Codes(codes) => codes.iter().any(|c| code_matches(c, full_code)),
        }
    }
}

/// Whether `pattern` names `code` or one of its dotted ancestors
pub fn code_matches(pattern: &str, code: &str) -> bool {
    match code.strip_prefix(pattern) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// All suppression ranges of one token stream
#[derive(Debug, Clone, Default)]
pub struct Suppressions {
    ranges: Vec<SuppressionRange>,
}

impl Suppressions {
    /// Read directives from the comments of `stream`
    pub fn from_stream<S: AsRef<str>>(stream: &TokenStream, prefixes: &[S]) -> Self {
        let mut builder = Builder::default();

        for token in stream.iter().filter(|t| t.kind.is_comment()) {
            let Some(directive) = parse_directive(&token.text, prefixes) else {
                continue;
            };
            let pos = token.position;
            match directive {
                Directive::Disable(codes) if codes.is_empty() => builder.disable_all(pos),
                Directive::Disable(codes) => builder.disable_codes(pos, codes),
                Directive::Enable(codes) if codes.is_empty() => builder.enable_all(pos),
                Directive::Enable(codes) => builder.enable_codes(pos, codes),
                Directive::Ignore(codes) => {
                    if let Some((start, end)) = ignore_target(stream, pos) {
                        builder.closed.push(SuppressionRange::new(start, end, scope_of(codes)));
                    }
                }
                Directive::IgnoreFile => {
                    builder.closed.push(SuppressionRange::new(
                        0,
                        stream.len().saturating_sub(1),
                        SuppressionScope::All,
                    ));
                }
            }
        }

        // Unterminated disables run to end of file
        let last = stream.len().saturating_sub(1);
        let Builder { mut closed, open } = builder;
        closed.extend(open.into_iter().map(|o| o.close(last)));

        Self { ranges: closed }
    }

    pub fn push(&mut self, range: SuppressionRange) {
        self.ranges.push(range);
    }

    pub fn ranges(&self) -> &[SuppressionRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_suppressed(&self, position: usize, full_code: &str) -> bool {
        self.ranges.iter().any(|r| r.covers(position, full_code))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive {
    Disable(Vec<String>),
    Enable(Vec<String>),
    Ignore(Vec<String>),
    IgnoreFile,
}

fn scope_of(codes: Vec<String>) -> SuppressionScope {
    if codes.is_empty() {
        SuppressionScope::All
    } else {
        SuppressionScope::Codes(codes.into_iter().collect())
    }
}

fn comment_body(text: &str) -> &str {
    let t = text.trim();
    let t = t
        .strip_prefix("/*")
        .or_else(|| t.strip_prefix("//"))
        .or_else(|| t.strip_prefix('#'))
        .unwrap_or(t);
    let t = t.strip_suffix("*/").unwrap_or(t);
    t.trim_start_matches(|c: char| c == '*' || c.is_whitespace())
        .trim_end()
}

fn parse_directive<S: AsRef<str>>(text: &str, prefixes: &[S]) -> Option<Directive> {
    let body = comment_body(text);

    let rest = prefixes.iter().find_map(|prefix| {
        let prefix = prefix.as_ref();
        let head = body.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        body[prefix.len()..].strip_prefix(':')
    })?;

    let rest = rest.split(" -- ").next().unwrap_or_default();
    let (command, args) = match rest.find(char::is_whitespace) {
        Some(split) => (&rest[..split], &rest[split..]),
        None => (rest, ""),
    };
    let codes: Vec<String> = args
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    match command.to_ascii_lowercase().as_str() {
        "disable" => Some(Directive::Disable(codes)),
        "enable" => Some(Directive::Enable(codes)),
        "ignore" => Some(Directive::Ignore(codes)),
        "ignorefile" => Some(Directive::IgnoreFile),
        _ => None,
    }
}

/// Tokens an `ignore` comment at `pos` applies to
fn ignore_target(stream: &TokenStream, pos: usize) -> Option<(usize, usize)> {
    let (line_start, _) = stream.line_range(pos)?;
    let own_line = (line_start..pos).all(|i| stream.tokens()[i].is_empty());

    if own_line {
        let next = stream.next_non_empty(pos)?;
        stream.line_range(next)
    } else {
        stream.line_range(pos)
    }
}

#[derive(Debug)]
struct OpenRange {
    start: usize,
    scope: SuppressionScope,
    exempt: BTreeSet<String>,
}

impl OpenRange {
    fn close(self, end: usize) -> SuppressionRange {
        SuppressionRange {
            start: self.start,
            end,
            scope: self.scope,
            exempt: self.exempt,
        }
    }

    fn covers(&self, code: &str) -> bool {
        let in_scope = match &self.scope {
            SuppressionScope::All => true,
            SuppressionScope::Codes(codes) => codes.iter().any(|c| code_matches(c, code)),
        };
        in_scope && !self.exempt.iter().any(|e| code_matches(e, code))
    }
}

#[derive(Debug, Default)]
struct Builder {
    closed: Vec<SuppressionRange>,
    open: Vec<OpenRange>,
}

impl Builder {
    /// Close `open[idx]` at `pos` and reopen it after `pos` with new settings
    fn split(&mut self, idx: usize, pos: usize, scope: SuppressionScope, exempt: BTreeSet<String>) {
        let old = std::mem::replace(
            &mut self.open[idx],
            OpenRange {
                start: pos + 1,
                scope,
                exempt,
            },
        );
        self.closed.push(old.close(pos));
    }

    fn disable_all(&mut self, pos: usize) {
        let existing = self
            .open
            .iter()
            .position(|o| o.scope == SuppressionScope::All);
        match existing {
            Some(idx) if !self.open[idx].exempt.is_empty() => {
                self.split(idx, pos, SuppressionScope::All, BTreeSet::new());
            }
            Some(_) => {}
            None => self.open.push(OpenRange {
                start: pos,
                scope: SuppressionScope::All,
                exempt: BTreeSet::new(),
            }),
        }
    }

    fn disable_codes(&mut self, pos: usize, codes: Vec<String>) {
        for code in codes {
            // Undo earlier exemptions of this code
            for idx in 0..self.open.len() {
                let exempt = &self.open[idx].exempt;
                if exempt.iter().any(|e| code_matches(&code, e)) {
                    let scope = self.open[idx].scope.clone();
                    let remaining = exempt
                        .iter()
                        .filter(|e| !code_matches(&code, e))
                        .cloned()
                        .collect();
                    self.split(idx, pos, scope, remaining);
                }
            }

            if !self.open.iter().any(|o| o.covers(&code)) {
                self.open.push(OpenRange {
                    start: pos,
                    scope: SuppressionScope::Codes(BTreeSet::from([code])),
                    exempt: BTreeSet::new(),
                });
            }
        }
    }

    fn enable_all(&mut self, pos: usize) {
        let open = std::mem::take(&mut self.open);
        self.closed.extend(open.into_iter().map(|o| o.close(pos)));
    }

    fn enable_codes(&mut self, pos: usize, codes: Vec<String>) {
        for code in codes {
            let mut idx = 0;
            while idx < self.open.len() {
                let range = &self.open[idx];
                match &range.scope {
                    SuppressionScope::Codes(set) if set.iter().any(|c| code_matches(&code, c)) => {
                        let remaining: BTreeSet<String> = set
                            .iter()
                            .filter(|c| !code_matches(&code, c))
                            .cloned()
                            .collect();
                        if remaining.is_empty() {
                            let range = self.open.remove(idx);
                            self.closed.push(range.close(pos));
                            continue;
                        }
                        let exempt = range.exempt.clone();
                        self.split(idx, pos, SuppressionScope::Codes(remaining), exempt);
                    }
                    _ if range.covers(&code) => {
                        let scope = range.scope.clone();
                        let mut exempt = range.exempt.clone();
                        exempt.insert(code.clone());
                        self.split(idx, pos, scope, exempt);
                    }
                    _ => {}
                }
                idx += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{RawToken, TokenKind};

    fn ws(text: &str) -> RawToken {
        RawToken::new(TokenKind::Whitespace, text)
    }

    fn comment(text: &str) -> RawToken {
        RawToken::new(TokenKind::Comment, text)
    }

    fn echo_var(name: &str) -> Vec<RawToken> {
        vec![
            RawToken::new(TokenKind::Echo, "echo"),
            ws(" "),
            RawToken::new(TokenKind::Variable, name),
            RawToken::new(TokenKind::Semicolon, ";"),
        ]
    }

    fn build(raw: Vec<RawToken>) -> (TokenStream, Suppressions) {
        let stream = TokenStream::new(raw);
        let suppressions = Suppressions::from_stream(&stream, DEFAULT_PREFIXES);
        (stream, suppressions)
    }

    const ESCAPE: &str = "Security.EscapeOutput.NoEscaping";

    #[test]
    fn test_code_matching_uses_dotted_segments() {
        assert!(code_matches("Security", ESCAPE));
        assert!(code_matches("Security.EscapeOutput", ESCAPE));
        assert!(code_matches(ESCAPE, ESCAPE));
        assert!(!code_matches("Secur", ESCAPE));
        assert!(!code_matches("Security.EscapeOutput.NoEscapingAtAll", ESCAPE));
    }

    #[test]
    fn test_parse_directive_forms() {
        let p = DEFAULT_PREFIXES;
        assert_eq!(parse_directive("// sniffer:disable", p), Some(Directive::Disable(vec![])));
        assert_eq!(
            parse_directive("/* phpcs:enable A.B, C -- done here */", p),
            Some(Directive::Enable(vec!["A.B".into(), "C".into()]))
        );
        assert_eq!(parse_directive("# sniffer:ignoreFile", p), Some(Directive::IgnoreFile));
        assert_eq!(
            parse_directive("/**\n * phpcs:ignore A\n */", p),
            Some(Directive::Ignore(vec!["A".into()]))
        );
        assert_eq!(parse_directive("// sniffer:frobnicate", p), None);
        assert_eq!(parse_directive("// just a comment", p), None);
        assert_eq!(parse_directive("// other:disable", p), None);
    }

    #[test]
    fn test_disable_enable_block() {
        let mut raw = vec![comment("/* sniffer:disable */")];
        raw.extend(echo_var("$x"));
        raw.push(comment("/* sniffer:enable */"));
        raw.extend(echo_var("$y"));
        let (_, s) = build(raw);

        assert!(s.is_suppressed(3, ESCAPE));
        assert!(!s.is_suppressed(8, ESCAPE));
    }

    #[test]
    fn test_unterminated_disable_runs_to_eof() {
        let mut raw = vec![comment("// phpcs:disable Security\n")];
        raw.extend(echo_var("$x"));
        raw.extend(echo_var("$y"));
        let (stream, s) = build(raw);

        assert!(s.is_suppressed(stream.len() - 2, ESCAPE));
        assert!(!s.is_suppressed(3, "PHP.RestrictedFunctions.Found"));
    }

    #[test]
    fn test_unmatched_enable_is_ignored() {
        let mut raw = vec![comment("// sniffer:enable\n")];
        raw.extend(echo_var("$x"));
        let (_, s) = build(raw);
        assert!(s.is_empty());
    }

    #[test]
    fn test_narrow_enable_inside_global_disable() {
        let mut raw = vec![comment("// sniffer:disable\n")];
        raw.extend(echo_var("$x")); // 1..=4, variable at 3
        raw.push(comment("// sniffer:enable Security.EscapeOutput\n")); // 5
        raw.extend(echo_var("$y")); // 6..=9, variable at 8
        let (_, s) = build(raw);

        assert!(s.is_suppressed(3, ESCAPE));
        assert!(!s.is_suppressed(8, ESCAPE));
        assert!(s.is_suppressed(8, "PHP.RestrictedFunctions.Found"));

        let mut reopened = SuppressionRange::new(6, 9, SuppressionScope::All);
        reopened.exempt.insert("Security.EscapeOutput".to_string());
        assert_eq!(
            s.ranges(),
            &[SuppressionRange::new(0, 5, SuppressionScope::All), reopened]
        );
    }

    #[test]
    fn test_enable_of_one_code_keeps_others_disabled() {
        let mut raw = vec![comment("// sniffer:disable A, B\n")];
        raw.extend(echo_var("$x"));
        raw.push(comment("// sniffer:enable A\n"));
        raw.extend(echo_var("$y"));
        let (_, s) = build(raw);

        assert!(s.is_suppressed(3, "A.X"));
        assert!(!s.is_suppressed(8, "A.X"));
        assert!(s.is_suppressed(8, "B.X"));
    }

    #[test]
    fn test_ignore_on_own_line_targets_next_code_line() {
        let mut raw = vec![comment("// sniffer:ignore\n")];
        raw.extend(echo_var("$x"));
        raw.push(ws("\n"));
        raw.extend(echo_var("$y"));
        let (_, s) = build(raw);

        assert!(s.is_suppressed(3, ESCAPE));
        assert!(!s.is_suppressed(8, ESCAPE));
    }

    #[test]
    fn test_trailing_ignore_targets_own_line() {
        let mut raw = echo_var("$x");
        raw.push(ws(" "));
        raw.push(comment("// phpcs:ignore Security\n"));
        raw.extend(echo_var("$y"));
        let (_, s) = build(raw);

        assert!(s.is_suppressed(2, ESCAPE));
        assert!(!s.is_suppressed(8, ESCAPE));
    }

    #[test]
    fn test_ignore_file() {
        let mut raw = echo_var("$x");
        raw.push(comment("# sniffer:ignoreFile"));
        let (_, s) = build(raw);
        assert!(s.is_suppressed(0, "Anything.At.All"));
    }

    #[test]
    fn test_custom_prefix_only() {
        let mut raw = vec![comment("/* phpcs:disable */")];
        raw.extend(echo_var("$x"));
        let stream = TokenStream::new(raw);
        let s = Suppressions::from_stream(&stream, &["mytool"]);
        assert!(s.is_empty());
    }
}
