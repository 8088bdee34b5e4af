//! Navigation helpers over a `TokenStream`
//!
//! Every helper takes and returns plain indices. Lookups that depend on a
//! bracket partner return `None` when the partner is missing, which rules
//! treat as "stop here, the code is still being written".

use crate::token::{Token, TokenKind, TokenStream};

/// Scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Tokens that can be part of a (possibly qualified) name
const NAME_PARTS: &[TokenKind] = &[TokenKind::Identifier, TokenKind::NsSeparator];

/// Tokens after which an identifier followed by `(` is not a plain function call
const NOT_A_CALL: &[TokenKind] = &[
    TokenKind::ObjectOperator,
    TokenKind::NullsafeObjectOperator,
    TokenKind::DoubleColon,
    TokenKind::Function,
    TokenKind::New,
    TokenKind::Const,
];

impl TokenStream {
    /// Find the first token matching `predicate`.
    ///
    /// Scanning starts at `start` (inclusive) and stops before `end`; with
    /// `None` it runs to the stream boundary. Walking backward, `end` is the
    /// lower exclusive bound. With `skip_empty` whitespace and comments are
    /// never returned.
    pub fn find<P>(
        &self,
        predicate: P,
        start: usize,
        end: Option<usize>,
        direction: Direction,
        skip_empty: bool,
    ) -> Option<usize>
    where
        P: Fn(&Token) -> bool,
    {
        let accept = |i: &usize| {
            let token = &self[*i];
            !(skip_empty && token.is_empty()) && predicate(token)
        };

        match direction {
            Direction::Forward => {
                let stop = end.unwrap_or(self.len()).min(self.len());
                (start..stop).find(accept)
            }
            Direction::Backward => {
                if self.is_empty() {
                    return None;
                }
                let from = start.min(self.len() - 1);
                let lower = end.map_or(0, |e| e + 1);
                if lower > from {
                    return None;
                }
                (lower..=from).rev().find(accept)
            }
        }
    }

    /// First token whose kind is one of `kinds`
    pub fn find_kind(
        &self,
        kinds: &[TokenKind],
        start: usize,
        end: Option<usize>,
        direction: Direction,
    ) -> Option<usize> {
        self.find(|t| t.is_any(kinds), start, end, direction, false)
    }

    /// First token whose kind is not one of `kinds`
    pub fn find_not_kind(
        &self,
        kinds: &[TokenKind],
        start: usize,
        end: Option<usize>,
        direction: Direction,
    ) -> Option<usize> {
        self.find(|t| !t.is_any(kinds), start, end, direction, false)
    }

    /// Next token after `index` that is not whitespace or a comment
    pub fn next_non_empty(&self, index: usize) -> Option<usize> {
        self.find(|_| true, index + 1, None, Direction::Forward, true)
    }

    /// Previous token before `index` that is not whitespace or a comment
    pub fn prev_non_empty(&self, index: usize) -> Option<usize> {
        let before = index.checked_sub(1)?;
        self.find(|_| true, before, None, Direction::Backward, true)
    }

    /// Partner of the bracket at `index`
    pub fn matching_bracket(&self, index: usize) -> Option<usize> {
        self.get(index)?.matching_bracket
    }

    /// Step over the bracketed region starting (or ending) at `index`.
    ///
    /// From an opener this is the index just past its closer; from a closer
    /// it is the index just before its opener.
    pub fn skip_bracket(&self, index: usize) -> Option<usize> {
        let token = self.get(index)?;
        let partner = token.matching_bracket?;
        if token.kind.is_opener() {
            Some(partner + 1)
        } else {
            partner.checked_sub(1)
        }
    }

    /// Last token of the statement containing `start`.
    ///
    /// That is the terminating `;` or close tag, or the token just before
    /// the closer of an enclosing bracket. Nested brackets are stepped over.
    /// Returns `None` when the statement never terminates.
    pub fn end_of_statement(&self, start: usize) -> Option<usize> {
        let mut i = start;
        while i < self.len() {
            let token = &self[i];
            match token.kind {
                TokenKind::Semicolon | TokenKind::CloseTag => return Some(i),
                k if k.is_opener() => {
                    i = token.matching_bracket? + 1;
                    continue;
                }
                k if k.is_closer() => {
                    // A closer reached here belongs to a bracket opened before `start`
                    return i.checked_sub(1).filter(|&prev| prev >= start);
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// First non-empty token of the statement containing `index`
    pub fn start_of_statement(&self, index: usize) -> usize {
        let mut boundary = 0;
        let mut i = index;
        while i > 0 {
            i -= 1;
            let token = &self[i];
            match token.kind {
                TokenKind::Semicolon
                | TokenKind::OpenTag
                | TokenKind::OpenTagWithEcho
                | TokenKind::CloseTag
                | TokenKind::OpenCurlyBracket
                | TokenKind::CloseCurlyBracket => {
                    boundary = i + 1;
                    break;
                }
                TokenKind::CloseParenthesis | TokenKind::CloseSquareBracket => {
                    if let Some(open) = token.matching_bracket {
                        i = open;
                    }
                }
                TokenKind::OpenParenthesis | TokenKind::OpenSquareBracket => {
                    boundary = i + 1;
                    break;
                }
                _ => {}
            }
        }

        self.find(|_| true, boundary, Some(index + 1), Direction::Forward, true)
            .unwrap_or(index)
    }

    /// Scope owners and bare `{` enclosing `index`, innermost first
    pub fn enclosing_scopes(&self, index: usize) -> Vec<usize> {
        let mut scopes = Vec::new();
        let mut current = self.get(index).and_then(|t| t.parent_scope);
        while let Some(scope) = current {
            scopes.push(scope);
            current = self[scope].parent_scope;
        }
        scopes
    }

    /// Whether `index` sits inside a scope owned by a `kind` token
    pub fn has_condition(&self, index: usize, kind: TokenKind) -> bool {
        self.enclosing_scopes(index)
            .into_iter()
            .any(|scope| self[scope].kind == kind)
    }

    pub fn is_in_parentheses(&self, index: usize) -> bool {
        self.get(index).is_some_and(|t| t.paren_depth > 0)
    }

    /// First and last token index starting on the same line as `index`
    pub fn line_range(&self, index: usize) -> Option<(usize, usize)> {
        let line = self.get(index)?.line;
        let mut first = index;
        while first > 0 && self[first - 1].line == line {
            first -= 1;
        }
        let mut last = index;
        while last + 1 < self.len() && self[last + 1].line == line {
            last += 1;
        }
        Some((first, last))
    }

    /// First token of the qualified name ending at `index` (`\Foo\bar`)
    pub fn name_start(&self, index: usize) -> usize {
        let mut start = index;
        while start > 0 && self[start - 1].is_any(NAME_PARTS) {
            start -= 1;
        }
        start
    }

    /// Last token of the qualified name starting at `index`
    pub fn name_end(&self, index: usize) -> usize {
        let mut end = index;
        while end + 1 < self.len() && self[end + 1].is_any(NAME_PARTS) {
            end += 1;
        }
        end
    }

    /// Text of the qualified name ending at `index`
    pub fn qualified_name(&self, index: usize) -> String {
        self.text_between(self.name_start(index), index)
    }

    /// Identifier naming a plain function call whose `(` is at `paren`.
    ///
    /// Method calls, static calls, declarations and `new` expressions are not
    /// function calls.
    pub fn function_call_name(&self, paren: usize) -> Option<usize> {
        if self.kind(paren)? != TokenKind::OpenParenthesis {
            return None;
        }
        let name = self.prev_non_empty(paren)?;
        if !self[name].is_any(&[TokenKind::Identifier, TokenKind::Eval]) {
            return None;
        }
        let before = self.name_start(name);
        match self.prev_non_empty(before) {
            Some(prev) if self[prev].is_any(NOT_A_CALL) => None,
            _ => Some(name),
        }
    }

    /// Opening parenthesis of the call when `index` is a function name
    pub fn call_parenthesis(&self, index: usize) -> Option<usize> {
        let paren = self.next_non_empty(index)?;
        (self.function_call_name(paren)? == index).then_some(paren)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::RawToken;
    use TokenKind::*;

    fn stream(pairs: &[(TokenKind, &str)]) -> TokenStream {
        TokenStream::new(pairs.iter().map(|(k, t)| RawToken::new(*k, *t)).collect())
    }

    // <?php
    // if ($a) {
    //     echo foo($b, [1]); // done
    // }
    fn sample() -> TokenStream {
        stream(&[
            (OpenTag, "<?php\n"),          // 0
            (If, "if"),                    // 1
            (Whitespace, " "),             // 2
            (OpenParenthesis, "("),        // 3
            (Variable, "$a"),              // 4
            (CloseParenthesis, ")"),       // 5
            (Whitespace, " "),             // 6
            (OpenCurlyBracket, "{"),       // 7
            (Whitespace, "\n    "),        // 8
            (Echo, "echo"),                // 9
            (Whitespace, " "),             // 10
            (Identifier, "foo"),           // 11
            (OpenParenthesis, "("),        // 12
            (Variable, "$b"),              // 13
            (Comma, ","),                  // 14
            (Whitespace, " "),             // 15
            (OpenSquareBracket, "["),      // 16
            (LNumber, "1"),                // 17
            (CloseSquareBracket, "]"),     // 18
            (CloseParenthesis, ")"),       // 19
            (Semicolon, ";"),              // 20
            (Whitespace, " "),             // 21
            (Comment, "// done\n"),        // 22
            (CloseCurlyBracket, "}"),      // 23
        ])
    }

    #[test]
    fn test_find_forward_and_backward() {
        let s = sample();
        assert_eq!(s.find(|t| t.is(Variable), 0, None, Direction::Forward, false), Some(4));
        assert_eq!(s.find(|t| t.is(Variable), 20, None, Direction::Backward, false), Some(13));
        assert_eq!(s.find(|t| t.is(Variable), 5, Some(12), Direction::Forward, false), None);
        assert_eq!(s.find(|t| t.is(Variable), 12, Some(4), Direction::Backward, false), None);
        assert_eq!(s.find(|t| t.is(Variable), 12, Some(3), Direction::Backward, false), Some(4));
    }

    #[test]
    fn test_find_skips_empty_tokens() {
        let s = sample();
        assert_eq!(s.find(|_| true, 21, None, Direction::Forward, true), Some(23));
        assert_eq!(s.find(|_| true, 21, None, Direction::Forward, false), Some(21));
        assert_eq!(s.next_non_empty(9), Some(11));
        assert_eq!(s.prev_non_empty(23), Some(20));
        assert_eq!(s.prev_non_empty(0), None);
    }

    #[test]
    fn test_find_kind() {
        let s = sample();
        assert_eq!(s.find_kind(&[Semicolon, Comma], 9, None, Direction::Forward), Some(14));
        assert_eq!(s.find_not_kind(&[Whitespace], 8, None, Direction::Forward), Some(9));
    }

    #[test]
    fn test_matching_and_skip_bracket() {
        let s = sample();
        assert_eq!(s.matching_bracket(12), Some(19));
        assert_eq!(s.skip_bracket(12), Some(20));
        assert_eq!(s.skip_bracket(19), Some(11));
        assert_eq!(s.skip_bracket(11), None);
        assert_eq!(s.matching_bracket(100), None);
    }

    #[test]
    fn test_matching_bracket_is_involution() {
        let s = sample();
        for i in 0..s.len() {
            if let Some(j) = s.matching_bracket(i) {
                assert_eq!(s.matching_bracket(j), Some(i));
            }
        }
    }

    #[test]
    fn test_statement_bounds() {
        let s = sample();
        assert_eq!(s.end_of_statement(9), Some(20));
        // Inside the argument list the statement ends before the enclosing `)`
        assert_eq!(s.end_of_statement(13), Some(18));
        assert_eq!(s.start_of_statement(13), 13);
        assert_eq!(s.start_of_statement(17), 17);
        assert_eq!(s.start_of_statement(20), 9);
    }

    #[test]
    fn test_unterminated_statement() {
        let s = stream(&[(Echo, "echo"), (Whitespace, " "), (Identifier, "foo"), (OpenParenthesis, "(")]);
        assert_eq!(s.end_of_statement(0), None);
        assert!(s.is_live_coding());
    }

    #[test]
    fn test_conditions() {
        let s = sample();
        assert!(s.has_condition(13, If));
        assert!(!s.has_condition(13, Function));
        assert_eq!(s.enclosing_scopes(13), vec![1]);
        assert!(s.is_in_parentheses(13));
        assert!(!s.is_in_parentheses(9));
    }

    #[test]
    fn test_line_range() {
        let s = sample();
        assert_eq!(s.line_range(11), Some((9, 22)));
        assert_eq!(s.line_range(23), Some((23, 23)));
    }

    #[test]
    fn test_function_call_name() {
        let s = sample();
        assert_eq!(s.function_call_name(12), Some(11));
        assert_eq!(s.call_parenthesis(11), Some(12));
        assert_eq!(s.function_call_name(3), None);
    }

    #[test]
    fn test_method_call_is_not_function_call() {
        let s = stream(&[
            (Variable, "$o"),
            (ObjectOperator, "->"),
            (Identifier, "run"),
            (OpenParenthesis, "("),
            (CloseParenthesis, ")"),
        ]);
        assert_eq!(s.function_call_name(3), None);
    }

    #[test]
    fn test_qualified_name() {
        let s = stream(&[
            (NsSeparator, "\\"),
            (Identifier, "Foo"),
            (NsSeparator, "\\"),
            (Identifier, "bar"),
            (OpenParenthesis, "("),
            (CloseParenthesis, ")"),
        ]);
        assert_eq!(s.qualified_name(3), "\\Foo\\bar");
        assert_eq!(s.name_end(0), 3);
        assert_eq!(s.name_end(4), 4);
        assert_eq!(s.function_call_name(4), Some(3));
        assert_eq!(s.call_parenthesis(3), Some(4));
    }
}
