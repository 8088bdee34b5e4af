//! sniffer-tokenizer: Lossless PHP tokenizer for sniffer
//!
//! Text outside `<?php` / `<?=` ... `?>` becomes `InlineHtml`; code between
//! the tags is lexed with logos. Bytes nothing recognises become `Unknown`
//! tokens, so concatenating the token texts always reproduces the input.

mod lexer;

use logos::Logos;
use sniffer_core::{RawToken, TokenKind, Tokenizer};

use lexer::{keyword, Lexeme};

/// Tokenizer for PHP source files
#[derive(Debug, Clone, Copy, Default)]
pub struct PhpTokenizer;

impl PhpTokenizer {
    pub fn new() -> Self {
        Self
    }
}

impl Tokenizer for PhpTokenizer {
    fn tokenize(&self, source: &str) -> Vec<RawToken> {
        tokenize(source)
    }
}

/// Split `source` into raw tokens
pub fn tokenize(source: &str) -> Vec<RawToken> {
    let mut tokens = Vec::new();
    let mut offset = 0;

    while offset < source.len() {
        let rest = &source[offset..];
        let Some((start, len, kind)) = find_open_tag(rest) else {
            tokens.push(RawToken::new(TokenKind::InlineHtml, rest));
            break;
        };
        if start > 0 {
            tokens.push(RawToken::new(TokenKind::InlineHtml, &rest[..start]));
        }
        tokens.push(RawToken::new(kind, &rest[start..start + len]));
        offset += start + len;
        offset += lex_php(&source[offset..], &mut tokens);
    }

    tokens
}

/// Find the next open tag: (byte offset, length, kind)
fn find_open_tag(text: &str) -> Option<(usize, usize, TokenKind)> {
    for (idx, _) in text.match_indices("<?") {
        let after = &text[idx + 2..];
        if after.starts_with('=') {
            return Some((idx, 3, TokenKind::OpenTagWithEcho));
        }
        let is_php = after
            .get(..3)
            .is_some_and(|word| word.eq_ignore_ascii_case("php"));
        if !is_php {
            continue;
        }
        let tail = &after[3..];
        let trailing = if tail.starts_with("\r\n") {
            2
        } else if tail.starts_with([' ', '\t', '\n']) {
            1
        } else if tail.is_empty() {
            0
        } else {
            // `<?phpinfo` is not an open tag
            continue;
        };
        return Some((idx, 5 + trailing, TokenKind::OpenTag));
    }
    None
}

/// Lex PHP code up to and including a close tag; returns bytes consumed
fn lex_php(code: &str, tokens: &mut Vec<RawToken>) -> usize {
    let mut lex = Lexeme::lexer(code);
    let mut last_significant: Option<TokenKind> = None;

    while let Some(result) = lex.next() {
        let text = lex.slice();
        let mut kind = match result {
            Ok(lexeme) => lexeme.kind(text),
            Err(()) => TokenKind::Unknown,
        };

        if kind == TokenKind::Identifier && !is_member_name_position(last_significant) {
            kind = keyword(text).unwrap_or(TokenKind::Identifier);
        }

        tokens.push(RawToken::new(kind, text));
        if kind == TokenKind::CloseTag {
            return lex.span().end;
        }
        if !kind.is_empty() {
            last_significant = Some(kind);
        }
    }

    code.len()
}

/// Keywords after `->`, `?->`, `::` or `function` are plain names
fn is_member_name_position(previous: Option<TokenKind>) -> bool {
    matches!(
        previous,
        Some(
            TokenKind::ObjectOperator
                | TokenKind::NullsafeObjectOperator
                | TokenKind::DoubleColon
                | TokenKind::Function
        )
    )
}
