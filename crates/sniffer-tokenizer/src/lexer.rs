//! Lexeme definitions for PHP code between open and close tags
//!
//! The lexemes are defined using the logos derive macro. Keywords are lexed
//! as identifiers and resolved afterwards, since PHP keywords are
//! case-insensitive and context-dependent.

use logos::{Lexer, Logos};
use sniffer_core::TokenKind;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lexeme {
    #[regex(r"[ \t\r\n\x0C]+")]
    Whitespace,

    #[token("//", line_comment)]
    #[token("#", line_comment)]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    #[token("/**", block_comment)]
    DocComment,

    #[regex(r"\?>(\r?\n)?")]
    CloseTag,

    #[regex(r"\$[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Variable,

    #[regex(r"[a-zA-Z_\x{80}-\x{10FFFF}][a-zA-Z0-9_\x{80}-\x{10FFFF}]*")]
    Identifier,

    #[regex(r"'([^'\\]|\\[\s\S])*'")]
    SingleQuoted,

    #[regex(r#""([^"\\]|\\[\s\S])*""#)]
    DoubleQuoted,

    #[regex(r"0[xX][0-9a-fA-F_]+|0[bB][01_]+|[0-9][0-9_]*")]
    LNumber,

    #[regex(r"([0-9][0-9_]*\.[0-9_]*|\.[0-9][0-9_]*)([eE][+-]?[0-9]+)?|[0-9][0-9_]*[eE][+-]?[0-9]+")]
    DNumber,

    #[regex(r"\([ \t]*(int|integer)[ \t]*\)", ignore(ascii_case))]
    IntCast,
    #[regex(r"\([ \t]*(float|double|real)[ \t]*\)", ignore(ascii_case))]
    DoubleCast,
    #[regex(r"\([ \t]*(string|binary)[ \t]*\)", ignore(ascii_case))]
    StringCast,
    #[regex(r"\([ \t]*(bool|boolean)[ \t]*\)", ignore(ascii_case))]
    BoolCast,
    #[regex(r"\([ \t]*array[ \t]*\)", ignore(ascii_case))]
    ArrayCast,
    #[regex(r"\([ \t]*object[ \t]*\)", ignore(ascii_case))]
    ObjectCast,
    #[regex(r"\([ \t]*unset[ \t]*\)", ignore(ascii_case))]
    UnsetCast,

    #[token("(")]
    OpenParenthesis,
    #[token(")")]
    CloseParenthesis,
    #[token("{")]
    OpenCurlyBracket,
    #[token("}")]
    CloseCurlyBracket,
    #[token("[")]
    OpenSquareBracket,
    #[token("]")]
    CloseSquareBracket,

    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("::")]
    DoubleColon,
    #[token("->")]
    ObjectOperator,
    #[token("?->")]
    NullsafeObjectOperator,
    #[token("=>")]
    DoubleArrow,
    #[token("?")]
    InlineThen,
    #[token("...")]
    Ellipsis,
    #[token("@")]
    Asperand,
    #[token("$")]
    Dollar,
    #[token("`")]
    Backtick,
    #[token("\\")]
    NsSeparator,

    #[token("=")]
    Equal,
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token(".=")]
    #[token("%=")]
    #[token("**=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("<<=")]
    #[token(">>=")]
    CompoundAssign,
    #[token("??=")]
    CoalesceEqual,
    #[token("==")]
    IsEqual,
    #[token("!=")]
    #[token("<>")]
    IsNotEqual,
    #[token("===")]
    IsIdentical,
    #[token("!==")]
    IsNotIdentical,
    #[token("<")]
    LessThan,
    #[token(">")]
    GreaterThan,
    #[token("<=")]
    IsSmallerOrEqual,
    #[token(">=")]
    IsGreaterOrEqual,
    #[token("<=>")]
    Spaceship,
    #[token("&&")]
    BooleanAnd,
    #[token("||")]
    BooleanOr,
    #[token("!")]
    BooleanNot,
    #[token("??")]
    Coalesce,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Multiply,
    #[token("/")]
    Divide,
    #[token("%")]
    Modulus,
    #[token("**")]
    Pow,
    #[token(".")]
    Concat,
    #[token("&")]
    BitwiseAnd,
    #[token("|")]
    BitwiseOr,
    #[token("^")]
    BitwiseXor,
    #[token("~")]
    BitwiseNot,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
}

/// A line comment runs to the end of the line (newline included) or to a close tag
fn line_comment(lex: &mut Lexer<Lexeme>) {
    let rest = lex.remainder();
    let newline = rest.find('\n').map(|i| i + 1);
    let close_tag = rest.find("?>");
    let end = match (newline, close_tag) {
        (Some(n), Some(c)) => n.min(c),
        (Some(n), None) => n,
        (None, Some(c)) => c,
        (None, None) => rest.len(),
    };
    lex.bump(end);
}

/// A block comment runs to `*/`, or to the end of input when unterminated
fn block_comment(lex: &mut Lexer<Lexeme>) {
    // `/**/` is lexed as "/**" followed by "/"
    if lex.slice() == "/**" && lex.remainder().starts_with('/') {
        lex.bump(1);
        return;
    }
    let rest = lex.remainder();
    let end = rest.find("*/").map_or(rest.len(), |i| i + 2);
    lex.bump(end);
}

impl Lexeme {
    /// Token kind for this lexeme. Identifiers come back as `Identifier`.
    pub(crate) fn kind(self, text: &str) -> TokenKind {
        match self {
            Lexeme::Whitespace => TokenKind::Whitespace,
            Lexeme::LineComment | Lexeme::BlockComment => TokenKind::Comment,
            Lexeme::DocComment if text == "/**/" => TokenKind::Comment,
            Lexeme::DocComment => TokenKind::DocComment,
            Lexeme::CloseTag => TokenKind::CloseTag,
            Lexeme::Variable => TokenKind::Variable,
            Lexeme::Identifier => TokenKind::Identifier,
            Lexeme::SingleQuoted => TokenKind::ConstantString,
            Lexeme::DoubleQuoted if text.contains('$') => TokenKind::DoubleQuotedString,
            Lexeme::DoubleQuoted => TokenKind::ConstantString,
            Lexeme::LNumber => TokenKind::LNumber,
            Lexeme::DNumber => TokenKind::DNumber,
            Lexeme::IntCast => TokenKind::IntCast,
            Lexeme::DoubleCast => TokenKind::DoubleCast,
            Lexeme::StringCast => TokenKind::StringCast,
            Lexeme::BoolCast => TokenKind::BoolCast,
            Lexeme::ArrayCast => TokenKind::ArrayCast,
            Lexeme::ObjectCast => TokenKind::ObjectCast,
            Lexeme::UnsetCast => TokenKind::UnsetCast,
            Lexeme::OpenParenthesis => TokenKind::OpenParenthesis,
            Lexeme::CloseParenthesis => TokenKind::CloseParenthesis,
            Lexeme::OpenCurlyBracket => TokenKind::OpenCurlyBracket,
            Lexeme::CloseCurlyBracket => TokenKind::CloseCurlyBracket,
            Lexeme::OpenSquareBracket => TokenKind::OpenSquareBracket,
            Lexeme::CloseSquareBracket => TokenKind::CloseSquareBracket,
            Lexeme::Semicolon => TokenKind::Semicolon,
            Lexeme::Comma => TokenKind::Comma,
            Lexeme::Colon => TokenKind::Colon,
            Lexeme::DoubleColon => TokenKind::DoubleColon,
            Lexeme::ObjectOperator => TokenKind::ObjectOperator,
            Lexeme::NullsafeObjectOperator => TokenKind::NullsafeObjectOperator,
            Lexeme::DoubleArrow => TokenKind::DoubleArrow,
            Lexeme::InlineThen => TokenKind::InlineThen,
            Lexeme::Ellipsis => TokenKind::Ellipsis,
            Lexeme::Asperand => TokenKind::Asperand,
            Lexeme::Dollar => TokenKind::Dollar,
            Lexeme::Backtick => TokenKind::Backtick,
            Lexeme::NsSeparator => TokenKind::NsSeparator,
            Lexeme::Equal => TokenKind::Equal,
            Lexeme::CompoundAssign => TokenKind::CompoundAssign,
            Lexeme::CoalesceEqual => TokenKind::CoalesceEqual,
            Lexeme::IsEqual => TokenKind::IsEqual,
            Lexeme::IsNotEqual => TokenKind::IsNotEqual,
            Lexeme::IsIdentical => TokenKind::IsIdentical,
            Lexeme::IsNotIdentical => TokenKind::IsNotIdentical,
            Lexeme::LessThan => TokenKind::LessThan,
            Lexeme::GreaterThan => TokenKind::GreaterThan,
            Lexeme::IsSmallerOrEqual => TokenKind::IsSmallerOrEqual,
            Lexeme::IsGreaterOrEqual => TokenKind::IsGreaterOrEqual,
            Lexeme::Spaceship => TokenKind::Spaceship,
            Lexeme::BooleanAnd => TokenKind::BooleanAnd,
            Lexeme::BooleanOr => TokenKind::BooleanOr,
            Lexeme::BooleanNot => TokenKind::BooleanNot,
            Lexeme::Coalesce => TokenKind::Coalesce,
            Lexeme::Plus => TokenKind::Plus,
            Lexeme::Minus => TokenKind::Minus,
            Lexeme::Multiply => TokenKind::Multiply,
            Lexeme::Divide => TokenKind::Divide,
            Lexeme::Modulus => TokenKind::Modulus,
            Lexeme::Pow => TokenKind::Pow,
            Lexeme::Concat => TokenKind::Concat,
            Lexeme::BitwiseAnd => TokenKind::BitwiseAnd,
            Lexeme::BitwiseOr => TokenKind::BitwiseOr,
            Lexeme::BitwiseXor => TokenKind::BitwiseXor,
            Lexeme::BitwiseNot => TokenKind::BitwiseNot,
            Lexeme::ShiftLeft => TokenKind::ShiftLeft,
            Lexeme::ShiftRight => TokenKind::ShiftRight,
            Lexeme::Inc => TokenKind::Inc,
            Lexeme::Dec => TokenKind::Dec,
        }
    }
}

/// Keyword kind for an identifier, matched case-insensitively
pub(crate) fn keyword(text: &str) -> Option<TokenKind> {
    let kind = match text.to_ascii_lowercase().as_str() {
        "echo" => TokenKind::Echo,
        "print" => TokenKind::Print,
        "exit" | "die" => TokenKind::Exit,
        "eval" => TokenKind::Eval,
        "include" => TokenKind::Include,
        "include_once" => TokenKind::IncludeOnce,
        "require" => TokenKind::Require,
        "require_once" => TokenKind::RequireOnce,
        "function" => TokenKind::Function,
        "fn" => TokenKind::Fn,
        "class" => TokenKind::Class,
        "interface" => TokenKind::Interface,
        "trait" => TokenKind::Trait,
        "extends" => TokenKind::Extends,
        "implements" => TokenKind::Implements,
        "namespace" => TokenKind::Namespace,
        "use" => TokenKind::Use,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "elseif" => TokenKind::ElseIf,
        "while" => TokenKind::While,
        "do" => TokenKind::Do,
        "for" => TokenKind::For,
        "foreach" => TokenKind::Foreach,
        "as" => TokenKind::As,
        "switch" => TokenKind::Switch,
        "case" => TokenKind::Case,
        "default" => TokenKind::Default,
        "match" => TokenKind::Match,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "return" => TokenKind::Return,
        "new" => TokenKind::New,
        "clone" => TokenKind::Clone,
        "instanceof" => TokenKind::Instanceof,
        "try" => TokenKind::Try,
        "catch" => TokenKind::Catch,
        "finally" => TokenKind::Finally,
        "throw" => TokenKind::Throw,
        "array" => TokenKind::Array,
        "list" => TokenKind::List,
        "isset" => TokenKind::Isset,
        "empty" => TokenKind::Empty,
        "unset" => TokenKind::Unset,
        "public" => TokenKind::Public,
        "protected" => TokenKind::Protected,
        "private" => TokenKind::Private,
        "static" => TokenKind::Static,
        "abstract" => TokenKind::Abstract,
        "final" => TokenKind::Final,
        "const" => TokenKind::Const,
        "global" => TokenKind::Global,
        "and" => TokenKind::LogicalAnd,
        "or" => TokenKind::LogicalOr,
        "xor" => TokenKind::LogicalXor,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "null" => TokenKind::Null,
        _ => return None,
    };
    Some(kind)
}
