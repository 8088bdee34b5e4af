//! Token stream with precomputed structural links
//!
//! A `TokenStream` is built once per pass from the raw tokens a tokenizer
//! produces. Building it walks the tokens a single time and records, for every
//! token, its line/column, the partner of each bracket, the scope owned by
//! keywords such as `function` or `if`, the innermost enclosing scope, and the
//! nesting depths. Rules only ever hold indices into the stream.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use std::str::FromStr;

macro_rules! token_kinds {
    ($( $(#[$meta:meta])* $variant:ident => $name:literal ),* $(,)?) => {
        /// Lexical category of a token
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum TokenKind {
            $( $(#[$meta])* $variant, )*
        }

        impl TokenKind {
            /// Every kind, in declaration order
            pub const ALL: &'static [TokenKind] = &[ $( TokenKind::$variant, )* ];

            /// Stable `T_*` name of this kind
            pub fn name(self) -> &'static str {
                match self {
                    $( TokenKind::$variant => $name, )*
                }
            }
        }
    };
}

token_kinds! {
    OpenTag => "T_OPEN_TAG",
    OpenTagWithEcho => "T_OPEN_TAG_WITH_ECHO",
    CloseTag => "T_CLOSE_TAG",
    InlineHtml => "T_INLINE_HTML",
    Whitespace => "T_WHITESPACE",
    Comment => "T_COMMENT",
    DocComment => "T_DOC_COMMENT",
    Variable => "T_VARIABLE",
    ConstantString => "T_CONSTANT_ENCAPSED_STRING",
    DoubleQuotedString => "T_DOUBLE_QUOTED_STRING",
    LNumber => "T_LNUMBER",
    DNumber => "T_DNUMBER",
    /// Bare identifier: function, class and constant names
    Identifier => "T_STRING",
    NsSeparator => "T_NS_SEPARATOR",
    True => "T_TRUE",
    False => "T_FALSE",
    Null => "T_NULL",

    Echo => "T_ECHO",
    Print => "T_PRINT",
    Exit => "T_EXIT",
    Eval => "T_EVAL",
    Include => "T_INCLUDE",
    IncludeOnce => "T_INCLUDE_ONCE",
    Require => "T_REQUIRE",
    RequireOnce => "T_REQUIRE_ONCE",
    Function => "T_FUNCTION",
    Fn => "T_FN",
    Class => "T_CLASS",
    Interface => "T_INTERFACE",
    Trait => "T_TRAIT",
    Extends => "T_EXTENDS",
    Implements => "T_IMPLEMENTS",
    Namespace => "T_NAMESPACE",
    Use => "T_USE",
    If => "T_IF",
    Else => "T_ELSE",
    ElseIf => "T_ELSEIF",
    While => "T_WHILE",
    Do => "T_DO",
    For => "T_FOR",
    Foreach => "T_FOREACH",
    As => "T_AS",
    Switch => "T_SWITCH",
    Case => "T_CASE",
    Default => "T_DEFAULT",
    Match => "T_MATCH",
    Break => "T_BREAK",
    Continue => "T_CONTINUE",
    Return => "T_RETURN",
    New => "T_NEW",
    Clone => "T_CLONE",
    Instanceof => "T_INSTANCEOF",
    Try => "T_TRY",
    Catch => "T_CATCH",
    Finally => "T_FINALLY",
    Throw => "T_THROW",
    Array => "T_ARRAY",
    List => "T_LIST",
    Isset => "T_ISSET",
    Empty => "T_EMPTY",
    Unset => "T_UNSET",
    Public => "T_PUBLIC",
    Protected => "T_PROTECTED",
    Private => "T_PRIVATE",
    Static => "T_STATIC",
    Abstract => "T_ABSTRACT",
    Final => "T_FINAL",
    Const => "T_CONST",
    Global => "T_GLOBAL",
    LogicalAnd => "T_LOGICAL_AND",
    LogicalOr => "T_LOGICAL_OR",
    LogicalXor => "T_LOGICAL_XOR",

    IntCast => "T_INT_CAST",
    DoubleCast => "T_DOUBLE_CAST",
    StringCast => "T_STRING_CAST",
    BoolCast => "T_BOOL_CAST",
    ArrayCast => "T_ARRAY_CAST",
    ObjectCast => "T_OBJECT_CAST",
    UnsetCast => "T_UNSET_CAST",

    OpenParenthesis => "T_OPEN_PARENTHESIS",
    CloseParenthesis => "T_CLOSE_PARENTHESIS",
    OpenCurlyBracket => "T_OPEN_CURLY_BRACKET",
    CloseCurlyBracket => "T_CLOSE_CURLY_BRACKET",
    OpenSquareBracket => "T_OPEN_SQUARE_BRACKET",
    CloseSquareBracket => "T_CLOSE_SQUARE_BRACKET",

    Semicolon => "T_SEMICOLON",
    Comma => "T_COMMA",
    Colon => "T_COLON",
    DoubleColon => "T_DOUBLE_COLON",
    ObjectOperator => "T_OBJECT_OPERATOR",
    NullsafeObjectOperator => "T_NULLSAFE_OBJECT_OPERATOR",
    DoubleArrow => "T_DOUBLE_ARROW",
    InlineThen => "T_INLINE_THEN",
    Ellipsis => "T_ELLIPSIS",
    Asperand => "T_ASPERAND",
    Dollar => "T_DOLLAR",
    Backtick => "T_BACKTICK",

    Equal => "T_EQUAL",
    CompoundAssign => "T_COMPOUND_ASSIGN",
    CoalesceEqual => "T_COALESCE_EQUAL",
    IsEqual => "T_IS_EQUAL",
    IsNotEqual => "T_IS_NOT_EQUAL",
    IsIdentical => "T_IS_IDENTICAL",
    IsNotIdentical => "T_IS_NOT_IDENTICAL",
    LessThan => "T_LESS_THAN",
    GreaterThan => "T_GREATER_THAN",
    IsSmallerOrEqual => "T_IS_SMALLER_OR_EQUAL",
    IsGreaterOrEqual => "T_IS_GREATER_OR_EQUAL",
    Spaceship => "T_SPACESHIP",
    BooleanAnd => "T_BOOLEAN_AND",
    BooleanOr => "T_BOOLEAN_OR",
    BooleanNot => "T_BOOLEAN_NOT",
    Coalesce => "T_COALESCE",
    Plus => "T_PLUS",
    Minus => "T_MINUS",
    Multiply => "T_MULTIPLY",
    Divide => "T_DIVIDE",
    Modulus => "T_MODULUS",
    Pow => "T_POW",
    Concat => "T_STRING_CONCAT",
    BitwiseAnd => "T_BITWISE_AND",
    BitwiseOr => "T_BITWISE_OR",
    BitwiseXor => "T_BITWISE_XOR",
    BitwiseNot => "T_BITWISE_NOT",
    ShiftLeft => "T_SL",
    ShiftRight => "T_SR",
    Inc => "T_INC",
    Dec => "T_DEC",

    Unknown => "T_UNKNOWN",
}

impl TokenKind {
    /// Whitespace and comments: tokens rules usually look through
    pub fn is_empty(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::Comment | TokenKind::DocComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::DocComment)
    }

    pub fn is_opener(self) -> bool {
        matches!(
            self,
            TokenKind::OpenParenthesis | TokenKind::OpenCurlyBracket | TokenKind::OpenSquareBracket
        )
    }

    pub fn is_closer(self) -> bool {
        matches!(
            self,
            TokenKind::CloseParenthesis
                | TokenKind::CloseCurlyBracket
                | TokenKind::CloseSquareBracket
        )
    }

    /// Keywords that own the next curly-brace block
    pub fn is_scope_owner(self) -> bool {
        matches!(
            self,
            TokenKind::Function
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Trait
                | TokenKind::Namespace
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::ElseIf
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Foreach
                | TokenKind::Switch
                | TokenKind::Match
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
        )
    }

    pub fn is_cast(self) -> bool {
        matches!(
            self,
            TokenKind::IntCast
                | TokenKind::DoubleCast
                | TokenKind::StringCast
                | TokenKind::BoolCast
                | TokenKind::ArrayCast
                | TokenKind::ObjectCast
                | TokenKind::UnsetCast
        )
    }

    /// Reserved words spelled with letters, whose case is not significant
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Echo
                | TokenKind::Print
                | TokenKind::Exit
                | TokenKind::Eval
                | TokenKind::Include
                | TokenKind::IncludeOnce
                | TokenKind::Require
                | TokenKind::RequireOnce
                | TokenKind::Function
                | TokenKind::Fn
                | TokenKind::Class
                | TokenKind::Interface
                | TokenKind::Trait
                | TokenKind::Extends
                | TokenKind::Implements
                | TokenKind::Namespace
                | TokenKind::Use
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::ElseIf
                | TokenKind::While
                | TokenKind::Do
                | TokenKind::For
                | TokenKind::Foreach
                | TokenKind::As
                | TokenKind::Switch
                | TokenKind::Case
                | TokenKind::Default
                | TokenKind::Match
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::Return
                | TokenKind::New
                | TokenKind::Clone
                | TokenKind::Instanceof
                | TokenKind::Try
                | TokenKind::Catch
                | TokenKind::Finally
                | TokenKind::Throw
                | TokenKind::Array
                | TokenKind::List
                | TokenKind::Isset
                | TokenKind::Empty
                | TokenKind::Unset
                | TokenKind::Public
                | TokenKind::Protected
                | TokenKind::Private
                | TokenKind::Static
                | TokenKind::Abstract
                | TokenKind::Final
                | TokenKind::Const
                | TokenKind::Global
                | TokenKind::LogicalAnd
                | TokenKind::LogicalOr
                | TokenKind::LogicalXor
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a `T_*` name does not name a token kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown token kind '{0}'")]
pub struct UnknownTokenKind(pub String);

impl FromStr for TokenKind {
    type Err = UnknownTokenKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TokenKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTokenKind(wanted.to_string()))
    }
}

/// A token as produced by a tokenizer, before structural analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub kind: TokenKind,
    pub text: String,
}

impl RawToken {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Turns source text into raw tokens
///
/// Implementations must be lossless: concatenating the text of every
/// returned token reproduces `source` exactly. The fix loop relies on this to
/// rebuild source text from a token stream.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, source: &str) -> Vec<RawToken>;
}

/// A token with its position and structural links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Index of this token in its stream
    pub position: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Partner of a bracket, parenthesis or curly brace
    pub matching_bracket: Option<usize>,
    /// Opening curly brace of the scope this token owns or delimits
    pub scope_opener: Option<usize>,
    /// Closing curly brace of the scope this token owns or delimits
    pub scope_closer: Option<usize>,
    /// Innermost enclosing scope: its owner keyword, or the bare `{`
    pub parent_scope: Option<usize>,
    /// Curly-brace nesting depth
    pub level: usize,
    /// Parenthesis nesting depth
    pub paren_depth: usize,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }

    /// Whitespace or comment
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }

    /// True when the token's text ends with a line break
    pub fn ends_line(&self) -> bool {
        self.text.ends_with('\n')
    }
}

/// Ordered, immutable sequence of tokens for one pass
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    tokens: Vec<Token>,
    live_coding: bool,
}

impl TokenStream {
    /// Build a stream and compute its structural metadata
    pub fn new(raw: Vec<RawToken>) -> Self {
        let mut tokens = Vec::with_capacity(raw.len());
        let (mut line, mut column) = (1usize, 1usize);

        for (position, raw) in raw.into_iter().enumerate() {
            let (start_line, start_column) = (line, column);
            for ch in raw.text.chars() {
                if ch == '\n' {
                    line += 1;
                    column = 1;
                } else {
                    column += 1;
                }
            }

            tokens.push(Token {
                kind: raw.kind,
                text: raw.text,
                position,
                line: start_line,
                column: start_column,
                matching_bracket: None,
                scope_opener: None,
                scope_closer: None,
                parent_scope: None,
                level: 0,
                paren_depth: 0,
            });
        }

        let live_coding = link_structure(&mut tokens);
        Self {
            tokens,
            live_coding,
        }
    }

    /// Tokenize `source` and build a stream from the result
    pub fn tokenize(tokenizer: &dyn Tokenizer, source: &str) -> Self {
        Self::new(tokenizer.tokenize(source))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Kind of the token at `index`, if there is one
    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|t| t.kind)
    }

    /// True when some bracket was opened and never closed
    pub fn is_live_coding(&self) -> bool {
        self.live_coding
    }

    /// Reassemble the source text
    pub fn source(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Source text of the inclusive token range `start..=end`
    pub fn text_between(&self, start: usize, end: usize) -> String {
        if start > end || start >= self.tokens.len() {
            return String::new();
        }
        let end = end.min(self.tokens.len() - 1);
        self.tokens[start..=end]
            .iter()
            .map(|t| t.text.as_str())
            .collect()
    }
}

impl Index<usize> for TokenStream {
    type Output = Token;

    fn index(&self, index: usize) -> &Token {
        &self.tokens[index]
    }
}

impl<'a> IntoIterator for &'a TokenStream {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// Link brackets, scopes and nesting depths in one forward pass.
///
/// Returns true when an opener was left unterminated.
fn link_structure(tokens: &mut [Token]) -> bool {
    let mut parens: Vec<usize> = Vec::new();
    let mut squares: Vec<usize> = Vec::new();
    // (opener index, owner keyword index)
    let mut curlies: Vec<(usize, Option<usize>)> = Vec::new();
    // (owner keyword index, paren depth where it appeared)
    let mut pending_owners: Vec<(usize, usize)> = Vec::new();

    for i in 0..tokens.len() {
        let kind = tokens[i].kind;

        tokens[i].level = curlies.len();
        tokens[i].paren_depth = parens.len();
        tokens[i].parent_scope = curlies
            .last()
            .map(|&(opener, owner)| owner.unwrap_or(opener));

        match kind {
            TokenKind::OpenParenthesis => parens.push(i),
            TokenKind::CloseParenthesis => {
                if let Some(open) = parens.pop() {
                    link_pair(tokens, open, i);
                    tokens[i].paren_depth = parens.len();
                    // Owners opened inside the parentheses never got a body
                    pending_owners.retain(|&(_, depth)| depth <= parens.len());
                }
            }
            TokenKind::OpenSquareBracket => squares.push(i),
            TokenKind::CloseSquareBracket => {
                if let Some(open) = squares.pop() {
                    link_pair(tokens, open, i);
                }
            }
            TokenKind::OpenCurlyBracket => {
                let owner = match pending_owners.last() {
                    Some(&(owner, depth)) if depth == parens.len() => {
                        pending_owners.pop();
                        Some(owner)
                    }
                    _ => None,
                };
                curlies.push((i, owner));
            }
            TokenKind::CloseCurlyBracket => {
                if let Some((open, owner)) = curlies.pop() {
                    link_pair(tokens, open, i);
                    for idx in [Some(open), Some(i), owner].into_iter().flatten() {
                        tokens[idx].scope_opener = Some(open);
                        tokens[idx].scope_closer = Some(i);
                    }
                    tokens[i].level = curlies.len();
                    tokens[i].parent_scope = curlies
                        .last()
                        .map(|&(opener, owner)| owner.unwrap_or(opener));
                }
            }
            TokenKind::Semicolon => {
                let depth = parens.len();
                pending_owners.retain(|&(_, d)| d < depth);
            }
            k if k.is_scope_owner() => {
                let depth = parens.len();
                pending_owners.retain(|&(_, d)| d != depth);
                pending_owners.push((i, depth));
            }
            _ => {}
        }
    }

    !(parens.is_empty() && squares.is_empty() && curlies.is_empty())
}

fn link_pair(tokens: &mut [Token], open: usize, close: usize) {
    tokens[open].matching_bracket = Some(close);
    tokens[close].matching_bracket = Some(open);
}
