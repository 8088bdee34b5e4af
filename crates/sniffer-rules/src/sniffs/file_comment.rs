//! Sniff: Commenting.FileComment
//!
//! A file must open with a `/** ... */` doc comment describing it. A doc
//! comment directly followed by a class or function belongs to that
//! declaration, so the file comment counts as missing.

use sniffer_core::{
    DiagnosticSink, Direction, Fixer, Rule, RuleResult, TokenKind, TokenStream,
};

/// Declarations that claim a preceding doc comment
const DECLARATIONS: &[TokenKind] = &[
    TokenKind::Class,
    TokenKind::Interface,
    TokenKind::Trait,
    TokenKind::Function,
    TokenKind::Final,
    TokenKind::Abstract,
];

#[derive(Default)]
pub struct FileCommentSniff {
    checked: bool,
}

impl FileCommentSniff {
    pub const CODE: &'static str = "Commenting.FileComment";

    pub fn new() -> Self {
        Self::default()
    }
}

fn is_empty_doc(text: &str) -> bool {
    let body = text
        .strip_prefix("/**")
        .and_then(|t| t.strip_suffix("*/"))
        .unwrap_or("");
    body.chars().all(|c| c.is_whitespace() || c == '*')
}

impl Rule for FileCommentSniff {
    fn code(&self) -> &str {
        Self::CODE
    }

    fn description(&self) -> &str {
        "Files must start with a doc comment"
    }

    fn register(&self) -> Vec<TokenKind> {
        vec![TokenKind::OpenTag]
    }

    fn reset(&mut self) {
        self.checked = false;
    }

    fn process(
        &mut self,
        position: usize,
        stream: &TokenStream,
        sink: &mut DiagnosticSink<'_>,
        _fixer: &mut Fixer,
    ) -> RuleResult {
        // Only the first open tag of a file
        if self.checked {
            return Ok(None);
        }
        self.checked = true;

        let comment = stream.find(
            |t| !t.is(TokenKind::Whitespace),
            position + 1,
            None,
            Direction::Forward,
            false,
        );
        let Some(comment) = comment else {
            sink.add_error(position, "Missing", "Missing file doc comment");
            return Ok(None);
        };

        match stream[comment].kind {
            TokenKind::Comment => {
                sink.add_error(
                    comment,
                    "WrongStyle",
                    "You must use \"/**\" style comments for a file comment",
                );
                Ok(Some(comment + 1))
            }
            TokenKind::DocComment => {
                let claimed = stream
                    .next_non_empty(comment)
                    .is_some_and(|next| stream[next].is_any(DECLARATIONS));
                if claimed {
                    sink.add_error(position, "Missing", "Missing file doc comment");
                } else if is_empty_doc(&stream[comment].text) {
                    sink.add_error(comment, "Empty", "File doc comment is empty");
                }
                Ok(Some(comment + 1))
            }
            _ => {
                sink.add_error(position, "Missing", "Missing file doc comment");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sniffer_tokenizer::PhpTokenizer;

    fn codes(source: &str) -> Vec<String> {
        let stream = TokenStream::tokenize(&PhpTokenizer, source);
        let mut sink = DiagnosticSink::for_stream(&stream);
        sink.set_active_rule(FileCommentSniff::CODE);
        let mut fixer = Fixer::new(false, stream.len());
        let mut rule = FileCommentSniff::new();
        for i in 0..stream.len() {
            if stream[i].is(TokenKind::OpenTag) {
                rule.process(i, &stream, &mut sink, &mut fixer).unwrap();
            }
        }
        sink.into_diagnostics().into_iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_file_comment_present() {
        assert!(codes("<?php\n/**\n * Helpers.\n */\n\n$a = 1;").is_empty());
    }

    #[test]
    fn test_missing() {
        assert_eq!(codes("<?php\n$a = 1;"), vec!["Missing"]);
        assert_eq!(codes("<?php\n"), vec!["Missing"]);
    }

    #[test]
    fn test_doc_comment_belongs_to_class() {
        assert_eq!(codes("<?php\n/**\n * A widget.\n */\nclass Widget {}"), vec!["Missing"]);
    }

    #[test]
    fn test_wrong_style_and_empty() {
        assert_eq!(codes("<?php\n/* File. */\n"), vec!["WrongStyle"]);
        assert_eq!(codes("<?php\n// File.\n"), vec!["WrongStyle"]);
        assert_eq!(codes("<?php\n/**\n *\n */\n$a = 1;"), vec!["Empty"]);
    }

    #[test]
    fn test_only_first_open_tag_checked() {
        assert_eq!(codes("<?php\n$a = 1; ?>\n<p></p>\n<?php\n$b = 2;"), vec!["Missing"]);
    }

    #[test]
    fn test_reset_between_files() {
        let mut rule = FileCommentSniff::new();
        rule.checked = true;
        rule.reset();
        assert!(!rule.checked);
    }
}
