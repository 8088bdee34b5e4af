//! Built-in sniffs

pub mod escape_output;
pub mod file_comment;
pub mod keyword_case;
pub mod restricted_functions;
pub mod semicolon_spacing;

pub use escape_output::EscapeOutputSniff;
pub use file_comment::FileCommentSniff;
pub use keyword_case::KeywordCaseSniff;
pub use restricted_functions::RestrictedFunctionsSniff;
pub use semicolon_spacing::SemicolonSpacingSniff;
