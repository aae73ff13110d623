//! Error types for HTML import/export.

use thiserror::Error;
use vellum_doc::DocError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HtmlError {
    #[error(transparent)]
    Doc(#[from] DocError),

    #[error("Malformed tag at byte {0}")]
    MalformedTag(usize),
}

pub type Result<T> = std::result::Result<T, HtmlError>;
