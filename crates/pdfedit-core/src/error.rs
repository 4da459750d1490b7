use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfEditError {
    #[error("Failed to parse PDF: {0}")]
    DocumentParse(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("PDF operation failed: {0}")]
    Operation(String),
}

impl PdfEditError {
    pub(crate) fn parse(err: impl std::fmt::Display) -> Self {
        PdfEditError::DocumentParse(err.to_string())
    }

    pub(crate) fn operation(err: impl std::fmt::Display) -> Self {
        PdfEditError::Operation(err.to_string())
    }
}
