use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to open PDF: {0}")]
    Open(String),

    /// Distinct kind for encrypted/locked documents (§4.2): one empty-password
    /// decrypt attempt is made before giving up.
    #[error("document is encrypted and could not be decrypted with an empty password")]
    Encrypted,

    #[error("failed to extract content from page {page}: {message}")]
    ContentExtraction { page: u32, message: String },

    #[error("failed to write sidecar CSV: {0}")]
    CsvWrite(#[from] csv::Error),

    #[error("failed to write table metadata: {0}")]
    MetadataWrite(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ParseResult<T> = Result<T, ParseError>;
