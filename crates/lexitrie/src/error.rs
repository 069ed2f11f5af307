use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LexitrieError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(PathBuf),

    #[error("Entry parse error: {0}")]
    EntryParse(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Catalog {path} is corrupt: {reason}")]
    CatalogCorrupt { path: PathBuf, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Build cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, LexitrieError>;

impl From<serde_json::Error> for LexitrieError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<quick_xml::Error> for LexitrieError {
    fn from(error: quick_xml::Error) -> Self {
        Self::Xml(error.to_string())
    }
}
