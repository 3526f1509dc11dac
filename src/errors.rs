use thiserror::Error;

pub type Result<T> = std::result::Result<T, PkError>;

#[derive(Error, Debug)]
pub enum PkError {
    #[error("PluralKit API is unreachable: {0}")]
    RemoteUnavailable(String),
    #[error("PluralKit API has no such entity: {0}")]
    RemoteNotFound(String),
    #[error("PluralKit API returned a malformed body: {0}")]
    RemoteMalformed(String),
    #[error("Author resolution is incomplete: {0}")]
    ResolutionIncomplete(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage error: {0} {1}")]
    Storage(String, String),
    #[error("Parsing error")]
    Parse,
    #[error("Invalid endpoint: {0}")]
    Url(#[from] url::ParseError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PkError {
    /// Whether the directory answered but the entity does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RemoteNotFound(_))
    }
}

impl From<serde_json::Error> for PkError {
    fn from(_: serde_json::Error) -> Self {
        Self::Parse
    }
}

impl From<reqwest::Error> for PkError {
    fn from(e: reqwest::Error) -> Self {
        Self::RemoteUnavailable(e.to_string())
    }
}
