use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Export input that cannot be turned into a note list or a valid header.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Binary timeline that is structurally invalid.
    #[error("midi parse error: {0}")]
    Parse(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("audio error: {0}")]
    Audio(#[from] hound::Error),
}

impl From<midly::Error> for Error {
    fn from(err: midly::Error) -> Self {
        Error::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
