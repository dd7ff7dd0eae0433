use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Invalid job: {0}")]
    InvalidJob(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
