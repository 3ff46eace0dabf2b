use thiserror::Error;

#[derive(Error, Debug)]
pub enum DopplerError {
    #[error("Invalid parameter: {0}")]
    Validation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Curve fit did not converge: {0}")]
    FitDivergence(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<hound::Error> for DopplerError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => DopplerError::IoError(e),
            other => DopplerError::Audio(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DopplerError>;
