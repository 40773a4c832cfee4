use std::path::PathBuf;

use thiserror::Error;

pub type UiResult<T> = Result<T, UiError>;
pub type PosterResult<T> = Result<T, PosterError>;

/// Failures reported by the browser surface. All of them are transient from the
/// point of view of a single selector or activation method.
#[derive(Error, Debug)]
pub enum UiError {
    #[error("Timed out waiting for {0}")]
    Timeout(String),
    #[error("Click intercepted: {0}")]
    Intercepted(String),
    #[error("Element not found: {0}")]
    NotFound(String),
    #[error("Browser driver error: {0}")]
    Driver(String),
    #[error("Clipboard error: {0}")]
    Clipboard(String),
}

impl UiError {
    pub fn is_interception(&self) -> bool {
        matches!(self, UiError::Intercepted(_))
    }
}

/// Failures of a whole posting attempt.
#[derive(Error, Debug)]
pub enum PosterError {
    #[error("Could not activate '{0}' with any selector")]
    ActivationFailed(String),
    #[error("No media available, every media strategy failed")]
    NoMediaAvailable,
    #[error(transparent)]
    Ui(#[from] UiError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type MediaResult<T> = Result<T, MediaError>;

/// Failure of a single media strategy. The provider recovers from all of these
/// by moving on to the next strategy.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("No candidate images in {0}")]
    NoCandidates(PathBuf),
    #[error("Remote generation failed: {0}")]
    Remote(String),
    #[error("Remote generation timed out after {0} polls")]
    PollTimeout(u32),
    #[error("Encoder failed: {0}")]
    Encoder(String),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Text endpoint returned status {0}")]
    Status(u16),
    #[error("Text endpoint returned no usable content")]
    EmptyResponse,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("Error parsing config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}
