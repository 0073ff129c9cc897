use thiserror::Error;

/// Failures surfaced to the user; none of these are fatal to the session.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    EmptyInput(String),

    #[error("image processing failed: {0}")]
    ImageProcessing(String),

    #[error("keyword generation failed: {0}")]
    Generation(String),

    #[error("analysis failed: {0}")]
    Analysis(String),
}

impl Error {
    /// Short message suitable for the TUI error line.
    pub fn user_message(&self) -> String {
        match self {
            Error::EmptyInput(msg) => msg.clone(),
            Error::ImageProcessing(_) => {
                "Could not process that image. Try a smaller or different file.".to_string()
            }
            Error::Generation(_) => {
                "Could not generate keyword ideas. Please try again.".to_string()
            }
            Error::Analysis(_) => {
                "Analysis failed. Try removing some text or using fewer images.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
