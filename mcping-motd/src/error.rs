use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MotdError {
    #[error("Invalid color format '{0}' (expected #RRGGBB)")]
    InvalidColorFormat(String),

    #[error("MOTD too long (max {max} characters, got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Shared MOTD link is malformed")]
    MalformedEncoding,
}
