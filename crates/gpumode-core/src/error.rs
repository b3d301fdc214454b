/// Errors raised while validating a control request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModeError {
    /// The input or output buffer cannot hold one mode value.
    #[error("buffer too small ({actual} bytes, need {needed})")]
    BufferTooSmall { needed: usize, actual: usize },

    /// The decoded value is not a known mode code.
    #[error("invalid gpu mode value {0}")]
    InvalidMode(u32),

    /// The control code does not select a known operation.
    #[error("unsupported control code {0:#010x}")]
    UnsupportedOperation(u32),

    /// A textual mode name could not be parsed.
    #[error("unknown gpu mode name: {0}")]
    UnknownName(String),
}

pub type Result<T> = std::result::Result<T, ModeError>;
