/// Errors raised while encoding or decoding packets.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The packet does not start with `"GM"`.
    #[error("invalid packet magic (expected 0x474d \"GM\")")]
    InvalidMagic,

    /// A payload exceeds the configured maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A completion carries a status this build does not know.
    #[error("unknown completion status {0}")]
    UnknownStatus(u32),

    /// I/O error on the underlying stream.
    #[error("packet I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before a whole packet arrived.
    #[error("connection closed (incomplete packet)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
