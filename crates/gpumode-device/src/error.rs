use gpumode_core::{ModeError, StatusCode};

/// Errors raised by the device host and client.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Socket-level failure.
    #[error("transport error: {0}")]
    Transport(#[from] gpumode_transport::TransportError),

    /// Packet-level failure.
    #[error("wire error: {0}")]
    Wire(#[from] gpumode_wire::WireError),

    /// The device completed the request with a non-success status.
    #[error("device returned {0}")]
    Status(StatusCode),

    /// The device returned bytes that are not a mode.
    #[error("mode error: {0}")]
    Mode(#[from] ModeError),

    /// The completion carried a different number of output bytes than asked for.
    #[error("unexpected output length {actual} (expected {expected})")]
    UnexpectedOutput { expected: usize, actual: usize },

    /// Spawning a worker failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
