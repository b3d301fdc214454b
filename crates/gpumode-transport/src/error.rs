use std::path::PathBuf;

/// Errors raised while binding, accepting or connecting device sockets.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Could not bind the device path.
    #[error("failed to bind device at {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Could not open the device path.
    #[error("failed to open device at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Accepting a client failed.
    #[error("failed to accept client: {0}")]
    Accept(std::io::Error),

    /// I/O error on a connected stream.
    #[error("device stream I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device path does not fit in `sockaddr_un.sun_path`.
    #[error("device path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// The underlying I/O error, if any.
    pub fn io_source(&self) -> Option<&std::io::Error> {
        match self {
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Some(source)
            }
            TransportError::Accept(source) | TransportError::Io(source) => Some(source),
            TransportError::PathTooLong { .. } => None,
        }
    }

    /// Convert into a plain `io::Error`, keeping the kind where there is one.
    pub fn into_io(self) -> std::io::Error {
        match self {
            TransportError::Bind { source, .. }
            | TransportError::Connect { source, .. }
            | TransportError::Accept(source)
            | TransportError::Io(source) => source,
            other => std::io::Error::new(std::io::ErrorKind::InvalidInput, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
