use std::fmt;
use std::io;

use gpumode_core::StatusCode;
use gpumode_device::DeviceError;
use gpumode_transport::TransportError;
use gpumode_wire::WireError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Exit code for a completed request.
pub fn status_exit_code(status: StatusCode) -> i32 {
    match status {
        StatusCode::Success => SUCCESS,
        StatusCode::BufferTooSmall | StatusCode::InvalidValue => DATA_INVALID,
        StatusCode::UnsupportedOperation => USAGE,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => TRANSPORT_ERROR,
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::ConnectionReset => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
    }
}

pub fn wire_error(context: &str, err: WireError) -> CliError {
    match err {
        WireError::Io(source) => io_error(context, source),
        WireError::ConnectionClosed => CliError::new(FAILURE, format!("{context}: {err}")),
        WireError::InvalidMagic | WireError::PayloadTooLarge { .. } | WireError::UnknownStatus(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn device_error(context: &str, err: DeviceError) -> CliError {
    match err {
        DeviceError::Transport(err) => transport_error(context, err),
        DeviceError::Wire(err) => wire_error(context, err),
        DeviceError::Status(status) => {
            CliError::new(status_exit_code(status), format!("{context}: {err}"))
        }
        DeviceError::Mode(_) | DeviceError::UnexpectedOutput { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        DeviceError::Io(source) => io_error(context, source),
    }
}
