use std::fmt;

use serde::Serialize;

use crate::error::ModeError;

/// Result of one control request.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Success = 0,
    BufferTooSmall = 1,
    InvalidValue = 2,
    UnsupportedOperation = 3,
}

impl StatusCode {
    pub const fn is_success(self) -> bool {
        matches!(self, StatusCode::Success)
    }

    /// Wire value.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Parse a wire value.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(StatusCode::Success),
            1 => Some(StatusCode::BufferTooSmall),
            2 => Some(StatusCode::InvalidValue),
            3 => Some(StatusCode::UnsupportedOperation),
            _ => None,
        }
    }

    /// The NTSTATUS a Windows driver completes the request with.
    pub const fn nt_status(self) -> u32 {
        match self {
            StatusCode::Success => 0x0000_0000,
            StatusCode::BufferTooSmall => 0xC000_0023,
            StatusCode::InvalidValue => 0xC000_000D,
            StatusCode::UnsupportedOperation => 0xC000_0010,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            StatusCode::Success => "success",
            StatusCode::BufferTooSmall => "buffer_too_small",
            StatusCode::InvalidValue => "invalid_value",
            StatusCode::UnsupportedOperation => "unsupported_operation",
        }
    }
}

impl From<&ModeError> for StatusCode {
    fn from(err: &ModeError) -> Self {
        match err {
            ModeError::BufferTooSmall { .. } => StatusCode::BufferTooSmall,
            ModeError::InvalidMode(_) | ModeError::UnknownName(_) => StatusCode::InvalidValue,
            ModeError::UnsupportedOperation(_) => StatusCode::UnsupportedOperation,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
