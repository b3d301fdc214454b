//! Control codes understood by the router.
//!
//! Codes use the Windows `CTL_CODE` bit layout so existing callers that
//! already speak these two requests keep working:
//!
//! ```text
//! ┌──────────────────┬────────────┬────────────────┬──────────┐
//! │ device type (16) │ access (2) │ function (12)  │ method(2)│
//! └──────────────────┴────────────┴────────────────┴──────────┘
//! ```

/// `FILE_DEVICE_UNKNOWN`.
pub const FILE_DEVICE_UNKNOWN: u32 = 0x22;
/// `METHOD_BUFFERED`.
pub const METHOD_BUFFERED: u32 = 0;
/// `FILE_ANY_ACCESS`.
pub const FILE_ANY_ACCESS: u32 = 0;

/// Build a control code from its parts.
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// Store a new mode. Input: one little-endian `u32` mode code.
pub const IOCTL_SET_GPU_MODE: u32 =
    ctl_code(FILE_DEVICE_UNKNOWN, 0x800, METHOD_BUFFERED, FILE_ANY_ACCESS);

/// Read the current mode. Output: one little-endian `u32` mode code.
pub const IOCTL_GET_GPU_MODE: u32 =
    ctl_code(FILE_DEVICE_UNKNOWN, 0x801, METHOD_BUFFERED, FILE_ANY_ACCESS);

/// Operation selected by a control code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetMode,
    GetMode,
    Unsupported(u32),
}

impl Operation {
    /// Classify a raw control code.
    pub const fn from_code(code: u32) -> Self {
        match code {
            IOCTL_SET_GPU_MODE => Operation::SetMode,
            IOCTL_GET_GPU_MODE => Operation::GetMode,
            other => Operation::Unsupported(other),
        }
    }

    /// The control code for this operation.
    pub const fn code(self) -> u32 {
        match self {
            Operation::SetMode => IOCTL_SET_GPU_MODE,
            Operation::GetMode => IOCTL_GET_GPU_MODE,
            Operation::Unsupported(code) => code,
        }
    }

    /// Short name for logs and reports.
    pub const fn name(self) -> &'static str {
        match self {
            Operation::SetMode => "set_mode",
            Operation::GetMode => "get_mode",
            Operation::Unsupported(_) => "unsupported",
        }
    }
}

impl From<u32> for Operation {
    fn from(code: u32) -> Self {
        Self::from_code(code)
    }
}
