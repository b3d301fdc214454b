use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModeError, Result};

/// Size of an encoded mode value on the control boundary (one `u32`).
pub const MODE_VALUE_SIZE: usize = 4;

/// GPU operating mode.
///
/// The numeric codes are fixed at the control boundary: `Integrated = 0`,
/// `Discrete = 1`. Any other value is rejected, never mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum GpuMode {
    #[default]
    Integrated = 0,
    Discrete = 1,
}

impl GpuMode {
    /// Numeric code used on the control boundary.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Lowercase name used for display and CLI input.
    pub const fn name(self) -> &'static str {
        match self {
            GpuMode::Integrated => "integrated",
            GpuMode::Discrete => "discrete",
        }
    }

    /// Encode as the 4-byte little-endian boundary value.
    pub const fn to_le_bytes(self) -> [u8; MODE_VALUE_SIZE] {
        self.code().to_le_bytes()
    }

    /// Decode the first four bytes of `input`.
    ///
    /// Checks the length before decoding and the domain after, so a short
    /// buffer is reported as too small even if its prefix looks valid.
    pub fn decode(input: &[u8]) -> Result<Self> {
        let raw = input
            .get(..MODE_VALUE_SIZE)
            .ok_or(ModeError::BufferTooSmall {
                needed: MODE_VALUE_SIZE,
                actual: input.len(),
            })?;
        let mut word = [0u8; MODE_VALUE_SIZE];
        word.copy_from_slice(raw);
        Self::try_from(u32::from_le_bytes(word))
    }
}

impl TryFrom<u32> for GpuMode {
    type Error = ModeError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(GpuMode::Integrated),
            1 => Ok(GpuMode::Discrete),
            other => Err(ModeError::InvalidMode(other)),
        }
    }
}

impl From<GpuMode> for u32 {
    fn from(mode: GpuMode) -> Self {
        mode.code()
    }
}

impl FromStr for GpuMode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "integrated" | "0" => Ok(GpuMode::Integrated),
            "discrete" | "1" => Ok(GpuMode::Discrete),
            _ => Err(ModeError::UnknownName(s.to_string())),
        }
    }
}

impl fmt::Display for GpuMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
