use std::ffi::c_void;
use std::sync::Arc;

use gpumode_core::{Device, StatusCode};
use gpumode_device::DeviceClient;

/// Request completed.
pub const GM_STATUS_SUCCESS: u32 = StatusCode::Success.code();
/// Input shorter than one mode value, or output capacity below four bytes.
pub const GM_STATUS_BUFFER_TOO_SMALL: u32 = StatusCode::BufferTooSmall.code();
/// Input is not a known mode code.
pub const GM_STATUS_INVALID_VALUE: u32 = StatusCode::InvalidValue.code();
/// Control code not recognized.
pub const GM_STATUS_UNSUPPORTED_OPERATION: u32 = StatusCode::UnsupportedOperation.code();

/// A pointer or length argument was unusable.
pub const GM_ERR_INVALID_ARGUMENT: u32 = 100;
/// The hosted device could not be reached.
pub const GM_ERR_IO: u32 = 101;
/// Internal failure, including a caught panic.
pub const GM_ERR_INTERNAL: u32 = 199;

pub const GM_IOCTL_SET_GPU_MODE: u32 = gpumode_core::IOCTL_SET_GPU_MODE;
pub const GM_IOCTL_GET_GPU_MODE: u32 = gpumode_core::IOCTL_GET_GPU_MODE;

pub type GmDeviceHandle = *mut c_void;
pub type GmClientHandle = *mut c_void;

pub(crate) struct DeviceHandle {
    pub(crate) device: Arc<Device>,
}

pub(crate) struct ClientHandle {
    pub(crate) client: DeviceClient,
}
