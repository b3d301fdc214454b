//! gpumode-ffi: C-ABI exports for gpumode devices.
//!
//! `gm_device_*` drives a device living in the calling process; several
//! threads may share one device handle. `gm_client_*` talks to a device
//! served by `gpumode serve`. Both return `GM_STATUS_*` codes, or `GM_ERR_*`
//! for unusable arguments, with a message in [`gm_last_error`].

mod args;
mod client;
mod device;
mod error;
mod types;

use std::panic::AssertUnwindSafe;

use gpumode_core::StatusCode;

pub use client::{gm_client_control, gm_client_free, gm_client_open};
pub use device::{gm_device_control, gm_device_create, gm_device_free};
pub use types::{
    GmClientHandle, GmDeviceHandle, GM_ERR_INTERNAL, GM_ERR_INVALID_ARGUMENT, GM_ERR_IO,
    GM_IOCTL_GET_GPU_MODE, GM_IOCTL_SET_GPU_MODE, GM_STATUS_BUFFER_TOO_SMALL,
    GM_STATUS_INVALID_VALUE, GM_STATUS_SUCCESS, GM_STATUS_UNSUPPORTED_OPERATION,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Message for the last failed call on this thread, empty if none.
///
/// The pointer stays valid until the next gpumode call on the same thread.
#[no_mangle]
pub extern "C" fn gm_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

/// NTSTATUS equivalent of a `GM_STATUS_*` code, or `STATUS_UNSUCCESSFUL`
/// (0xC0000001) for anything else.
#[no_mangle]
pub extern "C" fn gm_status_ntstatus(status: u32) -> u32 {
    StatusCode::from_code(status).map_or(0xC000_0001, StatusCode::nt_status)
}
