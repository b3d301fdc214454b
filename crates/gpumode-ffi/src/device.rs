use std::os::raw::c_char;
use std::sync::Arc;

use gpumode_core::{Device, DEFAULT_DEVICE_NAME};
use tracing::debug;

use crate::args;
use crate::error;
use crate::types::{DeviceHandle, GmDeviceHandle, GM_ERR_INTERNAL};

/// Create an in-process device whose mode starts as integrated.
///
/// A null `name` uses the default device name. Returns null on error.
///
/// # Safety
/// `name` must be null or a valid NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn gm_device_create(name: *const c_char) -> GmDeviceHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        // SAFETY: Null and UTF-8 are checked in the helper.
        let name = match unsafe { args::optional_str_arg(name, "name") } {
            Some(name) => name.unwrap_or(DEFAULT_DEVICE_NAME),
            None => return std::ptr::null_mut(),
        };

        let handle = DeviceHandle {
            device: Arc::new(Device::create(name)),
        };
        debug!(name, "device handle created");
        Box::into_raw(Box::new(handle)) as GmDeviceHandle
    })
}

/// Destroy a device created by [`gm_device_create`].
///
/// # Safety
/// `device` must be null or a handle from `gm_device_create` that is not used again.
#[no_mangle]
pub unsafe extern "C" fn gm_device_free(device: GmDeviceHandle) {
    crate::ffi_boundary((), || {
        if device.is_null() {
            return;
        }
        // SAFETY: Caller guarantees this handle was allocated by gm_device_create.
        unsafe {
            drop(Box::from_raw(device as *mut DeviceHandle));
        }
    });
}

/// Issue one control request against an in-process device.
///
/// Returns a `GM_STATUS_*` code, or `GM_ERR_*` when the arguments are
/// unusable. On success of a read exactly four bytes are written to the
/// front of `output`. `bytes_returned` (optional) receives the count of
/// bytes written, zero on any failure. May be called from several threads
/// on the same handle.
///
/// # Safety
/// `device` must be a live handle from `gm_device_create`. `input` must be
/// readable for `input_len` bytes and `output` writable for `output_len`
/// bytes whenever those lengths are non-zero. `bytes_returned` must be null
/// or writable.
#[no_mangle]
pub unsafe extern "C" fn gm_device_control(
    device: GmDeviceHandle,
    code: u32,
    input: *const u8,
    input_len: usize,
    output: *mut u8,
    output_len: usize,
    bytes_returned: *mut usize,
) -> u32 {
    crate::ffi_boundary(GM_ERR_INTERNAL, || {
        error::clear_error_state();
        // SAFETY: Caller guarantees the out-pointer is null or writable.
        unsafe { args::write_optional(bytes_returned, 0) };

        if device.is_null() {
            return error::set_invalid_argument("device handle cannot be null");
        }
        // SAFETY: Caller guarantees a live handle; `Device` is shared-access only.
        let handle = unsafe { &*(device as *const DeviceHandle) };

        // SAFETY: Pointer/length pairs are validated in the helpers.
        let input = match unsafe { args::input_arg(input, input_len) } {
            Ok(input) => input,
            Err(code) => return code,
        };
        // SAFETY: As above.
        let output = match unsafe { args::output_arg(output, output_len) } {
            Ok(output) => output,
            Err(code) => return code,
        };

        let completion = handle.device.dispatch_into(code, input, output);
        // SAFETY: Caller guarantees the out-pointer is null or writable.
        unsafe { args::write_optional(bytes_returned, completion.information) };
        error::report_status(completion.status)
    })
}
