use std::os::raw::c_char;

use gpumode_device::DeviceClient;
use tracing::debug;

use crate::args;
use crate::error;
use crate::types::{ClientHandle, GmClientHandle, GM_ERR_INTERNAL};

/// Open a device hosted at `path`. Returns null on error.
///
/// # Safety
/// `path` must be a non-null, NUL-terminated UTF-8 C string.
#[no_mangle]
pub unsafe extern "C" fn gm_client_open(path: *const c_char) -> GmClientHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        // SAFETY: Null and UTF-8 are checked in the helper.
        let Some(path) = (unsafe { args::required_str_arg(path, "path") }) else {
            return std::ptr::null_mut();
        };

        match DeviceClient::open(path) {
            Ok(client) => Box::into_raw(Box::new(ClientHandle { client })) as GmClientHandle,
            Err(err) => {
                debug!(path, error = %err, "client open failed");
                let _ = error::map_device_error(&err);
                std::ptr::null_mut()
            }
        }
    })
}

/// Close a client opened by [`gm_client_open`].
///
/// # Safety
/// `client` must be null or a handle from `gm_client_open` that is not used again.
#[no_mangle]
pub unsafe extern "C" fn gm_client_free(client: GmClientHandle) {
    crate::ffi_boundary((), || {
        if client.is_null() {
            return;
        }
        // SAFETY: Caller guarantees this handle was allocated by gm_client_open.
        unsafe {
            drop(Box::from_raw(client as *mut ClientHandle));
        }
    });
}

/// Issue one control request against a hosted device.
///
/// Same buffer contract as `gm_device_control`: `output` is only written
/// when the device reports success. `GM_ERR_IO` reports a lost connection. A client handle must not be used from two threads at once.
///
/// # Safety
/// `client` must be a live handle from `gm_client_open`, with the same
/// pointer requirements as `gm_device_control`.
#[no_mangle]
pub unsafe extern "C" fn gm_client_control(
    client: GmClientHandle,
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

        if client.is_null() {
            return error::set_invalid_argument("client handle cannot be null");
        }
        // SAFETY: Caller guarantees a live handle with no concurrent use.
        let handle = unsafe { &mut *(client as *mut ClientHandle) };

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
        let capacity = u32::try_from(output.len()).unwrap_or(u32::MAX);

        match handle.client.device_control(code, input, capacity) {
            Ok(completion) if !completion.status.is_success() => {
                error::report_status(completion.status)
            }
            Ok(completion) => {
                let written = completion.information();
                // The client rejects completions longer than `capacity`.
                let Some(dst) = output.get_mut(..written) else {
                    error::set_error_message("completion exceeds output buffer");
                    return GM_ERR_INTERNAL;
                };
                dst.copy_from_slice(&completion.output);
                // SAFETY: Caller guarantees the out-pointer is null or writable.
                unsafe { args::write_optional(bytes_returned, written) };
                error::report_status(completion.status)
            }
            Err(err) => error::map_device_error(&err),
        }
    })
}
