use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use gpumode_core::StatusCode;
use gpumode_device::DeviceError;

use crate::types::{GM_ERR_INTERNAL, GM_ERR_INVALID_ARGUMENT, GM_ERR_IO};

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| *state.borrow_mut() = CString::default());
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        // Interior NULs were replaced above, so this cannot fail.
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> u32 {
    set_error_message(message);
    GM_ERR_INVALID_ARGUMENT
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

/// Record a non-success status and return its code.
pub(crate) fn report_status(status: StatusCode) -> u32 {
    if !status.is_success() {
        set_error_message(format!("device returned {status}"));
    }
    status.code()
}

pub(crate) fn map_device_error(err: &DeviceError) -> u32 {
    set_error_message(err.to_string());
    match err {
        DeviceError::Status(status) => status.code(),
        DeviceError::Transport(_) | DeviceError::Wire(_) | DeviceError::Io(_) => GM_ERR_IO,
        DeviceError::Mode(_) | DeviceError::UnexpectedOutput { .. } => GM_ERR_INTERNAL,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}
