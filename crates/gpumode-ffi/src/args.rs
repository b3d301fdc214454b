use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error;

/// Convert an optional C string argument into UTF-8 `&str`.
///
/// Null maps to `Some(None)`; invalid UTF-8 records an error and returns `None`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn optional_str_arg<'a>(
    value: *const c_char,
    name: &str,
) -> Option<Option<&'a str>> {
    if value.is_null() {
        return Some(None);
    }
    // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
    match unsafe { CStr::from_ptr(value) }.to_str() {
        Ok(v) => Some(Some(v)),
        Err(_) => {
            let _ = error::set_invalid_argument(format!("{name} must be valid UTF-8"));
            None
        }
    }
}

/// Convert a required C string argument into UTF-8 `&str`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_str_arg<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    match unsafe { optional_str_arg(value, name) } {
        Some(Some(v)) => Some(v),
        Some(None) => {
            let _ = error::set_invalid_argument(format!("{name} cannot be null"));
            None
        }
        None => None,
    }
}

/// Input buffer: zero length means "no input" whatever the pointer.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn input_arg<'a>(data: *const u8, len: usize) -> Result<Option<&'a [u8]>, u32> {
    if len == 0 {
        return Ok(None);
    }
    if data.is_null() {
        return Err(error::set_invalid_argument(
            "input cannot be null when input_len > 0",
        ));
    }
    // SAFETY: Pointer and length are validated above and owned by the caller for the call.
    Ok(Some(unsafe { std::slice::from_raw_parts(data, len) }))
}

/// Output buffer: zero length is an empty slice whatever the pointer.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and writable for `len` bytes.
pub(crate) unsafe fn output_arg<'a>(data: *mut u8, len: usize) -> Result<&'a mut [u8], u32> {
    if len == 0 {
        return Ok(&mut []);
    }
    if data.is_null() {
        return Err(error::set_invalid_argument(
            "output cannot be null when output_len > 0",
        ));
    }
    // SAFETY: Pointer and length are validated above and owned by the caller for the call.
    Ok(unsafe { std::slice::from_raw_parts_mut(data, len) })
}

/// Store `value` through an optional out-pointer.
///
/// # Safety
/// `out` must be null or valid for a `usize` write.
pub(crate) unsafe fn write_optional(out: *mut usize, value: usize) {
    if !out.is_null() {
        // SAFETY: Non-null pointers are guaranteed writable by the caller.
        unsafe { *out = value };
    }
}
