//! GPU mode device: one lock-protected mode behind a control-request router.
//!
//! # Crate Structure
//!
//! - [`mode`]: mode store, control codes, status codes and the router
//! - [`transport`]: device socket paths and connected streams
//! - [`wire`]: request/completion packet codec
//! - [`device`]: threaded device host and blocking client
//!
//! ```
//! use gpumode::mode::{Device, GpuMode, StatusCode, IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE};
//!
//! let device = Device::default();
//! let set = device.dispatch(IOCTL_SET_GPU_MODE, Some(&GpuMode::Discrete.to_le_bytes()), 0);
//! assert_eq!(set.status, StatusCode::Success);
//!
//! let get = device.dispatch(IOCTL_GET_GPU_MODE, None, 4);
//! assert_eq!(get.output, Some(GpuMode::Discrete));
//! ```

/// Re-export mode store and router types.
pub mod mode {
    pub use gpumode_core::*;
}

/// Re-export transport types.
pub mod transport {
    pub use gpumode_transport::*;
}

/// Re-export packet codec types.
pub mod wire {
    pub use gpumode_wire::*;
}

/// Re-export host and client types.
pub mod device {
    pub use gpumode_device::*;
}
