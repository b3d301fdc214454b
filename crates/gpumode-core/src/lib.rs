//! Lock-protected GPU mode state and control-request dispatch.
//!
//! This is the only layer of gpumode that touches the mode. Everything else
//! (sockets, packets, the C ABI, the CLI) delivers a control code plus
//! optional input/output buffers to [`RequestRouter::dispatch`] and relays
//! the [`StatusCode`] back to its own caller.

pub mod control;
pub mod device;
pub mod error;
pub mod mode;
pub mod router;
pub mod status;
pub mod store;

pub use control::{ctl_code, Operation, IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE};
pub use device::{Device, DEFAULT_DEVICE_NAME};
pub use error::{ModeError, Result};
pub use mode::{GpuMode, MODE_VALUE_SIZE};
pub use router::{Completion, RequestRouter, Response};
pub use status::StatusCode;
pub use store::ModeStore;
