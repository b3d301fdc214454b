use std::sync::Arc;

use tracing::info;

use crate::router::{Completion, RequestRouter, Response};
use crate::store::ModeStore;

/// Name given to devices created without one.
pub const DEFAULT_DEVICE_NAME: &str = "GpuModeDriver";

/// One GPU mode device: a name plus the router over its own state.
///
/// The state is created with the device and dropped with it. Share a device
/// between workers with `Arc<Device>`.
#[derive(Debug)]
pub struct Device {
    name: String,
    router: RequestRouter,
}

impl Device {
    /// Create a device whose mode starts as `Integrated`.
    pub fn create(name: impl Into<String>) -> Self {
        let name = name.into();
        let router = RequestRouter::new(Arc::new(ModeStore::new()));
        info!(device = %name, "device created");
        Self { name, router }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// See [`RequestRouter::dispatch`].
    pub fn dispatch(&self, code: u32, input: Option<&[u8]>, output_capacity: usize) -> Response {
        self.router.dispatch(code, input, output_capacity)
    }

    /// See [`RequestRouter::dispatch_into`].
    pub fn dispatch_into(&self, code: u32, input: Option<&[u8]>, output: &mut [u8]) -> Completion {
        self.router.dispatch_into(code, input, output)
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::create(DEFAULT_DEVICE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE};
    use crate::mode::GpuMode;
    use crate::status::StatusCode;

    #[test]
    fn devices_have_independent_state() {
        let a = Device::create("a");
        let b = Device::default();
        assert_eq!(b.name(), DEFAULT_DEVICE_NAME);

        let set = a.dispatch(IOCTL_SET_GPU_MODE, Some(&1u32.to_le_bytes()), 0);
        assert_eq!(set.status, StatusCode::Success);

        assert_eq!(
            a.dispatch(IOCTL_GET_GPU_MODE, None, 4).output,
            Some(GpuMode::Discrete)
        );
        assert_eq!(
            b.dispatch(IOCTL_GET_GPU_MODE, None, 4).output,
            Some(GpuMode::Integrated)
        );
    }
}
