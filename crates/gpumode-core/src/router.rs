use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace};

use crate::control::Operation;
use crate::error::{ModeError, Result};
use crate::mode::{GpuMode, MODE_VALUE_SIZE};
use crate::status::StatusCode;
use crate::store::ModeStore;

/// Outcome of [`RequestRouter::dispatch`].
///
/// `output` is only ever `Some` for a successful `GetMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Response {
    pub status: StatusCode,
    pub output: Option<GpuMode>,
}

impl Response {
    fn success(output: Option<GpuMode>) -> Self {
        Self {
            status: StatusCode::Success,
            output,
        }
    }

    fn failure(status: StatusCode) -> Self {
        Self {
            status,
            output: None,
        }
    }

    /// Encoded output value, present only on a successful read.
    pub fn output_bytes(&self) -> Option<[u8; MODE_VALUE_SIZE]> {
        self.output.map(GpuMode::to_le_bytes)
    }
}

/// Outcome of [`RequestRouter::dispatch_into`]: status plus the number of
/// bytes written into the caller's output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub status: StatusCode,
    pub information: usize,
}

impl Completion {
    pub fn new(status: StatusCode, information: usize) -> Self {
        Self {
            status,
            information,
        }
    }
}

/// Validates control requests and maps each onto one [`ModeStore`] call.
#[derive(Debug, Clone, Default)]
pub struct RequestRouter {
    store: Arc<ModeStore>,
}

impl RequestRouter {
    /// Route requests to a shared store.
    pub fn new(store: Arc<ModeStore>) -> Self {
        Self { store }
    }

    /// Handle one request.
    ///
    /// `SetMode` checks the input size, decodes, checks the domain and only
    /// then stores. `GetMode` checks the output capacity before reading. Any
    /// other code is `UnsupportedOperation`. Failures never touch the store.
    pub fn dispatch(&self, code: u32, input: Option<&[u8]>, output_capacity: usize) -> Response {
        let op = Operation::from_code(code);
        match self.route(op, input, output_capacity) {
            Ok(output) => {
                trace!(op = op.name(), ?output, "request completed");
                Response::success(output)
            }
            Err(err) => {
                let status = StatusCode::from(&err);
                debug!(op = op.name(), code, %status, error = %err, "request rejected");
                Response::failure(status)
            }
        }
    }

    /// Handle one request against a caller-owned output buffer.
    ///
    /// On success of a read exactly four bytes are written to the front of
    /// `output`; anything past them is left as it was. Nothing is written on
    /// failure.
    pub fn dispatch_into(&self, code: u32, input: Option<&[u8]>, output: &mut [u8]) -> Completion {
        let response = self.dispatch(code, input, output.len());
        let written = match (response.output_bytes(), output.get_mut(..MODE_VALUE_SIZE)) {
            (Some(bytes), Some(dst)) => {
                dst.copy_from_slice(&bytes);
                MODE_VALUE_SIZE
            }
            _ => 0,
        };
        Completion::new(response.status, written)
    }

    fn route(
        &self,
        op: Operation,
        input: Option<&[u8]>,
        output_capacity: usize,
    ) -> Result<Option<GpuMode>> {
        match op {
            Operation::SetMode => {
                let mode = GpuMode::decode(input.unwrap_or_default())?;
                self.store.set(mode);
                Ok(None)
            }
            Operation::GetMode => {
                if output_capacity < MODE_VALUE_SIZE {
                    return Err(ModeError::BufferTooSmall {
                        needed: MODE_VALUE_SIZE,
                        actual: output_capacity,
                    });
                }
                Ok(Some(self.store.get()))
            }
            Operation::Unsupported(code) => Err(ModeError::UnsupportedOperation(code)),
        }
    }
}
