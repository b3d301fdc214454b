//! Serve a gpumode device over a socket path and talk to it as a client.
//!
//! [`DeviceHost`] owns one [`Device`](gpumode_core::Device) and hands every
//! accepted connection to its own worker thread, so requests from different
//! clients reach the router in parallel. [`DeviceClient`] is the other end:
//! it opens the path and turns control calls into request packets.

pub mod client;
pub mod error;
pub mod host;

pub use client::DeviceClient;
pub use error::{DeviceError, Result};
pub use host::{handle_request, DeviceHost, HostConfig, ShutdownHandle, DEFAULT_MAX_CONNECTIONS};
