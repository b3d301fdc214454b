//! Unix domain socket rendezvous for gpumode devices.
//!
//! A device host binds a [`DeviceSocket`] at a filesystem path; clients
//! connect to the same path. Both sides then talk over a [`DeviceStream`].

pub mod error;

#[cfg(unix)]
pub mod socket;
#[cfg(unix)]
pub mod stream;

pub use error::{Result, TransportError};

#[cfg(unix)]
pub use socket::DeviceSocket;
#[cfg(unix)]
pub use stream::{DeviceStream, PeerCredentials};
