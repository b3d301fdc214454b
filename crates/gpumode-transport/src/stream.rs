use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::error::Result;

/// Identity of the process on the other end of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

/// A connected device stream, one per client.
pub struct DeviceStream {
    inner: UnixStream,
}

impl DeviceStream {
    pub(crate) fn new(inner: UnixStream) -> Self {
        Self { inner }
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Duplicate the handle so reads and writes can be owned separately.
    pub fn try_clone(&self) -> Result<Self> {
        Ok(Self::new(self.inner.try_clone()?))
    }

    /// Close both directions; a blocked read on any clone returns EOF.
    pub fn shutdown(&self) -> Result<()> {
        match self.inner.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != std::io::ErrorKind::NotConnected => Err(err.into()),
            _ => Ok(()),
        }
    }

    /// Credentials of the connected process via `SO_PEERCRED`.
    #[cfg(target_os = "linux")]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        use std::os::fd::AsRawFd;

        let mut cred = libc::ucred {
            pid: 0,
            uid: 0,
            gid: 0,
        };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;

        // SAFETY: `cred` and `len` are live, writable and sized for `ucred`; the
        // descriptor belongs to `self.inner` for the duration of the call.
        let rc = unsafe {
            libc::getsockopt(
                self.inner.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                (&mut cred as *mut libc::ucred).cast::<libc::c_void>(),
                &mut len,
            )
        };

        (rc == 0 && len as usize == std::mem::size_of::<libc::ucred>()).then(|| PeerCredentials {
            uid: cred.uid,
            gid: cred.gid,
            pid: cred.pid as u32,
        })
    }

    /// Peer credentials are only read on Linux.
    #[cfg(not(target_os = "linux"))]
    pub fn peer_credentials(&self) -> Option<PeerCredentials> {
        None
    }
}

impl Read for DeviceStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for DeviceStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("transport", &"unix")
            .finish()
    }
}
