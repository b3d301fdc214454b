use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::DeviceStream;

/// Listening end of a device path.
///
/// The socket file stands in for a device's symbolic link: clients find the
/// device by path. The file is removed on drop, but only if it is still the
/// inode this socket created.
pub struct DeviceSocket {
    listener: UnixListener,
    path: PathBuf,
    identity: (u64, u64),
}

impl DeviceSocket {
    /// Permissions applied to a freshly bound device path.
    pub const DEFAULT_MODE: u32 = 0o600;

    #[cfg(target_os = "linux")]
    const MAX_PATH_LEN: usize = 108;
    #[cfg(not(target_os = "linux"))]
    const MAX_PATH_LEN: usize = 104;

    /// Bind the device path with [`DEFAULT_MODE`](Self::DEFAULT_MODE).
    ///
    /// A stale socket file at `path` is replaced; any other kind of file is
    /// left alone and the bind fails.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, Self::DEFAULT_MODE)
    }

    /// Bind the device path with explicit permissions.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        check_path_len(&path, Self::MAX_PATH_LEN)?;
        remove_stale_socket(&path)?;

        let bind_err = |source: std::io::Error| TransportError::Bind {
            path: path.clone(),
            source,
        };

        let listener = UnixListener::bind(&path).map_err(bind_err)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
            .map_err(bind_err)?;
        let metadata = std::fs::symlink_metadata(&path).map_err(bind_err)?;

        info!(?path, mode = %format!("{mode:o}"), "device path bound");
        Ok(Self {
            listener,
            identity: (metadata.dev(), metadata.ino()),
            path,
        })
    }

    /// Block until a client opens the device.
    pub fn accept(&self) -> Result<DeviceStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!(path = ?self.path, "client connected");
        Ok(DeviceStream::new(stream))
    }

    /// Open a device path bound by another process or thread.
    pub fn connect(path: impl AsRef<Path>) -> Result<DeviceStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|source| TransportError::Connect {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?path, "device opened");
        Ok(DeviceStream::new(stream))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DeviceSocket {
    fn drop(&mut self) {
        let Ok(metadata) = std::fs::symlink_metadata(&self.path) else {
            return;
        };
        if metadata.file_type().is_socket() && (metadata.dev(), metadata.ino()) == self.identity {
            debug!(path = ?self.path, "removing device path");
            let _ = std::fs::remove_file(&self.path);
        } else {
            debug!(path = ?self.path, "device path replaced; leaving it");
        }
    }
}

impl std::fmt::Debug for DeviceSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSocket")
            .field("path", &self.path)
            .finish()
    }
}

fn check_path_len(path: &Path, max: usize) -> Result<()> {
    let len = path.as_os_str().len();
    if len >= max {
        return Err(TransportError::PathTooLong {
            path: path.to_path_buf(),
            len,
            max,
        });
    }
    Ok(())
}

fn remove_stale_socket(path: &Path) -> Result<()> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(TransportError::Bind {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if !metadata.file_type().is_socket() {
        return Err(TransportError::Bind {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "existing path is not a unix socket",
            ),
        });
    }

    debug!(?path, "removing stale device socket");
    std::fs::remove_file(path).map_err(|source| TransportError::Bind {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gpumode-transport-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect() {
        let dir = temp_dir("accept");
        let path = dir.join("gpu.sock");
        let socket = DeviceSocket::bind(&path).unwrap();
        assert!(path.exists());

        let client_path = path.clone();
        let client = std::thread::spawn(move || {
            let mut stream = DeviceSocket::connect(&client_path).unwrap();
            stream.write_all(&[1, 0, 0, 0]).unwrap();
        });

        let mut server = socket.accept().unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 0, 0, 0]);
        client.join().unwrap();

        drop(socket);
        assert!(!path.exists(), "device path should be removed on drop");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_applies_restrictive_mode() {
        let dir = temp_dir("mode");
        let path = dir.join("gpu.sock");
        let socket = DeviceSocket::bind(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(socket);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_replaces_stale_socket() {
        let dir = temp_dir("stale");
        let path = dir.join("gpu.sock");
        let stale = UnixListener::bind(&path).unwrap();
        drop(stale);
        assert!(path.exists());

        let socket = DeviceSocket::bind(&path).expect("stale socket is replaced");
        drop(socket);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_refuses_regular_file() {
        let dir = temp_dir("file");
        let path = dir.join("gpu.sock");
        std::fs::write(&path, b"not a socket").unwrap();

        let result = DeviceSocket::bind(&path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));
        assert!(path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_long_path() {
        let path = format!("/tmp/{}.sock", "g".repeat(200));
        let result = DeviceSocket::bind(&path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn drop_leaves_replaced_path() {
        let dir = temp_dir("replaced");
        let path = dir.join("gpu.sock");
        let socket = DeviceSocket::bind(&path).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"someone else").unwrap();

        drop(socket);
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_to_missing_path_fails() {
        let dir = temp_dir("missing");
        let err = DeviceSocket::connect(dir.join("absent.sock")).unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert_eq!(
            err.io_source().map(std::io::Error::kind),
            Some(std::io::ErrorKind::NotFound)
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
