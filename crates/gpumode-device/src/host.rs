use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use gpumode_core::Device;
use gpumode_transport::{DeviceSocket, DeviceStream, TransportError};
use gpumode_wire::{
    CompletionPacket, PacketReader, PacketWriter, RequestPacket, WireConfig, WireError,
};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Default limit on simultaneously connected clients.
pub const DEFAULT_MAX_CONNECTIONS: usize = 64;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Host behavior.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Packet limits and per-connection timeouts.
    pub wire: WireConfig,
    /// Clients beyond this many are closed as soon as they are accepted.
    pub max_connections: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            wire: WireConfig::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

type ClientRegistry = Arc<Mutex<HashMap<u64, DeviceStream>>>;

/// Serves one [`Device`] at a socket path.
///
/// Each accepted client gets its own worker thread, so requests from
/// different clients are dispatched in parallel. Requests on one connection
/// are handled in order.
pub struct DeviceHost {
    socket: DeviceSocket,
    device: Arc<Device>,
    config: HostConfig,
    running: Arc<AtomicBool>,
    clients: ClientRegistry,
    next_client_id: AtomicU64,
}

impl DeviceHost {
    /// Bind `path` for `device`. Nothing is accepted until [`serve`](Self::serve).
    pub fn bind(path: impl AsRef<Path>, device: Arc<Device>) -> Result<Self> {
        let socket = DeviceSocket::bind(path)?;
        Ok(Self {
            socket,
            device,
            config: HostConfig::default(),
            running: Arc::new(AtomicBool::new(true)),
            clients: Arc::new(Mutex::new(HashMap::new())),
            next_client_id: AtomicU64::new(1),
        })
    }

    pub fn with_config(mut self, config: HostConfig) -> Self {
        self.config = config;
        self
    }

    /// Handle that stops [`serve`](Self::serve) from another thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            running: self.running.clone(),
            path: self.socket.path().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        self.socket.path()
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    /// Number of clients currently connected.
    pub fn active_clients(&self) -> usize {
        lock(&self.clients).len()
    }

    /// Accept and serve clients until the shutdown handle fires.
    ///
    /// On the way out every connected client is disconnected and its worker
    /// joined.
    pub fn serve(&self) -> Result<()> {
        info!(device = self.device.name(), path = ?self.path(), "serving device");

        let mut workers = Vec::new();
        let result = self.accept_loop(&mut workers);

        self.disconnect_all();
        for worker in workers {
            let _ = worker.join();
        }

        info!(device = self.device.name(), "device host stopped");
        result
    }

    fn accept_loop(&self, workers: &mut Vec<JoinHandle<()>>) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            let accepted = self.socket.accept();

            // The wake-up connection from `ShutdownHandle::trigger`.
            if !self.running.load(Ordering::SeqCst) {
                if let Err(err) = accepted {
                    debug!(error = %err, "accept failed during shutdown");
                }
                break;
            }

            workers.retain(|worker| !worker.is_finished());
            if let Some(worker) = self.on_accept(accepted)? {
                workers.push(worker);
            }
        }
        Ok(())
    }

    /// Admit one accepted connection.
    ///
    /// Only a failure of the listening socket itself is returned; anything
    /// that concerns a single connection is logged and that connection dropped.
    fn on_accept(
        &self,
        accepted: gpumode_transport::Result<DeviceStream>,
    ) -> Result<Option<JoinHandle<()>>> {
        match accepted {
            Ok(stream) => Ok(self.admit(stream)),
            Err(err) if is_listener_failure(&err) => Err(err.into()),
            Err(err) => {
                warn!(error = %err, "accept failed; still serving");
                // EMFILE and friends persist until some client goes away.
                thread::sleep(ACCEPT_RETRY_DELAY);
                Ok(None)
            }
        }
    }

    fn admit(&self, stream: DeviceStream) -> Option<JoinHandle<()>> {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut clients = lock(&self.clients);
            if clients.len() >= self.config.max_connections {
                warn!(
                    client = id,
                    max = self.config.max_connections,
                    "connection limit reached; closing client"
                );
                return None;
            }
            match stream.try_clone() {
                Ok(registered) => {
                    clients.insert(id, registered);
                }
                Err(err) => {
                    warn!(client = id, error = %err, "could not register client; closing it");
                    return None;
                }
            }
        }

        let pid = stream.peer_credentials().map(|creds| creds.pid);
        debug!(client = id, ?pid, "client admitted");

        let worker = ClientWorker {
            id,
            device: self.device.clone(),
            clients: self.clients.clone(),
            config: self.config.wire.clone(),
        };
        let spawned = thread::Builder::new()
            .name(format!("gpumode-client-{id}"))
            .spawn(move || worker.run(stream));

        match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                lock(&self.clients).remove(&id);
                warn!(client = id, error = %err, "could not start client worker; closing it");
                None
            }
        }
    }

    fn disconnect_all(&self) {
        let clients = lock(&self.clients);
        for (id, stream) in clients.iter() {
            if let Err(err) = stream.shutdown() {
                debug!(client = id, error = %err, "client shutdown failed");
            }
        }
    }
}

/// Accept errors that mean the listening socket itself is unusable.
fn is_listener_failure(err: &TransportError) -> bool {
    let Some(source) = err.io_source() else {
        return true;
    };
    matches!(
        source.raw_os_error(),
        Some(libc::EBADF | libc::EINVAL | libc::ENOTSOCK | libc::EOPNOTSUPP)
    )
}

/// Stops a running [`DeviceHost`].
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    running: Arc<AtomicBool>,
    path: PathBuf,
}

impl ShutdownHandle {
    /// Ask the host to stop. Safe to call more than once and from any thread.
    pub fn trigger(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            // Unblock the pending accept.
            if let Err(err) = DeviceSocket::connect(&self.path) {
                debug!(error = %err, "wake-up connection failed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Run one request through the device and build its completion.
pub fn handle_request(device: &Device, request: &RequestPacket) -> CompletionPacket {
    let response = device.dispatch(
        request.code,
        request.input(),
        request.output_capacity as usize,
    );
    let output = response
        .output_bytes()
        .map_or_else(Bytes::new, |bytes| Bytes::copy_from_slice(&bytes));
    CompletionPacket::new(response.status, output)
}

struct ClientWorker {
    id: u64,
    device: Arc<Device>,
    clients: ClientRegistry,
    config: WireConfig,
}

impl ClientWorker {
    fn run(self, stream: DeviceStream) {
        match self.serve(stream) {
            Ok(()) => debug!(client = self.id, "client disconnected"),
            Err(err) => warn!(client = self.id, error = %err, "closing client after error"),
        }
        lock(&self.clients).remove(&self.id);
    }

    fn serve(&self, stream: DeviceStream) -> Result<()> {
        let mut reader = PacketReader::for_stream(stream.try_clone()?, self.config.clone())?;
        let mut writer = PacketWriter::for_stream(stream, self.config.clone())?;

        loop {
            let request = match reader.read_request() {
                Ok(request) => request,
                Err(WireError::ConnectionClosed) => return Ok(()),
                Err(err) => return Err(err.into()),
            };
            let completion = handle_request(&self.device, &request);
            writer.write_completion(&completion)?;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::time::{Duration, Instant};

    use gpumode_core::{GpuMode, StatusCode, IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE};

    use super::*;
    use crate::client::DeviceClient;
    use crate::error::DeviceError;

    fn sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/gpumode-{}-{}-{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir.join("device.sock")
    }

    fn start(tag: &str, config: HostConfig) -> (PathBuf, ShutdownHandle, JoinHandle<Result<()>>) {
        let path = sock_path(tag);
        let host = DeviceHost::bind(&path, Arc::new(Device::create(tag)))
            .expect("host should bind")
            .with_config(config);
        let shutdown = host.shutdown_handle();
        let server = thread::spawn(move || host.serve());
        (path, shutdown, server)
    }

    fn stop(path: &Path, shutdown: ShutdownHandle, server: JoinHandle<Result<()>>) {
        shutdown.trigger();
        server
            .join()
            .expect("server thread should not panic")
            .expect("serve should stop cleanly");
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn handle_request_builds_completions() {
        let device = Device::create("unit");

        let get = handle_request(&device, &RequestPacket::new(IOCTL_GET_GPU_MODE, None, 16));
        assert_eq!(get.status, StatusCode::Success);
        assert_eq!(get.output.as_ref(), &[0, 0, 0, 0]);

        let small = handle_request(&device, &RequestPacket::new(IOCTL_GET_GPU_MODE, None, 2));
        assert_eq!(small.status, StatusCode::BufferTooSmall);
        assert_eq!(small.information(), 0);

        let bad = handle_request(
            &device,
            &RequestPacket::new(IOCTL_SET_GPU_MODE, Some(Bytes::from_static(&[5, 0, 0, 0])), 0),
        );
        assert_eq!(bad.status, StatusCode::InvalidValue);
        assert_eq!(bad.information(), 0);
    }

    #[test]
    fn set_and_get_over_socket() {
        let (path, shutdown, server) = start("roundtrip", HostConfig::default());

        let mut client = DeviceClient::open(&path).expect("client should open device");
        assert_eq!(client.get_mode().unwrap(), GpuMode::Integrated);

        client.set_mode(GpuMode::Discrete).unwrap();
        assert_eq!(client.get_mode().unwrap(), GpuMode::Discrete);

        let unsupported = client.device_control(0x0022_2008, None, 4).unwrap();
        assert_eq!(unsupported.status, StatusCode::UnsupportedOperation);
        assert_eq!(unsupported.information(), 0);

        let invalid = client
            .device_control(IOCTL_SET_GPU_MODE, Some(&2u32.to_le_bytes()), 0)
            .unwrap();
        assert_eq!(invalid.status, StatusCode::InvalidValue);
        assert_eq!(client.get_mode().unwrap(), GpuMode::Discrete);

        drop(client);
        stop(&path, shutdown, server);
    }

    #[test]
    fn clients_share_one_device_state() {
        let (path, shutdown, server) = start("shared", HostConfig::default());

        let mut writer = DeviceClient::open(&path).unwrap();
        let mut reader = DeviceClient::open(&path).unwrap();
        writer.set_mode(GpuMode::Discrete).unwrap();
        assert_eq!(reader.get_mode().unwrap(), GpuMode::Discrete);

        drop((writer, reader));
        stop(&path, shutdown, server);
    }

    #[test]
    fn parallel_clients_never_see_torn_values() {
        let (path, shutdown, server) = start("parallel", HostConfig::default());

        let workers: Vec<_> = (0..8)
            .map(|i| {
                let path = path.clone();
                thread::spawn(move || {
                    let mut client = DeviceClient::open(&path).expect("client should open");
                    for _ in 0..100 {
                        if i % 2 == 0 {
                            client.set_mode(GpuMode::Discrete).unwrap();
                        } else {
                            let mode = client.get_mode().expect("get should succeed");
                            assert!(matches!(mode, GpuMode::Integrated | GpuMode::Discrete));
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().expect("client thread should finish");
        }

        let mut client = DeviceClient::open(&path).unwrap();
        assert_eq!(client.get_mode().unwrap(), GpuMode::Discrete);

        drop(client);
        stop(&path, shutdown, server);
    }

    #[test]
    fn malformed_packet_closes_only_that_client() {
        let (path, shutdown, server) = start("garbage", HostConfig::default());

        let mut good = DeviceClient::open(&path).unwrap();
        let mut raw = DeviceSocket::connect(&path).unwrap();
        raw.write_all(&[0xFF; 32]).unwrap();
        let mut buf = [0u8; 1];
        let closed = matches!(raw.read(&mut buf), Ok(0) | Err(_));
        assert!(closed, "host should close a client that sends garbage");

        good.set_mode(GpuMode::Discrete).unwrap();
        assert_eq!(good.get_mode().unwrap(), GpuMode::Discrete);

        drop(good);
        stop(&path, shutdown, server);
    }

    #[test]
    fn connection_limit_closes_extra_clients() {
        let config = HostConfig {
            max_connections: 1,
            ..HostConfig::default()
        };
        let (path, shutdown, server) = start("limit", config);

        let mut first = DeviceClient::open(&path).unwrap();
        assert_eq!(first.get_mode().unwrap(), GpuMode::Integrated);

        let mut second = DeviceClient::open(&path).unwrap();
        let err = second.get_mode().unwrap_err();
        assert!(matches!(err, DeviceError::Wire(_)), "unexpected error: {err}");

        assert_eq!(first.get_mode().unwrap(), GpuMode::Integrated);

        drop((first, second));
        stop(&path, shutdown, server);
    }

    #[test]
    fn shutdown_disconnects_idle_clients() {
        let (path, shutdown, server) = start("shutdown", HostConfig::default());

        let mut client = DeviceClient::open(&path).unwrap();
        client.get_mode().unwrap();

        let started = Instant::now();
        shutdown.trigger();
        server
            .join()
            .expect("server thread should not panic")
            .expect("serve should stop cleanly");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!shutdown.is_running());

        assert!(client.get_mode().is_err());
        assert!(!path.exists(), "device path should be removed after serve");
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn per_connection_accept_failures_keep_serving() {
        let path = sock_path("acceptfail");
        let host = Arc::new(
            DeviceHost::bind(&path, Arc::new(Device::create("acceptfail"))).expect("host should bind"),
        );
        let shutdown = host.shutdown_handle();
        let server = {
            let host = host.clone();
            thread::spawn(move || host.serve())
        };

        for code in [libc::ECONNABORTED, libc::EMFILE, libc::ENFILE] {
            let failed = Err(TransportError::Accept(std::io::Error::from_raw_os_error(code)));
            assert!(matches!(host.on_accept(failed), Ok(None)), "errno {code} ended the host");
        }
        let broken = Err(TransportError::Accept(std::io::Error::from_raw_os_error(libc::EBADF)));
        assert!(host.on_accept(broken).is_err());

        let mut client = DeviceClient::open(&path).expect("host should still accept");
        client.set_mode(GpuMode::Discrete).unwrap();
        assert_eq!(client.get_mode().unwrap(), GpuMode::Discrete);
        assert!(shutdown.is_running());

        drop(client);
        stop(&path, shutdown, server);
    }

    #[test]
    fn idle_timeout_drops_only_the_idle_client() {
        let config = HostConfig {
            wire: WireConfig {
                read_timeout: Some(Duration::from_millis(200)),
                ..WireConfig::default()
            },
            ..HostConfig::default()
        };
        let (path, shutdown, server) = start("idle", config);

        let mut idle = DeviceClient::open(&path).unwrap();
        let mut active = DeviceClient::open(&path).unwrap();

        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(600) {
            active.set_mode(GpuMode::Discrete).unwrap();
            assert_eq!(active.get_mode().unwrap(), GpuMode::Discrete);
            thread::sleep(Duration::from_millis(50));
        }

        assert!(idle.get_mode().is_err(), "idle client should have been dropped");
        assert_eq!(active.get_mode().unwrap(), GpuMode::Discrete);

        drop((idle, active));
        stop(&path, shutdown, server);
    }
}
