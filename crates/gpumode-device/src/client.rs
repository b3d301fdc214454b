use std::path::{Path, PathBuf};

use bytes::Bytes;
use gpumode_core::{GpuMode, StatusCode, IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE, MODE_VALUE_SIZE};
use gpumode_transport::{DeviceSocket, DeviceStream};
use gpumode_wire::{CompletionPacket, PacketReader, PacketWriter, RequestPacket, WireConfig};
use tracing::debug;

use crate::error::{DeviceError, Result};

/// An open handle to a hosted device.
pub struct DeviceClient {
    reader: PacketReader<DeviceStream>,
    writer: PacketWriter<DeviceStream>,
    path: PathBuf,
}

impl DeviceClient {
    /// Open the device at `path` with default limits and no timeouts.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, WireConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: WireConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let stream = DeviceSocket::connect(&path)?;
        let reader = PacketReader::for_stream(stream.try_clone()?, config.clone())?;
        let writer = PacketWriter::for_stream(stream, config)?;
        debug!(?path, "device client opened");
        Ok(Self {
            reader,
            writer,
            path,
        })
    }

    /// Send a raw control request and wait for its completion.
    ///
    /// A non-success status is returned as-is, not as an error, so callers
    /// can inspect exactly what the device answered.
    pub fn device_control(
        &mut self,
        code: u32,
        input: Option<&[u8]>,
        output_capacity: u32,
    ) -> Result<CompletionPacket> {
        let request = RequestPacket::new(code, input.map(Bytes::copy_from_slice), output_capacity);
        self.writer.write_request(&request)?;
        let completion = self.reader.read_completion()?;

        if completion.information() > output_capacity as usize {
            return Err(DeviceError::UnexpectedOutput {
                expected: output_capacity as usize,
                actual: completion.information(),
            });
        }
        Ok(completion)
    }

    /// Store `mode` on the device.
    pub fn set_mode(&mut self, mode: GpuMode) -> Result<()> {
        let completion = self.device_control(IOCTL_SET_GPU_MODE, Some(&mode.to_le_bytes()), 0)?;
        expect_success(completion.status)
    }

    /// Read the device's current mode.
    pub fn get_mode(&mut self) -> Result<GpuMode> {
        let completion = self.device_control(IOCTL_GET_GPU_MODE, None, MODE_VALUE_SIZE as u32)?;
        expect_success(completion.status)?;
        if completion.information() != MODE_VALUE_SIZE {
            return Err(DeviceError::UnexpectedOutput {
                expected: MODE_VALUE_SIZE,
                actual: completion.information(),
            });
        }
        Ok(GpuMode::decode(&completion.output)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn expect_success(status: StatusCode) -> Result<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(DeviceError::Status(status))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use gpumode_core::ModeError;

    use super::*;

    fn sock_path(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/gpumode-client-{}-{}-{}",
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

    /// Answer one request with a canned completion.
    fn canned(tag: &str, reply: CompletionPacket) -> (PathBuf, thread::JoinHandle<RequestPacket>) {
        let path = sock_path(tag);
        let socket = DeviceSocket::bind(&path).expect("socket should bind");
        let server = thread::spawn(move || {
            let stream = socket.accept().expect("accept should succeed");
            let mut reader = PacketReader::new(stream.try_clone().unwrap());
            let mut writer = PacketWriter::new(stream);
            let request = reader.read_request().expect("request should arrive");
            writer.write_completion(&reply).expect("reply should send");
            request
        });
        (path, server)
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn set_mode_sends_encoded_value() {
        let (path, server) = canned("set", CompletionPacket::new(StatusCode::Success, Bytes::new()));

        let mut client = DeviceClient::open(&path).unwrap();
        client.set_mode(GpuMode::Discrete).unwrap();

        let request = server.join().unwrap();
        assert_eq!(request.code, IOCTL_SET_GPU_MODE);
        assert_eq!(request.input(), Some(&[1u8, 0, 0, 0][..]));
        assert_eq!(request.output_capacity, 0);
        cleanup(&path);
    }

    #[test]
    fn failed_status_becomes_error() {
        let (path, server) = canned(
            "status",
            CompletionPacket::new(StatusCode::InvalidValue, Bytes::new()),
        );

        let mut client = DeviceClient::open(&path).unwrap();
        let err = client.set_mode(GpuMode::Integrated).unwrap_err();
        assert!(matches!(err, DeviceError::Status(StatusCode::InvalidValue)));

        server.join().unwrap();
        cleanup(&path);
    }

    #[test]
    fn get_mode_rejects_short_output() {
        let (path, server) = canned("short", CompletionPacket::new(StatusCode::Success, vec![1, 0]));

        let mut client = DeviceClient::open(&path).unwrap();
        let err = client.get_mode().unwrap_err();
        assert!(matches!(
            err,
            DeviceError::UnexpectedOutput {
                expected: 4,
                actual: 2
            }
        ));

        let request = server.join().unwrap();
        assert_eq!(request.code, IOCTL_GET_GPU_MODE);
        assert_eq!(request.output_capacity, 4);
        cleanup(&path);
    }

    #[test]
    fn get_mode_rejects_unknown_value() {
        let (path, server) = canned(
            "unknown",
            CompletionPacket::new(StatusCode::Success, 7u32.to_le_bytes().to_vec()),
        );

        let mut client = DeviceClient::open(&path).unwrap();
        let err = client.get_mode().unwrap_err();
        assert!(matches!(err, DeviceError::Mode(ModeError::InvalidMode(7))));

        server.join().unwrap();
        cleanup(&path);
    }

    #[test]
    fn output_past_capacity_is_rejected() {
        let (path, server) = canned(
            "overflow",
            CompletionPacket::new(StatusCode::Success, vec![0u8; 8]),
        );

        let mut client = DeviceClient::open(&path).unwrap();
        let err = client.device_control(IOCTL_GET_GPU_MODE, None, 4).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::UnexpectedOutput {
                expected: 4,
                actual: 8
            }
        ));

        server.join().unwrap();
        cleanup(&path);
    }

    #[test]
    fn open_missing_device_fails() {
        let path = sock_path("missing");
        let err = DeviceClient::open(&path).err().expect("open should fail");
        assert!(matches!(err, DeviceError::Transport(_)));
        cleanup(&path);
    }
}
