use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::trace;

use crate::codec::{decode_completion, decode_request, CompletionPacket, RequestPacket, WireConfig};
use crate::error::{Result, WireError};

const READ_CHUNK_SIZE: usize = 4 * 1024;

type Decoder<P> = fn(&mut BytesMut, usize) -> Result<Option<P>>;

/// Reads whole packets from a byte stream.
///
/// Partial reads are buffered internally; every call returns one complete
/// packet or an error.
pub struct PacketReader<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Read> PacketReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            config,
        }
    }

    /// Read the next request (host side).
    ///
    /// EOF before any byte of a packet is [`WireError::ConnectionClosed`],
    /// which a host treats as a normal disconnect. EOF part-way through a
    /// packet is an `UnexpectedEof` I/O error.
    pub fn read_request(&mut self) -> Result<RequestPacket> {
        self.read_with(decode_request)
    }

    /// Read the next completion (client side).
    pub fn read_completion(&mut self) -> Result<CompletionPacket> {
        self.read_with(decode_completion)
    }

    fn read_with<P>(&mut self, decode: Decoder<P>) -> Result<P> {
        loop {
            if let Some(packet) = decode(&mut self.buf, self.config.max_payload_size)? {
                return Ok(packet);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(0) if self.buf.is_empty() => return Err(WireError::ConnectionClosed),
                Ok(0) => {
                    trace!(buffered = self.buf.len(), "stream closed mid-packet");
                    return Err(WireError::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("stream closed with {} bytes of a packet buffered", self.buf.len()),
                    )));
                }
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            };
            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn config(&self) -> &WireConfig {
        &self.config
    }
}

#[cfg(unix)]
impl PacketReader<gpumode_transport::DeviceStream> {
    /// Wrap a device stream and apply the configured read timeout.
    pub fn for_stream(inner: gpumode_transport::DeviceStream, config: WireConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(|err| WireError::Io(err.into_io()))?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, Bytes};
    use gpumode_core::{StatusCode, IOCTL_GET_GPU_MODE, IOCTL_SET_GPU_MODE};

    use super::*;
    use crate::codec::{encode_completion, encode_request, MAGIC};

    struct Trickle {
        bytes: Vec<u8>,
        pos: usize,
        interrupted: bool,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    #[test]
    fn reads_requests_in_order() {
        let mut wire = BytesMut::new();
        encode_request(
            &RequestPacket::new(IOCTL_SET_GPU_MODE, Some(Bytes::from_static(&[1, 0, 0, 0])), 0),
            &mut wire,
        )
        .unwrap();
        encode_request(&RequestPacket::new(IOCTL_GET_GPU_MODE, None, 4), &mut wire).unwrap();

        let mut reader = PacketReader::new(Cursor::new(wire.to_vec()));
        let set = reader.read_request().unwrap();
        let get = reader.read_request().unwrap();

        assert_eq!(set.code, IOCTL_SET_GPU_MODE);
        assert_eq!(set.input(), Some(&[1u8, 0, 0, 0][..]));
        assert_eq!(get.code, IOCTL_GET_GPU_MODE);
        assert_eq!(get.output_capacity, 4);
        assert!(matches!(
            reader.read_request(),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn byte_at_a_time_with_interrupt() {
        let mut wire = BytesMut::new();
        encode_completion(
            &CompletionPacket::new(StatusCode::Success, vec![1, 0, 0, 0]),
            &mut wire,
        )
        .unwrap();

        let mut reader = PacketReader::new(Trickle {
            bytes: wire.to_vec(),
            pos: 0,
            interrupted: false,
        });
        let completion = reader.read_completion().unwrap();
        assert_eq!(completion.status, StatusCode::Success);
        assert_eq!(completion.output.as_ref(), &[1, 0, 0, 0]);
    }

    #[test]
    fn eof_mid_packet_is_unexpected_eof() {
        let mut partial = BytesMut::new();
        partial.put_slice(&MAGIC);
        partial.put_u32_le(IOCTL_SET_GPU_MODE);
        partial.put_u32_le(0);
        partial.put_u32_le(4);
        partial.put_slice(&[1, 0]);

        let mut reader = PacketReader::new(Cursor::new(partial.to_vec()));
        match reader.read_request() {
            Err(WireError::Io(err)) => assert_eq!(err.kind(), ErrorKind::UnexpectedEof),
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }

    #[test]
    fn eof_after_whole_packets_is_connection_closed() {
        let mut wire = BytesMut::new();
        encode_completion(&CompletionPacket::new(StatusCode::Success, Bytes::new()), &mut wire)
            .unwrap();

        let mut reader = PacketReader::new(Cursor::new(wire.to_vec()));
        assert!(reader.read_completion().is_ok());
        assert!(matches!(
            reader.read_completion(),
            Err(WireError::ConnectionClosed)
        ));
    }

    #[test]
    fn garbage_is_invalid_magic() {
        let mut reader = PacketReader::new(Cursor::new(vec![0u8; 32]));
        assert!(matches!(reader.read_request(), Err(WireError::InvalidMagic)));
    }

    #[test]
    fn honours_configured_limit() {
        let mut wire = BytesMut::new();
        encode_request(
            &RequestPacket::new(IOCTL_SET_GPU_MODE, Some(Bytes::from(vec![0u8; 128])), 0),
            &mut wire,
        )
        .unwrap();

        let config = WireConfig {
            max_payload_size: 64,
            ..WireConfig::default()
        };
        let mut reader = PacketReader::with_config(Cursor::new(wire.to_vec()), config);
        assert!(matches!(
            reader.read_request(),
            Err(WireError::PayloadTooLarge { size: 128, max: 64 })
        ));
    }
}
