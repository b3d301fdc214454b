use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_completion, encode_request, CompletionPacket, RequestPacket, WireConfig};
use crate::error::{Result, WireError};

/// Writes whole packets to a byte stream.
pub struct PacketWriter<T> {
    inner: T,
    buf: BytesMut,
    config: WireConfig,
}

impl<T: Write> PacketWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, WireConfig::default())
    }

    pub fn with_config(inner: T, config: WireConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
        }
    }

    /// Send one request (client side).
    pub fn write_request(&mut self, packet: &RequestPacket) -> Result<()> {
        self.check_size(packet.input().map_or(0, <[u8]>::len))?;
        self.buf.clear();
        encode_request(packet, &mut self.buf)?;
        self.write_buffered()
    }

    /// Send one completion (host side).
    pub fn write_completion(&mut self, packet: &CompletionPacket) -> Result<()> {
        self.check_size(packet.output.len())?;
        self.buf.clear();
        encode_completion(packet, &mut self.buf)?;
        self.write_buffered()
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.config.max_payload_size {
            return Err(WireError::PayloadTooLarge {
                size,
                max: self.config.max_payload_size,
            });
        }
        Ok(())
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(WireError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if self.retryable(&err) => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if self.retryable(&err) => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// With a write timeout set, `WouldBlock` means the timeout expired.
    fn retryable(&self, err: &std::io::Error) -> bool {
        match err.kind() {
            ErrorKind::Interrupted => true,
            ErrorKind::WouldBlock => self.config.write_timeout.is_none(),
            _ => false,
        }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(unix)]
impl PacketWriter<gpumode_transport::DeviceStream> {
    /// Wrap a device stream and apply the configured write timeout.
    pub fn for_stream(inner: gpumode_transport::DeviceStream, config: WireConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(|err| WireError::Io(err.into_io()))?;
        Ok(Self::with_config(inner, config))
    }
}
