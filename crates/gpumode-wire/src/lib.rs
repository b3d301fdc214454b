//! Request and completion packet framing for gpumode device streams.
//!
//! A client writes one request packet per control call and reads back one
//! completion packet. Both start with the magic `"GM"` and carry
//! little-endian integers, so a stream can be resynchronized or rejected
//! early when something else is talking on the socket.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_completion, decode_request, encode_completion, encode_request, CompletionPacket,
    RequestPacket, WireConfig, COMPLETION_HEADER_SIZE, DEFAULT_MAX_PAYLOAD, MAGIC,
    REQUEST_HEADER_SIZE,
};
pub use error::{Result, WireError};
pub use reader::PacketReader;
pub use writer::PacketWriter;
