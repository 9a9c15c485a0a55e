//! Fixed-size JobPack header.
//!
//! ```text
//!  0        4        8        12       16       20
//!  +--------+--------+--------+--------+--------+----------------
//!  | magic  | off[0] | off[1] | off[2] | off[3] | sections ...
//!  +--------+--------+--------+--------+--------+----------------
//! ```
//!
//! All fields are big-endian `u32`. Offsets are absolute positions in the
//! whole buffer, header included.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::{JobPackError, Result};

/// Magic identifying the JobPack format.
pub const MAGIC: u32 = 0xd5c0;

/// Number of section offsets carried in the header.
pub const NUM_SECTIONS: usize = 4;

/// Magic plus one `u32` per section.
pub const HEADER_SIZE: usize = 4 + 4 * NUM_SECTIONS;

pub type Offsets = [u32; NUM_SECTIONS];

/// Decoded header. Nothing about it has been checked yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u32,
    pub offsets: Offsets,
}

impl Header {
    pub fn new(offsets: Offsets) -> Self {
        Self {
            magic: MAGIC,
            offsets,
        }
    }

    /// Append the encoded header to `buf`.
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_u32(self.magic);
        for offset in self.offsets {
            buf.put_u32(offset);
        }
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

/// Encode a header carrying the default magic.
pub fn encode_header(offsets: Offsets) -> Bytes {
    Header::new(offsets).encode()
}

/// Encode a header with an arbitrary magic. Mostly useful to build
/// deliberately broken packs.
pub fn encode_header_with_magic(magic: u32, offsets: Offsets) -> Bytes {
    Header { magic, offsets }.encode()
}

/// Read the magic and the offsets from the front of `buffer`.
///
/// Only fails if the buffer cannot hold a full header.
pub fn decode_header(buffer: &[u8]) -> Result<Header> {
    if buffer.len() < HEADER_SIZE {
        return Err(JobPackError::TruncatedHeader(buffer.len()));
    }

    let mut buf = &buffer[..HEADER_SIZE];
    let magic = buf.get_u32();
    let mut offsets = [0u32; NUM_SECTIONS];
    for offset in offsets.iter_mut() {
        *offset = buf.get_u32();
    }

    debug!("Decoded header magic={:#x} offsets={:?}", magic, offsets);
    Ok(Header { magic, offsets })
}
