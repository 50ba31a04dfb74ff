//! Coded-packet wire image.
//!
//! Bit-exact serialization of the fields both ends must agree on. The layout
//! is fixed big-endian:
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |V=1|U| resv  |   Priority    |       Block Number (16)         |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                        Block Seed (32)                        |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |                     Sequence Number (32)                      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |      Payload Length (16)      |        Payload bytes ...      |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! Block numbers wrap modulo 2^16; the seed drives row generation for the
//! whole block; the sequence number identifies the coded symbol within the
//! block. The `U` flag marks packets of a UEP stream.

use bytes::{Buf, BufMut, BytesMut};

use crate::buffer::Symbol;

/// Protocol version carried in the top two flag bits.
pub const PROTOCOL_VERSION: u8 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 14;

/// Largest payload a packet can carry.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// One coded symbol with its block identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodedPacket {
    /// Generation counter, wraps modulo 2^16.
    pub block_number: u16,
    /// Seed the row generator was reset with for this block.
    pub block_seed: u32,
    /// Index of this coded symbol within the block.
    pub sequence_number: u32,
    /// Priority tag (UEP streams; 0 otherwise).
    pub priority: u8,
    /// True for packets of a UEP stream.
    pub uep: bool,
    /// The coded payload.
    pub payload: Symbol,
}

impl CodedPacket {
    /// Serialize header + payload into a fresh buffer.
    ///
    /// Panics if the payload exceeds [`MAX_PAYLOAD_LEN`]; encoders fix the
    /// payload size per block well below that.
    pub fn encode(&self) -> BytesMut {
        assert!(self.payload.len() <= MAX_PAYLOAD_LEN, "payload too large");
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + self.payload.len());
        let flags = (PROTOCOL_VERSION & 0x03) << 6 | (self.uep as u8) << 5;
        buf.put_u8(flags);
        buf.put_u8(self.priority);
        buf.put_u16(self.block_number);
        buf.put_u32(self.block_seed);
        buf.put_u32(self.sequence_number);
        buf.put_u16(self.payload.len() as u16);
        buf.extend_from_slice(self.payload.as_slice());
        buf
    }

    /// Decode a packet. Returns `None` on a short buffer or a version
    /// mismatch.
    pub fn decode(buf: &mut impl Buf) -> Option<Self> {
        if buf.remaining() < HEADER_SIZE {
            return None;
        }
        let flags = buf.get_u8();
        if (flags >> 6) & 0x03 != PROTOCOL_VERSION {
            return None;
        }
        let uep = (flags >> 5) & 1 == 1;
        let priority = buf.get_u8();
        let block_number = buf.get_u16();
        let block_seed = buf.get_u32();
        let sequence_number = buf.get_u32();
        let payload_len = buf.get_u16() as usize;
        if buf.remaining() < payload_len {
            return None;
        }
        let payload = Symbol::from(buf.copy_to_bytes(payload_len));

        Some(CodedPacket {
            block_number,
            block_seed,
            sequence_number,
            priority,
            uep,
            payload,
        })
    }

    /// Total serialized size.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}
