//! Frame codec
//!
//! Every exchange on the bus carries one frame: a fixed 8-byte header followed
//! by the payload.
//!
//! ```text
//!  0        1        2        4        6        8
//!  +--------+--------+--------+--------+--------+---------------------
//!  | iface  | rsvd   | len LE | off LE | rsvd   | payload (len bytes)
//!  +--------+--------+--------+--------+--------+---------------------
//! ```
//!
//! A payload-bearing frame always has `offset == HEADER_SIZE`. Outbound frames
//! are padded with `4 - (len % 4)` zero bytes, so an already aligned payload
//! still gets a full 4-byte pad. Invalid inbound frames are dropped, never
//! repaired.

use crate::config::MAX_FRAME_SIZE;
use crate::error::{Error, FrameError, Result};

use zerocopy::byteorder::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// On-wire frame header
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct PayloadHeader {
    interface: u8,
    reserved1: u8,
    len: U16,
    offset: U16,
    reserved2: [u8; 2],
}

/// Size of [`PayloadHeader`] on the wire
pub const HEADER_SIZE: usize = core::mem::size_of::<PayloadHeader>();

/// Largest payload that fits in one frame
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - HEADER_SIZE;

impl PayloadHeader {
    /// Header for a payload of `len` bytes placed right after the header
    pub fn new(len: u16) -> Self {
        Self {
            interface: 0,
            reserved1: 0,
            len: U16::new(len),
            offset: U16::new(HEADER_SIZE as u16),
            reserved2: [0; 2],
        }
    }

    /// Payload byte count
    pub fn len(&self) -> u16 {
        self.len.get()
    }

    /// Distance from frame start to payload start
    pub fn offset(&self) -> u16 {
        self.offset.get()
    }

    /// Interface byte, carried as-is for the upper layer
    pub fn interface(&self) -> u8 {
        self.interface
    }
}

/// Payload bytes plus alignment padding for an outbound frame of `size` bytes
///
/// Always adds between 1 and 4 bytes.
pub const fn padded_len(size: usize) -> usize {
    size + (4 - (size % 4))
}

/// An owned frame buffer (header + payload)
///
/// Move-only: whoever holds it owns it, and dropping it releases it.
#[derive(Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    data: Vec<u8>,
}

fn alloc(capacity: usize) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    data.try_reserve_exact(capacity)
        .map_err(|_| Error::AllocationFailure { size: capacity })?;
    Ok(data)
}

impl FrameBuffer {
    /// Encode `payload` into a new outbound frame
    ///
    /// Only the encoded length is reserved. The scheduler copies the frame
    /// into its own exchange-sized staging buffer.
    pub fn encode(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(Error::InvalidArgument("empty payload"));
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(Error::InvalidArgument("payload larger than a frame"));
        }

        let total = HEADER_SIZE + padded_len(payload.len());
        let mut data = alloc(total)?;

        let header = PayloadHeader::new(payload.len() as u16);
        data.extend_from_slice(header.as_bytes());
        data.extend_from_slice(payload);
        data.resize(total, 0);

        Ok(Self { data })
    }

    /// Zero-filled receive buffer of `len` bytes
    pub fn zeroed(len: usize) -> Result<Self> {
        let mut data = alloc(len)?;
        data.resize(len, 0);
        Ok(Self { data })
    }

    /// Validate a raw inbound frame and trim it to header + payload
    ///
    /// On failure the buffer is dropped here.
    pub fn decode(mut raw: FrameBuffer) -> Result<Self> {
        let (header, _) = PayloadHeader::read_from_prefix(&raw.data)
            .map_err(|_| FrameError::Truncated { len: raw.data.len() })?;

        let offset = header.offset();
        if offset as usize != HEADER_SIZE {
            return Err(FrameError::BadOffset { offset }.into());
        }

        let len = header.len();
        if len == 0 {
            return Err(FrameError::EmptyPayload.into());
        }

        let total = HEADER_SIZE + len as usize;
        if total > MAX_FRAME_SIZE {
            return Err(FrameError::Oversized { len }.into());
        }
        if total > raw.data.len() {
            return Err(FrameError::Truncated { len: raw.data.len() }.into());
        }

        raw.data.truncate(total);
        Ok(raw)
    }

    /// Wrap raw bytes received from elsewhere, e.g. a test peer
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Decoded header
    pub fn header(&self) -> PayloadHeader {
        PayloadHeader::read_from_prefix(&self.data)
            .map(|(header, _)| header)
            .unwrap_or_else(|_| PayloadHeader::new(0))
    }

    /// Payload bytes, without header or padding
    pub fn payload(&self) -> &[u8] {
        let available = self.data.len().saturating_sub(HEADER_SIZE);
        let len = (self.header().len() as usize).min(available);
        &self.data[HEADER_SIZE.min(self.data.len())..][..len]
    }

    /// Whole frame as transferred
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Frame length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Give up the buffer as a plain vector
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7 + 3) as u8).collect()
    }

    fn raw_frame(len: u16, offset: u16) -> FrameBuffer {
        let mut frame = FrameBuffer::zeroed(MAX_FRAME_SIZE).unwrap();
        let bytes = frame.as_mut_bytes();
        bytes[2..4].copy_from_slice(&len.to_le_bytes());
        bytes[4..6].copy_from_slice(&offset.to_le_bytes());
        frame
    }

    #[test]
    fn test_header_layout() {
        assert_eq!(HEADER_SIZE, 8);
        let frame = FrameBuffer::encode(&[0xAA; 0x123]).unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(&bytes[2..4], &[0x23, 0x01]);
        assert_eq!(&bytes[4..6], &[0x08, 0x00]);
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[HEADER_SIZE], 0xAA);
    }

    #[test]
    fn test_round_trip_every_size() {
        for size in 1..=MAX_PAYLOAD_SIZE {
            let payload = pattern(size);
            let encoded = FrameBuffer::encode(&payload).unwrap();
            let decoded = FrameBuffer::decode(encoded).unwrap();
            assert_eq!(decoded.payload(), &payload[..], "size {}", size);
            assert_eq!(decoded.header().len() as usize, size);
            assert_eq!(decoded.len(), HEADER_SIZE + size);
        }
    }

    #[test]
    fn test_round_trip_content() {
        for fill in [0x00u8, 0x08, 0x55, 0xFF] {
            let payload = vec![fill; 64];
            let decoded = FrameBuffer::decode(FrameBuffer::encode(&payload).unwrap()).unwrap();
            assert_eq!(decoded.payload(), &payload[..]);
        }
    }

    #[test]
    fn test_padding_rule() {
        // Aligned sizes still get a full 4-byte pad.
        assert_eq!(padded_len(1), 4);
        assert_eq!(padded_len(3), 4);
        assert_eq!(padded_len(4), 8);
        assert_eq!(padded_len(5), 8);
        assert_eq!(padded_len(8), 12);

        for size in 1..=MAX_PAYLOAD_SIZE {
            let frame = FrameBuffer::encode(&pattern(size)).unwrap();
            assert_eq!(frame.len() - HEADER_SIZE, size + (4 - size % 4));
            assert_eq!(frame.len() % 4, 0);
            assert!(frame.as_bytes()[HEADER_SIZE + size..].iter().all(|&b| b == 0));
        }
    }

    #[test]
    fn test_encode_rejects_bad_sizes() {
        assert!(matches!(
            FrameBuffer::encode(&[]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            FrameBuffer::encode(&vec![0u8; MAX_PAYLOAD_SIZE + 1]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(FrameBuffer::encode(&vec![0u8; MAX_PAYLOAD_SIZE]).is_ok());
    }

    #[test]
    fn test_decode_rejects_bad_offset() {
        for offset in [0u16, 1, 7, 9, 16, 0xFFFF] {
            let err = FrameBuffer::decode(raw_frame(4, offset)).unwrap_err();
            assert!(matches!(
                err,
                Error::ValidationFailure(FrameError::BadOffset { offset: o }) if o == offset
            ));
        }
    }

    #[test]
    fn test_decode_rejects_bad_length() {
        assert!(matches!(
            FrameBuffer::decode(raw_frame(0, HEADER_SIZE as u16)),
            Err(Error::ValidationFailure(FrameError::EmptyPayload))
        ));

        let over = (MAX_PAYLOAD_SIZE + 1) as u16;
        assert!(matches!(
            FrameBuffer::decode(raw_frame(over, HEADER_SIZE as u16)),
            Err(Error::ValidationFailure(FrameError::Oversized { .. }))
        ));

        let max = MAX_PAYLOAD_SIZE as u16;
        assert!(FrameBuffer::decode(raw_frame(max, HEADER_SIZE as u16)).is_ok());
    }

    #[test]
    fn test_decode_all_zero_buffer() {
        // What an idle peer clocks back
        let err = FrameBuffer::decode(FrameBuffer::zeroed(MAX_FRAME_SIZE).unwrap()).unwrap_err();
        assert!(matches!(
            err,
            Error::ValidationFailure(FrameError::BadOffset { offset: 0 })
        ));
    }

    #[test]
    fn test_decode_short_buffer() {
        assert!(matches!(
            FrameBuffer::decode(FrameBuffer::from_vec(vec![0u8; 3])),
            Err(Error::ValidationFailure(FrameError::Truncated { len: 3 }))
        ));

        let mut raw = PayloadHeader::new(32).as_bytes().to_vec();
        raw.extend_from_slice(&[1, 2, 3]);
        assert!(matches!(
            FrameBuffer::decode(FrameBuffer::from_vec(raw)),
            Err(Error::ValidationFailure(FrameError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_decode_trims_to_payload() {
        let mut frame = raw_frame(5, HEADER_SIZE as u16);
        frame.as_mut_bytes()[HEADER_SIZE..HEADER_SIZE + 5].copy_from_slice(b"hello");
        let frame = FrameBuffer::decode(frame).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 5);
        assert_eq!(frame.payload(), b"hello");
    }

    #[test]
    fn test_encode_reserves_encoded_length_only() {
        let small = FrameBuffer::encode(&[1]).unwrap();
        assert_eq!(small.len(), HEADER_SIZE + 4);
        assert!(small.into_vec().capacity() < MAX_FRAME_SIZE);

        let largest = FrameBuffer::encode(&vec![0x5A; MAX_PAYLOAD_SIZE]).unwrap();
        assert_eq!(largest.len(), MAX_FRAME_SIZE + 4);
        assert_eq!(largest.payload().len(), MAX_PAYLOAD_SIZE);
    }
}
