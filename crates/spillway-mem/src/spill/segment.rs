//! Segment file header, frame header and naming.
//!
//! Layout on disk:
//! [ magic: u32 ][ version: u16 ][ codec: u8 ][ reserved: u8 ]
//! frame*:
//! [ payload_len: u32 ][ tuple_count: u32 ][ blake3(payload): 32 bytes ]
//! [ payload bytes … ]
//!
//! One frame holds one page. The checksum is computed over the payload as
//! stored (after compression).

use std::fmt;

use serde::{Deserialize, Serialize};

use spillway_core::id::SpillId;

use super::Codec;
use crate::error::{Error, Result};

pub const MAGIC: u32 = 0x5350_5759; // "SPWY"
pub const VERSION: u16 = 1;
pub const HEADER_LEN: usize = 4 + 2 + 1 + 1;
pub const FRAME_HEADER_LEN: usize = 4 + 4 + 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub magic: u32,
    pub version: u16,
    pub codec: Codec,
}

impl SegmentHeader {
    pub fn new(codec: Codec) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            codec,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..6].copy_from_slice(&self.version.to_le_bytes());
        out[6] = self.codec as u8;
        // out[7] reserved
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::Storage("short segment header".into()));
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if magic != MAGIC {
            return Err(Error::Storage(format!("bad segment magic {magic:#010x}")));
        }
        if version != VERSION {
            return Err(Error::Storage(format!(
                "unsupported segment version {version}"
            )));
        }
        let codec = Codec::from_u8(bytes[6])?;
        Ok(Self {
            magic,
            version,
            codec,
        })
    }
}

/// Per-page frame header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub payload_len: u32,
    pub tuple_count: u32,
    pub checksum: [u8; 32],
}

impl FrameHeader {
    pub fn for_payload(payload: &[u8], tuple_count: u32) -> Result<Self> {
        let payload_len = u32::try_from(payload.len())
            .map_err(|_| Error::Encoding(format!("frame payload of {} bytes", payload.len())))?;
        Ok(Self {
            payload_len,
            tuple_count,
            checksum: blake3::hash(payload).into(),
        })
    }

    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut out = [0u8; FRAME_HEADER_LEN];
        out[0..4].copy_from_slice(&self.payload_len.to_le_bytes());
        out[4..8].copy_from_slice(&self.tuple_count.to_le_bytes());
        out[8..].copy_from_slice(&self.checksum);
        out
    }

    /// Caller guarantees `bytes.len() == FRAME_HEADER_LEN`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let payload_len = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let tuple_count = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut checksum = [0u8; 32];
        checksum.copy_from_slice(&bytes[8..FRAME_HEADER_LEN]);
        Self {
            payload_len,
            tuple_count,
            checksum,
        }
    }

    pub fn verify(&self, payload: &[u8]) -> bool {
        let actual: [u8; 32] = blake3::hash(payload).into();
        actual == self.checksum
    }
}

/// Segment identity: owning spill id, merge pass and run index within the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentName {
    pub spill: SpillId,
    pub pass: u32,
    pub run: u32,
}

impl SegmentName {
    pub fn new(spill: SpillId, pass: u32, run: u32) -> Self {
        Self { spill, pass, run }
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spill{}_p{}_r{}", self.spill.get(), self.pass, self.run)
    }
}

/// What a finished writer reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentStats {
    pub frames: u64,
    pub tuples: u64,
    pub bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let bytes = SegmentHeader::new(Codec::None).to_bytes();
        assert_eq!(&bytes[0..4], &MAGIC.to_le_bytes());
        let parsed = SegmentHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.codec, Codec::None);
    }

    #[test]
    fn header_rejects_foreign_magic() {
        let mut bytes = SegmentHeader::new(Codec::None).to_bytes();
        bytes[0] ^= 0xff;
        assert!(SegmentHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn frame_checksum_detects_flip() {
        let payload = b"page payload".to_vec();
        let header = FrameHeader::for_payload(&payload, 3).unwrap();
        let reparsed = FrameHeader::from_bytes(&header.to_bytes());
        assert_eq!(reparsed, header);
        assert!(reparsed.verify(&payload));
        let mut bad = payload.clone();
        bad[0] ^= 1;
        assert!(!reparsed.verify(&bad));
    }

    #[test]
    fn names_render() {
        let name = SegmentName::new(SpillId::new(7), 2, 11);
        assert_eq!(name.to_string(), "spill7_p2_r11");
    }
}
