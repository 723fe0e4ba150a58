//! Streaming access to a single segment: append pages, read them back in order.

use std::sync::Arc;

use spillway_core::tuple::Tuple;

use super::codec::{self, Codec};
use super::encoding;
use super::segment::{FrameHeader, SegmentHeader, SegmentStats, FRAME_HEADER_LEN, HEADER_LEN};
use super::Storage;
use crate::error::{Error, Result};

/// Append-only writer. Tuples are buffered until a page is full, then written
/// as one frame.
pub struct SegmentWriter {
    storage: Arc<dyn Storage>,
    path: String,
    codec: Codec,
    page_capacity: usize,
    pending: Vec<Tuple>,
    stats: SegmentStats,
}

impl SegmentWriter {
    pub(crate) fn create(
        storage: Arc<dyn Storage>,
        path: String,
        codec: Codec,
        page_capacity: usize,
    ) -> Result<Self> {
        if page_capacity == 0 {
            return Err(Error::Encoding("segment page capacity must be > 0".into()));
        }
        let header = SegmentHeader::new(codec).to_bytes();
        storage.write(&path, &header)?;
        Ok(Self {
            storage,
            path,
            codec,
            page_capacity,
            pending: Vec::with_capacity(page_capacity),
            stats: SegmentStats {
                bytes: HEADER_LEN as u64,
                ..SegmentStats::default()
            },
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Buffer one tuple; a full page is flushed immediately.
    pub fn push(&mut self, tuple: Tuple) -> Result<()> {
        self.pending.push(tuple);
        if self.pending.len() >= self.page_capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Write `tuples` as one frame, after any buffered tuples.
    pub fn write_page(&mut self, tuples: &[Tuple]) -> Result<()> {
        self.flush()?;
        self.write_frame(tuples)
    }

    pub fn finish(mut self) -> Result<SegmentStats> {
        self.flush()?;
        tracing::trace!(
            path = %self.path,
            frames = self.stats.frames,
            tuples = self.stats.tuples,
            "segment finished"
        );
        Ok(self.stats)
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let page = std::mem::take(&mut self.pending);
        self.write_frame(&page)?;
        self.pending = page;
        self.pending.clear();
        Ok(())
    }

    fn write_frame(&mut self, tuples: &[Tuple]) -> Result<()> {
        if tuples.is_empty() {
            return Ok(());
        }
        let count = u32::try_from(tuples.len())
            .map_err(|_| Error::Encoding(format!("{} tuples in one frame", tuples.len())))?;

        let mut raw = Vec::new();
        encoding::encode_tuples(tuples, &mut raw)?;
        let payload = codec::compress(self.codec, &raw)?;
        let header = FrameHeader::for_payload(&payload, count)?;

        let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.extend_from_slice(&header.to_bytes());
        frame.extend_from_slice(&payload);
        self.storage.append(&self.path, &frame)?;

        self.stats.frames += 1;
        self.stats.tuples += u64::from(count);
        self.stats.bytes += frame.len() as u64;
        tracing::trace!(path = %self.path, tuples = count, bytes = frame.len(), "frame written");
        Ok(())
    }
}

/// Sequential reader. Holds no more than one decoded page at a time; the
/// caller owns the page it gets back.
pub struct SegmentReader {
    storage: Arc<dyn Storage>,
    path: String,
    codec: Codec,
    offset: u64,
    size: u64,
}

impl SegmentReader {
    pub(crate) fn open(storage: Arc<dyn Storage>, path: String) -> Result<Self> {
        let size = storage.size(&path)?;
        if size < HEADER_LEN as u64 {
            return Err(Error::Truncated {
                path,
                offset: 0,
                expected: HEADER_LEN,
                found: size as usize,
            });
        }
        let header = SegmentHeader::from_bytes(&storage.read_range(&path, 0, HEADER_LEN)?)?;
        Ok(Self {
            storage,
            path,
            codec: header.codec,
            offset: HEADER_LEN as u64,
            size,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next page, or `None` exactly at the end of the last frame.
    pub fn next_page(&mut self) -> Result<Option<Vec<Tuple>>> {
        if self.offset >= self.size {
            return Ok(None);
        }

        let header_bytes = self.read_exact(FRAME_HEADER_LEN)?;
        let header = FrameHeader::from_bytes(&header_bytes);
        self.offset += FRAME_HEADER_LEN as u64;

        let payload = self.read_exact(header.payload_len as usize)?;
        self.offset += payload.len() as u64;

        if !header.verify(&payload) {
            return Err(Error::ChecksumMismatch(self.path.clone()));
        }
        let raw = codec::decompress(self.codec, &payload)?;
        let tuples = encoding::decode_tuples(&raw, header.tuple_count as usize)?;
        tracing::trace!(path = %self.path, tuples = tuples.len(), "frame read");
        Ok(Some(tuples))
    }

    fn read_exact(&self, len: usize) -> Result<Vec<u8>> {
        let remaining = self.size - self.offset;
        if remaining < len as u64 {
            return Err(Error::Truncated {
                path: self.path.clone(),
                offset: self.offset,
                expected: len,
                found: remaining as usize,
            });
        }
        self.storage.read_range(&self.path, self.offset, len)
    }
}
