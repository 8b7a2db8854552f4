use std::num::NonZeroUsize;
use std::ops::{Bound, RangeBounds};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// 1-based part index, also the artifact suffix
    pub index: usize,
    pub range: ChunkRange,
}

/// Inclusive byte range. `start == end + 1` marks an empty span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start) + 1
        }
    }

    /// Bytes of a resource of `content_length` bytes this range actually covers.
    ///
    /// The last range ends at `content_length` itself, one past the final byte,
    /// so the server clamps it.
    pub fn available_len(&self, content_length: u64) -> u64 {
        if self.is_empty() || self.start >= content_length {
            return 0;
        }

        self.end.min(content_length - 1) - self.start + 1
    }

    pub fn to_range_header(&self) -> Option<headers::Range> {
        if self.is_empty() {
            return None;
        }

        headers::Range::bytes(self).ok()
    }
}

impl<'a> RangeBounds<u64> for &'a ChunkRange {
    fn start_bound(&self) -> Bound<&u64> {
        Bound::Included(&self.start)
    }

    fn end_bound(&self) -> Bound<&u64> {
        Bound::Included(&self.end)
    }
}

/// Splits `[0, content_length]` into `split_count` contiguous ranges.
///
/// Every range but the last spans `content_length / split_count` offsets past its start
/// (the first one includes offset 0 as well); the last one absorbs the remainder.
pub fn compute_ranges(content_length: u64, split_count: NonZeroUsize) -> Vec<ChunkInfo> {
    let split_count = split_count.get();
    let chunk_length = content_length / split_count as u64;
    let mut chunks = Vec::with_capacity(split_count);
    let mut end = 0u64;

    for i in 0..split_count {
        let start = if i == 0 { 0 } else { end + 1 };

        end = if i == split_count - 1 {
            content_length
        } else if i == 0 {
            chunk_length
        } else {
            end + chunk_length
        };

        chunks.push(ChunkInfo {
            index: i + 1,
            range: ChunkRange::new(start, end),
        });
    }

    chunks
}
