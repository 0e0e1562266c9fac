//! Chunk arithmetic for payload-bearing transactions.

use std::ops::Range;

use crate::error::{Error, Result};

/// How a payload is to be split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub payload_len: usize,
    pub chunk_size: usize,
    pub max_chunks: usize,
}

/// The slice of the payload one chunk carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRange {
    pub index: usize,
    pub range: Range<usize>,
}

impl ChunkRange {
    /// The single range used by transactions that don't chunk, and by
    /// chunked transactions that haven't been frozen yet.
    pub fn whole(payload_len: usize) -> Self {
        Self {
            index: 0,
            range: 0..payload_len,
        }
    }
}

/// `ceil(payload_len / chunk_size)`, never less than one. An empty payload
/// still travels as one (empty) chunk.
pub fn chunk_count(payload_len: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 1;
    }
    payload_len.div_ceil(chunk_size).max(1)
}

impl ChunkPlan {
    /// Splits the payload into ordered ranges, or fails if the plan needs
    /// more chunks than allowed.
    pub fn ranges(&self) -> Result<Vec<ChunkRange>> {
        let count = chunk_count(self.payload_len, self.chunk_size);
        if count > self.max_chunks {
            return Err(Error::argument(format!(
                "message of {} bytes requires {count} chunks but the maximum allowed chunks is {}",
                self.payload_len, self.max_chunks
            )));
        }
        Ok((0..count)
            .map(|index| {
                let start = (index * self.chunk_size).min(self.payload_len);
                let end = (start + self.chunk_size).min(self.payload_len);
                ChunkRange {
                    index,
                    range: start..end,
                }
            })
            .collect())
    }
}
