// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fixed-size overlapping windows over document text.
//!
//! A body of `L` characters split with window `C` and overlap `O` yields one
//! chunk when `L <= C` and `ceil((L - O) / (C - O))` chunks otherwise; chunk
//! `i` starts at `i * (C - O)` and adjacent chunks share exactly `O`
//! characters. Lengths are counted in `char`s so no code point is split.

use serde::{Deserialize, Serialize};

use crate::domain::repository::StoreError;

pub const DEFAULT_CHUNK_SIZE: usize = 3000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingPolicy {
    size: usize,
    overlap: usize,
}

impl ChunkingPolicy {
    pub fn new(size: usize, overlap: usize) -> Result<Self, StoreError> {
        if size == 0 {
            return Err(StoreError::MalformedInput("chunk size must be positive".to_string()));
        }
        if overlap >= size {
            return Err(StoreError::MalformedInput(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Number of chunks [`split`](Self::split) produces for `len` characters.
    pub fn chunk_count(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else if len <= self.size {
            1
        } else {
            let stride = self.size - self.overlap;
            (len - self.overlap).div_ceil(stride)
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        // Byte offset of every char boundary, including the end of the string.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let len = bounds.len() - 1;

        let mut chunks = Vec::with_capacity(self.chunk_count(len));
        let mut start = 0;
        while start < len {
            let end = (start + self.size).min(len);
            chunks.push(text[bounds[start]..bounds[end]].to_string());
            if end == len {
                break;
            }
            start = end - self.overlap;
        }
        chunks
    }
}

impl Default for ChunkingPolicy {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}
