//! Bounded FIFO of every frame the link has transmitted.

use std::collections::VecDeque;

use crate::frame::HISTORY_CAPACITY;

/// Sent frames, oldest first. Index `i` addresses the `i`-th frame still
/// retained; indices shift down once the oldest frame is evicted.
#[derive(Debug, Clone)]
pub struct PacketHistory {
    frames: VecDeque<Vec<u8>>,
    capacity: usize,
}

impl Default for PacketHistory {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl PacketHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.min(HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append a frame, evicting the oldest past capacity.
    pub fn push(&mut self, frame: Vec<u8>) {
        self.frames.push_back(frame);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.frames.get(index).map(Vec::as_slice)
    }

    /// Copy of the most recent `count` frames in send order, or all of them
    /// when `count` exceeds the history length.
    pub fn last(&self, count: usize) -> Vec<Vec<u8>> {
        let skip = self.frames.len().saturating_sub(count);
        self.frames.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.frames.iter().map(Vec::as_slice)
    }
}
