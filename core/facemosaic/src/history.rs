use std::collections::VecDeque;

use crate::pixel_buffer::PixelBuffer;

/// Default number of snapshots kept per session, baseline included.
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// Bounded stack of full-buffer snapshots, most recent last.
///
/// The first entry is the session baseline. When the stack grows past its
/// depth, the oldest entry *after* the baseline is dropped, so undo can
/// always return to the state the editor was opened with.
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: VecDeque<PixelBuffer>,
    max_depth: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_DEPTH)
    }
}

impl HistoryStack {
    /// `max_depth` is raised to 2 so there is always room for the baseline
    /// plus one undoable step.
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_depth: max_depth.max(2),
        }
    }

    /// Push a deep copy of `buffer`.
    pub fn snapshot(&mut self, buffer: &PixelBuffer) {
        self.entries.push_back(buffer.clone());
        self.prune();
    }

    /// Pop the latest snapshot and return the new top, which the caller
    /// restores. With one entry or none this is a no-op returning `None`.
    pub fn undo(&mut self) -> Option<&PixelBuffer> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop_back();
        self.entries.back()
    }

    /// Clear and push exactly one snapshot of `buffer` as the new baseline.
    pub fn reset(&mut self, buffer: &PixelBuffer) {
        self.entries.clear();
        self.entries.push_back(buffer.clone());
    }

    /// Clear without restoring anything.
    pub fn discard(&mut self) {
        self.entries.clear();
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn current(&self) -> Option<&PixelBuffer> {
        self.entries.back()
    }

    pub fn baseline(&self) -> Option<&PixelBuffer> {
        self.entries.front()
    }

    /// Bytes held by all snapshots.
    pub fn memory_usage(&self) -> usize {
        self.entries.iter().map(PixelBuffer::byte_len).sum()
    }

    fn prune(&mut self) {
        while self.entries.len() > self.max_depth {
            self.entries.remove(1);
        }
    }
}
