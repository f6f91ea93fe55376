/// Fixed-capacity history of prior transforms for motion vectors.

use std::collections::VecDeque;
use glam::Mat4;

/// Ring buffer of the last `capacity` model matrices, oldest first.
///
/// Capacity is the number of motion-blur sub-frames. Pushing into a full
/// history evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct MotionHistory {
    entries: VecDeque<Mat4>,
    capacity: usize,
}

impl MotionHistory {
    /// Panics on zero capacity.
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            crate::engine_fatal!("lumen3d::MotionHistory", "Motion history capacity must be at least 1");
        }
        Self { entries: VecDeque::with_capacity(capacity), capacity }
    }

    /// Record `transform` and return the previous transform for this frame.
    ///
    /// The previous transform is the entry that was oldest *before* the push:
    /// with a full history of N it is the transform pushed N frames ago. On
    /// the very first push it is `transform` itself.
    ///
    /// Reading the front after the push instead would lag N-1 frames; motion
    /// vectors here span the full N sub-frames.
    pub fn push(&mut self, transform: Mat4) -> Mat4 {
        let previous = self.entries.front().copied().unwrap_or(transform);
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(transform);
        previous
    }

    /// Oldest recorded transform
    pub fn oldest(&self) -> Option<&Mat4> {
        self.entries.front()
    }

    /// Newest recorded transform
    pub fn newest(&self) -> Option<&Mat4> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Mat4> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
#[path = "motion_history_tests.rs"]
mod tests;
