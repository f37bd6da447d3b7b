//! Frame queues
//!
//! Unbounded FIFOs of owned frames, lock-free so they can be pushed from the
//! handshake context, the worker and arbitrary callers alike. `pop` never
//! waits.

use crate::frame::FrameBuffer;
use crossbeam_queue::SegQueue;

/// Insertion-ordered queue of owned frames
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: SegQueue<FrameBuffer>,
}

impl FrameQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame, taking ownership of it
    pub fn push(&self, frame: FrameBuffer) {
        self.frames.push(frame);
    }

    /// Remove the oldest frame, or `None` right away if there is none
    pub fn pop(&self) -> Option<FrameBuffer> {
        self.frames.pop()
    }

    /// Number of frames currently queued
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Release every queued frame, returning how many there were
    pub fn drain(&self) -> usize {
        let mut count = 0;
        while self.frames.pop().is_some() {
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_fifo_order() {
        let queue = FrameQueue::new();
        for i in 1..=5u8 {
            queue.push(FrameBuffer::encode(&[i]).unwrap());
        }
        assert_eq!(queue.len(), 5);
        for i in 1..=5u8 {
            assert_eq!(queue.pop().unwrap().payload(), &[i]);
        }
        assert!(queue.pop().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain() {
        let queue = FrameQueue::new();
        for _ in 0..3 {
            queue.push(FrameBuffer::encode(b"x").unwrap());
        }
        assert_eq!(queue.drain(), 3);
        assert_eq!(queue.drain(), 0);
    }

    #[test]
    fn test_concurrent_producers() {
        const PRODUCERS: usize = 8;
        const PER_PRODUCER: usize = 500;

        let queue = Arc::new(FrameQueue::new());
        std::thread::scope(|s| {
            for p in 0..PRODUCERS {
                let queue = Arc::clone(&queue);
                s.spawn(move || {
                    for m in 0..PER_PRODUCER {
                        let tag = ((p * PER_PRODUCER + m) as u32).to_le_bytes();
                        queue.push(FrameBuffer::encode(&tag).unwrap());
                    }
                });
            }
        });

        let mut seen = HashSet::new();
        while let Some(frame) = queue.pop() {
            let tag = u32::from_le_bytes(frame.payload().try_into().unwrap());
            assert!(seen.insert(tag), "duplicate frame {}", tag);
        }
        assert_eq!(seen.len(), PRODUCERS * PER_PRODUCER);
    }
}
