//! Rolling frame retention.
//!
//! [`FrameBuffer`] keeps the last few seconds of decoded frames so the mode
//! classifier can look backward from a splash falling edge. It is a bounded
//! time-windowed deque: `push` appends at the tail and evicts expired frames
//! at the head, and those are the only mutation primitives.

use std::{collections::VecDeque, time::Duration};

use crate::source::DecodedFrame;

/// Time-windowed deque of recent frames.
#[derive(Debug)]
pub struct FrameBuffer {
    window: Duration,
    frames: VecDeque<DecodedFrame>,
}

impl FrameBuffer {
    /// Create a buffer retaining `window` of trailing frames.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            frames: VecDeque::new(),
        }
    }

    /// Append a frame and evict everything older than the window.
    ///
    /// Frames are expected in non-decreasing timestamp order; eviction is
    /// relative to the newest timestamp seen.
    pub fn push(&mut self, frame: DecodedFrame) {
        let now = frame.timestamp;
        self.frames.push_back(frame);
        self.evict_expired(now);
    }

    /// Drop frames older than `now - window` from the head.
    pub fn evict_expired(&mut self, now: Duration) {
        let cutoff = now.saturating_sub(self.window);
        while let Some(front) = self.frames.front() {
            if front.timestamp < cutoff {
                self.frames.pop_front();
            } else {
                break;
            }
        }
    }

    /// Retained frames with timestamps in `[from, to]`, oldest first.
    pub fn range(&self, from: Duration, to: Duration) -> impl Iterator<Item = &DecodedFrame> {
        self.frames
            .iter()
            .filter(move |frame| frame.timestamp >= from && frame.timestamp <= to)
    }

    /// Number of retained frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn frame(seconds: f64) -> DecodedFrame {
        DecodedFrame {
            timestamp: Duration::from_secs_f64(seconds),
            image: RgbImage::new(2, 2),
        }
    }

    #[test]
    fn evicts_beyond_window() {
        let mut buffer = FrameBuffer::new(Duration::from_secs(2));
        for seconds in [0.0, 1.0, 2.0, 3.0, 4.5] {
            buffer.push(frame(seconds));
        }
        // 0.0, 1.0 and 2.0 are older than 4.5 - 2.0.
        assert_eq!(buffer.len(), 2);
        let timestamps: Vec<f64> = buffer
            .range(Duration::ZERO, Duration::from_secs(10))
            .map(|f| f.timestamp.as_secs_f64())
            .collect();
        assert_eq!(timestamps, vec![3.0, 4.5]);
    }

    #[test]
    fn range_is_inclusive() {
        let mut buffer = FrameBuffer::new(Duration::from_secs(60));
        for seconds in [1.0, 2.0, 3.0] {
            buffer.push(frame(seconds));
        }
        let count = buffer
            .range(Duration::from_secs(1), Duration::from_secs(3))
            .count();
        assert_eq!(count, 3);
    }
}
