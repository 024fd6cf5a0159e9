//! Frame pool: recycle Frame allocations on the hot parse path.
//!
//! Free lists are keyed by message-length class so a reused frame's
//! buffers already hold the right capacity. Released frames are fully
//! reset first; an acquired frame is indistinguishable from a fresh one.

use std::sync::Mutex;

use crate::frame::Frame;

// Frames kept per class; beyond this, released frames just drop.
const MAX_POOLED: usize = 1024;

/// Message length class a pooled frame was sized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthClass {
    /// 56-bit messages (7 bytes).
    Short,
    /// 112-bit messages (14 bytes).
    Long,
}

impl LengthClass {
    /// Payload size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            LengthClass::Short => 7,
            LengthClass::Long => 14,
        }
    }
}

/// Thread-safe pool of reusable frames, keyed by length class.
#[derive(Debug, Default)]
pub struct FramePool {
    short: Mutex<Vec<Frame>>,
    long: Mutex<Vec<Frame>>,
}

impl FramePool {
    pub fn new() -> Self {
        FramePool::default()
    }

    /// Take a zeroed frame from the pool, or allocate one with its
    /// message buffer sized for the class.
    pub fn acquire(&self, class: LengthClass) -> Frame {
        let mut shelf = self.shelf(class).lock().expect("frame pool poisoned");
        shelf.pop().unwrap_or_else(|| {
            let mut frame = Frame::default();
            frame.message.reserve(class.bytes());
            frame
        })
    }

    /// Reset a frame and return it to the pool.
    ///
    /// Safe for frames that failed mid-parse or mid-decode; reset clears
    /// whatever state they reached.
    pub fn release(&self, mut frame: Frame) {
        let class = if frame.message.capacity() > LengthClass::Short.bytes() {
            LengthClass::Long
        } else {
            LengthClass::Short
        };
        frame.reset();

        let mut shelf = self.shelf(class).lock().expect("frame pool poisoned");
        if shelf.len() < MAX_POOLED {
            shelf.push(frame);
        }
    }

    fn shelf(&self, class: LengthClass) -> &Mutex<Vec<Frame>> {
        match class {
            LengthClass::Short => &self.short,
            LengthClass::Long => &self.long,
        }
    }

    #[cfg(test)]
    fn pooled(&self, class: LengthClass) -> usize {
        self.shelf(class).lock().unwrap().len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avr;
    use std::time::SystemTime;

    #[test]
    fn test_acquire_from_empty_pool() {
        let pool = FramePool::new();
        let frame = pool.acquire(LengthClass::Long);
        assert_eq!(frame, Frame::default());
        assert!(frame.message.capacity() >= 14);
    }

    #[test]
    fn test_release_resets_every_field() {
        let pool = FramePool::new();
        let mut frame = pool.acquire(LengthClass::Long);
        avr::parse_into(
            &mut frame,
            "*8D4840D6202CC371C32CE0576098;",
            SystemTime::now(),
        )
        .unwrap();
        frame.decode().unwrap();
        pool.release(frame);

        let recycled = pool.acquire(LengthClass::Long);
        assert_eq!(recycled, Frame::default());
    }

    #[test]
    fn test_release_keyed_by_capacity() {
        let pool = FramePool::new();
        let mut frame = pool.acquire(LengthClass::Short);
        avr::parse_into(&mut frame, "*5D7C49F828E943;", SystemTime::now()).unwrap();
        pool.release(frame);

        assert_eq!(pool.pooled(LengthClass::Short), 1);
        assert_eq!(pool.pooled(LengthClass::Long), 0);
    }

    #[test]
    fn test_errored_frame_is_releasable() {
        let pool = FramePool::new();
        let mut frame = pool.acquire(LengthClass::Short);
        assert!(avr::parse_into(&mut frame, "*ZZZZZZZZZZZZZZ;", SystemTime::now()).is_err());
        pool.release(frame);
        assert_eq!(pool.acquire(LengthClass::Short), Frame::default());
    }

    #[test]
    fn test_concurrent_acquire_release() {
        use std::sync::Arc;

        let pool = Arc::new(FramePool::new());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = Arc::clone(&pool);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let mut frame = pool.acquire(LengthClass::Long);
                    avr::parse_into(
                        &mut frame,
                        "*8D4840D6202CC371C32CE0576098;",
                        SystemTime::now(),
                    )
                    .unwrap();
                    frame.decode().unwrap();
                    assert_eq!(frame.icao(), Some(0x4840D6));
                    pool.release(frame);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
