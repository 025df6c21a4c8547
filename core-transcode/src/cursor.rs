//! Cursor over the most recently decoded unit.
//!
//! A native decoder produces units of whatever size the codec likes; callers
//! ask for arbitrary byte counts. The cursor keeps the tail of a unit that did
//! not fit into the caller's buffer until the next read.

use crate::error::{Result, TranscodeError};
use bytes::Bytes;

/// Read cursor over one decoded unit.
#[derive(Debug, Default, Clone)]
pub struct FrameBufferCursor {
    buffer: Bytes,
    offset: usize,
    remaining: usize,
}

impl FrameBufferCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a new unit.
    ///
    /// Only legal once the previous unit has been fully drained.
    pub fn fill(&mut self, data: Bytes) -> Result<()> {
        debug_assert!(
            self.remaining == 0,
            "fill called with {} undrained bytes",
            self.remaining
        );
        if self.remaining != 0 {
            return Err(TranscodeError::Internal(format!(
                "frame buffer refilled with {} bytes still pending",
                self.remaining
            )));
        }
        self.remaining = data.len();
        self.offset = 0;
        self.buffer = data;
        Ok(())
    }

    /// Copy as many pending bytes as fit into `dest`.
    pub fn drain(&mut self, dest: &mut [u8]) -> usize {
        let copied = dest.len().min(self.remaining);
        if copied == 0 {
            return 0;
        }
        dest[..copied].copy_from_slice(&self.buffer[self.offset..self.offset + copied]);
        self.offset += copied;
        self.remaining -= copied;
        if self.remaining == 0 {
            self.offset = 0;
            self.buffer = Bytes::new();
        }
        copied
    }

    /// Discard pending bytes.
    pub fn clear(&mut self) {
        self.buffer = Bytes::new();
        self.offset = 0;
        self.remaining = 0;
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_drains() {
        let mut cursor = FrameBufferCursor::new();
        cursor.fill(Bytes::from((0u8..10).collect::<Vec<_>>())).unwrap();

        let mut dest = [0u8; 4];
        assert_eq!(cursor.drain(&mut dest), 4);
        assert_eq!(dest, [0, 1, 2, 3]);
        assert_eq!(cursor.offset(), 4);
        assert_eq!(cursor.remaining(), 6);

        assert_eq!(cursor.drain(&mut dest), 4);
        assert_eq!(dest, [4, 5, 6, 7]);

        assert_eq!(cursor.drain(&mut dest), 2);
        assert_eq!(&dest[..2], &[8, 9]);
        assert!(cursor.is_empty());
        assert_eq!(cursor.offset(), 0);

        assert_eq!(cursor.drain(&mut dest), 0);
    }

    #[test]
    fn test_clear_discards_pending() {
        let mut cursor = FrameBufferCursor::new();
        cursor.fill(Bytes::from_static(&[1, 2, 3])).unwrap();
        cursor.clear();
        assert!(cursor.is_empty());
        assert!(cursor.fill(Bytes::from_static(&[4])).is_ok());
    }

    #[test]
    fn test_empty_destination_copies_nothing() {
        let mut cursor = FrameBufferCursor::new();
        cursor.fill(Bytes::from_static(&[1, 2])).unwrap();
        assert_eq!(cursor.drain(&mut []), 0);
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "undrained")]
    fn test_refill_before_drain_panics_in_debug() {
        let mut cursor = FrameBufferCursor::new();
        cursor.fill(Bytes::from_static(&[1, 2])).unwrap();
        let _ = cursor.fill(Bytes::from_static(&[3]));
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_refill_before_drain_is_an_error() {
        let mut cursor = FrameBufferCursor::new();
        cursor.fill(Bytes::from_static(&[1, 2])).unwrap();
        assert!(matches!(
            cursor.fill(Bytes::from_static(&[3])),
            Err(TranscodeError::Internal(_))
        ));
        assert_eq!(cursor.remaining(), 2);
    }
}
