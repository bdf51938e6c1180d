//! Byte-offset cursor over the tailed log file.
//!
//! The offset is monotonically non-decreasing while the underlying file is
//! not rotated. Rotation is detected from the file's metadata alone: the
//! current size dropping below the offset, or the write time moving backwards
//! past the last one observed.

use std::time::SystemTime;

/// Tracks how much of the log file has already been consumed.
#[derive(Debug, Clone, Default)]
pub struct PositionCursor {
    offset: u64,
    last_write: Option<SystemTime>,
}

impl PositionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Byte offset of the first unconsumed byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Feed the current file metadata into the cursor.
    ///
    /// Returns `true` when the file was rotated or truncated, in which case
    /// the offset has been reset to 0 and the caller should re-read from the
    /// start. Always records `modified` as the new high-water write time.
    pub fn observe(&mut self, len: u64, modified: Option<SystemTime>) -> bool {
        let shrunk = len < self.offset;
        let went_back = matches!(
            (modified, self.last_write),
            (Some(now), Some(seen)) if now < seen
        );
        let rotated = shrunk || went_back;
        if rotated {
            self.offset = 0;
        }
        if modified.is_some() {
            self.last_write = modified;
        }
        rotated
    }

    /// Advance past `bytes` consumed complete-line bytes.
    pub fn advance(&mut self, bytes: u64) {
        self.offset += bytes;
    }

    /// Jump to an absolute offset (used by `skip_to_end`).
    pub fn seek_to(&mut self, offset: u64) {
        self.offset = offset;
    }

    /// Forget all progress and re-read from the start of the file.
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn offset_is_monotonic_without_rotation() {
        let mut cursor = PositionCursor::new();
        let t0 = SystemTime::now();
        let mut previous = 0;
        for (len, consumed) in [(10, 10), (10, 0), (25, 15), (25, 0)] {
            assert!(!cursor.observe(len, Some(t0)));
            cursor.advance(consumed);
            assert!(cursor.offset() >= previous, "offset went backwards");
            previous = cursor.offset();
        }
        assert_eq!(cursor.offset(), 25);
    }

    #[test]
    fn shrunken_file_resets_offset() {
        let mut cursor = PositionCursor::new();
        cursor.observe(100, None);
        cursor.advance(100);
        assert!(cursor.observe(40, None), "size < offset must rotate");
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn older_write_time_resets_offset() {
        let mut cursor = PositionCursor::new();
        let newer = SystemTime::now();
        let older = newer - Duration::from_secs(3600);
        cursor.observe(100, Some(newer));
        cursor.advance(80);
        // Same size, but the replacement file carries an older mtime.
        assert!(cursor.observe(100, Some(older)));
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn equal_write_time_is_not_rotation() {
        let mut cursor = PositionCursor::new();
        let t0 = SystemTime::now();
        cursor.observe(10, Some(t0));
        cursor.advance(10);
        assert!(!cursor.observe(10, Some(t0)));
        assert_eq!(cursor.offset(), 10);
    }

    #[test]
    fn seek_and_reset() {
        let mut cursor = PositionCursor::new();
        cursor.seek_to(500);
        assert_eq!(cursor.offset(), 500);
        cursor.reset();
        assert_eq!(cursor.offset(), 0);
    }
}
