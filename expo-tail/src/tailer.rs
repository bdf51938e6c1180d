//! Poll-based tailer for the append-only status log.
//!
//! Polling (rather than a filesystem watcher) is deliberate: the producing
//! controller appends in bursts that watch APIs are known to miss, and a
//! timer tick that finds nothing new is cheap.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use expo_core::LogEncoding;

use crate::cursor::PositionCursor;
use crate::error::{io_err, TailError};

/// Reads newly appended, complete lines from the status log.
///
/// A line without a trailing terminator is not yet complete — the writer is
/// still mid-append — and is left for the next poll. The cursor only ever
/// advances past fully terminated lines, so nothing is lost or duplicated.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    encoding: LogEncoding,
    cursor: PositionCursor,
}

impl LogTailer {
    pub fn new(path: impl Into<PathBuf>, encoding: LogEncoding) -> Self {
        Self {
            path: path.into(),
            encoding,
            cursor: PositionCursor::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current byte offset of the first unconsumed byte.
    pub fn offset(&self) -> u64 {
        self.cursor.offset()
    }

    /// Return all complete lines appended since the last poll.
    ///
    /// An absent file is not an error — the controller may not have created
    /// it yet — and yields no lines. Rotation resets the cursor and the new
    /// file is read from the start on this same tick.
    pub fn poll(&mut self) -> Result<Vec<String>, TailError> {
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(io_err(&self.path, err)),
        };

        if self.cursor.observe(meta.len(), meta.modified().ok()) {
            tracing::info!(
                path = %self.path.display(),
                "log rotation detected; re-reading from start"
            );
        }

        if meta.len() <= self.cursor.offset() {
            return Ok(Vec::new());
        }

        // `File::open` takes no exclusive lock, so the concurrent writer is
        // never blocked.
        let mut file = File::open(&self.path).map_err(|e| io_err(&self.path, e))?;
        file.seek(SeekFrom::Start(self.cursor.offset()))
            .map_err(|e| io_err(&self.path, e))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map_err(|e| io_err(&self.path, e))?;

        let consumed = complete_prefix_len(&buf, self.encoding);
        let lines = decode_lines(&buf[..consumed], self.encoding);
        self.cursor.advance(consumed as u64);
        Ok(lines)
    }

    /// Forget all progress; the next poll re-reads the whole file.
    pub fn reset_to_beginning(&mut self) {
        self.cursor.reset();
    }

    /// Jump past everything currently in the file.
    ///
    /// Used once at startup after the silent backfill so live polling begins
    /// strictly after the backfilled content.
    pub fn skip_to_end(&mut self) -> Result<(), TailError> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                self.cursor.observe(meta.len(), meta.modified().ok());
                // A stat racing the writer mid code unit can report an odd
                // length; landing there would desync every later terminator
                // scan, so stay on a code-unit boundary.
                let end = match self.encoding {
                    LogEncoding::Utf8 => meta.len(),
                    LogEncoding::Utf16le => meta.len() - meta.len() % 2,
                };
                self.cursor.seek_to(end);
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.cursor.reset();
                Ok(())
            }
            Err(err) => Err(io_err(&self.path, err)),
        }
    }
}

/// Length in bytes of the prefix of `buf` ending at the last complete line
/// terminator, in the file's own encoding. Bytes past it belong to a line the
/// writer has not finished yet.
fn complete_prefix_len(buf: &[u8], encoding: LogEncoding) -> usize {
    match encoding {
        LogEncoding::Utf8 => buf
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0),
        LogEncoding::Utf16le => {
            let mut last = None;
            for i in (0..buf.len().saturating_sub(1)).step_by(2) {
                if buf[i] == b'\n' && buf[i + 1] == 0x00 {
                    last = Some(i + 2);
                }
            }
            last.unwrap_or(0)
        }
    }
}

fn decode_lines(bytes: &[u8], encoding: LogEncoding) -> Vec<String> {
    let text = match encoding {
        LogEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        LogEncoding::Utf16le => {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            char::decode_utf16(units)
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
    };
    text.lines()
        .map(|line| line.trim_end_matches('\r').to_owned())
        .filter(|line| !line.is_empty())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
