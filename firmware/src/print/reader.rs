//! Buffered line reader over a [`FileHandle`].

use crate::app::ports::{FileHandle, StorageError};

use super::gcode::{HEADER_SCAN, MAX_GCODE_LINE};

/// One line of a G-code file, terminator removed.
pub type LineBuf = heapless::Vec<u8, MAX_GCODE_LINE>;

/// Reads `\n`-terminated lines of at most [`MAX_GCODE_LINE`] bytes. A longer
/// line comes back in several pieces. Once a `;` has been seen, the rest of
/// that file line is consumed without being returned, so a comment never
/// spills into a following piece. Tracks how many file bytes have been
/// consumed for progress reporting.
pub struct LineReader {
    file: Box<dyn FileHandle>,
    buf: [u8; HEADER_SCAN],
    start: usize,
    end: usize,
    consumed: u64,
    eof: bool,
    in_comment: bool,
}

impl LineReader {
    pub fn new(file: Box<dyn FileHandle>) -> Self {
        let consumed = file.position();
        Self {
            file,
            buf: [0; HEADER_SCAN],
            start: 0,
            end: 0,
            consumed,
            eof: false,
            in_comment: false,
        }
    }

    /// Next line, or `None` at end of file.
    pub fn next_line(&mut self) -> Result<Option<LineBuf>, StorageError> {
        let mut line = LineBuf::new();
        loop {
            if self.start == self.end {
                if self.eof {
                    return Ok((!line.is_empty()).then_some(line));
                }
                let n = self.file.read(&mut self.buf)?;
                self.start = 0;
                self.end = n;
                if n == 0 {
                    self.eof = true;
                }
                continue;
            }
            if line.is_full() && !self.in_comment {
                return Ok(Some(line));
            }
            let b = self.buf[self.start];
            self.start += 1;
            self.consumed += 1;
            if b == b'\n' {
                self.in_comment = false;
                return Ok(Some(line));
            }
            if self.in_comment {
                continue;
            }
            if b == b';' {
                self.in_comment = true;
            }
            // Checked `is_full` above.
            let _ = line.push(b);
        }
    }

    /// File bytes handed out so far, terminators included.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn into_inner(self) -> Box<dyn FileHandle> {
        self.file
    }
}
