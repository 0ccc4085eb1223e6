//! Incremental line splitting for raw process output

/// Splits a byte stream into text lines
///
/// Both `\n` and `\r` terminate a line, so carriage-return progress updates
/// (as printed by yt-dlp and ffmpeg) arrive as separate lines. A `\r\n` pair
/// counts as one terminator. Blank lines are dropped and invalid UTF-8 is
/// replaced rather than rejected.
#[derive(Debug, Default)]
pub(crate) struct LineSplitter {
    pending: Vec<u8>,
    last_was_cr: bool,
}

impl LineSplitter {
    /// Feed a chunk of bytes, calling `emit` for every completed line
    pub(crate) fn feed(&mut self, chunk: &[u8], mut emit: impl FnMut(String)) {
        for &byte in chunk {
            match byte {
                b'\n' if self.last_was_cr => {
                    self.last_was_cr = false;
                }
                b'\r' | b'\n' => {
                    self.last_was_cr = byte == b'\r';
                    if let Some(line) = self.take_line() {
                        emit(line);
                    }
                }
                _ => {
                    self.last_was_cr = false;
                    self.pending.push(byte);
                }
            }
        }
    }

    /// Flush the trailing unterminated line, if any
    pub(crate) fn finish(mut self) -> Option<String> {
        self.take_line()
    }

    fn take_line(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        if line.trim().is_empty() { None } else { Some(line) }
    }
}
