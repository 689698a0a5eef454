use std::io::{Read, Seek, SeekFrom};

/// Buffered reader that yields lines from the end of a seekable source
/// toward the beginning.
///
/// The reader owns a fixed-size byte buffer and refills it with reads
/// positioned one buffer length before the current window (or from byte 0
/// once the window reaches the start). Lines up to the buffer size are
/// delivered intact; longer lines are split into buffer-sized chunks. A
/// `\r` preceding the line break is stripped, and a single trailing newline
/// at the end of the source is skipped so the last line comes out first.
#[derive(Debug)]
pub struct ReverseLineReader<R: Read + Seek> {
    inner: R,
    buf: Vec<u8>,
    /// Next byte to consume within `buf`, scanning backward; 0 = drained.
    cursor: usize,
    /// Absolute source offset of `buf[0]`.
    base: u64,
    /// Line bytes accumulated in reverse order, possibly across refills.
    pending: Vec<u8>,
    /// The current line was already handed out in chunks, so its line break
    /// must not produce an extra empty line.
    split_line: bool,
}

impl<R: Read + Seek> ReverseLineReader<R> {
    /// Create a reverse reader with the given buffer size, positioned at the
    /// end of the source.
    pub fn new(mut inner: R, buffer_size: usize) -> std::io::Result<ReverseLineReader<R>> {
        let len = inner.seek(SeekFrom::End(0))?;
        let mut reader = ReverseLineReader {
            inner,
            buf: vec![0; buffer_size.max(2)],
            cursor: 0,
            base: len,
            pending: Vec::new(),
            split_line: false,
        };
        reader.fill()?;
        reader.skip_trailing_newline();
        Ok(reader)
    }

    /// Bytes not yet consumed (from the start of the source to the cursor).
    pub fn remaining(&self) -> u64 {
        self.base + self.cursor as u64
    }

    /// Read the next line, moving backward. Returns `Ok(None)` once the
    /// start of the source has been reached and everything was delivered.
    pub fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if self.cursor == 0 && !self.fill()? {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.take_pending()));
            }
            while self.cursor > 0 {
                self.cursor -= 1;
                let byte = self.buf[self.cursor];
                if byte == b'\n' {
                    if self.split_line && self.pending.is_empty() {
                        // This break ends a line already handed out in
                        // chunks; consume it silently.
                        self.split_line = false;
                        continue;
                    }
                    self.split_line = false;
                    return Ok(Some(self.take_pending()));
                }
                self.pending.push(byte);
                if self.pending.len() >= self.buf.len() {
                    // Oversize line: hand out what fits.
                    self.split_line = true;
                    return Ok(Some(self.take_pending()));
                }
            }
        }
    }

    /// Refill the buffer with the bytes directly before the current window.
    /// Returns `false` once the window has reached byte 0.
    fn fill(&mut self) -> std::io::Result<bool> {
        if self.base == 0 {
            return Ok(false);
        }
        let take = self.buf.len().min(self.base as usize);
        let new_base = self.base - take as u64;
        self.inner.seek(SeekFrom::Start(new_base))?;
        self.inner.read_exact(&mut self.buf[..take])?;
        self.base = new_base;
        self.cursor = take;
        Ok(true)
    }

    fn skip_trailing_newline(&mut self) {
        if self.cursor > 0 && self.buf[self.cursor - 1] == b'\n' {
            self.cursor -= 1;
            if self.cursor > 0 && self.buf[self.cursor - 1] == b'\r' {
                self.cursor -= 1;
            }
        }
    }

    fn take_pending(&mut self) -> String {
        self.pending.reverse();
        if self.pending.last() == Some(&b'\r') {
            self.pending.pop();
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(data: &str, buffer_size: usize) -> Vec<String> {
        let mut reader = ReverseLineReader::new(Cursor::new(data.to_string()), buffer_size).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = reader.read_line().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn lines_come_out_in_reverse_order() {
        assert_eq!(read_all("L1\nL2\nL3", 64), vec!["L3", "L2", "L1"]);
    }

    #[test]
    fn trailing_newline_is_skipped() {
        assert_eq!(read_all("L1\nL2\nL3\n", 64), vec!["L3", "L2", "L1"]);
    }

    #[test]
    fn crlf_endings_are_stripped() {
        assert_eq!(read_all("a\r\nb\r\nc\r\n", 64), vec!["c", "b", "a"]);
    }

    #[test]
    fn empty_source_yields_nothing() {
        assert!(read_all("", 64).is_empty());
        assert!(read_all("\n", 64).is_empty());
    }

    #[test]
    fn blank_interior_lines_are_preserved() {
        assert_eq!(read_all("a\n\nb\n", 64), vec!["b", "", "a"]);
    }

    #[test]
    fn oversize_lines_are_split_into_chunks() {
        // Buffer far smaller than the input: long lines come out in
        // buffer-sized chunks, tail chunk first, with no phantom blanks.
        let data = "abcdefghijklmno\n0123456789ABCDEF\nthird";
        assert_eq!(
            read_all(data, 8),
            vec!["third", "89ABCDEF", "01234567", "hijklmno", "abcdefg"]
        );
    }

    #[test]
    fn lines_up_to_the_buffer_size_stay_intact() {
        let data = "aaaa\nbbbb\ncccc";
        assert_eq!(read_all(data, 5), vec!["cccc", "bbbb", "aaaa"]);
    }

    #[test]
    fn remaining_shrinks_toward_zero() {
        let mut reader = ReverseLineReader::new(Cursor::new("ab\ncd\n".to_string()), 64).unwrap();
        let initial = reader.remaining();
        reader.read_line().unwrap();
        assert!(reader.remaining() < initial);
        while reader.read_line().unwrap().is_some() {}
        assert_eq!(reader.remaining(), 0);
    }
}
