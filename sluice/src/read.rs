use std::io::{self, BufReader, Cursor, Read};

use crate::Source;

/// A buffered [`Source`] over a [`Read`] instance.
///
/// Like `std`'s [`BufReader`], this coalesces many small reads into fewer
/// larger reads of the underlying data. On top of that it tracks the
/// absolute input position, keeps the current anchored window addressable
/// for backtracking, and defers IO errors: a failed read truncates the
/// input and the error is reported by [`check_io_error`][Self::check_io_error]
/// once parsing has stopped.
pub struct ReadSource<'a> {
    read: Box<dyn Read + 'a>,
    buf: Vec<u8>,
    // `buf[anchor_in_buf..pos_in_buf + valid_len]` must always be valid and
    // is the addressable window.
    pos_in_buf: usize,
    valid_len: usize,
    anchor_in_buf: usize,
    complete: bool,
    io_error: Option<io::Error>,
    pos_of_buf: usize,
    chunk_size: usize,
}

impl<'a> ReadSource<'a> {
    const DEFAULT_CHUNK_SIZE: usize = 16 << 10;

    /// Creates a `ReadSource` for the data of a [`BufReader`].
    pub fn from_buf_reader(buf_reader: BufReader<impl Read + 'a>) -> Self {
        // Avoid double buffering without discarding any already buffered contents.
        let buf_data = buf_reader.buffer().to_vec();
        if buf_data.is_empty() {
            Self::from_read(buf_reader.into_inner())
        } else {
            Self::from_read(Cursor::new(buf_data).chain(buf_reader.into_inner()))
        }
    }

    /// Creates a `ReadSource` for the data of a [`Read`] instance.
    ///
    /// If the [`Read`] instance is a [`BufReader`], it is better to use
    /// [`from_buf_reader`][Self::from_buf_reader] to avoid unnecessary double
    /// buffering of the data.
    pub fn from_read(read: impl Read + 'a) -> Self {
        Self::from_boxed_dyn_read(Box::new(read))
    }

    /// Creates a `ReadSource` for the data of a boxed [`Read`] instance.
    #[inline(never)]
    pub fn from_boxed_dyn_read(read: Box<dyn Read + 'a>) -> Self {
        ReadSource {
            read,
            buf: vec![],
            pos_in_buf: 0,
            valid_len: 0,
            anchor_in_buf: 0,
            complete: false,
            io_error: None,
            pos_of_buf: 0,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the number of bytes that are read at once.
    ///
    /// This is an upper bound for the [`read`][Read::read] requests made.
    /// `ReadSource` will not issue more read requests than necessary, so
    /// line-buffered interactive input stays usable.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    /// Returns whether all remaining data is buffered.
    ///
    /// This happens when the end of the input was reached or when an IO
    /// error was encountered; use [`check_io_error`][Self::check_io_error]
    /// to tell the two apart.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Returns an encountered IO error as `Err(io_err)`.
    ///
    /// This resets the stored IO error and returns `Ok(())` if no IO error
    /// is stored.
    #[inline]
    pub fn check_io_error(&mut self) -> io::Result<()> {
        if let Some(err) = self.io_error.take() {
            Err(err)
        } else {
            Ok(())
        }
    }

    /// Returns a reference to an encountered IO error.
    ///
    /// This does not reset the stored IO error and returns `None` if no IO
    /// error is stored.
    #[inline]
    pub fn io_error(&self) -> Option<&io::Error> {
        self.io_error.as_ref()
    }

    /// Bytes buffered in front of the cursor.
    #[inline]
    fn buffered(&self) -> &[u8] {
        unsafe {
            // SAFETY `pos_in_buf..pos_in_buf + valid_len` is always kept
            // within range
            debug_assert!(self
                .buf
                .get(self.pos_in_buf..self.pos_in_buf + self.valid_len)
                .is_some());
            self.buf
                .get_unchecked(self.pos_in_buf..self.pos_in_buf + self.valid_len)
        }
    }

    #[cold]
    #[inline(never)]
    fn peek_at_cold(&mut self, offset: usize) -> Option<u8> {
        while self.valid_len <= offset {
            if !self.request_more() {
                return None;
            }
        }
        Some(self.buf[self.pos_in_buf + offset])
    }

    /// Tries to extend the buffer until at least `len` bytes are in front of
    /// the cursor.
    fn request(&mut self, len: usize) {
        while self.valid_len < len && self.request_more() {}
    }

    /// Tries to extend the buffer by reading more data.
    #[cold]
    #[inline(never)]
    fn request_more(&mut self) -> bool {
        if self.complete {
            return false;
        }

        // Realign only when the discardable prefix has grown well past the
        // chunk size; everything from the anchor on must stay addressable.
        if self.anchor_in_buf > self.chunk_size * 2 {
            let drop = self.anchor_in_buf;
            self.buf.copy_within(drop..self.pos_in_buf + self.valid_len, 0);
            self.pos_of_buf = self.pos_of_buf.wrapping_add(drop);
            self.pos_in_buf -= drop;
            self.anchor_in_buf = 0;

            // If the buffer is twice as large as the current window plus
            // another chunk needs, shrink it.
            if self.buf.len() > 2 * (self.pos_in_buf + self.valid_len + self.chunk_size) {
                self.buf.truncate(self.buf.len() / 2);
                self.buf.shrink_to_fit();
            }
        }

        let target_end = self.pos_in_buf + self.valid_len + self.chunk_size;

        if self.buf.len() < target_end {
            self.buf.resize(target_end, 0);
        }

        // Do only a single successful read (to make line buffered repls
        // usable), but do retry on `Interrupted`.
        loop {
            match self
                .read
                .read(&mut self.buf[self.pos_in_buf + self.valid_len..target_end])
            {
                Ok(0) => self.complete = true,
                Ok(n) => {
                    // SAFETY this assert is load bearing, as `self.valid_len`
                    // is trusted but Read implementations aren't
                    assert!(
                        n <= self.chunk_size,
                        "invariant of std::io::Read trait violated"
                    );
                    self.valid_len += n
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.io_error = Some(err);
                    self.complete = true;
                }
            }
            break;
        }

        true
    }

    #[cold]
    #[inline(never)]
    fn advance_cold(&self) -> ! {
        panic!("advanced past the buffered data");
    }

    #[cold]
    #[inline(never)]
    fn window_cold(&self) -> ! {
        panic!("position outside of the anchored window");
    }
}

impl Source for ReadSource<'_> {
    #[inline]
    fn position(&self) -> usize {
        self.pos_of_buf.wrapping_add(self.pos_in_buf)
    }

    #[inline]
    fn peek(&mut self) -> Option<u8> {
        self.peek_at(0)
    }

    #[inline]
    fn peek_at(&mut self, offset: usize) -> Option<u8> {
        if offset < self.valid_len {
            unsafe {
                // SAFETY within `pos_in_buf..pos_in_buf + valid_len`
                Some(*self.buf.get_unchecked(self.pos_in_buf + offset))
            }
        } else {
            self.peek_at_cold(offset)
        }
    }

    #[inline]
    fn advance(&mut self, n: usize) {
        let (next_len, overflow) = self.valid_len.overflowing_sub(n);
        self.valid_len = next_len;
        if overflow {
            self.advance_cold();
        }
        self.pos_in_buf += n;
    }

    #[inline]
    fn seek(&mut self, pos: usize) {
        let target = pos.wrapping_sub(self.pos_of_buf);
        let window_end = self.pos_in_buf + self.valid_len;
        if target < self.anchor_in_buf || target > window_end {
            self.window_cold();
        }
        self.pos_in_buf = target;
        self.valid_len = window_end - target;
    }

    #[inline]
    fn matches(&mut self, needle: &[u8]) -> bool {
        self.request(needle.len());
        self.buffered().starts_with(needle)
    }

    #[inline]
    fn set_anchor(&mut self) {
        self.anchor_in_buf = self.pos_in_buf;
    }

    #[inline]
    fn slice(&self, pos: usize, len: usize) -> &[u8] {
        let start = pos.wrapping_sub(self.pos_of_buf);
        if start < self.anchor_in_buf || start + len > self.pos_in_buf + self.valid_len {
            self.window_cold();
        }
        &self.buf[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out one byte per read call, then an error if one is configured.
    struct Trickle {
        data: Vec<u8>,
        served: usize,
        fail_after: Option<usize>,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if Some(self.served) == self.fail_after {
                return Err(io::Error::new(io::ErrorKind::Other, "broken pipe"));
            }
            if self.served == self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.data[self.served];
            self.served += 1;
            Ok(1)
        }
    }

    fn trickle(data: &[u8]) -> Trickle {
        Trickle {
            data: data.to_vec(),
            served: 0,
            fail_after: None,
        }
    }

    #[test]
    fn peeking_refills() {
        let mut src = ReadSource::from_read(trickle(b"abcd"));
        assert_eq!(src.peek(), Some(b'a'));
        assert_eq!(src.peek_at(3), Some(b'd'));
        assert_eq!(src.peek_at(4), None);
        src.advance(4);
        assert!(src.at_end());
        assert_eq!(src.position(), 4);
    }

    #[test]
    fn seek_within_window() {
        let mut src = ReadSource::from_read(trickle(b"one two"));
        src.set_anchor();
        assert_eq!(src.peek_at(6), Some(b'o'));
        src.advance(4);
        src.seek(1);
        assert_eq!(src.position(), 1);
        assert_eq!(src.peek(), Some(b'n'));
        src.seek(6);
        assert_eq!(src.peek(), Some(b'o'));
        assert_eq!(src.slice(0, 7), b"one two");
    }

    #[test]
    fn matching_is_not_consuming() {
        let mut src = ReadSource::from_read(trickle(b"::rest"));
        assert!(src.matches(b"::"));
        assert!(!src.matches(b"::!"));
        assert!(!src.matches(b"::rest+more"));
        assert_eq!(src.position(), 0);
    }

    #[test]
    fn window_survives_realign() {
        let data: Vec<u8> = (0..200u8).cycle().take(1000).collect();
        let mut src = ReadSource::from_read(trickle(&data));
        src.set_chunk_size(8);
        let mut pos = 0;
        while pos + 10 <= data.len() {
            src.set_anchor();
            for (i, &expected) in data[pos..pos + 10].iter().enumerate() {
                assert_eq!(src.peek_at(i), Some(expected));
            }
            src.advance(10);
            src.seek(pos + 5);
            assert_eq!(src.slice(pos, 10), &data[pos..pos + 10]);
            src.advance(5);
            pos += 10;
        }
    }

    #[test]
    fn io_errors_are_deferred() {
        let mut reader = trickle(b"12345");
        reader.fail_after = Some(3);
        let mut src = ReadSource::from_read(reader);
        assert_eq!(src.peek_at(2), Some(b'3'));
        // The failed read looks like the end of the input.
        assert_eq!(src.peek_at(3), None);
        src.advance(3);
        assert!(src.at_end());
        assert!(src.io_error().is_some());
        assert!(src.check_io_error().is_err());
        assert!(src.check_io_error().is_ok());
    }

    #[test]
    fn from_buf_reader_keeps_buffered_data() {
        let mut buf_reader = BufReader::with_capacity(4, trickle(b"abcdef"));
        use std::io::BufRead;
        // Force some data into the BufReader's buffer.
        let _ = buf_reader.fill_buf().unwrap();
        let mut src = ReadSource::from_buf_reader(buf_reader);
        let mut out = vec![];
        while let Some(b) = src.peek() {
            out.push(b);
            src.advance(1);
        }
        assert_eq!(out, b"abcdef");
    }
}
