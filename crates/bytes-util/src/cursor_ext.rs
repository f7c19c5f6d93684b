use std::io;

use bytes::{Buf, Bytes};

/// Extension trait for pulling zero-copy [`Bytes`] slices out of an [`io::Cursor<Bytes>`].
///
/// [`Bytes`] is reference-counted, so every extracted slice shares the
/// underlying allocation with the original buffer instead of copying it.
pub trait BytesCursorExt {
    /// Extracts `size` bytes starting at the cursor's current position,
    /// advancing the cursor past them.
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes>;

    /// Extracts everything remaining in the cursor, advancing it to the end.
    fn extract_remaining(&mut self) -> Bytes;
}

impl BytesCursorExt for io::Cursor<Bytes> {
    fn extract_bytes(&mut self, size: usize) -> io::Result<Bytes> {
        if self.remaining() < size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("not enough bytes remaining: wanted {size}, have {}", self.remaining()),
            ));
        }

        Ok(self.get_mut().copy_to_bytes(size))
    }

    fn extract_remaining(&mut self) -> Bytes {
        let remaining = self.remaining();
        self.get_mut().copy_to_bytes(remaining)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::Bytes;

    use super::BytesCursorExt;

    #[test]
    fn extract_bytes_advances_cursor() {
        let mut cursor = Cursor::new(Bytes::from_static(b"hello world"));
        let hello = cursor.extract_bytes(5).unwrap();
        assert_eq!(&hello[..], b"hello");
        let rest = cursor.extract_remaining();
        assert_eq!(&rest[..], b" world");
    }

    #[test]
    fn extract_bytes_rejects_short_buffer() {
        let mut cursor = Cursor::new(Bytes::from_static(b"hi"));
        assert!(cursor.extract_bytes(10).is_err());
    }

    #[test]
    fn extract_remaining_on_empty_buffer() {
        let mut cursor = Cursor::new(Bytes::new());
        assert_eq!(cursor.extract_remaining().len(), 0);
    }
}
