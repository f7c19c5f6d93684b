//! Small helpers for pulling [`bytes::Bytes`] slices out of an [`io::Cursor`].

mod cursor_ext;

pub use cursor_ext::BytesCursorExt;
