#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use byteorder::ReadBytesExt;

    use super::*;

    #[test]
    fn test_error_display() {
        let err = HandshakeError::Io(std::io::Cursor::new(Vec::<u8>::new()).read_u8().unwrap_err());
        assert_eq!(err.to_string(), "io error: failed to fill whole buffer");
    }
}
