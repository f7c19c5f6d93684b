use std::io;

use crate::chunk::ChunkEncodeError;

#[derive(Debug, thiserror::Error)]
pub enum UserControlMessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("chunk encode error: {0}")]
    ChunkEncode(#[from] ChunkEncodeError),
    #[error("truncated user control event, expected at least {0} bytes, got {1}")]
    Truncated(usize, usize),
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = UserControlMessageError::ChunkEncode(ChunkEncodeError::UnknownReadState);
        assert_eq!(error.to_string(), "chunk encode error: unknown read state");

        let error = UserControlMessageError::Truncated(4, 2);
        assert_eq!(error.to_string(), "truncated user control event, expected at least 4 bytes, got 2");
    }
}
