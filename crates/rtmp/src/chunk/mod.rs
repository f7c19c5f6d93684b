//! RTMP chunk stream codec (RTMP spec, chapter 5.3).
//!
//! Chunking splits a logical message into fixed-size pieces multiplexed
//! across chunk streams so that, for example, a large video frame doesn't
//! starve a command message queued behind it.

mod decoder;
mod define;
mod encoder;
mod errors;

pub use self::decoder::ChunkDecoder;
pub use self::define::{
    Chunk, ChunkBasicHeader, ChunkMessageHeader, ChunkType, CHUNK_SIZE, COMMAND_CHUNK_STREAM_ID, CONTROL_CHUNK_STREAM_ID,
    INIT_CHUNK_SIZE,
};
pub use self::encoder::ChunkEncoder;
pub use self::errors::{ChunkDecodeError, ChunkEncodeError};
