//! AMF0 error type.

use std::io;
use std::num::TryFromIntError;
use std::string::FromUtf8Error;

use crate::Amf0Marker;

pub type Result<T> = std::result::Result<T, Amf0Error>;

#[derive(thiserror::Error, Debug)]
pub enum Amf0Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A marker byte that isn't any known AMF0 marker at all.
    #[error("unknown marker byte: 0x{0:02x}")]
    UnknownMarker(u8),
    /// A marker that is a real AMF0 marker, but is outside the subset this
    /// codec supports (Number, Boolean, String, Null, Object, StrictArray).
    #[error("unsupported AMF0 marker: {0:?}")]
    UnsupportedMarker(Amf0Marker),
    #[error("unexpected type: expected one of {expected:?}, got {got:?}")]
    UnexpectedType {
        expected: &'static [Amf0Marker],
        got: Amf0Marker,
    },
    /// AMF0's normal String marker can only carry up to `u16::MAX` bytes;
    /// the long-string marker is part of the unsupported subset, so
    /// anything larger is a hard encode error rather than a silent fallback.
    #[error("string of {0} bytes exceeds the {max} byte limit", max = u16::MAX)]
    StringTooLong(usize),
    #[error("length {0} does not fit the wire format")]
    LengthOverflow(#[from] TryFromIntError),
    #[error("string is not valid utf-8: {0}")]
    StringParseError(#[from] FromUtf8Error),
    #[error("object is missing a value for key {0:?}")]
    TruncatedObject(String),
}
