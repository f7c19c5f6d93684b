//! A pure-Rust AMF0 encoder and decoder, restricted to the value types an
//! RTMP connection actually exchanges: Number, Boolean, String, Null,
//! Object, and StrictArray.
//!
//! Every other AMF0 marker — References, ECMA arrays, typed objects, dates,
//! the AMF3 switch marker — is rejected with a structured [`Amf0Error`]
//! rather than silently reinterpreted as one of the supported types.
//!
//! ```rust
//! use rtmprelay_amf0::{decode_value, encode_value, Amf0Value};
//!
//! let mut buf = Vec::new();
//! encode_value(&mut buf, &Amf0Value::Boolean(true)).unwrap();
//! assert_eq!(decode_value(&buf).unwrap(), Amf0Value::Boolean(true));
//! ```
#![deny(unsafe_code)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::Amf0Decoder;
pub use encoder::Amf0Encoder;
pub use error::{Amf0Error, Result};
pub use value::{Amf0Array, Amf0Object, Amf0Value};

/// AMF0 marker bytes, defined by the AMF0 specification section 2.1.
///
/// The decoder only ever returns values for the markers documented as
/// "supported" below; the rest exist so that rejection errors can name the
/// marker a peer tried to send.
#[derive(Debug, PartialEq, Eq, Clone, Copy, num_derive::FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    /// Supported.
    Number = 0x00,
    /// Supported.
    Boolean = 0x01,
    /// Supported.
    String = 0x02,
    /// Supported.
    Object = 0x03,
    MovieClipMarker = 0x04,
    /// Supported.
    Null = 0x05,
    Undefined = 0x06,
    Reference = 0x07,
    EcmaArray = 0x08,
    /// Internal sentinel inside [`Amf0Decoder::decode_object`]; never a standalone value.
    ObjectEnd = 0x09,
    /// Supported.
    StrictArray = 0x0a,
    Date = 0x0b,
    LongString = 0x0c,
    Unsupported = 0x0d,
    Recordset = 0x0e,
    XmlDocument = 0x0f,
    TypedObject = 0x10,
    /// Switches the remainder of the stream to AMF3 encoding.
    AvmPlusObject = 0x11,
}

/// Encodes a single value into `writer`, appending to whatever is already there.
pub fn encode_value(writer: &mut impl std::io::Write, value: &Amf0Value) -> Result<()> {
    Amf0Encoder::new(writer).encode_value(value)
}

/// Encodes a sequence of values back-to-back, e.g. an RPC command's
/// `(name, transaction_id, ...arguments)` tuple.
pub fn encode_all<'a>(writer: &mut impl std::io::Write, values: impl IntoIterator<Item = &'a Amf0Value>) -> Result<()> {
    let mut encoder = Amf0Encoder::new(writer);
    for value in values {
        encoder.encode_value(value)?;
    }
    Ok(())
}

/// Decodes a single value from the front of `bytes`.
pub fn decode_value(bytes: impl bytes::Buf) -> Result<Amf0Value> {
    Amf0Decoder::new(bytes).decode_value()
}

/// Decodes every value packed into `bytes` until it is exhausted.
pub fn decode_all(bytes: impl bytes::Buf) -> Result<Vec<Amf0Value>> {
    Amf0Decoder::new(bytes).decode_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_all_then_decode_all_round_trips() {
        let values = vec![
            Amf0Value::String("connect".to_owned()),
            Amf0Value::Number(1.0),
            Amf0Value::Null,
        ];

        let mut buf = Vec::new();
        encode_all(&mut buf, &values).unwrap();

        let decoded = decode_all(bytes::Bytes::from(buf)).unwrap();
        assert_eq!(decoded, values);
    }
}
