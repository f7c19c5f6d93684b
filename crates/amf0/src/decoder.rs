//! AMF0 decoder.

use bytes::Buf;
use num_traits::FromPrimitive;

use crate::{Amf0Array, Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// Decodes AMF0 values out of any [`bytes::Buf`].
///
/// Cheaply constructed: it only wraps the buffer plus a one-marker lookahead
/// used by [`Amf0Decoder::peek_marker`].
#[derive(Debug)]
pub struct Amf0Decoder<B> {
    buf: B,
    next_marker: Option<Amf0Marker>,
}

impl<B> Amf0Decoder<B>
where
    B: Buf,
{
    pub fn new(buf: B) -> Self {
        Self { buf, next_marker: None }
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    /// Decodes a single top-level value.
    pub fn decode_value(&mut self) -> Result<Amf0Value, Amf0Error> {
        let marker = self.peek_marker()?;

        match marker {
            Amf0Marker::Number => self.decode_number().map(Amf0Value::Number),
            Amf0Marker::Boolean => self.decode_boolean().map(Amf0Value::Boolean),
            Amf0Marker::String => self.decode_string().map(Amf0Value::String),
            Amf0Marker::Null => self.decode_null().map(|()| Amf0Value::Null),
            Amf0Marker::Object => self.decode_object().map(Amf0Value::Object),
            Amf0Marker::StrictArray => self.decode_strict_array().map(Amf0Value::Array),
            other => Err(Amf0Error::UnsupportedMarker(other)),
        }
    }

    /// Decodes values back-to-back until the buffer is exhausted.
    ///
    /// This is how a single RTMP command message (name, transaction id,
    /// then any number of argument values) is read off the wire.
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>, Amf0Error> {
        let mut values = Vec::new();

        while self.has_remaining() {
            values.push(self.decode_value()?);
        }

        Ok(values)
    }

    pub fn peek_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;
        self.next_marker = Some(marker);
        Ok(marker)
    }

    fn read_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        if let Some(marker) = self.next_marker.take() {
            return Ok(marker);
        }

        if !self.buf.has_remaining() {
            return Err(Amf0Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no more bytes for a marker",
            )));
        }

        let byte = self.buf.get_u8();
        Amf0Marker::from_u8(byte).ok_or(Amf0Error::UnknownMarker(byte))
    }

    fn expect_marker(&mut self, expect: &'static [Amf0Marker]) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;

        if expect.contains(&marker) {
            Ok(marker)
        } else {
            Err(Amf0Error::UnexpectedType { expected: expect, got: marker })
        }
    }

    pub fn decode_number(&mut self) -> Result<f64, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Number])?;
        Ok(self.buf.get_f64())
    }

    pub fn decode_boolean(&mut self) -> Result<bool, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Boolean])?;
        Ok(self.buf.get_u8() != 0)
    }

    fn decode_raw_string(&mut self) -> Result<String, Amf0Error> {
        let len = self.buf.get_u16() as usize;
        let bytes = self.buf.copy_to_bytes(len);
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    pub fn decode_string(&mut self) -> Result<String, Amf0Error> {
        self.expect_marker(&[Amf0Marker::String])?;
        self.decode_raw_string()
    }

    pub fn decode_null(&mut self) -> Result<(), Amf0Error> {
        self.expect_marker(&[Amf0Marker::Null])?;
        Ok(())
    }

    fn decode_object_key(&mut self) -> Result<Option<String>, Amf0Error> {
        let key = self.decode_raw_string()?;

        if key.is_empty() && self.peek_marker()? == Amf0Marker::ObjectEnd {
            self.next_marker = None;
            return Ok(None);
        }

        Ok(Some(key))
    }

    pub fn decode_object(&mut self) -> Result<Amf0Object, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Object])?;

        let mut object = Amf0Object::new();

        while let Some(key) = self.decode_object_key()? {
            let value = self.decode_value()?;
            object.insert(key, value);
        }

        Ok(object)
    }

    pub fn decode_strict_array(&mut self) -> Result<Amf0Array, Amf0Error> {
        self.expect_marker(&[Amf0Marker::StrictArray])?;
        let len = self.buf.get_u32() as usize;

        let mut array = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            array.push(self.decode_value()?);
        }

        Ok(array)
    }
}
