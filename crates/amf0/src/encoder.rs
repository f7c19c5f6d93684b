//! AMF0 encoder.

use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{Amf0Array, Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// Encodes AMF0 values into any [`io::Write`].
#[derive(Debug)]
pub struct Amf0Encoder<W> {
    writer: W,
}

impl<W> Amf0Encoder<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> Amf0Encoder<W>
where
    W: io::Write,
{
    /// Encodes any [`Amf0Value`], dispatching on its variant.
    pub fn encode_value(&mut self, value: &Amf0Value) -> Result<(), Amf0Error> {
        match value {
            Amf0Value::Number(n) => self.encode_number(*n),
            Amf0Value::Boolean(b) => self.encode_boolean(*b),
            Amf0Value::String(s) => self.encode_string(s),
            Amf0Value::Null => self.encode_null(),
            Amf0Value::Object(o) => self.encode_object(o),
            Amf0Value::Array(a) => self.encode_strict_array(a),
        }
    }

    pub fn encode_boolean(&mut self, value: bool) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Boolean as u8)?;
        self.writer.write_u8(value as u8)?;
        Ok(())
    }

    pub fn encode_number(&mut self, value: f64) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Number as u8)?;
        self.writer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    /// Encodes `value` using the normal String marker.
    ///
    /// Returns [`Amf0Error::StringTooLong`] past `u16::MAX` bytes instead of
    /// falling back to the (unsupported) long-string marker.
    pub fn encode_string(&mut self, value: &str) -> Result<(), Amf0Error> {
        if value.len() > u16::MAX as usize {
            return Err(Amf0Error::StringTooLong(value.len()));
        }

        self.writer.write_u8(Amf0Marker::String as u8)?;
        self.encode_raw_string(value)
    }

    fn encode_raw_string(&mut self, value: &str) -> Result<(), Amf0Error> {
        self.writer.write_u16::<BigEndian>(value.len() as u16)?;
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }

    pub fn encode_null(&mut self) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Null as u8)?;
        Ok(())
    }

    /// Encodes an object. Iteration order of [`Amf0Object`] (a [`std::collections::BTreeMap`])
    /// is already lexicographic by key, so the wire encoding is deterministic.
    pub fn encode_object(&mut self, values: &Amf0Object) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Object as u8)?;

        for (key, value) in values.iter() {
            if key.len() > u16::MAX as usize {
                return Err(Amf0Error::StringTooLong(key.len()));
            }
            self.encode_raw_string(key)?;
            self.encode_value(value)?;
        }

        self.encode_raw_string("")?;
        self.writer.write_u8(Amf0Marker::ObjectEnd as u8)?;
        Ok(())
    }

    pub fn encode_strict_array(&mut self, values: &Amf0Array) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::StrictArray as u8)?;
        self.writer.write_u32::<BigEndian>(values.len().try_into()?)?;

        for value in values {
            self.encode_value(value)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_boolean_round_trips() {
        let mut buf = Vec::new();
        Amf0Encoder::new(&mut buf).encode_value(&Amf0Value::Boolean(true)).unwrap();
        assert_eq!(buf, vec![0x01, 0x01]);
    }

    #[test]
    fn encode_string_at_u16_boundary_succeeds() {
        let s = "a".repeat(u16::MAX as usize);
        let mut buf = Vec::new();
        Amf0Encoder::new(&mut buf).encode_string(&s).unwrap();
        assert_eq!(buf.len(), 1 + 2 + s.len());
    }

    #[test]
    fn encode_string_past_u16_boundary_errors() {
        let s = "a".repeat(u16::MAX as usize + 1);
        let mut buf = Vec::new();
        let err = Amf0Encoder::new(&mut buf).encode_string(&s).unwrap_err();
        assert!(matches!(err, Amf0Error::StringTooLong(_)));
    }

    #[test]
    fn encode_object_orders_keys_lexicographically() {
        let mut object = Amf0Object::new();
        object.insert("zebra".to_owned(), Amf0Value::Boolean(true));
        object.insert("alpha".to_owned(), Amf0Value::Boolean(false));

        let mut buf = Vec::new();
        Amf0Encoder::new(&mut buf).encode_object(&object).unwrap();

        // "alpha" must appear before "zebra" in the encoded bytes.
        let alpha_pos = buf.windows(5).position(|w| w == b"alpha").unwrap();
        let zebra_pos = buf.windows(5).position(|w| w == b"zebra").unwrap();
        assert!(alpha_pos < zebra_pos);
    }
}
