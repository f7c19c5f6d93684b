//! Writing [`OnStatus`].

use std::io;

use rtmprelay_amf0::{Amf0Encoder, Amf0Value};

use super::OnStatus;
use crate::command_messages::error::CommandError;

impl OnStatus {
    /// Writes an onStatus command to the given writer.
    pub fn write(self, buf: &mut impl io::Write, transaction_id: f64) -> Result<(), CommandError> {
        let mut encoder = Amf0Encoder::new(buf);

        encoder.encode_string("onStatus")?;
        encoder.encode_number(transaction_id)?;
        encoder.encode_null()?; // command object

        let mut info_object = self.others.unwrap_or_default();
        info_object.insert("level".to_owned(), Amf0Value::String(self.level.to_string()));
        info_object.insert("code".to_owned(), Amf0Value::String(self.code));
        if let Some(description) = self.description {
            info_object.insert("description".to_owned(), Amf0Value::String(description));
        }

        encoder.encode_object(&info_object)?;

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::{BufMut, Bytes, BytesMut};
    use rtmprelay_amf0::{Amf0Decoder, Amf0Value};

    use super::*;
    use crate::command_messages::CommandResultLevel;

    #[test]
    fn test_write_on_status() {
        let mut buf = BytesMut::new();

        OnStatus {
            level: CommandResultLevel::Status,
            code: "idk".to_owned(),
            description: Some("description".to_owned()),
            others: Some([("testkey".to_owned(), Amf0Value::String("testvalue".to_owned()))].into_iter().collect()),
        }
        .write(&mut (&mut buf).writer(), 1.0)
        .expect("write");

        let mut decoder = Amf0Decoder::new(Bytes::from(buf));
        let values = decoder.decode_all().unwrap();

        assert_eq!(values.len(), 4);
        assert_eq!(values[0], Amf0Value::String("onStatus".to_owned()));
        assert_eq!(values[1], Amf0Value::Number(1.0));
        assert_eq!(values[2], Amf0Value::Null);
        let Amf0Value::Object(info) = &values[3] else {
            panic!("expected object");
        };
        assert_eq!(info["level"], Amf0Value::String("status".to_owned()));
        assert_eq!(info["code"], Amf0Value::String("idk".to_owned()));
        assert_eq!(info["description"], Amf0Value::String("description".to_owned()));
        assert_eq!(info["testkey"], Amf0Value::String("testvalue".to_owned()));
    }
}
