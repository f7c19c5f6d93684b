//! Writing [`NetConnectionCommand`].

use std::io;

use rtmprelay_amf0::{Amf0Encoder, Amf0Value};

use super::{NetConnectionCommand, NetConnectionCommandConnectResult};
use crate::command_messages::error::CommandError;

impl NetConnectionCommand {
    pub fn write(self, buf: &mut impl io::Write, transaction_id: f64) -> Result<(), CommandError> {
        let mut encoder = Amf0Encoder::new(buf);

        match self {
            Self::ConnectResult(result) => {
                encoder.encode_string("_result")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_object(
                    &[
                        ("fmsVer".to_owned(), Amf0Value::String(result.fmsver)),
                        ("capabilities".to_owned(), Amf0Value::Number(result.capabilities)),
                    ]
                    .into_iter()
                    .collect(),
                )?;
                encoder.encode_object(
                    &[
                        ("level".to_owned(), Amf0Value::String(result.level.to_string())),
                        ("code".to_owned(), Amf0Value::String(result.code)),
                        ("description".to_owned(), Amf0Value::String(result.description)),
                        ("objectEncoding".to_owned(), Amf0Value::Number(result.encoding)),
                    ]
                    .into_iter()
                    .collect(),
                )?;
            }
            Self::CreateStreamResult { stream_id } => {
                encoder.encode_string("_result")?;
                encoder.encode_number(transaction_id)?;
                encoder.encode_null()?;
                encoder.encode_number(stream_id)?;
            }
            Self::Connect { .. } | Self::Call { .. } | Self::Close | Self::CreateStream => {
                return Err(CommandError::NotServerWritable("NetConnection client command"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use bytes::{BufMut, Bytes, BytesMut};
    use rtmprelay_amf0::{Amf0Decoder, Amf0Value};

    use super::*;

    #[test]
    fn test_netconnection_connect_response() {
        let mut buf = BytesMut::new();

        NetConnectionCommand::ConnectResult(NetConnectionCommandConnectResult::default())
            .write(&mut (&mut buf).writer(), 1.0)
            .expect("write");

        let mut decoder = Amf0Decoder::new(Bytes::from(buf));
        let values = decoder.decode_all().unwrap();

        assert_eq!(values.len(), 4);
        assert_eq!(values[0], Amf0Value::String("_result".to_owned()));
        assert_eq!(values[1], Amf0Value::Number(1.0));
        assert_eq!(
            values[2],
            Amf0Value::Object(
                [
                    ("fmsVer".to_owned(), Amf0Value::String("FMS/3,0,1,123".to_owned())),
                    ("capabilities".to_owned(), Amf0Value::Number(31.0)),
                ]
                .into_iter()
                .collect()
            )
        );
        let Amf0Value::Object(info) = &values[3] else {
            panic!("expected object");
        };
        assert_eq!(info["code"], Amf0Value::String("NetConnection.Connect.Success".to_owned()));
    }

    #[test]
    fn test_netconnection_create_stream_response() {
        let mut buf = BytesMut::new();

        NetConnectionCommand::CreateStreamResult { stream_id: 1.0 }
            .write(&mut (&mut buf).writer(), 2.0)
            .expect("write");

        let mut decoder = Amf0Decoder::new(Bytes::from(buf));
        let values = decoder.decode_all().unwrap();

        assert_eq!(values[0], Amf0Value::String("_result".to_owned()));
        assert_eq!(values[1], Amf0Value::Number(2.0));
        assert_eq!(values[2], Amf0Value::Null);
        assert_eq!(values[3], Amf0Value::Number(1.0));
    }
}
