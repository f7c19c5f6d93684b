//! Reading [`Command`].

use std::convert::Infallible;
use std::str::FromStr;

use bytes::Bytes;
use rtmprelay_amf0::Amf0Decoder;

use super::error::CommandError;
use super::netconnection::NetConnectionCommand;
use super::netstream::NetStreamCommand;
use super::{Command, CommandResultLevel, CommandType};

impl Command {
    /// Reads a [`Command`] from the given payload.
    pub fn read(payload: Bytes) -> Result<Self, CommandError> {
        let mut decoder = Amf0Decoder::new(payload);

        let command_name = decoder.decode_string()?;
        let transaction_id = decoder.decode_number()?;

        let command_type = CommandType::read(command_name, &mut decoder)?;

        Ok(Self {
            transaction_id,
            command_type,
        })
    }
}

impl CommandType {
    fn read(command_name: String, decoder: &mut Amf0Decoder<Bytes>) -> Result<Self, CommandError> {
        if let Some(command) = NetConnectionCommand::read(&command_name, decoder)? {
            return Ok(Self::NetConnection(command));
        }

        if let Some(command) = NetStreamCommand::read(&command_name, decoder)? {
            return Ok(Self::NetStream(command));
        }

        let values = decoder.decode_all()?;
        Ok(Self::Unknown { command_name, values })
    }
}

impl FromStr for CommandResultLevel {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(Self::Warning),
            "status" => Ok(Self::Status),
            "error" => Ok(Self::Error),
            _ => Ok(Self::Unknown(s.to_owned())),
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use rtmprelay_amf0::Amf0Encoder;

    use super::*;

    #[test]
    fn test_command_result_level() {
        assert_eq!("warning".parse::<CommandResultLevel>().unwrap(), CommandResultLevel::Warning);
        assert_eq!("status".parse::<CommandResultLevel>().unwrap(), CommandResultLevel::Status);
        assert_eq!("error".parse::<CommandResultLevel>().unwrap(), CommandResultLevel::Error);
        assert_eq!(
            "unknown".parse::<CommandResultLevel>().unwrap(),
            CommandResultLevel::Unknown("unknown".to_owned())
        );
    }

    #[test]
    fn reads_connect_command() {
        let mut payload = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut payload);
        encoder.encode_string("connect").unwrap();
        encoder.encode_number(1.0).unwrap();
        encoder
            .encode_object(
                &[("app".to_owned(), rtmprelay_amf0::Amf0Value::String("live".to_owned()))]
                    .into_iter()
                    .collect(),
            )
            .unwrap();

        let command = Command::read(Bytes::from(payload)).unwrap();
        assert_eq!(command.transaction_id, 1.0);
        assert!(matches!(command.command_type, CommandType::NetConnection(NetConnectionCommand::Connect(_))));
    }

    #[test]
    fn reads_unknown_command() {
        let mut payload = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut payload);
        encoder.encode_string("releaseStream").unwrap();
        encoder.encode_number(3.0).unwrap();
        encoder.encode_null().unwrap();
        encoder.encode_string("mystream").unwrap();

        let command = Command::read(Bytes::from(payload)).unwrap();
        let CommandType::Unknown { command_name, values } = command.command_type else {
            panic!("expected unknown command");
        };
        assert_eq!(command_name, "releaseStream");
        assert_eq!(values.len(), 2);
    }
}
