//! Reading [`NetConnectionCommand`].

use bytes::Bytes;
use rtmprelay_amf0::Amf0Decoder;

use super::{NetConnectionCommand, NetConnectionCommandConnect};
use crate::command_messages::error::CommandError;

impl NetConnectionCommand {
    /// Reads a [`NetConnectionCommand`] from the given decoder.
    ///
    /// Returns `Ok(None)` if `command_name` is not recognized as a
    /// NetConnection command.
    pub fn read(command_name: &str, decoder: &mut Amf0Decoder<Bytes>) -> Result<Option<Self>, CommandError> {
        match command_name {
            "connect" => {
                let mut command_object = decoder.decode_object()?;
                let app = command_object
                    .remove("app")
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .ok_or(CommandError::MissingField("app"))?;

                Ok(Some(Self::Connect(NetConnectionCommandConnect {
                    app,
                    others: command_object,
                })))
            }
            "call" => {
                let command_object = decoder.decode_value()?;
                // Any optional arguments following the command object are
                // not forwarded anywhere today, so they're drained and dropped.
                decoder.decode_all()?;
                Ok(Some(Self::Call { command_object }))
            }
            "close" => Ok(Some(Self::Close)),
            "createStream" => Ok(Some(Self::CreateStream)),
            _ => Ok(None),
        }
    }
}
