//! Reading [`NetStreamCommand`].

use bytes::Bytes;
use rtmprelay_amf0::Amf0Decoder;

use super::NetStreamCommand;
use crate::command_messages::error::CommandError;

impl NetStreamCommand {
    /// Reads a [`NetStreamCommand`] from the given decoder.
    ///
    /// Returns `Ok(None)` if `command_name` is not recognized as a
    /// NetStream command.
    pub fn read(command_name: &str, decoder: &mut Amf0Decoder<Bytes>) -> Result<Option<Self>, CommandError> {
        match command_name {
            "play" => {
                decoder.decode_null()?; // command object
                let values = decoder.decode_all()?;
                let stream_name = values.first().and_then(|v| v.as_str()).unwrap_or_default().to_owned();
                Ok(Some(Self::Play { stream_name, values }))
            }
            "play2" => {
                decoder.decode_null()?;
                let parameters = decoder.decode_object()?;
                Ok(Some(Self::Play2 { parameters }))
            }
            "deleteStream" => {
                decoder.decode_null()?;
                let stream_id = decoder.decode_number()?;
                Ok(Some(Self::DeleteStream { stream_id }))
            }
            "closeStream" => Ok(Some(Self::CloseStream)),
            "receiveAudio" => {
                decoder.decode_null()?;
                let receive_audio = decoder.decode_boolean()?;
                Ok(Some(Self::ReceiveAudio { receive_audio }))
            }
            "receiveVideo" => {
                decoder.decode_null()?;
                let receive_video = decoder.decode_boolean()?;
                Ok(Some(Self::ReceiveVideo { receive_video }))
            }
            "publish" => {
                decoder.decode_null()?;
                let publishing_name = decoder.decode_string()?;
                let publishing_type = decoder
                    .has_remaining()
                    .then(|| decoder.decode_string())
                    .transpose()?
                    .map(|s| s.as_str().into())
                    .unwrap_or(super::NetStreamCommandPublishPublishingType::Live);

                Ok(Some(Self::Publish {
                    publishing_name,
                    publishing_type,
                }))
            }
            "seek" => {
                decoder.decode_null()?;
                let milliseconds = decoder.decode_number()?;
                Ok(Some(Self::Seek { milliseconds }))
            }
            "pause" => {
                decoder.decode_null()?;
                let pause = decoder.decode_boolean()?;
                let milliseconds = decoder.decode_number()?;
                Ok(Some(Self::Pause { pause, milliseconds }))
            }
            _ => Ok(None),
        }
    }
}
