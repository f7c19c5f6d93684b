//! Reading [`UserControlEvent`].

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use num_traits::FromPrimitive;

use super::define::{EventType, UserControlEvent};
use super::errors::UserControlMessageError;

impl UserControlEvent {
    /// Parses a user control event from a raw user control message payload:
    /// a 2-byte event type followed by event-specific data.
    pub fn read(data: &[u8]) -> Result<Self, UserControlMessageError> {
        if data.len() < 2 {
            return Err(UserControlMessageError::Truncated(2, data.len()));
        }

        let event_type = BigEndian::read_u16(&data[..2]);
        let body = &data[2..];

        let require_u32 = |body: &[u8]| -> Result<u32, UserControlMessageError> {
            if body.len() < 4 {
                return Err(UserControlMessageError::Truncated(4, body.len()));
            }
            Ok(BigEndian::read_u32(&body[..4]))
        };

        match EventType::from_u16(event_type) {
            Some(EventType::StreamBegin) => Ok(Self::StreamBegin {
                stream_id: require_u32(body)?,
            }),
            Some(EventType::StreamEof) => Ok(Self::StreamEof {
                stream_id: require_u32(body)?,
            }),
            Some(EventType::StreamDry) => Ok(Self::StreamDry {
                stream_id: require_u32(body)?,
            }),
            Some(EventType::SetBufferLength) => {
                if body.len() < 8 {
                    return Err(UserControlMessageError::Truncated(8, body.len()));
                }
                Ok(Self::SetBufferLength {
                    stream_id: BigEndian::read_u32(&body[..4]),
                    buffer_length_ms: BigEndian::read_u32(&body[4..8]),
                })
            }
            Some(EventType::StreamIsRecorded) => Ok(Self::StreamIsRecorded {
                stream_id: require_u32(body)?,
            }),
            Some(EventType::PingRequest) => Ok(Self::PingRequest {
                timestamp: require_u32(body)?,
            }),
            Some(EventType::PingResponse) => Ok(Self::PingResponse {
                timestamp: require_u32(body)?,
            }),
            None => Ok(Self::Other {
                event_type,
                data: Bytes::copy_from_slice(body),
            }),
        }
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn reads_ping_response() {
        let data = [0x00, 0x07, 0x00, 0x00, 0x01, 0x2C];
        let event = UserControlEvent::read(&data).unwrap();
        assert_eq!(event, UserControlEvent::PingResponse { timestamp: 300 });
    }

    #[test]
    fn reads_set_buffer_length() {
        let data = [0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x03, 0xE8];
        let event = UserControlEvent::read(&data).unwrap();
        assert_eq!(
            event,
            UserControlEvent::SetBufferLength {
                stream_id: 1,
                buffer_length_ms: 1000
            }
        );
    }

    #[test]
    fn rejects_truncated_event() {
        let err = UserControlEvent::read(&[0x00]).unwrap_err();
        assert!(matches!(err, UserControlMessageError::Truncated(2, 1)));
    }

    #[test]
    fn falls_back_to_other_for_unknown_event_type() {
        let data = [0x00, 0x63, 0x01, 0x02];
        let event = UserControlEvent::read(&data).unwrap();
        assert_eq!(
            event,
            UserControlEvent::Other {
                event_type: 0x63,
                data: Bytes::from_static(&[0x01, 0x02])
            }
        );
    }
}
