//! NetStream command messages (legacy RTMP spec, 7.2.2).

use rtmprelay_amf0::{Amf0Object, Amf0Value};

pub mod reader;
pub mod writer;

/// NetStream commands as defined in 7.2.2.
#[derive(Debug, Clone, PartialEq)]
pub enum NetStreamCommand {
    Play {
        stream_name: String,
        values: Vec<Amf0Value>,
    },
    Play2 {
        parameters: Amf0Object,
    },
    DeleteStream {
        stream_id: f64,
    },
    CloseStream,
    ReceiveAudio {
        receive_audio: bool,
    },
    ReceiveVideo {
        receive_video: bool,
    },
    Publish {
        publishing_name: String,
        publishing_type: NetStreamCommandPublishPublishingType,
    },
    Seek {
        milliseconds: f64,
    },
    Pause {
        pause: bool,
        milliseconds: f64,
    },
}

/// Type of publishing requested by a `publish` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetStreamCommandPublishPublishingType {
    Live,
    Record,
    Append,
    Unknown(String),
}

impl From<&str> for NetStreamCommandPublishPublishingType {
    fn from(value: &str) -> Self {
        match value {
            "live" => Self::Live,
            "record" => Self::Record,
            "append" => Self::Append,
            other => Self::Unknown(other.to_owned()),
        }
    }
}
