//! Audio/video payload classification (4.7).
//!
//! These are not codecs in the transcoding sense: we never decode a frame,
//! only look at enough of the FLV-style tag header to know (a) which codec is
//! in use and (b) whether this particular payload is a sequence header that
//! late-joining subscribers need replayed to them.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCodec {
    Aac,
    Mp3,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    Avc,
    Hevc,
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    SequenceHeader,
    Data,
}

/// Classifies an audio message payload. Returns `None` for an empty payload.
pub fn classify_audio(data: &[u8]) -> Option<(AudioCodec, FrameKind)> {
    let first = *data.first()?;
    let sound_format = first >> 4;
    let codec = match sound_format {
        10 => AudioCodec::Aac,
        2 => AudioCodec::Mp3,
        other => AudioCodec::Other(other),
    };

    let kind = match codec {
        AudioCodec::Aac => match data.get(1) {
            Some(0) => FrameKind::SequenceHeader,
            _ => FrameKind::Data,
        },
        _ => FrameKind::Data,
    };

    Some((codec, kind))
}

/// Classifies a video message payload. Returns `None` for an empty payload.
pub fn classify_video(data: &[u8]) -> Option<(VideoCodec, FrameKind)> {
    let first = *data.first()?;
    let codec_id = first & 0x0F;
    let codec = match codec_id {
        7 => VideoCodec::Avc,
        12 => VideoCodec::Hevc,
        other => VideoCodec::Other(other),
    };

    let kind = match codec {
        VideoCodec::Avc => match data.get(1) {
            Some(0) => FrameKind::SequenceHeader,
            _ => FrameKind::Data,
        },
        _ => FrameKind::Data,
    };

    Some((codec, kind))
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn classifies_aac_sequence_header() {
        let (codec, kind) = classify_audio(&[0xAF, 0x00, 0x12, 0x34]).unwrap();
        assert_eq!(codec, AudioCodec::Aac);
        assert_eq!(kind, FrameKind::SequenceHeader);
    }

    #[test]
    fn classifies_aac_raw_frame() {
        let (codec, kind) = classify_audio(&[0xAF, 0x01, 0x12, 0x34]).unwrap();
        assert_eq!(codec, AudioCodec::Aac);
        assert_eq!(kind, FrameKind::Data);
    }

    #[test]
    fn classifies_mp3_as_data_always() {
        let (codec, kind) = classify_audio(&[0x2F, 0x00]).unwrap();
        assert_eq!(codec, AudioCodec::Mp3);
        assert_eq!(kind, FrameKind::Data);
    }

    #[test]
    fn classifies_avc_sequence_header() {
        let (codec, kind) = classify_video(&[0x17, 0x00, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(codec, VideoCodec::Avc);
        assert_eq!(kind, FrameKind::SequenceHeader);
    }

    #[test]
    fn classifies_avc_nalu() {
        let (codec, kind) = classify_video(&[0x27, 0x01, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(codec, VideoCodec::Avc);
        assert_eq!(kind, FrameKind::Data);
    }

    #[test]
    fn classifies_hevc_codec_id() {
        let (codec, _) = classify_video(&[0x1C, 0x01]).unwrap();
        assert_eq!(codec, VideoCodec::Hevc);
    }

    #[test]
    fn empty_payload_yields_none() {
        assert!(classify_audio(&[]).is_none());
        assert!(classify_video(&[]).is_none());
    }
}
