//! FLV file recorder (4.10).
//!
//! One [`Recorder`] per publishing stream when recording is enabled. Any
//! write failure (disk full, permission revoked mid-write, ...) disables the
//! recorder permanently; it becomes a silent no-op rather than tearing down
//! the live stream it's attached to.

use std::path::{Path, PathBuf};

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const TAG_TYPE_AUDIO: u8 = 8;
const TAG_TYPE_VIDEO: u8 = 9;

/// Writes audio/video messages to an FLV file on disk.
pub struct Recorder {
    file: Option<File>,
    path: PathBuf,
}

impl Recorder {
    /// Opens `<record_dir>/<app>_<streamName>_<YYYYMMDD_HHMMSS>.flv` and writes the FLV header.
    pub async fn create(record_dir: &Path, app: &str, stream_name: &str) -> std::io::Result<Self> {
        let file_name = format!("{app}_{stream_name}_{}.flv", timestamp_for_filename());
        let path = record_dir.join(file_name);

        let mut file = File::create(&path).await?;
        file.write_all(&flv_header()).await?;

        Ok(Self { file: Some(file), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    pub async fn write_audio(&mut self, timestamp: u32, data: &Bytes) {
        self.write_tag(TAG_TYPE_AUDIO, timestamp, data).await;
    }

    pub async fn write_video(&mut self, timestamp: u32, data: &Bytes) {
        self.write_tag(TAG_TYPE_VIDEO, timestamp, data).await;
    }

    async fn write_tag(&mut self, tag_type: u8, timestamp: u32, data: &Bytes) {
        let Some(file) = self.file.as_mut() else { return };

        if let Err(err) = write_tag(file, tag_type, timestamp, data).await {
            tracing::warn!(path = %self.path.display(), error = %err, "disabling recorder after write failure");
            self.file = None;
        }
    }
}

async fn write_tag(file: &mut File, tag_type: u8, timestamp: u32, data: &Bytes) -> std::io::Result<()> {
    let mut tag = Vec::with_capacity(11 + data.len());
    WriteBytesExt::write_u8(&mut tag, tag_type)?;
    tag.write_u24::<BigEndian>(data.len() as u32)?;
    tag.write_u24::<BigEndian>(timestamp & 0x00FF_FFFF)?;
    WriteBytesExt::write_u8(&mut tag, ((timestamp >> 24) & 0xFF) as u8)?; // timestamp extended byte
    tag.write_u24::<BigEndian>(0)?; // stream id, always 0
    tag.extend_from_slice(data);

    let previous_tag_size = tag.len() as u32;
    WriteBytesExt::write_u32::<BigEndian>(&mut tag, previous_tag_size)?;

    file.write_all(&tag).await
}

fn flv_header() -> [u8; 13] {
    let mut header = [0u8; 13];
    header[0..3].copy_from_slice(b"FLV");
    header[3] = 1; // version
    header[4] = 0b0000_0101; // audio + video present
    header[5..9].copy_from_slice(&9u32.to_be_bytes()); // data offset
    // bytes 9..13 are the "previous tag size 0" field preceding the first tag
    header
}

/// Formats the current time as `YYYYMMDD_HHMMSS` in UTC.
fn timestamp_for_filename() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn formats_known_unix_timestamp() {
        // 2024-01-02 03:04:05 UTC
        let formatted = chrono::DateTime::<chrono::Utc>::from_timestamp(1704164645, 0)
            .unwrap()
            .format("%Y%m%d_%H%M%S")
            .to_string();
        assert_eq!(formatted, "20240102_030405");
    }

    #[test]
    fn flv_header_has_expected_signature_and_offset() {
        let header = flv_header();
        assert_eq!(&header[0..3], b"FLV");
        assert_eq!(header[3], 1);
        assert_eq!(u32::from_be_bytes(header[5..9].try_into().unwrap()), 9);
    }

    #[tokio::test]
    async fn recorder_writes_header_and_tags_then_disables_on_failure() {
        let dir = std::env::temp_dir().join(format!("rtmprelay-recorder-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let mut recorder = Recorder::create(&dir, "live", "key").await.unwrap();
        assert!(recorder.is_active());

        recorder.write_video(0, &Bytes::from_static(b"\x17\x00frame")).await;
        assert!(recorder.is_active());

        let contents = tokio::fs::read(recorder.path()).await.unwrap();
        assert!(contents.len() > 13);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
