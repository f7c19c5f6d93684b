use std::io;
use std::io::Write;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use rand::Rng;
use rtmprelay_bytes_util::BytesCursorExt;

use super::define::{self, RtmpVersion, ServerHandshakeState};
use super::errors::HandshakeError;

/// Simple handshake server (RTMP spec 1.0, 5.2). Complex/crypto handshake
/// variants are not supported; any client that requires them is expected to
/// fall back to the simple form as ordinary RTMP clients do.
pub struct HandshakeServer {
    version: RtmpVersion,
    requested_version: RtmpVersion,

    state: ServerHandshakeState,

    c1_bytes: Bytes,
    c1_timestamp: u32,
    /// The random bytes we sent as S1, used to lenient-check C2 against S1 (4.1: a
    /// mismatch is a warning, not fatal).
    s1_random: Bytes,
}

impl Default for HandshakeServer {
    fn default() -> Self {
        Self {
            state: ServerHandshakeState::Initial,
            c1_bytes: Bytes::new(),
            c1_timestamp: 0,
            s1_random: Bytes::new(),
            version: RtmpVersion::Unknown,
            requested_version: RtmpVersion::Unknown,
        }
    }
}

impl HandshakeServer {
    /// Current state of the handshake.
    pub fn state(&self) -> ServerHandshakeState {
        self.state
    }

    /// True once C2 has been received and the handshake is complete.
    pub fn is_finished(&self) -> bool {
        self.state == ServerHandshakeState::Completed
    }

    /// Drives one step of the handshake, reading from `input` and appending
    /// to `output`. Call repeatedly (supplying newly-read bytes each time)
    /// until [`Self::is_finished`] returns true.
    pub fn handshake(&mut self, input: &mut io::Cursor<Bytes>, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        match self.state {
            ServerHandshakeState::Initial => {
                self.read_c0(input)?;
                self.read_c1(input)?;
                self.state = ServerHandshakeState::RecvC0C1;

                self.write_s0(output)?;
                self.write_s1(output)?;
                self.write_s2(output)?;
                self.state = ServerHandshakeState::SentS0S1S2;
            }
            ServerHandshakeState::SentS0S1S2 => {
                self.read_c2(input)?;
                self.state = ServerHandshakeState::RecvC2;
                self.state = ServerHandshakeState::Completed;
            }
            ServerHandshakeState::RecvC0C1 | ServerHandshakeState::RecvC2 | ServerHandshakeState::Completed => {}
        }

        Ok(())
    }

    fn read_c0(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        let requested_version = input.read_u8()?;
        self.requested_version = match requested_version {
            3 => RtmpVersion::Version3,
            _ => RtmpVersion::Unknown,
        };

        // We only support version 3; a client requesting anything else still gets a
        // version-3 response, per spec.
        self.version = RtmpVersion::Version3;

        Ok(())
    }

    fn read_c1(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        self.c1_timestamp = input.read_u32::<BigEndian>()?;
        input.read_u32::<BigEndian>()?; // zero field, ignored

        self.c1_bytes = input.extract_bytes(define::RTMP_HANDSHAKE_SIZE - define::TIME_VERSION_LENGTH)?;

        Ok(())
    }

    fn read_c2(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        let c2 = input.extract_bytes(define::RTMP_HANDSHAKE_SIZE)?;

        if c2[8..] != self.s1_random[..] {
            tracing::warn!("C2 random data does not match the S1 we sent, ignoring");
        }

        Ok(())
    }

    fn write_s0(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        output.write_u8(self.version as u8)?;
        Ok(())
    }

    fn write_s1(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        output.write_u32::<BigEndian>(current_time())?;
        output.write_u32::<BigEndian>(0)?;

        let mut random = vec![0u8; define::RTMP_HANDSHAKE_SIZE - define::TIME_VERSION_LENGTH];
        rand::rng().fill(random.as_mut_slice());
        output.write_all(&random)?;
        self.s1_random = Bytes::from(random);

        Ok(())
    }

    fn write_s2(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        // S2 is a byte-for-byte echo of C1, as required when no crypto digest is used.
        output.write_u32::<BigEndian>(self.c1_timestamp)?;
        output.write_u32::<BigEndian>(current_time())?;
        output.write_all(&self.c1_bytes[..])?;

        Ok(())
    }
}

pub fn current_time() -> u32 {
    let duration = std::time::SystemTime::now().duration_since(std::time::SystemTime::UNIX_EPOCH);
    match duration {
        Ok(result) => result.as_nanos() as u32,
        _ => 0,
    }
}

#[cfg(test)]
#[cfg_attr(all(test, coverage_nightly), coverage(off))]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn runs_simple_handshake_to_completion() {
        let mut handshake_server = HandshakeServer::default();

        let mut c0c1 = Vec::with_capacity(1528 + 9);
        c0c1.write_u8(3).unwrap(); // version
        c0c1.write_u32::<BigEndian>(123).unwrap(); // timestamp
        c0c1.write_u32::<BigEndian>(0).unwrap(); // zero

        for i in 0..1528 {
            c0c1.write_u8((i % 256) as u8).unwrap();
        }

        let c0c1 = Bytes::from(c0c1);

        let mut writer = Vec::new();
        handshake_server
            .handshake(&mut std::io::Cursor::new(c0c1.clone()), &mut writer)
            .unwrap();
        assert_eq!(handshake_server.state(), ServerHandshakeState::SentS0S1S2);

        let mut reader = std::io::Cursor::new(writer);
        assert_eq!(reader.read_u8().unwrap(), 3); // version
        let timestamp = reader.read_u32::<BigEndian>().unwrap();
        assert_eq!(reader.read_u32::<BigEndian>().unwrap(), 0);

        let mut server_random = vec![0; 1528];
        reader.read_exact(&mut server_random).unwrap();

        assert_eq!(reader.read_u32::<BigEndian>().unwrap(), 123); // echoes our c1 timestamp
        let timestamp2 = reader.read_u32::<BigEndian>().unwrap();
        assert!(timestamp2 >= timestamp);

        let mut read_client_random = vec![0; 1528];
        reader.read_exact(&mut read_client_random).unwrap();
        assert_eq!(&c0c1[9..], &read_client_random); // S2 echoes C1 byte-for-byte

        let mut c2 = Vec::with_capacity(1528 + 8);
        c2.write_u32::<BigEndian>(timestamp).unwrap();
        c2.write_u32::<BigEndian>(124).unwrap();
        c2.write_all(&server_random).unwrap();

        let mut writer = Vec::new();
        handshake_server
            .handshake(&mut std::io::Cursor::new(Bytes::from(c2)), &mut writer)
            .unwrap();

        assert!(handshake_server.is_finished());
        assert_eq!(handshake_server.state(), ServerHandshakeState::Completed);
    }

    #[test]
    fn tolerates_mismatched_c2_random_data() {
        let mut handshake_server = HandshakeServer::default();

        let mut c0c1 = Vec::with_capacity(1528 + 9);
        c0c1.write_u8(3).unwrap();
        c0c1.write_u32::<BigEndian>(1).unwrap();
        c0c1.write_u32::<BigEndian>(0).unwrap();
        c0c1.extend(std::iter::repeat_n(0u8, 1528));

        let mut writer = Vec::new();
        handshake_server
            .handshake(&mut std::io::Cursor::new(Bytes::from(c0c1)), &mut writer)
            .unwrap();

        let mut c2 = Vec::with_capacity(1528 + 8);
        c2.write_u32::<BigEndian>(1).unwrap();
        c2.write_u32::<BigEndian>(2).unwrap();
        c2.extend(std::iter::repeat_n(0xFFu8, 1528)); // deliberately wrong random echo

        let mut writer = Vec::new();
        handshake_server
            .handshake(&mut std::io::Cursor::new(Bytes::from(c2)), &mut writer)
            .unwrap();

        assert!(handshake_server.is_finished());
    }
}
