//! Handshake constants and state (RTMP spec, 5.2).

/// Size in bytes of each of C1/S1/C2/S2.
pub const RTMP_HANDSHAKE_SIZE: usize = 1536;
pub(super) const TIME_VERSION_LENGTH: usize = 8;

/// RTMP version byte exchanged in C0/S0. Only version 3 is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RtmpVersion {
    Version3 = 3,
    Unknown = 0,
}

/// States of the simple handshake finite-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerHandshakeState {
    Initial,
    RecvC0C1,
    SentS0S1S2,
    RecvC2,
    Completed,
}
