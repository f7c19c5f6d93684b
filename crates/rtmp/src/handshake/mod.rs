//! Simple RTMP handshake (RTMP spec, 5.2). Complex/crypto handshake variants
//! are out of scope; see 4.1.

mod define;
mod errors;
mod server;

pub use self::define::{RTMP_HANDSHAKE_SIZE, ServerHandshakeState};
pub use self::errors::HandshakeError;
pub use self::server::{HandshakeServer, current_time};
