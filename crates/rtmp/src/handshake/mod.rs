//! RTMP handshakes.
//!
//! Both the plain ("simple") three-packet exchange of the RTMP spec and the
//! digest-authenticated ("complex") variant that Flash-era clients expect.
//! The server tries the complex form first and silently falls back to simple;
//! the client uses the simple form and validates the echo.

use std::time::SystemTime;

pub mod complex;
pub mod simple;

mod error;
mod server;

pub use self::error::HandshakeError;
pub use self::server::HandshakeServer;
pub use self::simple::SimpleHandshakeClient;

/// The size of C1/S1/C2/S2 packets: 8 bytes of time/zero plus 1528 bytes of
/// random data.
pub const RTMP_HANDSHAKE_SIZE: usize = 1536;

/// The time and zero (or version) fields in front of the random block.
pub const TIME_VERSION_LENGTH: usize = 4 + 4;

/// The number of random bytes in C1/S1.
pub const RTMP_RANDOM_SIZE: usize = RTMP_HANDSHAKE_SIZE - TIME_VERSION_LENGTH;

nutype_enum::nutype_enum! {
    /// The RTMP version byte exchanged in C0/S0.
    pub enum RtmpVersion(u8) {
        /// The only deployed version.
        Version3 = 3,
    }
}

/// The state of a server handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerHandshakeState {
    /// Waiting for C0 and C1.
    ReadC0C1,
    /// Waiting for C2.
    ReadC2,
    /// Done.
    Finish,
}

/// The state of a client handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientHandshakeState {
    /// C0 and C1 not sent yet.
    WriteC0C1,
    /// Waiting for S0, S1 and S2.
    ReadS0S1S2,
    /// Done.
    Finish,
}

/// Milliseconds since the unix epoch, truncated to 32 bits; the handshake
/// timestamps carry no meaning beyond being an epoch marker.
pub(crate) fn current_time() -> u32 {
    match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => duration.as_millis() as u32,
        Err(_) => 0,
    }
}
