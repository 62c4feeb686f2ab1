use std::io::{self, Seek};

use bytes::Bytes;

use super::complex::ComplexHandshakeServer;
use super::simple::SimpleHandshakeServer;
use super::{HandshakeError, ServerHandshakeState};

/// A server handshake that accepts both handshake forms.
///
/// Starts in the complex (digest) form; when C1 carries no valid digest the
/// input is rewound and replayed against the simple form.
///
/// Order of messages:
/// - Client -> C0, C1 -> Server
/// - Client <- S0, S1, S2 <- Server
/// - Client -> C2 -> Server
pub enum HandshakeServer {
    /// The plain handshake of the RTMP spec.
    Simple(SimpleHandshakeServer),
    /// The digest handshake of Flash-era clients.
    Complex(ComplexHandshakeServer),
}

impl Default for HandshakeServer {
    fn default() -> Self {
        Self::Complex(ComplexHandshakeServer::default())
    }
}

impl HandshakeServer {
    /// Returns true if the handshake is finished.
    pub fn is_finished(&self) -> bool {
        match self {
            HandshakeServer::Simple(handshaker) => handshaker.is_finished(),
            HandshakeServer::Complex(handshaker) => handshaker.is_finished(),
        }
    }

    /// The state of the handshake.
    pub fn state(&self) -> ServerHandshakeState {
        if self.is_finished() {
            ServerHandshakeState::Finish
        } else {
            ServerHandshakeState::ReadC0C1
        }
    }

    /// Perform the handshake, writing to the output and reading from the input.
    pub fn handshake(&mut self, input: &mut io::Cursor<Bytes>, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        match self {
            HandshakeServer::Complex(handshaker) => {
                // remember where we started so the simple form can re-read C0+C1
                let position = input.position();

                if let Err(err) = handshaker.handshake(input, output) {
                    tracing::debug!(error = %err, "complex handshake failed, falling back to simple");

                    let mut simple = SimpleHandshakeServer::default();

                    input.seek(io::SeekFrom::Start(position))?;
                    simple.handshake(input, output)?;

                    *self = HandshakeServer::Simple(simple);
                }
            }
            HandshakeServer::Simple(handshaker) => {
                handshaker.handshake(input, output)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{BigEndian, WriteBytesExt};

    use super::super::{RTMP_HANDSHAKE_SIZE, simple::SimpleHandshakeClient};
    use super::*;

    #[test]
    fn falls_back_to_simple_for_plain_c1() {
        let mut server = HandshakeServer::default();

        let mut c0c1 = vec![3u8];
        c0c1.write_u32::<BigEndian>(123).unwrap();
        c0c1.write_u32::<BigEndian>(0).unwrap();
        c0c1.extend_from_slice(&[9u8; RTMP_HANDSHAKE_SIZE - 8]);

        let mut s0s1s2 = Vec::new();
        server.handshake(&mut io::Cursor::new(Bytes::from(c0c1)), &mut s0s1s2).unwrap();

        assert!(matches!(server, HandshakeServer::Simple(_)));
        assert_eq!(s0s1s2.len(), 1 + 2 * RTMP_HANDSHAKE_SIZE);

        // S2 echoes C1: timestamp then our random block
        let s2 = &s0s1s2[1 + RTMP_HANDSHAKE_SIZE..];
        assert_eq!(&s2[..4], &123u32.to_be_bytes());
        assert_eq!(&s2[8..], &[9u8; RTMP_HANDSHAKE_SIZE - 8]);
    }

    #[test]
    fn simple_client_against_server() {
        let mut client = SimpleHandshakeClient::new(false);
        let mut server = HandshakeServer::default();

        let mut c0c1 = Vec::new();
        client.handshake(&mut io::Cursor::new(Bytes::new()), &mut c0c1).unwrap();

        let mut s0s1s2 = Vec::new();
        server.handshake(&mut io::Cursor::new(Bytes::from(c0c1)), &mut s0s1s2).unwrap();

        let mut c2 = Vec::new();
        client.handshake(&mut io::Cursor::new(Bytes::from(s0s1s2)), &mut c2).unwrap();
        assert!(client.is_finished());

        server.handshake(&mut io::Cursor::new(Bytes::from(c2)), &mut Vec::new()).unwrap();
        assert!(server.is_finished());
    }
}
