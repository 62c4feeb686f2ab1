//! The complex (digest) handshake.
//!
//! There is no official specification for this; the implementation follows
//! the layout Flash Media Server and every later media server agreed on:
//! <https://blog.csdn.net/win_lin/article/details/13006803>

pub mod digest;

use std::io::{self, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use digest::{DigestProcessor, SchemaVersion};
use rand::Rng;
use strom_bytes_util::BytesCursorExt;

use super::{HandshakeError, RTMP_HANDSHAKE_SIZE, RtmpVersion, ServerHandshakeState, TIME_VERSION_LENGTH, current_time};

/// The version number servers advertise in S1. The value comes from the
/// reference implementation; nothing interprets it.
pub const RTMP_SERVER_VERSION: u32 = 0x04050001;

/// The digest is always 32 bytes (SHA-256).
pub const RTMP_DIGEST_LENGTH: usize = 32;

/// The first half of the server key, used to sign S1.
pub const RTMP_SERVER_KEY_FIRST_HALF: &[u8] = b"Genuine Adobe Flash Media Server 001";

/// The first half of the client key, used to verify C1.
pub const RTMP_CLIENT_KEY_FIRST_HALF: &[u8] = b"Genuine Adobe Flash Player 001";

/// The full server key, used to sign S2.
pub const RTMP_SERVER_KEY: &[u8] = &[
    0x47, 0x65, 0x6e, 0x75, 0x69, 0x6e, 0x65, 0x20, 0x41, 0x64, 0x6f, 0x62, 0x65, 0x20, 0x46, 0x6c, 0x61, 0x73, 0x68, 0x20,
    0x4d, 0x65, 0x64, 0x69, 0x61, 0x20, 0x53, 0x65, 0x72, 0x76, 0x65, 0x72, 0x20, 0x30, 0x30, 0x31, 0xf0, 0xee, 0xc2, 0x4a,
    0x80, 0x68, 0xbe, 0xe8, 0x2e, 0x00, 0xd0, 0xd1, 0x02, 0x9e, 0x7e, 0x57, 0x6e, 0xec, 0x5d, 0x2d, 0x29, 0x80, 0x6f, 0xab,
    0x93, 0xb8, 0xe6, 0x36, 0xcf, 0xeb, 0x31, 0xae,
];

/// Complex Handshake Server.
pub struct ComplexHandshakeServer {
    version: RtmpVersion,
    state: ServerHandshakeState,
    schema_version: SchemaVersion,
    c1_digest: Bytes,
    c1_timestamp: u32,
}

impl Default for ComplexHandshakeServer {
    fn default() -> Self {
        Self {
            state: ServerHandshakeState::ReadC0C1,
            c1_digest: Bytes::default(),
            c1_timestamp: 0,
            version: RtmpVersion::Version3,
            schema_version: SchemaVersion::Schema0,
        }
    }
}

impl ComplexHandshakeServer {
    /// Returns true if the handshake is finished.
    pub fn is_finished(&self) -> bool {
        self.state == ServerHandshakeState::Finish
    }

    /// Perform the handshake, writing to the output and reading from the input.
    pub fn handshake(&mut self, input: &mut io::Cursor<Bytes>, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        match self.state {
            ServerHandshakeState::ReadC0C1 => {
                self.read_c0(input)?;
                self.read_c1(input)?;
                self.write_s0(output)?;
                self.write_s1(output)?;
                self.write_s2(output)?;
                self.state = ServerHandshakeState::ReadC2;
            }
            ServerHandshakeState::ReadC2 => {
                self.read_c2(input)?;
                self.state = ServerHandshakeState::Finish;
            }
            ServerHandshakeState::Finish => {}
        }

        Ok(())
    }

    fn read_c0(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        let requested_version = input.read_u8()?;
        if requested_version != RtmpVersion::Version3.0 {
            return Err(HandshakeError::VersionMismatch(requested_version));
        }

        self.version = RtmpVersion::Version3;

        Ok(())
    }

    fn read_c1(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        let c1_bytes = input.extract_bytes(RTMP_HANDSHAKE_SIZE)?;

        self.c1_timestamp = (&c1_bytes[0..4]).read_u32::<BigEndian>()?;

        // the next 4 bytes carry the client version; ignored

        // the random block hides the digest; finding it also tells us the
        // schema the client uses
        let processor = DigestProcessor::new(c1_bytes, RTMP_CLIENT_KEY_FIRST_HALF);
        let (c1_digest, schema_version) = processor.read_digest()?;

        self.c1_digest = c1_digest;
        self.schema_version = schema_version;

        Ok(())
    }

    fn read_c2(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        // C2 is read and discarded, like in the simple handshake.
        input.seek_relative(RTMP_HANDSHAKE_SIZE as i64)?;

        Ok(())
    }

    fn write_s0(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        output.write_u8(self.version.0)?;

        Ok(())
    }

    fn write_s1(&self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        let mut packet = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);

        packet.write_u32::<BigEndian>(current_time())?;
        packet.write_u32::<BigEndian>(RTMP_SERVER_VERSION)?;

        let mut random = vec![0u8; RTMP_HANDSHAKE_SIZE - TIME_VERSION_LENGTH];
        rand::rng().fill(&mut random[..]);
        packet.extend_from_slice(&random);

        // sign the packet with the same schema the client used
        let processor = DigestProcessor::new(Bytes::from(packet), RTMP_SERVER_KEY_FIRST_HALF);
        let (before, digest, after) = processor.generate_and_fill_digest(self.schema_version)?;

        output.write_all(&before)?;
        output.write_all(&digest)?;
        output.write_all(&after)?;

        Ok(())
    }

    fn write_s2(&self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        let start = output.len();

        output.write_u32::<BigEndian>(current_time())?;
        output.write_u32::<BigEndian>(self.c1_timestamp)?;

        let mut random = vec![0u8; RTMP_HANDSHAKE_SIZE - RTMP_DIGEST_LENGTH - TIME_VERSION_LENGTH];
        rand::rng().fill(&mut random[..]);
        output.write_all(&random)?;

        // S2's trailing digest signs the packet with a key derived from the
        // digest found in C1
        let key_processor = DigestProcessor::new(Bytes::new(), RTMP_SERVER_KEY);
        let key = key_processor.make_digest(&self.c1_digest, &[])?;

        let processor = DigestProcessor::new(Bytes::new(), &key);
        let digest = processor.make_digest(&output[start..start + RTMP_HANDSHAKE_SIZE - RTMP_DIGEST_LENGTH], &[])?;

        output.write_all(&digest)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complex_handshake_round_trip() {
        let mut server = ComplexHandshakeServer::default();

        // build a C0+C1 with a valid schema-1 digest
        let mut c1 = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
        c1.write_u32::<BigEndian>(123).unwrap();
        c1.write_u32::<BigEndian>(0x80000702u32).unwrap();
        for i in 0..(RTMP_HANDSHAKE_SIZE - TIME_VERSION_LENGTH) {
            c1.push((i % 256) as u8);
        }

        let processor = DigestProcessor::new(Bytes::from(c1), RTMP_CLIENT_KEY_FIRST_HALF);
        let (before, digest, after) = processor.generate_and_fill_digest(SchemaVersion::Schema1).unwrap();

        let mut c0c1 = vec![3u8];
        c0c1.extend_from_slice(&before);
        c0c1.extend_from_slice(&digest);
        c0c1.extend_from_slice(&after);

        let mut s0s1s2 = Vec::new();
        server.handshake(&mut io::Cursor::new(Bytes::from(c0c1)), &mut s0s1s2).unwrap();

        assert_eq!(s0s1s2.len(), 1 + 2 * RTMP_HANDSHAKE_SIZE);
        assert_eq!(s0s1s2[0], 3);

        // S1 must carry a valid digest under the server key, same schema
        let s1 = Bytes::copy_from_slice(&s0s1s2[1..1 + RTMP_HANDSHAKE_SIZE]);
        let processor = DigestProcessor::new(s1, RTMP_SERVER_KEY_FIRST_HALF);
        let (_, schema) = processor.read_digest().unwrap();
        assert_eq!(schema, SchemaVersion::Schema1);

        // S2 echoes the C1 timestamp in its second field
        let s2 = &s0s1s2[1 + RTMP_HANDSHAKE_SIZE..];
        assert_eq!(&s2[4..8], &123u32.to_be_bytes());

        // feed any C2 back to finish
        let c2 = vec![0u8; RTMP_HANDSHAKE_SIZE];
        server.handshake(&mut io::Cursor::new(Bytes::from(c2)), &mut Vec::new()).unwrap();
        assert!(server.is_finished());
    }

    #[test]
    fn plain_c1_has_no_digest() {
        let mut server = ComplexHandshakeServer::default();

        let mut c0c1 = vec![3u8];
        c0c1.extend_from_slice(&[7u8; RTMP_HANDSHAKE_SIZE]);

        let err = server
            .handshake(&mut io::Cursor::new(Bytes::from(c0c1)), &mut Vec::new())
            .unwrap_err();
        assert!(matches!(err, HandshakeError::DigestNotFound));
    }
}
