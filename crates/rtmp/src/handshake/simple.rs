//! The simple (plain) handshake.
//!
//! RTMP Spec 1.0 - 5.2

use std::io::{self, Read, Seek, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use bytes::Bytes;
use rand::Rng;
use strom_bytes_util::BytesCursorExt;

use super::{
    ClientHandshakeState, HandshakeError, RTMP_HANDSHAKE_SIZE, RTMP_RANDOM_SIZE, RtmpVersion, ServerHandshakeState,
    current_time,
};

/// Simple Handshake Server
///
/// RTMP Spec 1.0 - 5.2
pub struct SimpleHandshakeServer {
    version: RtmpVersion,
    state: ServerHandshakeState,
    c1_bytes: Bytes,
    c1_timestamp: u32,
}

impl Default for SimpleHandshakeServer {
    fn default() -> Self {
        Self {
            state: ServerHandshakeState::ReadC0C1,
            c1_bytes: Bytes::new(),
            c1_timestamp: 0,
            version: RtmpVersion::Version3,
        }
    }
}

impl SimpleHandshakeServer {
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
        // In C0, this field identifies the RTMP version requested by the
        // client. We only speak version 3.
        let requested_version = input.read_u8()?;
        if requested_version != RtmpVersion::Version3.0 {
            return Err(HandshakeError::VersionMismatch(requested_version));
        }

        self.version = RtmpVersion::Version3;

        Ok(())
    }

    fn read_c1(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        // The timestamp the client uses as the epoch of its chunk stream.
        self.c1_timestamp = input.read_u32::<BigEndian>()?;

        // Zero (4 bytes): This field MUST be all 0s. Some encoders put a
        // version number here; it is ignored either way.
        input.read_u32::<BigEndian>()?;

        // The random block; echoed back in S2 so the client can match our
        // response to its request.
        self.c1_bytes = input.extract_bytes(RTMP_RANDOM_SIZE)?;

        Ok(())
    }

    fn read_c2(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        // C2 echoes S1. Deployed clients are not strict about the echo, so it
        // is read and discarded rather than validated.
        input.seek_relative(RTMP_HANDSHAKE_SIZE as i64)?;

        Ok(())
    }

    fn write_s0(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        // In S0, this field identifies the RTMP version selected by the server.
        output.write_u8(self.version.0)?;

        Ok(())
    }

    fn write_s1(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        output.write_u32::<BigEndian>(current_time())?;
        output.write_u32::<BigEndian>(0)?;

        let mut random = [0u8; RTMP_RANDOM_SIZE];
        rand::rng().fill(&mut random[..]);
        output.write_all(&random)?;

        Ok(())
    }

    fn write_s2(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        // S2 echoes the timestamp and random data of C1.
        output.write_u32::<BigEndian>(self.c1_timestamp)?;
        output.write_u32::<BigEndian>(current_time())?;
        output.write_all(&self.c1_bytes[..])?;

        Ok(())
    }
}

/// Simple Handshake Client
///
/// RTMP Spec 1.0 - 5.2. Drives the C0/C1 → S0/S1/S2 → C2 exchange and,
/// unless `relaxed_echo` is set, validates that S2 echoes C1. Tunneled
/// transports are known to violate the echo and must run relaxed.
pub struct SimpleHandshakeClient {
    state: ClientHandshakeState,
    relaxed_echo: bool,
    c1_timestamp: u32,
    c1_bytes: [u8; RTMP_RANDOM_SIZE],
    server_random: Bytes,
}

impl SimpleHandshakeClient {
    /// Creates a client handshake; `relaxed_echo` disables S2 validation.
    pub fn new(relaxed_echo: bool) -> Self {
        let mut c1_bytes = [0u8; RTMP_RANDOM_SIZE];
        rand::rng().fill(&mut c1_bytes[..]);

        Self {
            state: ClientHandshakeState::WriteC0C1,
            relaxed_echo,
            c1_timestamp: current_time(),
            c1_bytes,
            server_random: Bytes::new(),
        }
    }

    /// Returns true if the handshake is finished.
    pub fn is_finished(&self) -> bool {
        self.state == ClientHandshakeState::Finish
    }

    /// The random block the server sent in S1.
    pub fn server_random(&self) -> &Bytes {
        &self.server_random
    }

    /// Perform the handshake, writing to the output and reading from the input.
    ///
    /// Call once with an empty input to produce C0+C1, then again with
    /// S0+S1+S2 (3073 bytes) buffered to produce C2 and finish.
    pub fn handshake(&mut self, input: &mut io::Cursor<Bytes>, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        match self.state {
            ClientHandshakeState::WriteC0C1 => {
                self.write_c0(output)?;
                self.write_c1(output)?;
                self.state = ClientHandshakeState::ReadS0S1S2;
            }
            ClientHandshakeState::ReadS0S1S2 => {
                self.read_s0(input)?;
                self.read_s1(input, output)?;
                self.read_s2(input)?;
                self.state = ClientHandshakeState::Finish;
            }
            ClientHandshakeState::Finish => {}
        }

        Ok(())
    }

    fn write_c0(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        output.write_u8(RtmpVersion::Version3.0)?;

        Ok(())
    }

    fn write_c1(&mut self, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        output.write_u32::<BigEndian>(self.c1_timestamp)?;
        output.write_u32::<BigEndian>(0)?;
        output.write_all(&self.c1_bytes)?;

        Ok(())
    }

    fn read_s0(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        let version = input.read_u8()?;
        if version != RtmpVersion::Version3.0 {
            return Err(HandshakeError::VersionMismatch(version));
        }

        Ok(())
    }

    /// Reads S1 and immediately answers it with C2.
    fn read_s1(&mut self, input: &mut io::Cursor<Bytes>, output: &mut Vec<u8>) -> Result<(), HandshakeError> {
        let s1_timestamp = input.read_u32::<BigEndian>()?;
        input.read_u32::<BigEndian>()?;
        self.server_random = input.extract_bytes(RTMP_RANDOM_SIZE)?;

        // C2 echoes S1: its timestamp, our read time, its random block.
        output.write_u32::<BigEndian>(s1_timestamp)?;
        output.write_u32::<BigEndian>(current_time())?;
        output.write_all(&self.server_random)?;

        Ok(())
    }

    fn read_s2(&mut self, input: &mut io::Cursor<Bytes>) -> Result<(), HandshakeError> {
        let s2_timestamp = input.read_u32::<BigEndian>()?;
        input.read_u32::<BigEndian>()?;

        let mut s2_random = [0u8; RTMP_RANDOM_SIZE];
        input.read_exact(&mut s2_random)?;

        // Over TCP the server must echo C1 exactly; tunneled relays rewrite
        // the exchange and are accepted as-is.
        if !self.relaxed_echo && (s2_timestamp != self.c1_timestamp || s2_random != self.c1_bytes) {
            return Err(HandshakeError::EchoMismatch);
        }

        Ok(())
    }
}
