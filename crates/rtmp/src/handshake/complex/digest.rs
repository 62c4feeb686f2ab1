//! The digest scheme of the complex handshake.
//!
//! C1/S1 hide an HMAC-SHA256 digest inside the random block; the digest
//! offset is derived from four bytes of the block itself, and which half of
//! the block carries the digest is the "schema".

use bytes::Bytes;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::super::HandshakeError;
use super::RTMP_DIGEST_LENGTH;

/// The two layouts of the C1/S1 random block.
///
/// A block is 764 bytes ((1536 - 8) / 2). Schema 0 puts the digest block
/// after the key block (digest offset base 776), schema 1 puts it first
/// (offset base 12). The server always mirrors the schema the client used.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SchemaVersion {
    /// Key block first, digest block second.
    Schema0,
    /// Digest block first, key block second.
    Schema1,
}

/// Computes and verifies the handshake digests for one packet.
pub struct DigestProcessor<'a> {
    data: Bytes,
    key: &'a [u8],
}

impl<'a> DigestProcessor<'a> {
    /// Creates a processor over one 1536-byte packet (or an empty buffer when
    /// only [`make_digest`](Self::make_digest) is needed).
    pub fn new(data: Bytes, key: &'a [u8]) -> Self {
        Self { data, key }
    }

    /// The offset of the 32-byte digest within the packet for a schema.
    ///
    /// Four bytes at the head of the digest block, summed mod 728, plus the
    /// block base.
    fn digest_offset(&self, schema: SchemaVersion) -> usize {
        let base = match schema {
            SchemaVersion::Schema0 => 772,
            SchemaVersion::Schema1 => 8,
        };

        let sum = self.data[base] as usize
            + self.data[base + 1] as usize
            + self.data[base + 2] as usize
            + self.data[base + 3] as usize;

        sum % 728 + base + 4
    }

    /// Finds and verifies the digest in the packet, trying both schemas.
    ///
    /// Returns the digest bytes and the schema that matched.
    pub fn read_digest(&self) -> Result<(Bytes, SchemaVersion), HandshakeError> {
        for schema in [SchemaVersion::Schema0, SchemaVersion::Schema1] {
            let offset = self.digest_offset(schema);

            let left = &self.data[..offset];
            let digest = &self.data[offset..offset + RTMP_DIGEST_LENGTH];
            let right = &self.data[offset + RTMP_DIGEST_LENGTH..];

            let computed = self.make_digest(left, right)?;
            if computed == digest {
                return Ok((Bytes::copy_from_slice(digest), schema));
            }
        }

        Err(HandshakeError::DigestNotFound)
    }

    /// Splits the packet at the digest position for a schema and fills the
    /// gap with the computed digest.
    ///
    /// Returns `(before, digest, after)`; concatenated they form the packet
    /// to send.
    pub fn generate_and_fill_digest(&self, schema: SchemaVersion) -> Result<(Bytes, Bytes, Bytes), HandshakeError> {
        let offset = self.digest_offset(schema);

        let before = self.data.slice(..offset);
        let after = self.data.slice(offset + RTMP_DIGEST_LENGTH..);
        let digest = self.make_digest(&before, &after)?;

        Ok((before, digest, after))
    }

    /// HMAC-SHA256 over `left || right` with this processor's key.
    pub fn make_digest(&self, left: &[u8], right: &[u8]) -> Result<Bytes, HandshakeError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.key).expect("hmac accepts any key size");
        mac.update(left);
        mac.update(right);

        let digest = mac.finalize().into_bytes();
        if digest.len() != RTMP_DIGEST_LENGTH {
            return Err(HandshakeError::DigestLength(digest.len()));
        }

        Ok(Bytes::copy_from_slice(&digest))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::super::RTMP_CLIENT_KEY_FIRST_HALF;
    use super::*;
    use crate::handshake::RTMP_HANDSHAKE_SIZE;

    fn packet_with_digest(schema: SchemaVersion) -> Bytes {
        let mut packet = vec![0u8; RTMP_HANDSHAKE_SIZE];
        for (i, byte) in packet.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }

        let processor = DigestProcessor::new(Bytes::from(packet), RTMP_CLIENT_KEY_FIRST_HALF);
        let (before, digest, after) = processor.generate_and_fill_digest(schema).unwrap();

        let mut filled = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
        filled.extend_from_slice(&before);
        filled.extend_from_slice(&digest);
        filled.extend_from_slice(&after);
        Bytes::from(filled)
    }

    #[test]
    fn generated_digest_validates() {
        for schema in [SchemaVersion::Schema0, SchemaVersion::Schema1] {
            let packet = packet_with_digest(schema);

            let processor = DigestProcessor::new(packet, RTMP_CLIENT_KEY_FIRST_HALF);
            let (_, found_schema) = processor.read_digest().unwrap();
            assert_eq!(found_schema, schema);
        }
    }

    #[test]
    fn corrupted_digest_is_rejected() {
        let packet = packet_with_digest(SchemaVersion::Schema1);
        let mut corrupted = packet.to_vec();
        corrupted[100] ^= 0xFF;

        let processor = DigestProcessor::new(Bytes::from(corrupted), RTMP_CLIENT_KEY_FIRST_HALF);
        assert!(matches!(processor.read_digest(), Err(HandshakeError::DigestNotFound)));
    }
}
