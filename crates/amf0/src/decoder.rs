//! AMF0 decoder

use bytes::Buf;
use num_traits::FromPrimitive;

use crate::{Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// AMF0 decoder.
///
/// Provides functions to decode the different AMF0 element types from any
/// [`Buf`]. Truncated input always yields [`Amf0Error::UnexpectedEof`],
/// never a panic.
#[derive(Debug, Clone)]
pub struct Amf0Decoder<B> {
    buf: B,
    next_marker: Option<Amf0Marker>,
}

impl<B> Amf0Decoder<B>
where
    B: Buf,
{
    /// Creates a new decoder over `buf`.
    pub fn new(buf: B) -> Self {
        Self { buf, next_marker: None }
    }

    /// Check if there are remaining bytes to read.
    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.next_marker.is_some() || self.buf.has_remaining()
    }

    fn ensure(&self, size: usize) -> Result<(), Amf0Error> {
        if self.buf.remaining() < size {
            return Err(Amf0Error::UnexpectedEof);
        }
        Ok(())
    }

    /// Decode a single [`Amf0Value`] from the buffer.
    pub fn decode_value(&mut self) -> Result<Amf0Value, Amf0Error> {
        let marker = self.peek_marker()?;

        match marker {
            Amf0Marker::Boolean => self.decode_boolean().map(Into::into),
            Amf0Marker::Number | Amf0Marker::Date => self.decode_number().map(Into::into),
            Amf0Marker::String | Amf0Marker::LongString | Amf0Marker::XmlDocument => self.decode_string().map(Into::into),
            Amf0Marker::Null | Amf0Marker::Undefined => self.decode_null().map(|()| Amf0Value::Null),
            Amf0Marker::Object | Amf0Marker::TypedObject => self.decode_object().map(Into::into),
            Amf0Marker::EcmaArray => self.decode_object().map(Amf0Value::EcmaArray),
            Amf0Marker::StrictArray => self.decode_strict_array().map(Into::into),
            _ => Err(Amf0Error::UnsupportedMarker(marker)),
        }
    }

    /// Decode all values from the buffer until the end.
    pub fn decode_all(&mut self) -> Result<Vec<Amf0Value>, Amf0Error> {
        let mut values = Vec::new();

        while self.has_remaining() {
            values.push(self.decode_value()?);
        }

        Ok(values)
    }

    /// Peek the next marker in the buffer without consuming it.
    pub fn peek_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;
        // Buffer the marker for the next read
        self.next_marker = Some(marker);

        Ok(marker)
    }

    fn read_marker(&mut self) -> Result<Amf0Marker, Amf0Error> {
        if let Some(marker) = self.next_marker.take() {
            return Ok(marker);
        }

        self.ensure(1)?;
        let marker = self.buf.get_u8();
        Amf0Marker::from_u8(marker).ok_or(Amf0Error::UnknownMarker(marker))
    }

    fn expect_marker(&mut self, expect: &'static [Amf0Marker]) -> Result<Amf0Marker, Amf0Error> {
        let marker = self.read_marker()?;

        if !expect.contains(&marker) {
            Err(Amf0Error::UnexpectedType {
                expected: expect,
                got: marker,
            })
        } else {
            Ok(marker)
        }
    }

    /// Decode a number from the buffer.
    pub fn decode_number(&mut self) -> Result<f64, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::Number, Amf0Marker::Date])?;

        self.ensure(8)?;
        let number = self.buf.get_f64();

        if marker == Amf0Marker::Date {
            // Skip the timezone
            self.ensure(2)?;
            self.buf.get_i16();
        }

        Ok(number)
    }

    /// Decode a boolean from the buffer.
    pub fn decode_boolean(&mut self) -> Result<bool, Amf0Error> {
        self.expect_marker(&[Amf0Marker::Boolean])?;
        self.ensure(1)?;
        Ok(self.buf.get_u8() != 0)
    }

    /// Decode a string from the buffer.
    pub fn decode_string(&mut self) -> Result<String, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::String, Amf0Marker::LongString, Amf0Marker::XmlDocument])?;

        let len = if marker == Amf0Marker::String {
            self.ensure(2)?;
            self.buf.get_u16() as usize
        } else {
            self.ensure(4)?;
            self.buf.get_u32() as usize
        };

        self.read_utf8(len)
    }

    /// Decode a null (or undefined) from the buffer.
    pub fn decode_null(&mut self) -> Result<(), Amf0Error> {
        self.expect_marker(&[Amf0Marker::Null, Amf0Marker::Undefined])?;
        Ok(())
    }

    /// Decode an object, typed object or ECMA array from the buffer.
    ///
    /// The three forms share the key/value layout; the ECMA array length hint
    /// and the typed-object class name are consumed and discarded.
    pub fn decode_object(&mut self) -> Result<Amf0Object, Amf0Error> {
        let marker = self.expect_marker(&[Amf0Marker::Object, Amf0Marker::TypedObject, Amf0Marker::EcmaArray])?;

        match marker {
            Amf0Marker::EcmaArray => {
                // associative-count, only a hint
                self.ensure(4)?;
                self.buf.get_u32();
            }
            Amf0Marker::TypedObject => {
                self.ensure(2)?;
                let name_len = self.buf.get_u16() as usize;
                self.read_utf8(name_len)?;
            }
            _ => {}
        }

        let mut object = Vec::new();

        loop {
            self.ensure(2)?;
            let key_len = self.buf.get_u16() as usize;
            let key = self.read_utf8(key_len)?;

            if key.is_empty() {
                let marker = self.read_marker()?;
                if marker == Amf0Marker::ObjectEnd {
                    break;
                }

                return Err(Amf0Error::UnexpectedType {
                    expected: &[Amf0Marker::ObjectEnd],
                    got: marker,
                });
            }

            object.push((key, self.decode_value()?));
        }

        Ok(object)
    }

    /// Decode a strict array from the buffer.
    pub fn decode_strict_array(&mut self) -> Result<Vec<Amf0Value>, Amf0Error> {
        self.expect_marker(&[Amf0Marker::StrictArray])?;

        self.ensure(4)?;
        let len = self.buf.get_u32() as usize;

        let mut values = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            values.push(self.decode_value()?);
        }

        Ok(values)
    }

    fn read_utf8(&mut self, len: usize) -> Result<String, Amf0Error> {
        self.ensure(len)?;
        let mut bytes = vec![0; len];
        self.buf.copy_to_slice(&mut bytes);
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::Amf0Decoder;
    use crate::{Amf0Error, Amf0Marker, Amf0Value};

    #[test]
    fn decode_primitives() {
        #[rustfmt::skip]
        let data = [
            0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // number 1.0
            0x01, 0x01, // boolean true
            0x02, 0x00, 0x03, b'a', b'b', b'c', // string "abc"
            0x05, // null
        ];

        let mut decoder = Amf0Decoder::new(Bytes::copy_from_slice(&data));
        assert_eq!(decoder.decode_value().unwrap(), Amf0Value::Number(1.0));
        assert_eq!(decoder.decode_value().unwrap(), Amf0Value::Boolean(true));
        assert_eq!(decoder.decode_value().unwrap(), Amf0Value::String("abc".into()));
        assert_eq!(decoder.decode_value().unwrap(), Amf0Value::Null);
        assert!(!decoder.has_remaining());
    }

    #[test]
    fn decode_object() {
        #[rustfmt::skip]
        let data = [
            0x03, // object marker
            0x00, 0x03, b'a', b'p', b'p', // key "app"
            0x02, 0x00, 0x04, b'l', b'i', b'v', b'e', // value "live"
            0x00, 0x00, 0x09, // object end
        ];

        let mut decoder = Amf0Decoder::new(Bytes::copy_from_slice(&data));
        let value = decoder.decode_value().unwrap();

        assert_eq!(value.get("app").and_then(|v| v.as_str()), Some("live"));
    }

    #[test]
    fn decode_ecma_array() {
        #[rustfmt::skip]
        let data = [
            0x08, // ecma array marker
            0x00, 0x00, 0x00, 0x01, // length hint
            0x00, 0x01, b'x', // key "x"
            0x00, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // number 2.0
            0x00, 0x00, 0x09, // object end
        ];

        let mut decoder = Amf0Decoder::new(Bytes::copy_from_slice(&data));
        let value = decoder.decode_value().unwrap();

        assert_eq!(value, Amf0Value::EcmaArray(vec![("x".into(), Amf0Value::Number(2.0))]));
    }

    #[test]
    fn truncated_input_is_an_error() {
        // number marker but only 4 of 8 payload bytes
        let data = [0x00, 0x3F, 0xF0, 0x00, 0x00];

        let mut decoder = Amf0Decoder::new(Bytes::copy_from_slice(&data));
        assert!(matches!(decoder.decode_value(), Err(Amf0Error::UnexpectedEof)));
    }

    #[test]
    fn peek_does_not_consume() {
        let data = [0x05];

        let mut decoder = Amf0Decoder::new(Bytes::copy_from_slice(&data));
        assert_eq!(decoder.peek_marker().unwrap(), Amf0Marker::Null);
        assert_eq!(decoder.decode_value().unwrap(), Amf0Value::Null);
    }

    #[test]
    fn unknown_marker() {
        let data = [0xFF];

        let mut decoder = Amf0Decoder::new(Bytes::copy_from_slice(&data));
        assert!(matches!(decoder.decode_value(), Err(Amf0Error::UnknownMarker(0xFF))));
    }
}
