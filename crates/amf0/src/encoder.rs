//! AMF0 encoder

use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::{Amf0Error, Amf0Marker, Amf0Object, Amf0Value};

/// AMF0 encoder.
///
/// Provides functions to encode the different AMF0 element types into a
/// writer.
#[derive(Debug)]
pub struct Amf0Encoder<W> {
    writer: W,
}

impl<W> Amf0Encoder<W> {
    /// Creates a new encoder around `writer`.
    pub fn new(writer: W) -> Self {
        Amf0Encoder { writer }
    }
}

impl<W> Amf0Encoder<W>
where
    W: io::Write,
{
    /// Encode a full [`Amf0Value`].
    pub fn encode_value(&mut self, value: &Amf0Value) -> Result<(), Amf0Error> {
        match value {
            Amf0Value::Number(n) => self.encode_number(*n),
            Amf0Value::Boolean(b) => self.encode_boolean(*b),
            Amf0Value::String(s) => self.encode_string(s),
            Amf0Value::Object(object) => self.encode_object(object),
            Amf0Value::Null => self.encode_null(),
            Amf0Value::Array(values) => self.encode_array(values),
            Amf0Value::EcmaArray(object) => self.encode_ecma_array(object),
        }
    }

    /// Encode a [`bool`] as a AMF0 boolean value.
    pub fn encode_boolean(&mut self, value: bool) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Boolean as u8)?;
        self.writer.write_u8(value as u8)?;
        Ok(())
    }

    /// Encode a [`f64`] as a AMF0 number value.
    pub fn encode_number(&mut self, value: f64) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Number as u8)?;
        self.writer.write_f64::<BigEndian>(value)?;
        Ok(())
    }

    /// Encode a [`&str`](str) as a AMF0 string value.
    ///
    /// Decides based on the length of the given string slice whether to use a
    /// normal string or a long string.
    pub fn encode_string(&mut self, value: &str) -> Result<(), Amf0Error> {
        let len = value.len();

        if len <= (u16::MAX as usize) {
            self.writer.write_u8(Amf0Marker::String as u8)?;
            self.writer.write_u16::<BigEndian>(len as u16)?;
            self.writer.write_all(value.as_bytes())?;
        } else {
            // This try_into fails if the length is greater than u32::MAX
            let len: u32 = len.try_into()?;

            self.writer.write_u8(Amf0Marker::LongString as u8)?;
            self.writer.write_u32::<BigEndian>(len)?;
            self.writer.write_all(value.as_bytes())?;
        }

        Ok(())
    }

    /// Encode AMF0 Null value.
    pub fn encode_null(&mut self) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Null as u8)?;
        Ok(())
    }

    /// Encode a list of values as an AMF0 StrictArray value.
    pub fn encode_array(&mut self, values: &[Amf0Value]) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::StrictArray as u8)?;
        self.writer.write_u32::<BigEndian>(values.len().try_into()?)?;

        for value in values {
            self.encode_value(value)?;
        }

        Ok(())
    }

    fn encode_object_key(&mut self, key: &str) -> Result<(), Amf0Error> {
        self.writer.write_u16::<BigEndian>(key.len().try_into()?)?;
        self.writer.write_all(key.as_bytes())?;
        Ok(())
    }

    fn encode_object_trailer(&mut self) -> Result<(), Amf0Error> {
        self.writer.write_u24::<BigEndian>(Amf0Marker::ObjectEnd as u32)?;
        Ok(())
    }

    /// Encode an [`Amf0Object`] as an AMF0 Object value.
    pub fn encode_object(&mut self, values: &Amf0Object) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::Object as u8)?;

        for (key, value) in values.iter() {
            self.encode_object_key(key)?;
            self.encode_value(value)?;
        }

        self.encode_object_trailer()?;

        Ok(())
    }

    /// Encode an [`Amf0Object`] as an AMF0 EcmaArray value.
    ///
    /// The associative count is the number of pairs; readers treat it as a
    /// hint only.
    pub fn encode_ecma_array(&mut self, values: &Amf0Object) -> Result<(), Amf0Error> {
        self.writer.write_u8(Amf0Marker::EcmaArray as u8)?;
        self.writer.write_u32::<BigEndian>(values.len().try_into()?)?;

        for (key, value) in values.iter() {
            self.encode_object_key(key)?;
            self.encode_value(value)?;
        }

        self.encode_object_trailer()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::Amf0Encoder;
    use crate::{Amf0Decoder, Amf0Value};

    #[test]
    fn encode_primitives_byte_exact() {
        let mut buf = Vec::new();
        let mut encoder = Amf0Encoder::new(&mut buf);

        encoder.encode_number(1.0).unwrap();
        encoder.encode_boolean(false).unwrap();
        encoder.encode_string("hi").unwrap();
        encoder.encode_null().unwrap();

        #[rustfmt::skip]
        assert_eq!(
            buf,
            vec![
                0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // number 1.0
                0x01, 0x00, // boolean false
                0x02, 0x00, 0x02, b'h', b'i', // string "hi"
                0x05, // null
            ]
        );
    }

    #[test]
    fn object_round_trip_preserves_order() {
        let object = vec![
            ("b".to_string(), Amf0Value::Number(2.0)),
            ("a".to_string(), Amf0Value::String("x".into())),
        ];

        let mut buf = Vec::new();
        Amf0Encoder::new(&mut buf).encode_object(&object).unwrap();

        let decoded = Amf0Decoder::new(Bytes::from(buf)).decode_object().unwrap();
        assert_eq!(decoded, object);
    }

    #[test]
    fn ecma_array_round_trip() {
        let object = vec![("duration".to_string(), Amf0Value::Number(1.5))];

        let mut buf = Vec::new();
        Amf0Encoder::new(&mut buf).encode_ecma_array(&object).unwrap();

        // length hint directly after the marker
        assert_eq!(&buf[1..5], &[0, 0, 0, 1]);

        let decoded = Amf0Decoder::new(Bytes::from(buf)).decode_value().unwrap();
        assert_eq!(decoded, Amf0Value::EcmaArray(object));
    }

    #[test]
    fn strict_array_round_trip() {
        let values = vec![Amf0Value::Number(1.0), Amf0Value::Null];

        let mut buf = Vec::new();
        Amf0Encoder::new(&mut buf).encode_array(&values).unwrap();

        let decoded = Amf0Decoder::new(Bytes::from(buf)).decode_value().unwrap();
        assert_eq!(decoded, Amf0Value::Array(values));
    }
}
