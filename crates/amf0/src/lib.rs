//! A pure Rust implementation of an AMF0 encoder and decoder.
//!
//! The surface is an element tree: [`Amf0Value`] goes in, bytes come out, and
//! back. References and the AVM+ escape marker are not supported.
//!
//! # Examples
//!
//! ```rust
//! # fn test() -> Result<(), strom_amf0::Amf0Error> {
//! use strom_amf0::{Amf0Decoder, Amf0Encoder, Amf0Value};
//!
//! let mut buf = Vec::new();
//! let mut encoder = Amf0Encoder::new(&mut buf);
//! encoder.encode_string("connect")?;
//! encoder.encode_number(1.0)?;
//!
//! let mut decoder = Amf0Decoder::new(bytes::Bytes::from(buf));
//! assert_eq!(decoder.decode_value()?, Amf0Value::String("connect".into()));
//! assert_eq!(decoder.decode_value()?, Amf0Value::Number(1.0));
//! # Ok(())
//! # }
//! # test().expect("test failed");
//! ```
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![deny(unsafe_code)]
#![deny(unreachable_pub)]

mod decoder;
mod encoder;
mod error;
mod value;

pub use decoder::Amf0Decoder;
pub use encoder::Amf0Encoder;
pub use error::{Amf0Error, Result};
pub use value::{Amf0Object, Amf0Value};

/// AMF0 marker types.
///
/// Defined by:
/// - AMF 0 spec, 2.1.
#[derive(Debug, PartialEq, Eq, Clone, Copy, num_derive::FromPrimitive)]
#[repr(u8)]
pub enum Amf0Marker {
    /// number-marker
    Number = 0x00,
    /// boolean-marker
    Boolean = 0x01,
    /// string-marker
    String = 0x02,
    /// object-marker
    Object = 0x03,
    /// movieclip-marker
    ///
    /// reserved, not supported
    MovieClipMarker = 0x04,
    /// null-marker
    Null = 0x05,
    /// undefined-marker
    Undefined = 0x06,
    /// reference-marker
    Reference = 0x07,
    /// ecma-array-marker
    EcmaArray = 0x08,
    /// object-end-marker
    ObjectEnd = 0x09,
    /// strict-array-marker
    StrictArray = 0x0a,
    /// date-marker
    Date = 0x0b,
    /// long-string-marker
    LongString = 0x0c,
    /// unsupported-marker
    Unsupported = 0x0d,
    /// recordset-marker
    ///
    /// reserved, not supported
    Recordset = 0x0e,
    /// xml-document-marker
    XmlDocument = 0x0f,
    /// typed-object-marker
    TypedObject = 0x10,
    /// avmplus-object-marker
    ///
    /// AMF3 marker
    AVMPlusObject = 0x11,
}
