//! Byte-source and bit-level IO utilities shared by the strom crates.
//!
//! ## License
//!
//! This project is licensed under the [MIT](./LICENSE.MIT) or
//! [Apache-2.0](./LICENSE.Apache-2.0) license.
//! You can choose between one of them if you use this work.
//!
//! `SPDX-License-Identifier: MIT OR Apache-2.0`
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(unreachable_pub)]

mod bit_reader;
mod bit_writer;
mod cursor;
mod source;

pub mod zero_copy;

pub use bit_reader::BitReader;
pub use bit_writer::BitWriter;
pub use cursor::BytesCursorExt;
pub use source::{ByteSource, SizedSource};
