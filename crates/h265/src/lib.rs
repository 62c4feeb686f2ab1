//! H.265/HEVC support for the strom media stack: the HEVC decoder
//! configuration record (ISO/IEC 14496-15, 8.3.2.1).
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

mod config;

pub use config::{ConfigError, HEVCDecoderConfigurationRecord, NaluArray, NaluType};
