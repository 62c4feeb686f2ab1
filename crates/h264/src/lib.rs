//! H.264/AVC support for the strom media stack: the AVC decoder
//! configuration record (ISO/IEC 14496-15) and NAL-unit framing conversion
//! between AnnexB start codes and AVCC length prefixes.
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
mod nal;

pub use config::{AVCDecoderConfigurationRecord, AvccExtendedConfig, ConfigError};
pub use nal::{NalPrefix, split_annex_b, strip_nal_prefix, to_avcc};
