//! A pure Rust implementation of the FLV container format: demuxing and
//! muxing of FLV files and streams, including the Enhanced RTMP (E-RTMP v2)
//! tag layouts.
//!
//! Every wire type in this crate implements the same triple:
//! `demux(reader)`, `size()` (the exact number of bytes `mux` will write) and
//! `mux(writer)`.
//!
//! ## Specifications
//!
//! | Name | Version | Link | Comments |
//! | --- | --- | --- | --- |
//! | Adobe Flash Video File Format Specification | `10.1` | <https://github.com/veovera/enhanced-rtmp/blob/main/docs/legacy/video-file-format-v10-1-spec.pdf> | Referred to as 'Legacy FLV spec' in this documentation |
//! | Enhanced RTMP | `v2-2024-10-22-b1` | <https://github.com/veovera/enhanced-rtmp/blob/main/docs/enhanced/enhanced-rtmp-v2.pdf> | Referred to as 'Enhanced RTMP spec' in this documentation |
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

pub mod audio;
pub mod common;
pub mod error;
pub mod file;
pub mod header;
pub mod script;
pub mod tag;
pub mod video;
