//! RTMP sessions.
//!
//! One session per transport connection, in either role: [`server`] accepts
//! publishers and players, [`client`] connects, publishes and plays.

pub mod client;
pub mod server;
