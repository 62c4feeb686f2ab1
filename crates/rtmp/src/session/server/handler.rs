//! Defines types for handling session events.

use bytes::Bytes;

use super::error::ServerSessionError;
use crate::command_messages::UnknownCommand;
use crate::messages::UnknownMessage;

/// Data received from a session.
#[derive(Debug, Clone)]
pub enum SessionData {
    /// Video data.
    Video {
        /// Timestamp of the data.
        timestamp: u32,
        /// The FLV video tag body.
        data: Bytes,
    },
    /// Audio data.
    Audio {
        /// Timestamp of the data.
        timestamp: u32,
        /// The FLV audio tag body.
        data: Bytes,
    },
    /// Metadata.
    Amf0 {
        /// Timestamp of the data.
        timestamp: u32,
        /// The raw AMF0 payload.
        data: Bytes,
    },
}

/// Handler for server session events.
pub trait SessionHandler {
    /// Called when a client wants to publish a stream.
    ///
    /// Returning [`ServerSessionError::PublishRejected`] refuses the publish
    /// with an error-level `onStatus` and keeps the session alive; any other
    /// error tears the session down.
    fn on_publish(
        &mut self,
        stream_id: u32,
        app_name: &str,
        stream_name: &str,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send;

    /// Called when a stream is unpublished.
    fn on_unpublish(&mut self, stream_id: u32) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send;

    /// Called when a client wants to play a stream.
    ///
    /// The default refuses with `NetStream.Play.Failed`; feeding media to an
    /// accepted player is the outer application's business.
    fn on_play(
        &mut self,
        stream_id: u32,
        stream_name: &str,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send {
        let _ = (stream_id, stream_name);
        async { Err(ServerSessionError::PlayRejected("play not supported".to_string())) }
    }

    /// Called when media or metadata is received on a published stream.
    fn on_data(
        &mut self,
        stream_id: u32,
        data: SessionData,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send;

    /// Called for messages of unknown type.
    fn on_unknown_message(
        &mut self,
        stream_id: u32,
        message: UnknownMessage,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send {
        async move {
            tracing::debug!(stream_id, msg_type_id = message.msg_type_id.0, "ignoring unknown message");
            Ok(())
        }
    }

    /// Called for commands of unknown name.
    fn on_unknown_command(
        &mut self,
        stream_id: u32,
        command: UnknownCommand,
    ) -> impl std::future::Future<Output = Result<(), ServerSessionError>> + Send {
        async move {
            tracing::debug!(stream_id, command_name = %command.command_name, "ignoring unknown command");
            Ok(())
        }
    }
}
