//! Defines types for handling client session events.

use super::error::ClientSessionError;
use crate::command_messages::Command;
use crate::command_messages::on_status::OnStatus;
use crate::session::server::SessionData;
use crate::user_control_messages::EventMessage;

/// Handler for client session events that are not the reply to an awaited
/// command: unsolicited status events (including the E-RTMP reconnect
/// request), user control events, inbound media on a play stream and any
/// command the session does not interpret.
///
/// Every method has a do-nothing default, so a pure publisher only overrides
/// what it cares about.
pub trait ClientSessionHandler {
    /// Called for `onStatus` events no command is waiting for.
    ///
    /// `NetConnection.Connect.ReconnectRequest` arrives here; the session
    /// stays open until the caller reacts.
    fn on_status(
        &mut self,
        stream_id: u32,
        status: OnStatus,
    ) -> impl std::future::Future<Output = Result<(), ClientSessionError>> + Send {
        async move {
            tracing::debug!(stream_id, code = %status.code, "unhandled status event");
            Ok(())
        }
    }

    /// Called for user control events (stream begin/EOF/dry, recorded, ping
    /// responses). Ping requests are answered by the session itself.
    fn on_user_control(
        &mut self,
        event: EventMessage,
    ) -> impl std::future::Future<Output = Result<(), ClientSessionError>> + Send {
        async move {
            tracing::debug!(?event, "unhandled user control event");
            Ok(())
        }
    }

    /// Called when media or metadata arrives, i.e. when playing.
    fn on_data(
        &mut self,
        stream_id: u32,
        data: SessionData,
    ) -> impl std::future::Future<Output = Result<(), ClientSessionError>> + Send {
        async move {
            let _ = (stream_id, data);
            Ok(())
        }
    }

    /// Called for commands nothing else consumed (e.g. `onFCPublish`).
    fn on_command(&mut self, command: Command) -> impl std::future::Future<Output = Result<(), ClientSessionError>> + Send {
        async move {
            tracing::debug!(?command, "unhandled command");
            Ok(())
        }
    }
}

/// A handler that ignores every event; enough for plain publishers.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHandler;

impl ClientSessionHandler for NullHandler {}
