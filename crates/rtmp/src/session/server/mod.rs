//! RTMP server session.

use std::time::Duration;

use bytes::BytesMut;
use strom_bytes_util::BytesCursorExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::chunk::{ChunkReader, ChunkWriter, OUT_CHUNK_SIZE};
use crate::command_messages::netconnection::{NetConnectionCommand, NetConnectionConnect, NetConnectionConnectResult};
use crate::command_messages::netstream::NetStreamCommand;
use crate::command_messages::on_status::{OnStatus, codes};
use crate::command_messages::{Command, CommandResult, CommandType};
use crate::handshake;
use crate::handshake::HandshakeServer;
use crate::messages::MessageData;
use crate::protocol_control_messages::{
    ProtocolControlMessageAcknowledgement, ProtocolControlMessageSetChunkSize, ProtocolControlMessageSetPeerBandwidth,
    ProtocolControlMessageSetPeerBandwidthLimitType, ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::user_control_messages::EventMessage;

mod error;
mod handler;

pub use error::ServerSessionError;
pub use handler::{SessionData, SessionHandler};

// The acknowledgement window used until the client announces its own.
// This is a common value used by other media servers as well.
// - https://github.com/FFmpeg/FFmpeg/blob/154c00514d889d27ae84a1001e00f9032fdc1c54/libavformat/rtmpproto.c#L2850
const DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE: u32 = 2_500_000; // 2.5 MB

// Message stream ids handed out by createStream. Ids 0..=2 are reserved for
// the connection itself, so allocation starts above them.
const FIRST_STREAM_ID: u32 = 3;

/// A RTMP server session that is used to communicate with a client.
///
/// This provides a high-level API to drive a RTMP session.
pub struct ServerSession<S, H> {
    /// Used to read and write data.
    io: S,
    handler: H,
    /// The app name from the connect command, once received.
    app_name: Option<String>,
    /// The object encoding the client asked for in connect.
    object_encoding: f64,
    /// The size of the acknowledgement window.
    acknowledgement_window_size: u32,
    /// The number of bytes read from the stream, wrapping at u32::MAX.
    sequence_number: u32,
    /// The sequence number of the last acknowledgement sent.
    last_acknowledged: u32,
    /// Buffer to read data into.
    read_buf: BytesMut,
    /// Buffer to write data to.
    write_buf: Vec<u8>,
    /// The handshake sometimes over-reads; this flag marks buffered data
    /// ready to parse before the next socket read.
    skip_read: bool,
    chunk_reader: ChunkReader,
    chunk_writer: ChunkWriter,
    /// Message stream ids issued by createStream, in issue order.
    created_stream_ids: Vec<u32>,
    /// The next message stream id to issue.
    next_stream_id: u32,
    /// Stream ids currently publishing.
    publishing_stream_ids: Vec<u32>,
}

impl<S, H> ServerSession<S, H> {
    /// Create a new session.
    pub fn new(io: S, handler: H) -> Self {
        Self {
            io,
            handler,
            app_name: None,
            object_encoding: 0.0,
            acknowledgement_window_size: DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE,
            sequence_number: 0,
            last_acknowledged: 0,
            read_buf: BytesMut::new(),
            write_buf: Vec::new(),
            skip_read: false,
            chunk_reader: ChunkReader::default(),
            chunk_writer: ChunkWriter::default(),
            created_stream_ids: Vec::new(),
            next_stream_id: FIRST_STREAM_ID,
            publishing_stream_ids: Vec::new(),
        }
    }
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin, H: SessionHandler> ServerSession<S, H> {
    /// Run the session to completion.
    ///
    /// The returned value is true when all publishers have disconnected
    /// cleanly; false means the client went away mid-publish.
    pub async fn run(mut self) -> Result<bool, crate::error::RtmpError> {
        let mut handshaker = HandshakeServer::default();
        loop {
            let finished = self.drive_handshake(&mut handshaker).await?;
            self.flush().await?;
            if finished {
                break;
            }
        }

        drop(handshaker);

        tracing::debug!("handshake complete");

        loop {
            match self.drive().await {
                Ok(true) => self.flush().await?,
                Ok(false) => break, // client closed the connection
                Err(err) if err.is_client_closed() => {
                    tracing::debug!("client closed the connection");
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        // Most clients just disconnect without cleanly stopping their play
        // streams, so only the publishers count for a clean exit.
        Ok(self.publishing_stream_ids.is_empty())
    }

    /// Drives the handshake stage; returns true once it completes.
    async fn drive_handshake(&mut self, handshaker: &mut HandshakeServer) -> Result<bool, crate::error::RtmpError> {
        // C0 + C1 on the first pass, C2 on the second
        const READ_SIZE: usize = handshake::RTMP_HANDSHAKE_SIZE + 1;
        self.read_buf.reserve(READ_SIZE);

        let mut bytes_read = 0;
        while bytes_read < READ_SIZE {
            let n = tokio::time::timeout(Duration::from_secs(2), self.io.read_buf(&mut self.read_buf))
                .await
                .map_err(ServerSessionError::Timeout)??;

            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }

            bytes_read += n;
            self.sequence_number = self.sequence_number.wrapping_add(n as u32);
        }

        let mut cursor = std::io::Cursor::new(self.read_buf.split().freeze());

        handshaker.handshake(&mut cursor, &mut self.write_buf)?;

        if handshaker.is_finished() {
            let over_read = cursor.extract_remaining();

            if !over_read.is_empty() {
                self.skip_read = true;
                self.read_buf.extend_from_slice(&over_read);
            }

            self.send_set_chunk_size()?;

            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Drives the message stage; returns false when the client disconnects.
    async fn drive(&mut self) -> Result<bool, crate::error::RtmpError> {
        if self.skip_read {
            self.skip_read = false;
        } else {
            self.read_buf.reserve(OUT_CHUNK_SIZE);

            let n = self.io.read_buf(&mut self.read_buf).await? as u32;
            if n == 0 {
                return Ok(false);
            }

            self.sequence_number = self.sequence_number.wrapping_add(n);
            self.maybe_acknowledge()?;
        }

        self.process_chunks().await?;

        Ok(true)
    }

    /// Emits an acknowledgement once a window worth of bytes arrived since
    /// the last one. The sequence number sent is monotonically non-decreasing.
    fn maybe_acknowledge(&mut self) -> Result<(), crate::error::RtmpError> {
        let unacknowledged = self.sequence_number.wrapping_sub(self.last_acknowledged);
        if unacknowledged >= self.acknowledgement_window_size {
            tracing::debug!(sequence_number = %self.sequence_number, "sending acknowledgement");

            ProtocolControlMessageAcknowledgement {
                sequence_number: self.sequence_number,
            }
            .write(&mut self.write_buf, &mut self.chunk_writer)?;

            self.last_acknowledged = self.sequence_number;
        }

        Ok(())
    }

    /// Parses buffered bytes into messages and processes them.
    async fn process_chunks(&mut self) -> Result<(), crate::error::RtmpError> {
        while let Some(chunk) = self.chunk_reader.read_chunk(&mut self.read_buf)? {
            let timestamp = chunk.message_header.timestamp;
            let msg_stream_id = chunk.message_header.msg_stream_id;

            let msg = MessageData::read(&chunk)?;
            self.process_message(msg, msg_stream_id, timestamp).await?;
        }

        Ok(())
    }

    /// Process one RTMP message.
    async fn process_message(
        &mut self,
        msg: MessageData,
        stream_id: u32,
        timestamp: u32,
    ) -> Result<(), crate::error::RtmpError> {
        match msg {
            MessageData::Command(command) => self.on_command_message(stream_id, command).await?,
            MessageData::SetChunkSize(ProtocolControlMessageSetChunkSize { chunk_size }) => {
                self.on_set_chunk_size(chunk_size as usize)?;
            }
            MessageData::Abort(abort) => self.chunk_reader.abort(abort.chunk_stream_id),
            MessageData::Acknowledgement(ack) => {
                tracing::trace!(sequence_number = ack.sequence_number, "peer acknowledged");
            }
            MessageData::SetAcknowledgementWindowSize(ProtocolControlMessageWindowAcknowledgementSize {
                acknowledgement_window_size,
            }) => {
                tracing::debug!(acknowledgement_window_size, "received new acknowledgement window size");
                self.acknowledgement_window_size = acknowledgement_window_size;
            }
            MessageData::SetPeerBandwidth(bandwidth) => {
                // answer with the window acknowledgement size we operate with
                tracing::debug!(
                    window = bandwidth.acknowledgement_window_size,
                    "peer bandwidth requested, answering with window ack size"
                );
                ProtocolControlMessageWindowAcknowledgementSize {
                    acknowledgement_window_size: DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE,
                }
                .write(&mut self.write_buf, &mut self.chunk_writer)?;
            }
            MessageData::UserControl(event) => self.on_user_control(event)?,
            MessageData::AudioData { data } => {
                if self.is_issued_stream(stream_id) {
                    self.handler
                        .on_data(stream_id, SessionData::Audio { timestamp, data })
                        .await?;
                } else {
                    tracing::debug!(stream_id, "dropping audio on unknown stream");
                }
            }
            MessageData::VideoData { data } => {
                if self.is_issued_stream(stream_id) {
                    self.handler
                        .on_data(stream_id, SessionData::Video { timestamp, data })
                        .await?;
                } else {
                    tracing::debug!(stream_id, "dropping video on unknown stream");
                }
            }
            MessageData::DataAmf0 { data } => {
                if self.is_issued_stream(stream_id) {
                    self.handler.on_data(stream_id, SessionData::Amf0 { timestamp, data }).await?;
                } else {
                    tracing::debug!(stream_id, "dropping data on unknown stream");
                }
            }
            MessageData::Unknown(unknown_message) => {
                self.handler.on_unknown_message(stream_id, unknown_message).await?;
            }
            // ignore everything else
            _ => {}
        }

        Ok(())
    }

    fn is_issued_stream(&self, stream_id: u32) -> bool {
        self.created_stream_ids.contains(&stream_id)
    }

    /// Announce our write chunk size and start using it.
    fn send_set_chunk_size(&mut self) -> Result<(), crate::error::RtmpError> {
        ProtocolControlMessageSetChunkSize {
            chunk_size: OUT_CHUNK_SIZE as u32,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer)?;
        self.chunk_writer.set_chunk_size(OUT_CHUNK_SIZE);

        Ok(())
    }

    fn on_set_chunk_size(&mut self, chunk_size: usize) -> Result<(), crate::error::RtmpError> {
        if self.chunk_reader.update_max_chunk_size(chunk_size) {
            Ok(())
        } else {
            Err(crate::error::RtmpError::Session(ServerSessionError::InvalidChunkSize(
                chunk_size,
            )))
        }
    }

    fn on_user_control(&mut self, event: EventMessage) -> Result<(), crate::error::RtmpError> {
        match event {
            EventMessage::PingRequest { timestamp } => {
                EventMessage::PingResponse { timestamp }.write(&mut self.write_buf, &mut self.chunk_writer)?;
            }
            event => {
                tracing::debug!(?event, "ignoring user control event");
            }
        }

        Ok(())
    }

    /// Handle one command message from the client.
    async fn on_command_message(&mut self, stream_id: u32, command: Command) -> Result<(), crate::error::RtmpError> {
        match command.command_type {
            CommandType::NetConnection(NetConnectionCommand::Connect(connect)) => {
                self.on_command_connect(command.transaction_id, connect)?;
            }
            CommandType::NetConnection(NetConnectionCommand::CreateStream) => {
                self.on_command_create_stream(command.transaction_id)?;
            }
            CommandType::NetStream(NetStreamCommand::ReleaseStream { stream_key }) => {
                // nothing to release; acknowledged by convention
                tracing::debug!(%stream_key, "releaseStream");
                Command {
                    transaction_id: command.transaction_id,
                    command_type: CommandType::Result(CommandResult {
                        success: true,
                        values: vec![],
                    }),
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, 0)?;
            }
            CommandType::NetStream(NetStreamCommand::FcPublish { stream_key }) => {
                tracing::debug!(%stream_key, "FCPublish");
                Command {
                    transaction_id: 0.0,
                    command_type: CommandType::OnFcPublish { info: None },
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, 0)?;
            }
            CommandType::NetStream(NetStreamCommand::FcUnpublish { stream_key }) => {
                tracing::debug!(%stream_key, "FCUnpublish");
                Command {
                    transaction_id: command.transaction_id,
                    command_type: CommandType::Result(CommandResult {
                        success: true,
                        values: vec![],
                    }),
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, 0)?;
            }
            CommandType::NetStream(NetStreamCommand::DeleteStream {
                stream_id: delete_stream_id,
            }) => {
                self.on_command_delete_stream(command.transaction_id, delete_stream_id as u32).await?;
            }
            CommandType::NetStream(NetStreamCommand::CloseStream) => {
                if self.publishing_stream_ids.contains(&stream_id) {
                    self.handler.on_unpublish(stream_id).await?;
                    self.publishing_stream_ids.retain(|id| *id != stream_id);
                }
            }
            CommandType::NetStream(NetStreamCommand::Publish {
                publishing_name,
                publishing_type,
            }) => {
                tracing::debug!(name = %publishing_name, publish_type = publishing_type.as_ref(), "publish");
                self.on_command_publish(stream_id, command.transaction_id, &publishing_name).await?;
            }
            CommandType::NetStream(NetStreamCommand::Play { stream_name, .. }) => {
                self.on_command_play(stream_id, command.transaction_id, &stream_name).await?;
            }
            CommandType::Unknown(unknown_command) => {
                self.handler.on_unknown_command(stream_id, unknown_command).await?;
            }
            // ignore everything else
            _ => {}
        }

        Ok(())
    }

    /// Handle the connect command: window, bandwidth, stream begin and the
    /// success result.
    fn on_command_connect(&mut self, transaction_id: f64, connect: NetConnectionConnect) -> Result<(), crate::error::RtmpError> {
        ProtocolControlMessageWindowAcknowledgementSize {
            acknowledgement_window_size: DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer)?;

        ProtocolControlMessageSetPeerBandwidth {
            acknowledgement_window_size: DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE,
            limit_type: ProtocolControlMessageSetPeerBandwidthLimitType::Dynamic,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer)?;

        EventMessage::StreamBegin { stream_id: 0 }.write(&mut self.write_buf, &mut self.chunk_writer)?;

        tracing::debug!(app = %connect.app, caps_ex = ?connect.caps_ex, "connect");

        self.object_encoding = connect.object_encoding.unwrap_or(0.0);
        self.app_name = Some(connect.app);

        let result = NetConnectionCommand::ConnectResult(NetConnectionConnectResult::success(self.object_encoding));

        Command {
            command_type: CommandType::NetConnection(result),
            transaction_id,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer, 0)?;

        Ok(())
    }

    /// Allocate a fresh message stream id and report it back.
    fn on_command_create_stream(&mut self, transaction_id: f64) -> Result<(), crate::error::RtmpError> {
        let stream_id = self.next_stream_id;
        self.next_stream_id += 1;
        self.created_stream_ids.push(stream_id);

        Command {
            command_type: CommandType::NetConnection(NetConnectionCommand::CreateStreamResult {
                stream_id: stream_id as f64,
            }),
            transaction_id,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer, 0)?;

        Ok(())
    }

    /// Tear down one created stream.
    async fn on_command_delete_stream(
        &mut self,
        transaction_id: f64,
        stream_id: u32,
    ) -> Result<(), crate::error::RtmpError> {
        if self.publishing_stream_ids.contains(&stream_id) {
            self.handler.on_unpublish(stream_id).await?;
        }

        self.publishing_stream_ids.retain(|id| *id != stream_id);
        self.created_stream_ids.retain(|id| *id != stream_id);

        Command {
            command_type: CommandType::OnStatus(OnStatus::status(codes::NET_STREAM_DELETE_STREAM_SUCCESS)),
            transaction_id,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer, 0)?;

        Ok(())
    }

    /// Handle a publish: consult the handler, then either start the stream
    /// or refuse it.
    async fn on_command_publish(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        publishing_name: &str,
    ) -> Result<(), crate::error::RtmpError> {
        let Some(app_name) = self.app_name.clone() else {
            return Err(crate::error::RtmpError::Session(ServerSessionError::PublishBeforeConnect));
        };

        if !self.is_issued_stream(stream_id) {
            return Err(crate::error::RtmpError::Session(ServerSessionError::StreamNotCreated(
                stream_id,
            )));
        }

        match self.handler.on_publish(stream_id, &app_name, publishing_name).await {
            Ok(()) => {
                self.publishing_stream_ids.push(stream_id);

                EventMessage::StreamBegin { stream_id }.write(&mut self.write_buf, &mut self.chunk_writer)?;

                Command {
                    command_type: CommandType::OnStatus(OnStatus::status(codes::NET_STREAM_PUBLISH_START)),
                    transaction_id,
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, stream_id)?;
            }
            Err(ServerSessionError::PublishRejected(reason)) => {
                tracing::debug!(%reason, "publish rejected");

                Command {
                    command_type: CommandType::OnStatus(OnStatus::error(codes::NET_STREAM_PUBLISH_FAILED, reason)),
                    transaction_id,
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, stream_id)?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    /// Handle a play: consult the handler, then either begin the stream or
    /// refuse it.
    async fn on_command_play(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        stream_name: &str,
    ) -> Result<(), crate::error::RtmpError> {
        if !self.is_issued_stream(stream_id) {
            return Err(crate::error::RtmpError::Session(ServerSessionError::StreamNotCreated(
                stream_id,
            )));
        }

        match self.handler.on_play(stream_id, stream_name).await {
            Ok(()) => {
                EventMessage::StreamBegin { stream_id }.write(&mut self.write_buf, &mut self.chunk_writer)?;

                Command {
                    command_type: CommandType::OnStatus(OnStatus::status(codes::NET_STREAM_PLAY_START)),
                    transaction_id,
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, stream_id)?;
            }
            Err(ServerSessionError::PlayRejected(reason)) => {
                tracing::debug!(%reason, "play rejected");

                Command {
                    command_type: CommandType::OnStatus(OnStatus::error(codes::NET_STREAM_PLAY_FAILED, reason)),
                    transaction_id,
                }
                .write(&mut self.write_buf, &mut self.chunk_writer, stream_id)?;
            }
            Err(e) => return Err(e.into()),
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), crate::error::RtmpError> {
        if !self.write_buf.is_empty() {
            tokio::time::timeout(Duration::from_secs(2), self.io.write_all(self.write_buf.as_ref()))
                .await
                .map_err(ServerSessionError::Timeout)??;
            self.write_buf.clear();
        }

        Ok(())
    }
}
