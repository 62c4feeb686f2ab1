//! RTMP client session.
//!
//! The client is split in two halves wired by a queue: [`ClientSession`] is
//! the message pump that owns the transport, drives the dispatch loop and
//! serializes every outbound write (so chunk sequences of different messages
//! never interleave); [`Client`] is the cloneable handle application tasks
//! call. Command methods suspend until the matching reply resolves their
//! transaction slot; media writes suspend only for queue backpressure.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use bytes::BytesMut;
use strom_bytes_util::{ByteSource, BytesCursorExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

use crate::chunk::{
    CHUNK_STREAM_ID_AUDIO, CHUNK_STREAM_ID_DATA, CHUNK_STREAM_ID_VIDEO, Chunk, ChunkReader, ChunkWriter, OUT_CHUNK_SIZE,
};
use crate::command_messages::netconnection::{NetConnectionCommand, NetConnectionConnect};
use crate::command_messages::netstream::{NetStreamCommand, PublishingType};
use crate::command_messages::{Command, CommandType};
use crate::handshake::{RTMP_HANDSHAKE_SIZE, SimpleHandshakeClient};
use crate::messages::{MessageData, MessageType};
use crate::protocol_control_messages::{
    ProtocolControlMessageSetChunkSize, ProtocolControlMessageWindowAcknowledgementSize,
};
use crate::session::server::SessionData;
use crate::transport::TransportKind;
use crate::url::RtmpUrl;
use crate::user_control_messages::EventMessage;

mod error;
mod handler;
mod transaction;

pub use error::ClientSessionError;
pub use handler::{ClientSessionHandler, NullHandler};
pub use transaction::AwaitKey;

use transaction::{CommandOutcome, TransactionRegistry};

// Mirrors the window media servers default to.
const DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE: u32 = 2_500_000;

// Audio/video codec support bitmasks advertised in connect; the values every
// FLV-capable encoder announces.
const DEFAULT_AUDIO_CODECS: f64 = 4071.0;
const DEFAULT_VIDEO_CODECS: f64 = 252.0;
const DEFAULT_VIDEO_FUNCTION: f64 = 1.0;

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-session client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The chunk size announced for the write direction.
    pub write_chunk_size: usize,
    /// The acknowledgement window announced to the peer.
    pub write_window_ack_size: u32,
    /// The `flashVer` string put into the connect command.
    pub flash_ver: String,
    /// The object encoding requested in connect (0 = AMF0, 3 = AMF3).
    pub object_encoding: f64,
    /// When set, media frames whose `timestamp + timeout` lies in the past at
    /// write time are silently dropped instead of sent.
    pub too_late_drop_timeout_ms: Option<u64>,
    /// The transport kind; tunneled transports relax the handshake echo.
    pub transport: TransportKind,
    /// The wall clock used by the frame drop policy, in milliseconds.
    pub now_ms: fn() -> u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            write_chunk_size: OUT_CHUNK_SIZE,
            write_window_ack_size: DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE,
            flash_ver: "FMLE/3.0 (compatible; strom)".to_string(),
            object_encoding: 0.0,
            too_late_drop_timeout_ms: None,
            transport: TransportKind::Tcp,
            now_ms: wall_clock_ms,
        }
    }
}

/// The coarse client state, driven by RPC completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Handshake done, `connect` not yet acknowledged.
    Connected,
    /// `createStream` returned a stream id.
    StreamCreated,
    /// `publish` was acknowledged with `NetStream.Publish.Start`.
    Publishing,
    /// `play` was acknowledged.
    Playing,
    /// `close` was requested.
    Closing,
    /// The session is gone.
    Closed,
}

enum ClientRequest {
    Command {
        command: Command,
        msg_stream_id: u32,
        await_key: Option<AwaitKey>,
        reply: Option<oneshot::Sender<CommandOutcome>>,
    },
    Media {
        msg_type: MessageType,
        msg_stream_id: u32,
        timestamp: u32,
        payload: ByteSource,
        deadline_ms: Option<u64>,
    },
    Close,
}

/// The cloneable handle to a running [`ClientSession`].
#[derive(Clone)]
pub struct Client {
    tx: mpsc::Sender<ClientRequest>,
    next_transaction_id: Arc<AtomicU32>,
    state: Arc<Mutex<ClientState>>,
    too_late_drop_timeout_ms: Option<u64>,
}

impl Client {
    /// The current session state.
    pub fn state(&self) -> ClientState {
        *self.state.lock().expect("state lock poisoned")
    }

    fn set_state(&self, state: ClientState) {
        *self.state.lock().expect("state lock poisoned") = state;
    }

    fn next_transaction_id(&self) -> u32 {
        self.next_transaction_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn send(&self, request: ClientRequest) -> Result<(), ClientSessionError> {
        self.tx.send(request).await.map_err(|_| ClientSessionError::Cancelled)
    }

    /// Sends a command and, when `await_key` is set, suspends until the
    /// matching reply arrives.
    async fn send_command(
        &self,
        command: Command,
        msg_stream_id: u32,
        await_key: Option<AwaitKey>,
    ) -> Result<Option<Command>, ClientSessionError> {
        match await_key {
            Some(await_key) => {
                let (reply_tx, reply_rx) = oneshot::channel();

                self.send(ClientRequest::Command {
                    command,
                    msg_stream_id,
                    await_key: Some(await_key),
                    reply: Some(reply_tx),
                })
                .await?;

                let reply = reply_rx.await.map_err(|_| ClientSessionError::Cancelled)??;
                Ok(Some(reply))
            }
            None => {
                self.send(ClientRequest::Command {
                    command,
                    msg_stream_id,
                    await_key: None,
                    reply: None,
                })
                .await?;
                Ok(None)
            }
        }
    }

    /// Sends `connect` for the given URL and waits for the `_result`.
    ///
    /// The connect object is derived from the URL plus the session defaults;
    /// use [`connect_with`](Self::connect_with) for full control.
    pub async fn connect(&self, url: &RtmpUrl, config: &ClientConfig) -> Result<Command, ClientSessionError> {
        let mut connect = NetConnectionConnect::new(url.app.clone());
        connect.tc_url = Some(url.tc_url.clone());
        connect.flash_ver = Some(config.flash_ver.clone());
        connect.fpad = Some(false);
        connect.audio_codecs = Some(DEFAULT_AUDIO_CODECS);
        connect.video_codecs = Some(DEFAULT_VIDEO_CODECS);
        connect.video_function = Some(DEFAULT_VIDEO_FUNCTION);
        connect.object_encoding = Some(config.object_encoding);

        self.connect_with(connect).await
    }

    /// Sends a fully caller-built `connect` command and waits for the
    /// `_result`.
    pub async fn connect_with(&self, connect: NetConnectionConnect) -> Result<Command, ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        let reply = self
            .send_command(
                Command {
                    transaction_id: transaction_id as f64,
                    command_type: CommandType::NetConnection(NetConnectionCommand::Connect(connect)),
                },
                0,
                Some(AwaitKey::TransactionId(transaction_id)),
            )
            .await?
            .expect("awaited command always yields a reply");

        Ok(reply)
    }

    /// Sends `createStream` and waits for the issued stream id.
    pub async fn create_stream(&self) -> Result<u32, ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        let reply = self
            .send_command(
                Command {
                    transaction_id: transaction_id as f64,
                    command_type: CommandType::NetConnection(NetConnectionCommand::CreateStream),
                },
                0,
                Some(AwaitKey::TransactionId(transaction_id)),
            )
            .await?
            .expect("awaited command always yields a reply");

        let CommandType::Result(result) = &reply.command_type else {
            return Err(ClientSessionError::RemoteCommand(reply));
        };

        let stream_id = result.stream_id().ok_or(ClientSessionError::NoStreamId)?;
        self.set_state(ClientState::StreamCreated);

        Ok(stream_id)
    }

    /// Sends `releaseStream`. The reply, if any, is ignored by clients.
    pub async fn release_stream(&self, stream_key: impl Into<String>) -> Result<(), ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        self.send_command(
            Command {
                transaction_id: transaction_id as f64,
                command_type: CommandType::NetStream(NetStreamCommand::ReleaseStream {
                    stream_key: stream_key.into(),
                }),
            },
            0,
            None,
        )
        .await?;

        Ok(())
    }

    /// Sends `FCPublish`. The `onFCPublish` reply is surfaced through the
    /// session handler.
    pub async fn fc_publish(&self, stream_key: impl Into<String>) -> Result<(), ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        self.send_command(
            Command {
                transaction_id: transaction_id as f64,
                command_type: CommandType::NetStream(NetStreamCommand::FcPublish {
                    stream_key: stream_key.into(),
                }),
            },
            0,
            None,
        )
        .await?;

        Ok(())
    }

    /// Sends `FCUnpublish`.
    pub async fn fc_unpublish(&self, stream_key: impl Into<String>) -> Result<(), ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        self.send_command(
            Command {
                transaction_id: transaction_id as f64,
                command_type: CommandType::NetStream(NetStreamCommand::FcUnpublish {
                    stream_key: stream_key.into(),
                }),
            },
            0,
            None,
        )
        .await?;

        Ok(())
    }

    /// Sends `publish` on the given stream and waits for the
    /// `NetStream.Publish` status event.
    pub async fn publish(
        &self,
        stream_id: u32,
        stream_key: impl Into<String>,
        publishing_type: PublishingType,
    ) -> Result<Command, ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        let reply = self
            .send_command(
                Command {
                    transaction_id: transaction_id as f64,
                    command_type: CommandType::NetStream(NetStreamCommand::Publish {
                        publishing_name: stream_key.into(),
                        publishing_type,
                    }),
                },
                stream_id,
                Some(AwaitKey::StatusCodePrefix("NetStream.Publish")),
            )
            .await?
            .expect("awaited command always yields a reply");

        self.set_state(ClientState::Publishing);

        Ok(reply)
    }

    /// Sends `play` on the given stream and waits for the `NetStream.Play`
    /// status event. Media then arrives through the session handler.
    pub async fn play(&self, stream_id: u32, stream_name: impl Into<String>) -> Result<Command, ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        let reply = self
            .send_command(
                Command {
                    transaction_id: transaction_id as f64,
                    command_type: CommandType::NetStream(NetStreamCommand::Play {
                        stream_name: stream_name.into(),
                        args: Vec::new(),
                    }),
                },
                stream_id,
                Some(AwaitKey::StatusCodePrefix("NetStream.Play")),
            )
            .await?
            .expect("awaited command always yields a reply");

        self.set_state(ClientState::Playing);

        Ok(reply)
    }

    /// Sends `deleteStream` for the given stream. Fire and forget.
    pub async fn delete_stream(&self, stream_id: u32) -> Result<(), ClientSessionError> {
        let transaction_id = self.next_transaction_id();

        self.send_command(
            Command {
                transaction_id: transaction_id as f64,
                command_type: CommandType::NetStream(NetStreamCommand::DeleteStream {
                    stream_id: stream_id as f64,
                }),
            },
            0,
            None,
        )
        .await?;

        Ok(())
    }

    /// Sends `closeStream` on the given stream. Fire and forget.
    pub async fn close_stream(&self, stream_id: u32) -> Result<(), ClientSessionError> {
        self.send_command(
            Command {
                transaction_id: 0.0,
                command_type: CommandType::NetStream(NetStreamCommand::CloseStream),
            },
            stream_id,
            None,
        )
        .await?;

        Ok(())
    }

    fn deadline_for(&self, timestamp: u32) -> Option<u64> {
        self.too_late_drop_timeout_ms.map(|timeout| timestamp as u64 + timeout)
    }

    async fn write_media(
        &self,
        msg_type: MessageType,
        stream_id: u32,
        timestamp: u32,
        payload: ByteSource,
    ) -> Result<(), ClientSessionError> {
        self.send(ClientRequest::Media {
            msg_type,
            msg_stream_id: stream_id,
            timestamp,
            payload,
            deadline_ms: self.deadline_for(timestamp),
        })
        .await
    }

    /// Writes an audio message (an FLV audio tag body) on the given stream.
    ///
    /// The session borrows the source for the single write; it is consumed
    /// and not retained.
    pub async fn publish_audio(
        &self,
        stream_id: u32,
        timestamp: u32,
        payload: impl Into<ByteSource>,
    ) -> Result<(), ClientSessionError> {
        self.write_media(MessageType::Audio, stream_id, timestamp, payload.into()).await
    }

    /// Writes a video message (an FLV video tag body) on the given stream.
    pub async fn publish_video(
        &self,
        stream_id: u32,
        timestamp: u32,
        payload: impl Into<ByteSource>,
    ) -> Result<(), ClientSessionError> {
        self.write_media(MessageType::Video, stream_id, timestamp, payload.into()).await
    }

    /// Writes an AMF0 data message (e.g. `@setDataFrame` metadata) on the
    /// given stream.
    pub async fn publish_metadata(
        &self,
        stream_id: u32,
        timestamp: u32,
        payload: impl Into<ByteSource>,
    ) -> Result<(), ClientSessionError> {
        self.write_media(MessageType::DataAMF0, stream_id, timestamp, payload.into()).await
    }

    /// Closes the session. Outstanding command awaiters resolve with
    /// [`ClientSessionError::Cancelled`].
    pub async fn close(&self) -> Result<(), ClientSessionError> {
        self.set_state(ClientState::Closing);
        let result = self.send(ClientRequest::Close).await;
        self.set_state(ClientState::Closed);
        result
    }
}

/// The driving half of a client session: owns the transport, pumps incoming
/// messages and performs the queued writes.
pub struct ClientSession<S, H> {
    io: S,
    handler: H,
    config: ClientConfig,
    rx: mpsc::Receiver<ClientRequest>,
    transactions: TransactionRegistry,
    read_buf: BytesMut,
    write_buf: Vec<u8>,
    chunk_reader: ChunkReader,
    chunk_writer: ChunkWriter,
    sequence_number: u32,
    last_acknowledged: u32,
    read_window_ack_size: u32,
    dropped_frames: u64,
}

impl<S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin, H: ClientSessionHandler> ClientSession<S, H> {
    /// Performs the RTMP handshake on `io` and returns the session pair.
    ///
    /// Spawn [`run`](Self::run) on the returned session; then drive the
    /// protocol through the [`Client`].
    pub async fn handshake(mut io: S, handler: H, config: ClientConfig) -> Result<(Client, Self), crate::error::RtmpError> {
        let mut handshaker = SimpleHandshakeClient::new(config.transport.relaxed_handshake());

        // C0 + C1
        let mut write_buf = Vec::new();
        handshaker.handshake(&mut std::io::Cursor::new(bytes::Bytes::new()), &mut write_buf)?;
        io.write_all(&write_buf).await?;
        write_buf.clear();

        // S0 + S1 + S2
        const RESPONSE_SIZE: usize = 1 + 2 * RTMP_HANDSHAKE_SIZE;
        let mut read_buf = BytesMut::with_capacity(RESPONSE_SIZE);
        while read_buf.len() < RESPONSE_SIZE {
            let n = tokio::time::timeout(Duration::from_secs(5), io.read_buf(&mut read_buf))
                .await
                .map_err(ClientSessionError::Timeout)??;

            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
            }
        }

        let mut cursor = std::io::Cursor::new(read_buf.split().freeze());
        handshaker.handshake(&mut cursor, &mut write_buf)?;

        // C2
        io.write_all(&write_buf).await?;
        write_buf.clear();

        tracing::debug!("handshake complete");

        // anything past S2 is protocol data already
        let over_read = cursor.extract_remaining();
        let mut read_buf = BytesMut::new();
        read_buf.extend_from_slice(&over_read);

        let (tx, rx) = mpsc::channel(64);

        let client = Client {
            tx,
            next_transaction_id: Arc::new(AtomicU32::new(1)),
            state: Arc::new(Mutex::new(ClientState::Connected)),
            too_late_drop_timeout_ms: config.too_late_drop_timeout_ms,
        };

        let mut session = Self {
            io,
            handler,
            rx,
            transactions: TransactionRegistry::default(),
            read_buf,
            write_buf,
            chunk_reader: ChunkReader::default(),
            chunk_writer: ChunkWriter::default(),
            sequence_number: 0,
            last_acknowledged: 0,
            read_window_ack_size: DEFAULT_ACKNOWLEDGEMENT_WINDOW_SIZE,
            dropped_frames: 0,
            config,
        };

        session.announce_write_settings()?;
        session.flush().await?;

        Ok((client, session))
    }

    /// The number of media frames dropped by the too-late policy.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Runs the message pump to completion.
    ///
    /// Exits cleanly when the peer closes the connection or every [`Client`]
    /// handle is gone; fatal framing or transport errors propagate. Either
    /// way, all outstanding transactions resolve cancelled.
    pub async fn run(mut self) -> Result<(), crate::error::RtmpError> {
        let result = self.drive_loop().await;

        self.transactions.drain_cancelled();

        // push out anything still buffered; the error (if any) wins
        let flushed = self.flush().await;
        result.and(flushed)
    }

    async fn drive_loop(&mut self) -> Result<(), crate::error::RtmpError> {
        // process anything over-read during the handshake first
        self.process_chunks().await?;
        self.flush().await?;

        loop {
            tokio::select! {
                read = self.io.read_buf(&mut self.read_buf) => {
                    let n = read? as u32;
                    if n == 0 {
                        tracing::debug!("server closed the connection");
                        return Ok(());
                    }

                    self.sequence_number = self.sequence_number.wrapping_add(n);
                    self.maybe_acknowledge()?;
                    self.process_chunks().await?;
                    self.flush().await?;
                }
                request = self.rx.recv() => {
                    match request {
                        None | Some(ClientRequest::Close) => return Ok(()),
                        Some(request) => {
                            self.handle_request(request)?;
                            self.flush().await?;
                        }
                    }
                }
            }
        }
    }

    fn announce_write_settings(&mut self) -> Result<(), crate::error::RtmpError> {
        ProtocolControlMessageSetChunkSize {
            chunk_size: self.config.write_chunk_size as u32,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer)?;
        self.chunk_writer.set_chunk_size(self.config.write_chunk_size);

        ProtocolControlMessageWindowAcknowledgementSize {
            acknowledgement_window_size: self.config.write_window_ack_size,
        }
        .write(&mut self.write_buf, &mut self.chunk_writer)?;

        Ok(())
    }

    fn handle_request(&mut self, request: ClientRequest) -> Result<(), crate::error::RtmpError> {
        match request {
            ClientRequest::Command {
                command,
                msg_stream_id,
                await_key,
                reply,
            } => {
                // the slot must exist before the command bytes go out
                if let (Some(await_key), Some(reply)) = (await_key, reply) {
                    self.transactions.register(await_key, reply);
                }

                command.write(&mut self.write_buf, &mut self.chunk_writer, msg_stream_id)?;
            }
            ClientRequest::Media {
                msg_type,
                msg_stream_id,
                timestamp,
                payload,
                deadline_ms,
            } => {
                if let Some(deadline_ms) = deadline_ms {
                    // the deadline is checked once, at the point of writing
                    let now = (self.config.now_ms)();
                    if now > deadline_ms {
                        self.dropped_frames += 1;
                        tracing::debug!(timestamp, now, deadline_ms, "dropping frame past its deadline");
                        return Ok(());
                    }
                }

                let chunk_stream_id = match msg_type {
                    MessageType::Audio => CHUNK_STREAM_ID_AUDIO,
                    MessageType::Video => CHUNK_STREAM_ID_VIDEO,
                    _ => CHUNK_STREAM_ID_DATA,
                };

                self.chunk_writer.write_chunk(
                    &mut self.write_buf,
                    Chunk::new(chunk_stream_id, timestamp, msg_type, msg_stream_id, payload.into_bytes()),
                )?;
            }
            ClientRequest::Close => {}
        }

        Ok(())
    }

    fn maybe_acknowledge(&mut self) -> Result<(), crate::error::RtmpError> {
        let unacknowledged = self.sequence_number.wrapping_sub(self.last_acknowledged);
        if unacknowledged >= self.read_window_ack_size {
            tracing::debug!(sequence_number = %self.sequence_number, "sending acknowledgement");

            crate::protocol_control_messages::ProtocolControlMessageAcknowledgement {
                sequence_number: self.sequence_number,
            }
            .write(&mut self.write_buf, &mut self.chunk_writer)?;

            self.last_acknowledged = self.sequence_number;
        }

        Ok(())
    }

    async fn process_chunks(&mut self) -> Result<(), crate::error::RtmpError> {
        while let Some(chunk) = self.chunk_reader.read_chunk(&mut self.read_buf)? {
            let timestamp = chunk.message_header.timestamp;
            let msg_stream_id = chunk.message_header.msg_stream_id;

            let msg = MessageData::read(&chunk)?;
            self.process_message(msg, msg_stream_id, timestamp).await?;
        }

        Ok(())
    }

    async fn process_message(
        &mut self,
        msg: MessageData,
        stream_id: u32,
        timestamp: u32,
    ) -> Result<(), crate::error::RtmpError> {
        match msg {
            MessageData::Command(command) => self.on_command_message(stream_id, command).await?,
            MessageData::SetChunkSize(ProtocolControlMessageSetChunkSize { chunk_size }) => {
                if !self.chunk_reader.update_max_chunk_size(chunk_size as usize) {
                    return Err(crate::error::RtmpError::ClientSession(ClientSessionError::InvalidChunkSize(
                        chunk_size as usize,
                    )));
                }
            }
            MessageData::Abort(abort) => self.chunk_reader.abort(abort.chunk_stream_id),
            MessageData::Acknowledgement(ack) => {
                tracing::trace!(sequence_number = ack.sequence_number, "peer acknowledged");
            }
            MessageData::SetAcknowledgementWindowSize(window) => {
                tracing::debug!(
                    acknowledgement_window_size = window.acknowledgement_window_size,
                    "received new acknowledgement window size"
                );
                self.read_window_ack_size = window.acknowledgement_window_size;
            }
            MessageData::SetPeerBandwidth(_) => {
                // answer with the window acknowledgement size we operate with
                ProtocolControlMessageWindowAcknowledgementSize {
                    acknowledgement_window_size: self.config.write_window_ack_size,
                }
                .write(&mut self.write_buf, &mut self.chunk_writer)?;
            }
            MessageData::UserControl(EventMessage::PingRequest { timestamp }) => {
                EventMessage::PingResponse { timestamp }.write(&mut self.write_buf, &mut self.chunk_writer)?;
            }
            MessageData::UserControl(event) => self.handler.on_user_control(event).await?,
            MessageData::AudioData { data } => {
                self.handler
                    .on_data(stream_id, SessionData::Audio { timestamp, data })
                    .await?;
            }
            MessageData::VideoData { data } => {
                self.handler
                    .on_data(stream_id, SessionData::Video { timestamp, data })
                    .await?;
            }
            MessageData::DataAmf0 { data } => {
                self.handler.on_data(stream_id, SessionData::Amf0 { timestamp, data }).await?;
            }
            MessageData::Unknown(unknown) => {
                tracing::debug!(msg_type_id = unknown.msg_type_id.0, "ignoring unknown message");
            }
            // ignore everything else
            _ => {}
        }

        Ok(())
    }

    async fn on_command_message(&mut self, stream_id: u32, command: Command) -> Result<(), crate::error::RtmpError> {
        match &command.command_type {
            CommandType::Result(result) => {
                let outcome: CommandOutcome = if result.success {
                    Ok(command.clone())
                } else {
                    Err(ClientSessionError::RemoteCommand(command.clone()))
                };

                if !self.transactions.complete_transaction(command.transaction_id, outcome) {
                    tracing::debug!(
                        transaction_id = command.transaction_id,
                        "reply without outstanding transaction"
                    );
                    self.handler.on_command(command).await?;
                }
            }
            CommandType::OnStatus(status) => {
                // an error-level status fails the awaiting command
                let outcome: CommandOutcome = if status.level == crate::command_messages::CommandResultLevel::Error {
                    Err(ClientSessionError::RemoteCommand(command.clone()))
                } else {
                    Ok(command.clone())
                };

                if !self.transactions.complete_status(&status.code, outcome) {
                    self.handler.on_status(stream_id, status.clone()).await?;
                }
            }
            _ => self.handler.on_command(command).await?,
        }

        Ok(())
    }

    async fn flush(&mut self) -> Result<(), crate::error::RtmpError> {
        if !self.write_buf.is_empty() {
            self.io.write_all(self.write_buf.as_ref()).await?;
            self.write_buf.clear();
        }

        Ok(())
    }
}
