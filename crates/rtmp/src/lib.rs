//! A pure Rust implementation of the RTMP protocol: chunk stream framing,
//! message multiplexing, AMF0 command plumbing, handshakes and both session
//! roles (publish/play client and accepting server).
//!
//! The session types are generic over any `AsyncRead + AsyncWrite` transport;
//! see [`transport`] for the TCP and TLS connectors and the handshake
//! strictness rules for tunneled transports.
//!
//! ## Specifications
//!
//! | Name | Version | Link |
//! | --- | --- | --- |
//! | Adobe RTMP Specification | `1.0` | <https://github.com/veovera/enhanced-rtmp/blob/main/docs/legacy/rtmp-v1-0-spec.pdf> |
//! | Enhanced RTMP | `v2-2024-10-22-b1` | <https://github.com/veovera/enhanced-rtmp/blob/main/docs/enhanced/enhanced-rtmp-v2.pdf> |
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

pub mod chunk;
pub mod command_messages;
pub mod error;
pub mod handshake;
pub mod messages;
pub mod protocol_control_messages;
pub mod session;
pub mod transport;
pub mod url;
pub mod user_control_messages;

pub use error::RtmpError;
pub use session::client::{Client, ClientConfig, ClientSession, ClientSessionError, ClientSessionHandler};
pub use session::server::{ServerSession, ServerSessionError, SessionData, SessionHandler};

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use crate::command_messages::CommandType;
    use crate::command_messages::netstream::PublishingType;
    use crate::session::client::{ClientConfig, ClientSession, ClientSessionError, ClientSessionHandler, NullHandler};
    use crate::session::server::{ServerSession, ServerSessionError, SessionData, SessionHandler};
    use crate::url::RtmpUrl;

    #[derive(Debug)]
    enum Event {
        Publish {
            stream_id: u32,
            app_name: String,
            stream_name: String,
        },
        Unpublish {
            stream_id: u32,
        },
        Play {
            stream_id: u32,
            stream_name: String,
        },
        Data {
            stream_id: u32,
            data: SessionData,
        },
    }

    struct Handler {
        events: mpsc::UnboundedSender<Event>,
        accept_publish: bool,
        accept_play: bool,
    }

    impl Handler {
        fn new(events: mpsc::UnboundedSender<Event>) -> Self {
            Self {
                events,
                accept_publish: true,
                accept_play: false,
            }
        }
    }

    impl SessionHandler for Handler {
        async fn on_publish(&mut self, stream_id: u32, app_name: &str, stream_name: &str) -> Result<(), ServerSessionError> {
            if !self.accept_publish {
                return Err(ServerSessionError::PublishRejected("not allowed".to_string()));
            }

            self.events
                .send(Event::Publish {
                    stream_id,
                    app_name: app_name.to_string(),
                    stream_name: stream_name.to_string(),
                })
                .unwrap();
            Ok(())
        }

        async fn on_unpublish(&mut self, stream_id: u32) -> Result<(), ServerSessionError> {
            self.events.send(Event::Unpublish { stream_id }).unwrap();
            Ok(())
        }

        async fn on_play(&mut self, stream_id: u32, stream_name: &str) -> Result<(), ServerSessionError> {
            if !self.accept_play {
                return Err(ServerSessionError::PlayRejected("play not supported".to_string()));
            }

            self.events
                .send(Event::Play {
                    stream_id,
                    stream_name: stream_name.to_string(),
                })
                .unwrap();
            Ok(())
        }

        async fn on_data(&mut self, stream_id: u32, data: SessionData) -> Result<(), ServerSessionError> {
            self.events.send(Event::Data { stream_id, data }).unwrap();
            Ok(())
        }
    }

    fn test_url() -> RtmpUrl {
        RtmpUrl::parse("rtmp://127.0.0.1:1935/live/stream-key").unwrap()
    }

    async fn connected_pair(
        handler: Handler,
    ) -> (
        crate::session::client::Client,
        tokio::task::JoinHandle<Result<(), crate::RtmpError>>,
        tokio::task::JoinHandle<Result<bool, crate::RtmpError>>,
    ) {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);

        let server = ServerSession::new(server_io, handler);
        let server_task = tokio::spawn(server.run());

        let config = ClientConfig::default();
        let (client, session) = ClientSession::handshake(client_io, NullHandler, config.clone())
            .await
            .expect("handshake");
        let client_task = tokio::spawn(session.run());

        let reply = client.connect(&test_url(), &config).await.expect("connect");
        let CommandType::Result(result) = reply.command_type else {
            panic!("expected result");
        };
        assert!(result.success);

        // the result carries the NetConnection.Connect.Success info object
        let code = result
            .values
            .iter()
            .find_map(|value| value.get("code"))
            .and_then(|code| code.as_str().map(str::to_string))
            .expect("code");
        assert_eq!(code, "NetConnection.Connect.Success");

        (client, client_task, server_task)
    }

    #[tokio::test]
    async fn connect_round_trip() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (client, client_task, server_task) = connected_pair(Handler::new(events_tx)).await;

        client.close().await.unwrap();
        client_task.await.unwrap().unwrap();
        assert!(server_task.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn publish_pipeline_delivers_media_in_order() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (client, client_task, server_task) = connected_pair(Handler::new(events_tx)).await;

        let stream_id = client.create_stream().await.expect("create stream");
        assert!(stream_id > 2);

        client.release_stream("stream-key").await.unwrap();
        client.fc_publish("stream-key").await.unwrap();

        let reply = client
            .publish(stream_id, "stream-key", PublishingType::Live)
            .await
            .expect("publish");
        let CommandType::OnStatus(status) = reply.command_type else {
            panic!("expected onStatus");
        };
        assert_eq!(status.code, "NetStream.Publish.Start");

        let event = events_rx.recv().await.expect("publish event");
        let Event::Publish {
            stream_id: got_stream_id,
            app_name,
            stream_name,
        } = event
        else {
            panic!("expected publish event, got {event:?}");
        };
        assert_eq!(got_stream_id, stream_id);
        assert_eq!(app_name, "live");
        assert_eq!(stream_name, "stream-key");

        // a 4-byte audio tag body at ts 0 and a 10-byte video body at ts 33,
        // built with the flv crate the way a publisher would
        let audio = strom_flv::audio::AudioData {
            header: strom_flv::audio::header::AudioTagHeader::Legacy(
                strom_flv::audio::header::legacy::LegacyAudioTagHeader::aac(),
            ),
            body: strom_flv::audio::body::AudioTagBody::Legacy(strom_flv::audio::body::legacy::LegacyAudioTagBody::Aac(
                strom_flv::audio::body::legacy::AacAudioData::Raw(bytes::Bytes::from_static(&[0x21, 0x10])),
            )),
        };
        let mut audio_body = Vec::new();
        audio.mux(&mut audio_body).unwrap();
        assert_eq!(audio_body.len(), 4);

        let video = strom_flv::video::VideoData {
            header: strom_flv::video::header::VideoTagHeader {
                frame_type: strom_flv::video::header::VideoFrameType::InterFrame,
                data: strom_flv::video::header::VideoTagHeaderData::Legacy(
                    strom_flv::video::header::legacy::LegacyVideoTagHeader::AvcPacket(
                        strom_flv::video::header::legacy::LegacyVideoTagHeaderAvcPacket::Nalu {
                            composition_time_offset: 0,
                        },
                    ),
                ),
            },
            body: strom_flv::video::body::VideoTagBody::Legacy(strom_flv::video::body::legacy::LegacyVideoTagBody::Other {
                data: bytes::Bytes::from_static(&[1, 2, 3, 4, 5]),
            }),
        };
        let mut video_body = Vec::new();
        video.mux(&mut video_body).unwrap();
        assert_eq!(video_body.len(), 10);

        client.publish_audio(stream_id, 0, audio_body).await.unwrap();
        client.publish_video(stream_id, 33, video_body).await.unwrap();

        let Event::Data {
            stream_id: audio_stream,
            data: SessionData::Audio { timestamp, data },
        } = events_rx.recv().await.expect("audio event")
        else {
            panic!("expected audio");
        };
        assert_eq!(audio_stream, stream_id);
        assert_eq!(timestamp, 0);
        assert_eq!(data.len(), 4);

        let Event::Data {
            stream_id: video_stream,
            data: SessionData::Video { timestamp, data },
        } = events_rx.recv().await.expect("video event")
        else {
            panic!("expected video");
        };
        assert_eq!(video_stream, stream_id);
        assert_eq!(timestamp, 33);
        assert_eq!(data.len(), 10);

        // clean shutdown: unpublish then close
        client.fc_unpublish("stream-key").await.unwrap();
        client.delete_stream(stream_id).await.unwrap();

        let Event::Unpublish {
            stream_id: unpublished_stream,
        } = events_rx.recv().await.expect("unpublish event")
        else {
            panic!("expected unpublish");
        };
        assert_eq!(unpublished_stream, stream_id);

        client.close().await.unwrap();
        client_task.await.unwrap().unwrap();
        assert!(server_task.await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn rejected_publish_surfaces_as_remote_command_error() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let mut handler = Handler::new(events_tx);
        handler.accept_publish = false;

        let (client, client_task, server_task) = connected_pair(handler).await;

        let stream_id = client.create_stream().await.unwrap();
        let err = client
            .publish(stream_id, "stream-key", PublishingType::Live)
            .await
            .unwrap_err();

        let ClientSessionError::RemoteCommand(command) = err else {
            panic!("expected remote command error");
        };
        let CommandType::OnStatus(status) = command.command_type else {
            panic!("expected onStatus");
        };
        assert_eq!(status.code, "NetStream.Publish.Failed");

        client.close().await.unwrap();
        client_task.await.unwrap().unwrap();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn play_round_trip() {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut handler = Handler::new(events_tx);
        handler.accept_play = true;

        let (client, client_task, server_task) = connected_pair(handler).await;

        let stream_id = client.create_stream().await.unwrap();
        let reply = client.play(stream_id, "stream-key").await.expect("play");

        let CommandType::OnStatus(status) = reply.command_type else {
            panic!("expected onStatus");
        };
        assert_eq!(status.code, "NetStream.Play.Start");

        let Event::Play {
            stream_id: played_stream,
            stream_name,
        } = events_rx.recv().await.expect("play event")
        else {
            panic!("expected play event");
        };
        assert_eq!(played_stream, stream_id);
        assert_eq!(stream_name, "stream-key");

        client.close().await.unwrap();
        client_task.await.unwrap().unwrap();
        server_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn too_late_frames_are_dropped_silently() {
        struct FrozenClock;
        impl FrozenClock {
            fn now() -> u64 {
                1_000_000
            }
        }

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);

        let server = ServerSession::new(server_io, Handler::new(events_tx));
        let server_task = tokio::spawn(server.run());

        let config = ClientConfig {
            too_late_drop_timeout_ms: Some(50),
            now_ms: FrozenClock::now,
            ..Default::default()
        };

        let (client, session) = ClientSession::handshake(client_io, NullHandler, config.clone())
            .await
            .expect("handshake");
        let client_task = tokio::spawn(session.run());

        client.connect(&test_url(), &config).await.unwrap();
        let stream_id = client.create_stream().await.unwrap();
        client.publish(stream_id, "stream-key", PublishingType::Live).await.unwrap();

        let Event::Publish { .. } = events_rx.recv().await.unwrap() else {
            panic!("expected publish");
        };

        // the frame timestamp is far behind the frozen wall clock: dropped
        client
            .publish_audio(stream_id, 0, bytes::Bytes::from_static(&[0xAF, 0x01]))
            .await
            .unwrap();

        // a frame with a deadline in the future goes through
        client
            .publish_audio(stream_id, FrozenClock::now() as u32, bytes::Bytes::from_static(&[0xAF, 0x01, 0x02]))
            .await
            .unwrap();

        let Event::Data {
            data: SessionData::Audio { data, .. },
            ..
        } = events_rx.recv().await.expect("audio event")
        else {
            panic!("expected audio");
        };
        // the first (dropped) frame never arrives
        assert_eq!(data.len(), 3);

        client.close().await.unwrap();
        client_task.await.unwrap().unwrap();
        server_task.await.unwrap().unwrap();
    }

    /// A client talking to a client-side handler that records status events.
    struct StatusRecorder(mpsc::UnboundedSender<String>);

    impl ClientSessionHandler for StatusRecorder {
        async fn on_status(
            &mut self,
            _stream_id: u32,
            status: crate::command_messages::on_status::OnStatus,
        ) -> Result<(), ClientSessionError> {
            self.0.send(status.code).unwrap();
            Ok(())
        }
    }

    #[tokio::test]
    async fn unsolicited_status_reaches_the_handler() {
        let (events_tx, _events_rx) = mpsc::unbounded_channel();
        let (status_tx, mut status_rx) = mpsc::unbounded_channel();

        let (client_io, server_io) = tokio::io::duplex(64 * 1024);

        let server = ServerSession::new(server_io, Handler::new(events_tx));
        let server_task = tokio::spawn(server.run());

        let config = ClientConfig::default();
        let (client, session) = ClientSession::handshake(client_io, StatusRecorder(status_tx), config.clone())
            .await
            .unwrap();
        let client_task = tokio::spawn(session.run());

        client.connect(&test_url(), &config).await.unwrap();
        let stream_id = client.create_stream().await.unwrap();

        // deleteStream is fire-and-forget; its onStatus reply has no awaiter
        // and lands in the handler
        client.delete_stream(stream_id).await.unwrap();

        let code = status_rx.recv().await.expect("status event");
        assert_eq!(code, "NetStream.DeleteStream.Success");

        client.close().await.unwrap();
        client_task.await.unwrap().unwrap();
        server_task.await.unwrap().unwrap();
    }
}
