//! `MediaPlatform` implementation over webrtc-rs

use crate::config::MediaCaptureConfig;
use crate::media::{MediaStream, MediaStreamTrack, TrackKind};
use crate::peer::WebRtcPeer;
use anyhow::Context;
use async_trait::async_trait;
use mediasession_core::{IceServer, MediaConstraints, MediaPlatform};
use std::sync::Arc;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// Creates local media and peer connections from one shared webrtc-rs API
pub struct WebRtcPlatform {
    api: Arc<API>,
    capture: MediaCaptureConfig,
}

impl WebRtcPlatform {
    /// Platform with default capture codecs (Opus 48 kHz stereo, VP8)
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(MediaCaptureConfig::default())
    }

    /// Platform with explicit capture codecs
    pub fn with_config(capture: MediaCaptureConfig) -> anyhow::Result<Self> {
        capture.validate()?;

        // Opus for audio, VP8/VP9/H.264 for video
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .context("failed to register codecs")?;

        let interceptor_registry =
            register_default_interceptors(Default::default(), &mut media_engine)
                .context("failed to register interceptors")?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(interceptor_registry)
            .build();

        Ok(Self {
            api: Arc::new(api),
            capture,
        })
    }

    /// Capture configuration
    pub fn capture_config(&self) -> &MediaCaptureConfig {
        &self.capture
    }
}

#[allow(clippy::needless_update)]
fn to_rtc_ice_server(server: &IceServer) -> RTCIceServer {
    RTCIceServer {
        urls: server.urls.clone(),
        username: server.username.clone().unwrap_or_default(),
        credential: server.credential.clone().unwrap_or_default(),
        ..Default::default()
    }
}

#[async_trait]
impl MediaPlatform for WebRtcPlatform {
    type Stream = MediaStream;
    type Peer = WebRtcPeer;

    async fn get_user_media(&self, constraints: &MediaConstraints) -> anyhow::Result<MediaStream> {
        if constraints.is_empty() {
            anyhow::bail!("at least one of audio or video must be requested");
        }

        let id = uuid::Uuid::new_v4().to_string();
        let stream = MediaStream::new(format!("stream-{id}"));

        if constraints.audio {
            let track = Arc::new(TrackLocalStaticSample::new(
                self.capture.audio_capability(),
                format!("audio-{id}"),
                stream.id().to_string(),
            ));
            stream.add_track(MediaStreamTrack::Local {
                kind: TrackKind::Audio,
                track,
            });
        }

        if constraints.video {
            let track = Arc::new(TrackLocalStaticSample::new(
                self.capture.video_capability(),
                format!("video-{id}"),
                stream.id().to_string(),
            ));
            stream.add_track(MediaStreamTrack::Local {
                kind: TrackKind::Video,
                track,
            });
        }

        debug!(stream_id = %stream.id(), "Created local stream: {:?}", constraints);
        Ok(stream)
    }

    async fn create_peer_connection(&self, ice_servers: &[IceServer]) -> anyhow::Result<WebRtcPeer> {
        let connection_id = uuid::Uuid::new_v4().to_string();
        info!(
            connection_id = %connection_id,
            ice_servers = ice_servers.len(),
            "Creating peer connection"
        );

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers.iter().map(to_rtc_ice_server).collect(),
            ..Default::default()
        };

        let peer_connection = self
            .api
            .new_peer_connection(rtc_config)
            .await
            .context("failed to create peer connection")?;

        Ok(WebRtcPeer::new(connection_id, Arc::new(peer_connection)))
    }
}
