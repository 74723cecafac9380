//! `PeerConnection` implementation over webrtc-rs

use crate::media::{MediaStream, MediaStreamTrack, TrackKind};
use anyhow::Context;
use async_trait::async_trait;
use mediasession_core::{
    IceCandidate, IceCandidateHandler, PeerConnection, RemoteStreamHandler, SdpType,
    SessionDescription,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

type SharedStreamHandler = Arc<dyn Fn(MediaStream) + Send + Sync>;

/// A webrtc-rs peer connection driven by the session controller
pub struct WebRtcPeer {
    connection_id: String,

    peer_connection: Arc<RTCPeerConnection>,

    /// Remote streams keyed by stream id
    remote_streams: Arc<Mutex<HashMap<String, MediaStream>>>,

    remote_stream_handler: Arc<Mutex<Option<SharedStreamHandler>>>,
}

impl WebRtcPeer {
    pub(crate) fn new(connection_id: String, peer_connection: Arc<RTCPeerConnection>) -> Self {
        let peer = Self {
            connection_id,
            peer_connection,
            remote_streams: Arc::new(Mutex::new(HashMap::new())),
            remote_stream_handler: Arc::new(Mutex::new(None)),
        };
        peer.watch_connection_state();
        peer.watch_remote_tracks();
        peer
    }

    /// Connection id used in logs
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Underlying webrtc-rs peer connection
    pub fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        Arc::clone(&self.peer_connection)
    }

    /// Remote streams received so far
    pub fn remote_streams(&self) -> Vec<MediaStream> {
        self.remote_streams.lock().values().cloned().collect()
    }

    fn watch_connection_state(&self) {
        let connection_id = self.connection_id.clone();
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
                let connection_id = connection_id.clone();
                Box::pin(async move {
                    info!(connection_id = %connection_id, "Peer connection state: {}", s);
                })
            }));
    }

    /// Group incoming tracks by remote stream id and report each stream
    /// to the remote stream handler
    fn watch_remote_tracks(&self) {
        let streams = Arc::clone(&self.remote_streams);
        let handler = Arc::clone(&self.remote_stream_handler);
        let connection_id = self.connection_id.clone();

        self.peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                match TrackKind::from_codec_type(track.kind()) {
                    Some(kind) => {
                        let stream_id = track.stream_id();
                        info!(
                            connection_id = %connection_id,
                            stream_id = %stream_id,
                            "Remote {} track added: {}",
                            kind,
                            track.id()
                        );

                        let stream = streams
                            .lock()
                            .entry(stream_id.clone())
                            .or_insert_with(|| MediaStream::new(stream_id))
                            .clone();
                        stream.add_track(MediaStreamTrack::Remote { kind, track });

                        let handler = handler.lock().clone();
                        if let Some(handler) = handler {
                            handler(stream);
                        }
                    }
                    None => {
                        warn!(connection_id = %connection_id, "Ignoring remote track of unknown kind")
                    }
                }

                Box::pin(async {})
            },
        ));
    }
}

fn to_rtc_description(description: SessionDescription) -> anyhow::Result<RTCSessionDescription> {
    let rtc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp),
        SdpType::Answer => RTCSessionDescription::answer(description.sdp),
    };
    rtc.context("invalid session description")
}

#[async_trait]
impl PeerConnection for WebRtcPeer {
    type Stream = MediaStream;

    async fn add_stream(&self, stream: &MediaStream) -> anyhow::Result<()> {
        let tracks: Vec<_> = stream
            .tracks()
            .into_iter()
            .filter_map(|t| t.as_local().cloned().map(|track| (t.kind(), track)))
            .collect();

        if tracks.is_empty() {
            anyhow::bail!("stream {} has no local tracks", stream.id());
        }

        for (kind, track) in tracks {
            let sender = self
                .peer_connection
                .add_track(track.clone() as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .with_context(|| format!("failed to add {kind} track"))?;

            // RTCP must be read for interceptors (NACK, reports) to work.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while sender.read(&mut rtcp_buf).await.is_ok() {}
            });

            debug!(connection_id = %self.connection_id, "Added local {} track {}", kind, track.id());
        }
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        let rtc = to_rtc_description(description)?;
        self.peer_connection
            .set_remote_description(rtc)
            .await
            .context("failed to set remote description")
    }

    async fn create_answer(&self) -> anyhow::Result<SessionDescription> {
        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("failed to create answer")?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        let rtc = to_rtc_description(description)?;
        self.peer_connection
            .set_local_description(rtc)
            .await
            .context("failed to set local description")
    }

    fn on_ice_candidate(&self, handler: IceCandidateHandler) {
        let handler: Arc<dyn Fn(Option<IceCandidate>) + Send + Sync> = Arc::from(handler);
        let connection_id = self.connection_id.clone();

        self.peer_connection
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let handler = Arc::clone(&handler);
                let connection_id = connection_id.clone();

                Box::pin(async move {
                    let Some(candidate) = candidate else {
                        debug!(connection_id = %connection_id, "ICE gathering complete");
                        handler(None);
                        return;
                    };

                    match candidate.to_json() {
                        Ok(init) => handler(Some(IceCandidate {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                        })),
                        Err(e) => {
                            warn!(connection_id = %connection_id, "Failed to encode ICE candidate: {}", e)
                        }
                    }
                })
            }));
    }

    fn on_remote_stream(&self, handler: RemoteStreamHandler<MediaStream>) {
        *self.remote_stream_handler.lock() = Some(Arc::from(handler));
    }

    async fn close(&self) -> anyhow::Result<()> {
        info!(connection_id = %self.connection_id, "Closing peer connection");
        self.peer_connection
            .close()
            .await
            .context("failed to close peer connection")
    }
}
