//! Media streams backed by webrtc-rs tracks
//!
//! A [`MediaStream`] groups tracks the way a browser `MediaStream` does:
//! local streams hold the sample tracks produced by `get_user_media`, remote
//! streams collect the tracks a peer announced under one stream id. Clones
//! share the track list, so a remote track that arrives later shows up in
//! every handle.

use anyhow::Context;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl TrackKind {
    pub(crate) fn from_codec_type(codec_type: RTPCodecType) -> Option<Self> {
        match codec_type {
            RTPCodecType::Audio => Some(TrackKind::Audio),
            RTPCodecType::Video => Some(TrackKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// A single track inside a [`MediaStream`]
#[derive(Clone)]
pub enum MediaStreamTrack {
    /// Track captured locally; samples are written by the application
    Local {
        /// Media kind
        kind: TrackKind,
        /// Underlying sample track
        track: Arc<TrackLocalStaticSample>,
    },
    /// Track received from the remote peer
    Remote {
        /// Media kind
        kind: TrackKind,
        /// Underlying remote track; read RTP from it
        track: Arc<TrackRemote>,
    },
}

impl MediaStreamTrack {
    /// Media kind of this track
    pub fn kind(&self) -> TrackKind {
        match self {
            MediaStreamTrack::Local { kind, .. } | MediaStreamTrack::Remote { kind, .. } => *kind,
        }
    }

    /// Track id
    pub fn id(&self) -> String {
        match self {
            MediaStreamTrack::Local { track, .. } => track.id().to_string(),
            MediaStreamTrack::Remote { track, .. } => track.id(),
        }
    }

    /// Whether the track was produced locally
    pub fn is_local(&self) -> bool {
        matches!(self, MediaStreamTrack::Local { .. })
    }

    /// Local sample track, if this is a local track
    pub fn as_local(&self) -> Option<&Arc<TrackLocalStaticSample>> {
        match self {
            MediaStreamTrack::Local { track, .. } => Some(track),
            MediaStreamTrack::Remote { .. } => None,
        }
    }

    /// Remote track, if this track was received from the peer
    pub fn as_remote(&self) -> Option<&Arc<TrackRemote>> {
        match self {
            MediaStreamTrack::Remote { track, .. } => Some(track),
            MediaStreamTrack::Local { .. } => None,
        }
    }
}

impl fmt::Debug for MediaStreamTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStreamTrack")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("local", &self.is_local())
            .finish()
    }
}

/// A group of tracks sharing one stream id
#[derive(Clone)]
pub struct MediaStream {
    id: String,
    tracks: Arc<RwLock<Vec<MediaStreamTrack>>>,
}

impl MediaStream {
    /// Create an empty stream
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Stream id (the `msid` announced in SDP)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the tracks currently in the stream
    pub fn tracks(&self) -> Vec<MediaStreamTrack> {
        self.tracks.read().clone()
    }

    /// Tracks of the given kind
    pub fn tracks_of(&self, kind: TrackKind) -> Vec<MediaStreamTrack> {
        self.tracks
            .read()
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    /// Whether the stream carries an audio track
    pub fn has_audio(&self) -> bool {
        self.tracks.read().iter().any(|t| t.kind() == TrackKind::Audio)
    }

    /// Whether the stream carries a video track
    pub fn has_video(&self) -> bool {
        self.tracks.read().iter().any(|t| t.kind() == TrackKind::Video)
    }

    pub(crate) fn add_track(&self, track: MediaStreamTrack) {
        let id = track.id();
        let mut tracks = self.tracks.write();
        if tracks.iter().all(|t| t.id() != id) {
            tracks.push(track);
        }
    }

    /// Write an encoded sample to every local track of `kind`
    ///
    /// webrtc-rs handles RTP packetization. Fails if the stream has no
    /// local track of that kind.
    ///
    /// ```
    /// use mediasession_core::{MediaConstraints, MediaPlatform};
    /// use mediasession_webrtc::{Sample, TrackKind, WebRtcPlatform};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let platform = WebRtcPlatform::new()?;
    /// let stream = platform.get_user_media(&MediaConstraints::audio_only()).await?;
    ///
    /// let opus_frame: Vec<u8> = vec![0xfc, 0xff, 0xfe];
    /// let sample = Sample {
    ///     data: opus_frame.into(),
    ///     duration: Duration::from_millis(20),
    ///     ..Default::default()
    /// };
    /// stream.write_sample(TrackKind::Audio, &sample).await?;
    /// assert!(stream.write_sample(TrackKind::Video, &sample).await.is_err());
    /// # Ok::<(), anyhow::Error>(())
    /// # }).unwrap();
    /// ```
    pub async fn write_sample(&self, kind: TrackKind, sample: &Sample) -> anyhow::Result<()> {
        let targets: Vec<Arc<TrackLocalStaticSample>> = self
            .tracks
            .read()
            .iter()
            .filter(|t| t.kind() == kind)
            .filter_map(|t| t.as_local().cloned())
            .collect();

        if targets.is_empty() {
            anyhow::bail!("stream {} has no local {} track", self.id, kind);
        }

        for track in targets {
            track
                .write_sample(sample)
                .await
                .with_context(|| format!("failed to write {kind} sample to track {}", track.id()))?;
        }
        Ok(())
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &*self.tracks.read())
            .finish()
    }
}

impl PartialEq for MediaStream {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
