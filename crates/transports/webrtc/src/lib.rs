//! webrtc-rs platform and WebSocket signaling for `mediasession-core`
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  SessionController<WebRtcPlatform, WsSignalingClient>  │
//! │  ├─ WebRtcPlatform (MediaPlatform)                     │
//! │  │   ├─ get_user_media → MediaStream (Opus / VP8)      │
//! │  │   └─ create_peer_connection → WebRtcPeer            │
//! │  └─ WsSignalingClient (SignalingClient)                │
//! │      └─ WsSignalingConnection (JSON over WebSocket)    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mediasession_core::{SessionConfig, SessionController};
//! use mediasession_webrtc::{WebRtcPlatform, WsSignalingClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let controller = SessionController::new(
//!     "subscriber",
//!     SessionConfig::default(),
//!     WebRtcPlatform::new()?,
//!     WsSignalingClient::new(),
//! )?;
//!
//! let session = controller.start("channel-1", "token", None).await?;
//! if let Some(stream) = session.stream {
//!     println!("receiving {} tracks", stream.tracks().len());
//! }
//! controller.disconnect().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod media;
pub mod peer;
pub mod platform;
pub mod signaling;

pub use config::{AudioCodec, MediaCaptureConfig, VideoCodec};
pub use media::{MediaStream, MediaStreamTrack, TrackKind};
pub use peer::WebRtcPeer;
pub use platform::WebRtcPlatform;
pub use signaling::{WsSignalingClient, WsSignalingConnection};

/// Encoded media sample accepted by [`MediaStream::write_sample`]
pub use webrtc::media::Sample;

/// Session controller wired to webrtc-rs and WebSocket signaling
pub type WebRtcSessionController =
    mediasession_core::SessionController<WebRtcPlatform, WsSignalingClient>;
