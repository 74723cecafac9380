//! Session controller for a single WebRTC media session
//!
//! This crate sequences the setup of one publisher or subscriber session.
//! Media capture, peer connections and signaling are collaborators behind
//! traits; `mediasession-webrtc` provides implementations on top of
//! webrtc-rs and a WebSocket signaling client.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  SessionController<P, S>                             │
//! │  ├─ Role (Publisher | Subscriber)                    │
//! │  ├─ SessionConfig (endpoints, remote stream policy)  │
//! │  ├─ P: MediaPlatform                                 │
//! │  │   ├─ get_user_media                               │
//! │  │   └─ create_peer_connection → PeerConnection      │
//! │  └─ S: SignalingClient                               │
//! │      └─ connection → SignalingConnection             │
//! │         (connect / answer / candidate / disconnect)  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mediasession_core::{SessionConfig, SessionController};
//!
//! let controller = SessionController::new("publisher", SessionConfig::default(), platform, signaling)?;
//! controller.on_error(|e| eprintln!("session error: {e}"));
//!
//! let session = controller.start("channel-1", "token", None).await?;
//! println!("client id: {}", session.client_id);
//!
//! controller.disconnect().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod controller;
pub mod error;
pub mod media;
pub mod platform;
pub mod signaling;

pub use config::{RemoteStreamPolicy, Role, SessionConfig};
pub use controller::{SessionController, StartedSession};
pub use error::{Error, ErrorKind, Result};
pub use media::{IceCandidate, IceServer, MediaConstraints, SdpType, SessionDescription};
pub use platform::{IceCandidateHandler, MediaPlatform, PeerConnection, RemoteStreamHandler};
pub use signaling::{
    ConnectRequest, DisconnectHandler, ErrorHandler, SignalingClient, SignalingConnection,
    SignalingOffer, SignalingRole,
};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
