//! Media and peer-connection collaborator traits
//!
//! A [`MediaPlatform`] stands in for the host's native media stack: it
//! captures local media and builds peer connections. The controller never
//! touches ICE, DTLS or SDP internals itself.

use crate::media::{IceCandidate, IceServer, MediaConstraints, SessionDescription};
use async_trait::async_trait;

/// Handler for locally discovered ICE candidates
///
/// `None` signals that gathering has finished.
pub type IceCandidateHandler = Box<dyn Fn(Option<IceCandidate>) + Send + Sync>;

/// Handler for an inbound media stream
pub type RemoteStreamHandler<S> = Box<dyn Fn(S) + Send + Sync>;

/// Local media capture and peer-connection construction
#[async_trait]
pub trait MediaPlatform: Send + Sync + 'static {
    /// Media stream handle (local or remote)
    type Stream: Clone + Send + Sync + 'static;

    /// Peer connection produced by this platform
    type Peer: PeerConnection<Stream = Self::Stream>;

    /// Acquire a local media stream matching `constraints`
    async fn get_user_media(&self, constraints: &MediaConstraints) -> anyhow::Result<Self::Stream>;

    /// Create a peer connection using the given ICE servers
    async fn create_peer_connection(&self, ice_servers: &[IceServer]) -> anyhow::Result<Self::Peer>;
}

/// A single native peer connection
#[async_trait]
pub trait PeerConnection: Send + Sync + 'static {
    /// Media stream handle
    type Stream: Clone + Send + Sync + 'static;

    /// Attach a local stream as outgoing media
    async fn add_stream(&self, stream: &Self::Stream) -> anyhow::Result<()>;

    /// Apply the remote (offer) description
    async fn set_remote_description(&self, description: SessionDescription) -> anyhow::Result<()>;

    /// Generate an answer to the applied offer
    async fn create_answer(&self) -> anyhow::Result<SessionDescription>;

    /// Apply the local (answer) description
    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()>;

    /// Replace the ICE-candidate-discovered handler
    fn on_ice_candidate(&self, handler: IceCandidateHandler);

    /// Replace the remote-stream-arrived handler
    fn on_remote_stream(&self, handler: RemoteStreamHandler<Self::Stream>);

    /// Close the connection
    async fn close(&self) -> anyhow::Result<()>;
}
