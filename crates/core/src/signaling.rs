//! Signaling collaborator traits and messages

use crate::media::{IceCandidate, IceServer, SessionDescription};
use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Handler for asynchronous session errors
pub type ErrorHandler = Arc<dyn Fn(Error) + Send + Sync>;

/// Handler for signaling disconnection
pub type DisconnectHandler = Arc<dyn Fn() + Send + Sync>;

/// Role announced in the signaling `connect` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalingRole {
    /// Sending side
    Upstream,
    /// Receiving side
    Downstream,
}

/// Parameters of the signaling `connect` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// Upstream or downstream
    pub role: SignalingRole,
    /// Channel to join
    pub channel_id: String,
    /// Access token for the channel
    pub access_token: String,
}

/// Offer returned by the signaling server after `connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalingOffer {
    /// Identifier the server assigned to this client
    pub client_id: String,
    /// Offer SDP
    pub sdp: String,
    /// ICE servers to seed the peer connection with
    pub ice_servers: Vec<IceServer>,
}

impl SignalingOffer {
    /// The offer as a remote description
    pub fn description(&self) -> SessionDescription {
        SessionDescription::offer(self.sdp.clone())
    }
}

/// Factory for signaling connections
pub trait SignalingClient: Send + Sync + 'static {
    /// Connection type produced by this client
    type Connection: SignalingConnection;

    /// Create an unconnected signaling connection for `url`
    fn connection(&self, url: &str) -> Self::Connection;
}

/// One signaling connection
#[async_trait]
pub trait SignalingConnection: Send + Sync + 'static {
    /// Open the connection and wait for the server's offer
    async fn connect(&self, request: ConnectRequest) -> anyhow::Result<SignalingOffer>;

    /// Send the local answer SDP
    async fn answer(&self, sdp: String) -> anyhow::Result<()>;

    /// Send a locally discovered ICE candidate
    async fn candidate(&self, candidate: IceCandidate) -> anyhow::Result<()>;

    /// Close the connection
    async fn disconnect(&self) -> anyhow::Result<()>;

    /// Replace the error handler
    fn on_error(&self, handler: ErrorHandler);

    /// Replace the disconnect handler
    fn on_disconnect(&self, handler: DisconnectHandler);
}
