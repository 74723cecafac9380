//! Signaling message types
//!
//! Every message is a JSON object tagged by `type`. The client sends
//! `connect`, `answer`, `candidate` and `pong`; the server sends `offer`
//! and `ping`. Unknown server messages are tolerated.

use mediasession_core::{ConnectRequest, IceCandidate, IceServer, SignalingOffer};
use serde::{Deserialize, Serialize};

/// Message sent from the client to the signaling server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Join a channel with a role and access token
    Connect(ConnectRequest),
    /// Local SDP answer
    Answer {
        /// SDP body
        sdp: String,
    },
    /// Trickled local ICE candidate
    Candidate(IceCandidate),
    /// Reply to a server `ping`
    Pong,
}

impl ClientMessage {
    /// Serialize to the JSON text sent over the socket
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Message received from the signaling server
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Remote SDP offer for this client
    Offer(OfferMessage),
    /// Keepalive; answered with `pong`
    Ping,
    /// Any message type this client does not handle
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Parse a text frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Body of an `offer` message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferMessage {
    /// Remote SDP offer
    pub sdp: String,

    /// Identifier the server assigned to this client
    pub client_id: String,

    /// ICE servers at the top level of the message
    #[serde(default)]
    pub ice_servers: Option<Vec<IceServer>>,

    /// ICE servers nested under `config`
    #[serde(default)]
    pub config: Option<OfferConfig>,
}

/// `config` object of an `offer` message
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferConfig {
    /// STUN/TURN servers for the peer connection
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
}

impl From<OfferMessage> for SignalingOffer {
    fn from(msg: OfferMessage) -> Self {
        // Top-level servers win over the nested config.
        let ice_servers = msg
            .ice_servers
            .or_else(|| msg.config.map(|c| c.ice_servers))
            .unwrap_or_default();

        SignalingOffer {
            client_id: msg.client_id,
            sdp: msg.sdp,
            ice_servers,
        }
    }
}
