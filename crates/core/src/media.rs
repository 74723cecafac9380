//! Media and negotiation value types shared with collaborators

use serde::{Deserialize, Deserializer, Serialize};

/// Which kinds of local media a publisher requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConstraints {
    /// Request a video track
    pub video: bool,
    /// Request an audio track
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

impl MediaConstraints {
    /// Audio only
    pub fn audio_only() -> Self {
        Self {
            video: false,
            audio: true,
        }
    }

    /// Video only
    pub fn video_only() -> Self {
        Self {
            video: true,
            audio: false,
        }
    }

    /// True if no media kind is requested
    pub fn is_empty(&self) -> bool {
        !self.video && !self.audio
    }
}

/// STUN/TURN server descriptor handed out by signaling
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IceServer {
    /// Server URLs (stun:, turn:, turns:)
    #[serde(deserialize_with = "one_or_many")]
    pub urls: Vec<String>,

    /// TURN username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// TURN credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// `urls` may be a single string or a list
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}

/// A locally discovered ICE candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    /// Candidate attribute line (`candidate:...`)
    pub candidate: String,

    /// Media stream identification tag
    #[serde(default)]
    pub sdp_mid: Option<String>,

    /// Index of the m-line this candidate belongs to
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidate {
    /// Create a candidate without m-line information
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// SDP description kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    /// Offer from the remote side
    Offer,
    /// Local answer
    Answer,
}

/// An SDP offer or answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Offer or answer
    #[serde(rename = "type")]
    pub sdp_type: SdpType,

    /// Raw SDP text
    pub sdp: String,
}

impl SessionDescription {
    /// Wrap SDP text as an offer
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    /// Wrap SDP text as an answer
    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}
