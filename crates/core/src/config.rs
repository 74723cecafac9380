//! Session role and endpoint configuration

use crate::signaling::SignalingRole;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default WebSocket signaling endpoint
pub const DEFAULT_SIGNALING_URL: &str = "wss://anzu.shiguredo.jp/signaling";

/// Default session-service endpoint
pub const DEFAULT_SESSION_SERVICE_URL: &str = "https://anzu.shiguredo.jp/api/";

/// Which side of the media session this controller plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sends local media into the channel
    Publisher,
    /// Receives media from the channel
    Subscriber,
}

impl Role {
    /// Role name as accepted by [`Role::from_str`]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Publisher => "publisher",
            Role::Subscriber => "subscriber",
        }
    }

    /// Role announced to the signaling server
    pub fn signaling_role(&self) -> SignalingRole {
        match self {
            Role::Publisher => SignalingRole::Upstream,
            Role::Subscriber => SignalingRole::Downstream,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "publisher" => Ok(Role::Publisher),
            "subscriber" => Ok(Role::Subscriber),
            other => Err(Error::Configuration(format!(
                "Role {} is not defined",
                other
            ))),
        }
    }
}

/// When a subscriber's `start` resolves relative to the remote stream
///
/// Some peer-connection implementations deliver the remote stream before
/// the local description is applied, others only afterwards. The platform
/// layer picks the policy that matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStreamPolicy {
    /// Resolve as soon as the local answer is applied and sent.
    ///
    /// The returned stream is `None` if it has not arrived yet; it shows up
    /// later through [`SessionController::stream`](crate::SessionController::stream).
    ResolveEagerly,
    /// Resolve only once the remote stream has arrived (default)
    #[default]
    AwaitRemoteStream,
}

/// Configuration for a [`SessionController`](crate::SessionController)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// WebSocket signaling URL (ws:// or wss://)
    pub signaling_url: String,

    /// Session-service URL (http:// or https://), kept for callers
    pub session_service_url: String,

    /// Subscriber completion policy (default: AwaitRemoteStream)
    pub remote_stream_policy: RemoteStreamPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signaling_url: DEFAULT_SIGNALING_URL.to_string(),
            session_service_url: DEFAULT_SESSION_SERVICE_URL.to_string(),
            remote_stream_policy: RemoteStreamPolicy::default(),
        }
    }
}

impl SessionConfig {
    /// Build a config from optional endpoints, falling back to the defaults
    pub fn with_endpoints(
        signaling_url: Option<String>,
        session_service_url: Option<String>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            signaling_url: signaling_url.unwrap_or(defaults.signaling_url),
            session_service_url: session_service_url.unwrap_or(defaults.session_service_url),
            remote_stream_policy: defaults.remote_stream_policy,
        }
    }

    /// Validate endpoint URLs
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if:
    /// - `signaling_url` is not a ws:// or wss:// URL
    /// - `session_service_url` is not an http:// or https:// URL
    pub fn validate(&self) -> Result<()> {
        if !self.signaling_url.starts_with("ws://") && !self.signaling_url.starts_with("wss://") {
            return Err(Error::Configuration(format!(
                "signaling_url must start with ws:// or wss://, got {}",
                self.signaling_url
            )));
        }

        if !self.session_service_url.starts_with("http://")
            && !self.session_service_url.starts_with("https://")
        {
            return Err(Error::Configuration(format!(
                "session_service_url must start with http:// or https://, got {}",
                self.session_service_url
            )));
        }

        Ok(())
    }
}
