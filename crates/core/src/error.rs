//! Error types for media sessions

use thiserror::Error;

/// Result type alias for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by a [`SessionController`](crate::SessionController)
///
/// Each pipeline stage fails with its own variant, so callers can tell
/// which step of session setup went wrong without inspecting messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Invalid role or endpoint configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Local media was denied or is unavailable
    #[error("Media acquisition error: {0}")]
    MediaAcquisition(String),

    /// Signaling connection, offer or message delivery failed
    #[error("Signaling error: {0}")]
    Signaling(String),

    /// Peer connection could not be constructed or fed media
    #[error("Peer connection error: {0}")]
    PeerConnection(String),

    /// An SDP create/apply step failed
    #[error("Negotiation error: {0}")]
    Negotiation(String),
}

/// Payload-free discriminant of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Configuration`]
    Configuration,
    /// See [`Error::MediaAcquisition`]
    MediaAcquisition,
    /// See [`Error::Signaling`]
    Signaling,
    /// See [`Error::PeerConnection`]
    PeerConnection,
    /// See [`Error::Negotiation`]
    Negotiation,
}

impl Error {
    /// Get the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration(_) => ErrorKind::Configuration,
            Error::MediaAcquisition(_) => ErrorKind::MediaAcquisition,
            Error::Signaling(_) => ErrorKind::Signaling,
            Error::PeerConnection(_) => ErrorKind::PeerConnection,
            Error::Negotiation(_) => ErrorKind::Negotiation,
        }
    }

    /// Wrap a collaborator failure as a media acquisition error
    pub fn media_acquisition(err: anyhow::Error) -> Self {
        Error::MediaAcquisition(format!("{err:#}"))
    }

    /// Wrap a collaborator failure as a signaling error
    pub fn signaling(err: anyhow::Error) -> Self {
        Error::Signaling(format!("{err:#}"))
    }

    /// Wrap a collaborator failure as a peer connection error
    pub fn peer_connection(err: anyhow::Error) -> Self {
        Error::PeerConnection(format!("{err:#}"))
    }

    /// Wrap a collaborator failure as a negotiation error
    pub fn negotiation(err: anyhow::Error) -> Self {
        Error::Negotiation(format!("{err:#}"))
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
