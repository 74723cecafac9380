//! Session controller: one publisher or subscriber session
//!
//! `start` runs a strictly sequential pipeline. Each stage awaits the
//! previous one and the first failure aborts the rest:
//!
//! ```text
//! publisher:  get_user_media ─► signaling connect ─► peer + add_stream ─► negotiate
//! subscriber:                   signaling connect ─► peer ─────────────► negotiate ─► (remote stream)
//! ```

use crate::config::{RemoteStreamPolicy, Role, SessionConfig};
use crate::media::{IceCandidate, MediaConstraints};
use crate::platform::{MediaPlatform, PeerConnection};
use crate::signaling::{
    ConnectRequest, DisconnectHandler, ErrorHandler, SignalingClient, SignalingConnection,
    SignalingOffer,
};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, instrument, warn};

/// Result of a successful `start`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedSession<S> {
    /// Client identifier assigned by the signaling server
    pub client_id: String,

    /// Local stream (publisher) or remote stream (subscriber)
    ///
    /// Only `None` for a subscriber using
    /// [`RemoteStreamPolicy::ResolveEagerly`] whose stream has not arrived yet.
    pub stream: Option<S>,
}

/// Single-slot lifecycle handlers
#[derive(Default, Clone)]
struct Callbacks {
    on_error: Option<ErrorHandler>,
    on_disconnect: Option<DisconnectHandler>,
}

/// Live state of the current session
struct SessionState<P: MediaPlatform, S: SignalingClient> {
    signaling: Option<Arc<S::Connection>>,
    peer: Option<Arc<P::Peer>>,
    stream: Option<P::Stream>,
    client_id: Option<String>,
    answer_sent: bool,
}

impl<P: MediaPlatform, S: SignalingClient> Default for SessionState<P, S> {
    fn default() -> Self {
        Self {
            signaling: None,
            peer: None,
            stream: None,
            client_id: None,
            answer_sent: false,
        }
    }
}

/// Controller for a single WebRTC media session
///
/// The role is fixed at construction. A controller runs at most one
/// session at a time; calling `start` again while a session is active is
/// not supported.
pub struct SessionController<P: MediaPlatform, S: SignalingClient> {
    role: Role,
    config: SessionConfig,
    platform: P,
    signaling: S,
    callbacks: Arc<Mutex<Callbacks>>,
    state: Arc<Mutex<SessionState<P, S>>>,
}

impl<P: MediaPlatform, S: SignalingClient> SessionController<P, S> {
    /// Create a controller
    ///
    /// # Arguments
    ///
    /// * `role` - `"publisher"` or `"subscriber"`
    /// * `config` - Endpoints and subscriber completion policy
    /// * `platform` - Media capture and peer connection provider
    /// * `signaling` - Signaling connection factory
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown role or invalid
    /// endpoint URLs.
    pub fn new(role: &str, config: SessionConfig, platform: P, signaling: S) -> Result<Self> {
        let role: Role = role.parse()?;
        config.validate()?;

        debug!(%role, signaling_url = %config.signaling_url, "Creating session controller");

        Ok(Self {
            role,
            config,
            platform,
            signaling,
            callbacks: Arc::new(Mutex::new(Callbacks::default())),
            state: Arc::new(Mutex::new(SessionState::default())),
        })
    }

    /// Role fixed at construction
    pub fn role(&self) -> Role {
        self.role
    }

    /// Configuration fixed at construction
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Client identifier of the current session, once the offer arrived
    pub fn client_id(&self) -> Option<String> {
        self.state.lock().client_id.clone()
    }

    /// Current media stream slot
    ///
    /// For an eagerly resolved subscriber this is where the remote stream
    /// appears once it arrives.
    pub fn stream(&self) -> Option<P::Stream> {
        self.state.lock().stream.clone()
    }

    /// Whether the local answer has been sent for the current session
    pub fn answer_sent(&self) -> bool {
        self.state.lock().answer_sent
    }

    /// Start the session
    ///
    /// `constraints` only applies to publishers and defaults to audio and
    /// video.
    ///
    /// # Errors
    ///
    /// Fails with the error of the first stage that failed:
    /// [`Error::MediaAcquisition`], [`Error::Signaling`],
    /// [`Error::PeerConnection`] or [`Error::Negotiation`].
    #[instrument(skip_all, fields(role = %self.role, channel_id = %channel_id))]
    pub async fn start(
        &self,
        channel_id: &str,
        token: &str,
        constraints: Option<MediaConstraints>,
    ) -> Result<StartedSession<P::Stream>> {
        *self.state.lock() = SessionState::default();

        match self.role {
            Role::Publisher => {
                self.start_publisher(channel_id, token, constraints.unwrap_or_default())
                    .await
            }
            Role::Subscriber => self.start_subscriber(channel_id, token).await,
        }
    }

    async fn start_publisher(
        &self,
        channel_id: &str,
        token: &str,
        constraints: MediaConstraints,
    ) -> Result<StartedSession<P::Stream>> {
        debug!(
            video = constraints.video,
            audio = constraints.audio,
            "Acquiring local media"
        );
        let stream = self
            .platform
            .get_user_media(&constraints)
            .await
            .map_err(Error::media_acquisition)?;
        self.state.lock().stream = Some(stream.clone());

        let (connection, offer) = self.open_signaling(channel_id, token).await?;

        let peer = self.create_peer(&offer).await?;
        peer.add_stream(&stream)
            .await
            .map_err(Error::peer_connection)?;

        self.negotiate(&peer, &connection, &offer).await?;

        info!(client_id = %offer.client_id, "Publisher session started");

        Ok(StartedSession {
            client_id: offer.client_id,
            stream: Some(stream),
        })
    }

    async fn start_subscriber(
        &self,
        channel_id: &str,
        token: &str,
    ) -> Result<StartedSession<P::Stream>> {
        let (connection, offer) = self.open_signaling(channel_id, token).await?;

        let peer = self.create_peer(&offer).await?;

        let arrived = Arc::new(Notify::new());
        let state = Arc::clone(&self.state);
        let notify = Arc::clone(&arrived);
        peer.on_remote_stream(Box::new(move |stream| {
            debug!("Remote stream arrived");
            state.lock().stream = Some(stream);
            // Permit is kept if nobody is waiting yet
            notify.notify_one();
        }));

        self.negotiate(&peer, &connection, &offer).await?;

        if self.config.remote_stream_policy == RemoteStreamPolicy::AwaitRemoteStream {
            debug!("Waiting for remote stream");
            arrived.notified().await;
        }

        let stream = self.state.lock().stream.clone();

        info!(
            client_id = %offer.client_id,
            has_stream = stream.is_some(),
            "Subscriber session started"
        );

        Ok(StartedSession {
            client_id: offer.client_id,
            stream,
        })
    }

    /// Create the signaling connection, register handlers and wait for the offer
    async fn open_signaling(
        &self,
        channel_id: &str,
        token: &str,
    ) -> Result<(Arc<S::Connection>, SignalingOffer)> {
        let connection = Arc::new(self.signaling.connection(&self.config.signaling_url));

        {
            let callbacks = self.callbacks.lock();
            if let Some(handler) = callbacks.on_error.as_ref() {
                connection.on_error(Arc::clone(handler));
            }
            if let Some(handler) = callbacks.on_disconnect.as_ref() {
                connection.on_disconnect(Arc::clone(handler));
            }
            self.state.lock().signaling = Some(Arc::clone(&connection));
        }

        info!(url = %self.config.signaling_url, "Connecting to signaling server");

        let request = ConnectRequest {
            role: self.role.signaling_role(),
            channel_id: channel_id.to_string(),
            access_token: token.to_string(),
        };
        let offer = connection
            .connect(request)
            .await
            .map_err(Error::signaling)?;

        debug!(
            client_id = %offer.client_id,
            ice_servers = ?offer.ice_servers,
            sdp = %offer.sdp,
            "Received offer"
        );

        Ok((connection, offer))
    }

    async fn create_peer(&self, offer: &SignalingOffer) -> Result<Arc<P::Peer>> {
        let peer = self
            .platform
            .create_peer_connection(&offer.ice_servers)
            .await
            .map_err(Error::peer_connection)?;
        let peer = Arc::new(peer);

        let mut state = self.state.lock();
        state.client_id = Some(offer.client_id.clone());
        state.peer = Some(Arc::clone(&peer));

        Ok(peer)
    }

    /// Offer/answer exchange plus the trailing ICE candidate forwarder
    ///
    /// Candidates found before the answer goes out are queued and forwarded
    /// right after it, in discovery order.
    async fn negotiate(
        &self,
        peer: &P::Peer,
        connection: &Arc<S::Connection>,
        offer: &SignalingOffer,
    ) -> Result<()> {
        peer.set_remote_description(offer.description())
            .await
            .map_err(Error::negotiation)?;

        let answer = peer.create_answer().await.map_err(Error::negotiation)?;
        debug!(sdp = %answer.sdp, "Created answer");

        let (candidate_tx, candidate_rx) = mpsc::unbounded_channel();
        peer.on_ice_candidate(Box::new(move |candidate| {
            if let Some(candidate) = candidate {
                let _ = candidate_tx.send(candidate);
            }
        }));

        peer.set_local_description(answer.clone())
            .await
            .map_err(Error::negotiation)?;

        connection
            .answer(answer.sdp)
            .await
            .map_err(Error::signaling)?;
        self.state.lock().answer_sent = true;

        tokio::spawn(forward_candidates(
            candidate_rx,
            Arc::clone(connection),
            Arc::clone(&self.callbacks),
        ));

        Ok(())
    }

    /// Close the session
    ///
    /// Closes the signaling connection and the peer connection if they
    /// exist. Calling it without a session, or twice, does nothing.
    pub async fn disconnect(&self) {
        let (signaling, peer) = {
            let mut state = self.state.lock();
            (state.signaling.take(), state.peer.take())
        };

        if let Some(connection) = signaling {
            info!("Disconnecting from signaling server");
            if let Err(e) = connection.disconnect().await {
                warn!("Failed to disconnect signaling: {:#}", e);
            }
        }

        if let Some(peer) = peer {
            if let Err(e) = peer.close().await {
                warn!("Failed to close peer connection: {:#}", e);
            }
        }
    }

    /// Set the error handler
    ///
    /// Replaces any previous handler. If a signaling connection exists it
    /// receives the handler too.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        let handler: ErrorHandler = Arc::new(handler);
        let mut callbacks = self.callbacks.lock();
        callbacks.on_error = Some(Arc::clone(&handler));

        if let Some(connection) = self.state.lock().signaling.as_ref() {
            connection.on_error(handler);
        }
    }

    /// Set the disconnect handler
    ///
    /// Replaces any previous handler. If a signaling connection exists it
    /// receives the handler too.
    pub fn on_disconnect<F>(&self, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let handler: DisconnectHandler = Arc::new(handler);
        let mut callbacks = self.callbacks.lock();
        callbacks.on_disconnect = Some(Arc::clone(&handler));

        if let Some(connection) = self.state.lock().signaling.as_ref() {
            connection.on_disconnect(handler);
        }
    }
}

/// Drain discovered candidates into the signaling connection
async fn forward_candidates<C: SignalingConnection>(
    mut rx: mpsc::UnboundedReceiver<IceCandidate>,
    connection: Arc<C>,
    callbacks: Arc<Mutex<Callbacks>>,
) {
    while let Some(candidate) = rx.recv().await {
        debug!(candidate = %candidate.candidate, "Forwarding ICE candidate");

        if let Err(e) = connection.candidate(candidate).await {
            let err = Error::signaling(e);
            warn!("Failed to forward ICE candidate: {}", err);

            let handler = callbacks.lock().on_error.clone();
            if let Some(handler) = handler {
                handler(err);
            }
        }
    }

    debug!("ICE candidate forwarder terminated");
}
