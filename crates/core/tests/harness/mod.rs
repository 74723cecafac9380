//! Recording fake collaborators for session controller tests
//!
//! The fakes succeed by default; each stage can be told to fail. Every
//! collaborator call is appended to a shared call log so tests can assert
//! ordering and absence of calls.

#![allow(dead_code)]

use async_trait::async_trait;
use mediasession_core::{
    ConnectRequest, DisconnectHandler, ErrorHandler, IceCandidate, IceCandidateHandler,
    IceServer, MediaConstraints, MediaPlatform, PeerConnection, RemoteStreamHandler,
    SessionConfig, SessionController, SessionDescription, SignalingClient, SignalingConnection,
    SignalingOffer,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared, ordered record of collaborator calls
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.0.lock().iter().any(|e| e == entry)
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == entry)
    }
}

/// Which collaborator calls should fail
#[derive(Clone, Default)]
pub struct Failures {
    pub get_user_media: bool,
    pub connect: bool,
    pub create_peer: bool,
    pub add_stream: bool,
    pub set_remote_description: bool,
    pub create_answer: bool,
    pub set_local_description: bool,
    pub send_answer: bool,
    pub send_candidate: bool,
}

/// Opaque media stream used by the fakes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeStream(pub String);

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Events a fake peer emits on its own while negotiating
#[derive(Clone, Default)]
pub struct PeerScript {
    /// Emitted from inside `set_local_description`
    pub candidates_on_local_description: Vec<Option<IceCandidate>>,
    /// Emitted from inside `set_remote_description`
    pub stream_on_remote_description: Option<FakeStream>,
}

pub struct FakePlatform {
    pub log: CallLog,
    pub failures: Failures,
    pub script: PeerScript,
    pub local_stream: FakeStream,
    pub peers: Arc<Mutex<Vec<FakePeer>>>,
    pub requested_constraints: Arc<Mutex<Vec<MediaConstraints>>>,
    pub ice_servers_seen: Arc<Mutex<Vec<Vec<IceServer>>>>,
}

impl FakePlatform {
    pub fn new(log: CallLog, failures: Failures) -> Self {
        Self {
            log,
            failures,
            script: PeerScript::default(),
            local_stream: FakeStream("local-stream".to_string()),
            peers: Arc::new(Mutex::new(Vec::new())),
            requested_constraints: Arc::new(Mutex::new(Vec::new())),
            ice_servers_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl MediaPlatform for FakePlatform {
    type Stream = FakeStream;
    type Peer = FakePeer;

    async fn get_user_media(&self, constraints: &MediaConstraints) -> anyhow::Result<FakeStream> {
        self.log.push("get_user_media");
        self.requested_constraints.lock().push(*constraints);
        if self.failures.get_user_media {
            anyhow::bail!("permission denied");
        }
        Ok(self.local_stream.clone())
    }

    async fn create_peer_connection(&self, ice_servers: &[IceServer]) -> anyhow::Result<FakePeer> {
        self.log.push("create_peer_connection");
        self.ice_servers_seen.lock().push(ice_servers.to_vec());
        if self.failures.create_peer {
            anyhow::bail!("no peer connection support");
        }
        let peer = FakePeer::new(self.log.clone(), self.failures.clone(), self.script.clone());
        self.peers.lock().push(peer.clone());
        Ok(peer)
    }
}

struct PeerInner {
    log: CallLog,
    failures: Failures,
    script: PeerScript,
    ice_handler: Mutex<Option<IceCandidateHandler>>,
    stream_handler: Mutex<Option<RemoteStreamHandler<FakeStream>>>,
    added_streams: Mutex<Vec<FakeStream>>,
    remote_description: Mutex<Option<SessionDescription>>,
    local_description: Mutex<Option<SessionDescription>>,
    closed: AtomicUsize,
}

/// Cloneable handle to a fake peer connection
#[derive(Clone)]
pub struct FakePeer {
    inner: Arc<PeerInner>,
}

impl FakePeer {
    fn new(log: CallLog, failures: Failures, script: PeerScript) -> Self {
        Self {
            inner: Arc::new(PeerInner {
                log,
                failures,
                script,
                ice_handler: Mutex::new(None),
                stream_handler: Mutex::new(None),
                added_streams: Mutex::new(Vec::new()),
                remote_description: Mutex::new(None),
                local_description: Mutex::new(None),
                closed: AtomicUsize::new(0),
            }),
        }
    }

    /// Fire the ICE-candidate-discovered event
    pub fn emit_candidate(&self, candidate: Option<IceCandidate>) {
        if let Some(handler) = self.inner.ice_handler.lock().as_ref() {
            handler(candidate);
        }
    }

    /// Fire the remote-stream-arrived event
    pub fn emit_remote_stream(&self, stream: FakeStream) {
        if let Some(handler) = self.inner.stream_handler.lock().as_ref() {
            handler(stream);
        }
    }

    pub fn added_streams(&self) -> Vec<FakeStream> {
        self.inner.added_streams.lock().clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.inner.remote_description.lock().clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.inner.local_description.lock().clone()
    }

    pub fn close_count(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PeerConnection for FakePeer {
    type Stream = FakeStream;

    async fn add_stream(&self, stream: &FakeStream) -> anyhow::Result<()> {
        self.inner.log.push("add_stream");
        if self.inner.failures.add_stream {
            anyhow::bail!("track rejected");
        }
        self.inner.added_streams.lock().push(stream.clone());
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        self.inner.log.push("set_remote_description");
        if self.inner.failures.set_remote_description {
            anyhow::bail!("malformed offer");
        }
        *self.inner.remote_description.lock() = Some(description);
        if let Some(stream) = self.inner.script.stream_on_remote_description.clone() {
            self.emit_remote_stream(stream);
        }
        Ok(())
    }

    async fn create_answer(&self) -> anyhow::Result<SessionDescription> {
        self.inner.log.push("create_answer");
        if self.inner.failures.create_answer {
            anyhow::bail!("no compatible codecs");
        }
        Ok(SessionDescription::answer("v=0\r\nanswer"))
    }

    async fn set_local_description(&self, description: SessionDescription) -> anyhow::Result<()> {
        self.inner.log.push("set_local_description");
        if self.inner.failures.set_local_description {
            anyhow::bail!("invalid answer");
        }
        *self.inner.local_description.lock() = Some(description);
        for candidate in self.inner.script.candidates_on_local_description.clone() {
            self.emit_candidate(candidate);
        }
        Ok(())
    }

    fn on_ice_candidate(&self, handler: IceCandidateHandler) {
        self.inner.log.push("on_ice_candidate");
        *self.inner.ice_handler.lock() = Some(handler);
    }

    fn on_remote_stream(&self, handler: RemoteStreamHandler<FakeStream>) {
        self.inner.log.push("on_remote_stream");
        *self.inner.stream_handler.lock() = Some(handler);
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.inner.log.push("peer_close");
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

pub struct FakeSignaling {
    pub log: CallLog,
    pub failures: Failures,
    pub offer: SignalingOffer,
    pub connections: Arc<Mutex<Vec<FakeConnection>>>,
}

impl FakeSignaling {
    pub fn new(log: CallLog, failures: Failures) -> Self {
        Self {
            log,
            failures,
            offer: default_offer(),
            connections: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub fn default_offer() -> SignalingOffer {
    SignalingOffer {
        client_id: "client-42".to_string(),
        sdp: "v=0\r\noffer".to_string(),
        ice_servers: vec![IceServer {
            urls: vec!["stun:stun.example.com:3478".to_string()],
            username: None,
            credential: None,
        }],
    }
}

impl SignalingClient for FakeSignaling {
    type Connection = FakeConnection;

    fn connection(&self, url: &str) -> FakeConnection {
        self.log.push("signaling_connection");
        let connection = FakeConnection {
            inner: Arc::new(ConnectionInner {
                url: url.to_string(),
                log: self.log.clone(),
                failures: self.failures.clone(),
                offer: self.offer.clone(),
                requests: Mutex::new(Vec::new()),
                answers: Mutex::new(Vec::new()),
                candidates: Mutex::new(Vec::new()),
                error_handlers: Mutex::new(Vec::new()),
                disconnect_handlers: Mutex::new(Vec::new()),
                disconnects: AtomicUsize::new(0),
            }),
        };
        self.connections.lock().push(connection.clone());
        connection
    }
}

struct ConnectionInner {
    url: String,
    log: CallLog,
    failures: Failures,
    offer: SignalingOffer,
    requests: Mutex<Vec<ConnectRequest>>,
    answers: Mutex<Vec<String>>,
    candidates: Mutex<Vec<IceCandidate>>,
    error_handlers: Mutex<Vec<ErrorHandler>>,
    disconnect_handlers: Mutex<Vec<DisconnectHandler>>,
    disconnects: AtomicUsize,
}

/// Cloneable handle to a fake signaling connection
#[derive(Clone)]
pub struct FakeConnection {
    inner: Arc<ConnectionInner>,
}

impl FakeConnection {
    pub fn url(&self) -> String {
        self.inner.url.clone()
    }

    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.inner.requests.lock().clone()
    }

    pub fn answers(&self) -> Vec<String> {
        self.inner.answers.lock().clone()
    }

    pub fn candidates(&self) -> Vec<IceCandidate> {
        self.inner.candidates.lock().clone()
    }

    pub fn error_handler_count(&self) -> usize {
        self.inner.error_handlers.lock().len()
    }

    pub fn disconnect_handler_count(&self) -> usize {
        self.inner.disconnect_handlers.lock().len()
    }

    pub fn disconnect_count(&self) -> usize {
        self.inner.disconnects.load(Ordering::SeqCst)
    }

    /// Invoke the most recently registered error handler
    pub fn fire_error(&self, err: mediasession_core::Error) {
        let handler = self.inner.error_handlers.lock().last().cloned();
        if let Some(handler) = handler {
            handler(err);
        }
    }

    /// Invoke the most recently registered disconnect handler
    pub fn fire_disconnect(&self) {
        let handler = self.inner.disconnect_handlers.lock().last().cloned();
        if let Some(handler) = handler {
            handler();
        }
    }
}

#[async_trait]
impl SignalingConnection for FakeConnection {
    async fn connect(&self, request: ConnectRequest) -> anyhow::Result<SignalingOffer> {
        self.inner.log.push("connect");
        self.inner.requests.lock().push(request);
        if self.inner.failures.connect {
            anyhow::bail!("403 Forbidden");
        }
        Ok(self.inner.offer.clone())
    }

    async fn answer(&self, sdp: String) -> anyhow::Result<()> {
        self.inner.log.push("answer");
        if self.inner.failures.send_answer {
            anyhow::bail!("socket closed");
        }
        self.inner.answers.lock().push(sdp);
        Ok(())
    }

    async fn candidate(&self, candidate: IceCandidate) -> anyhow::Result<()> {
        self.inner.log.push("candidate");
        if self.inner.failures.send_candidate {
            anyhow::bail!("socket closed");
        }
        self.inner.candidates.lock().push(candidate);
        Ok(())
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.inner.log.push("signaling_disconnect");
        self.inner.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn on_error(&self, handler: ErrorHandler) {
        self.inner.log.push("signaling_on_error");
        self.inner.error_handlers.lock().push(handler);
    }

    fn on_disconnect(&self, handler: DisconnectHandler) {
        self.inner.log.push("signaling_on_disconnect");
        self.inner.disconnect_handlers.lock().push(handler);
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub type FakeController = SessionController<FakePlatform, FakeSignaling>;

/// A controller wired to fresh fakes, plus handles into those fakes
pub struct Fixture {
    pub controller: Arc<FakeController>,
    pub log: CallLog,
    peers: Arc<Mutex<Vec<FakePeer>>>,
    connections: Arc<Mutex<Vec<FakeConnection>>>,
    constraints: Arc<Mutex<Vec<MediaConstraints>>>,
    ice_servers: Arc<Mutex<Vec<Vec<IceServer>>>>,
}

impl Fixture {
    pub fn new(role: &str, config: SessionConfig, failures: Failures) -> Self {
        Self::with_script(role, config, failures, PeerScript::default())
    }

    pub fn with_script(
        role: &str,
        config: SessionConfig,
        failures: Failures,
        script: PeerScript,
    ) -> Self {
        let log = CallLog::default();
        let mut platform = FakePlatform::new(log.clone(), failures.clone());
        platform.script = script;
        let signaling = FakeSignaling::new(log.clone(), failures);

        let peers = Arc::clone(&platform.peers);
        let constraints = Arc::clone(&platform.requested_constraints);
        let ice_servers = Arc::clone(&platform.ice_servers_seen);
        let connections = Arc::clone(&signaling.connections);

        let controller = SessionController::new(role, config, platform, signaling)
            .expect("valid role and config");

        Self {
            controller: Arc::new(controller),
            log,
            peers,
            connections,
            constraints,
            ice_servers,
        }
    }

    pub fn peer(&self) -> Option<FakePeer> {
        self.peers.lock().last().cloned()
    }

    pub fn connection(&self) -> Option<FakeConnection> {
        self.connections.lock().last().cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn requested_constraints(&self) -> Vec<MediaConstraints> {
        self.constraints.lock().clone()
    }

    pub fn ice_servers_seen(&self) -> Vec<Vec<IceServer>> {
        self.ice_servers.lock().clone()
    }
}

pub fn candidate(n: u32) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2130706431 192.168.1.{n} 5000{n} typ host"),
        sdp_mid: Some("0".to_string()),
        sdp_m_line_index: Some(0),
    }
}

/// Poll `condition` until it holds or a second has passed
pub async fn wait_until<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
