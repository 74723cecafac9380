//! WebSocket signaling client for SDP and ICE exchange

use super::protocol::{ClientMessage, ServerMessage};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use mediasession_core::{
    ConnectRequest, DisconnectHandler, Error, ErrorHandler, IceCandidate, SignalingClient,
    SignalingConnection, SignalingOffer,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Factory for WebSocket signaling connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WsSignalingClient;

impl WsSignalingClient {
    /// Create a new client
    pub fn new() -> Self {
        Self
    }
}

impl SignalingClient for WsSignalingClient {
    type Connection = WsSignalingConnection;

    fn connection(&self, url: &str) -> Self::Connection {
        WsSignalingConnection::new(url)
    }
}

/// Handler slots shared with the receiver task
#[derive(Default)]
struct Handlers {
    on_error: Mutex<Option<ErrorHandler>>,
    on_disconnect: Mutex<Option<DisconnectHandler>>,
}

impl Handlers {
    fn report_error(&self, err: Error) {
        let handler = self.on_error.lock().clone();
        match handler {
            Some(handler) => handler(err),
            None => warn!("Unhandled signaling error: {}", err),
        }
    }

    fn report_disconnect(&self) {
        let handler = self.on_disconnect.lock().clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

/// One WebSocket session with the signaling server
///
/// Created unconnected; [`SignalingConnection::connect`] opens the socket,
/// joins the channel and waits for the server's offer.
pub struct WsSignalingConnection {
    /// Signaling server URL
    url: String,

    /// Outgoing message sender, present while the socket is open
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,

    /// Set once `disconnect` was requested locally
    closing: Arc<AtomicBool>,

    handlers: Arc<Handlers>,
}

impl WsSignalingConnection {
    /// Create an unconnected signaling connection
    ///
    /// # Arguments
    ///
    /// * `url` - WebSocket signaling server URL (ws:// or wss://)
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            outbound: Mutex::new(None),
            closing: Arc::new(AtomicBool::new(false)),
            handlers: Arc::new(Handlers::default()),
        }
    }

    /// Signaling server URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Whether the socket is currently open
    pub fn is_connected(&self) -> bool {
        self.outbound
            .lock()
            .as_ref()
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }

    fn send(&self, message: &ClientMessage) -> anyhow::Result<()> {
        let json = message
            .to_json()
            .context("failed to serialize signaling message")?;

        let outbound = self.outbound.lock();
        let tx = outbound
            .as_ref()
            .ok_or_else(|| anyhow!("signaling connection is not open"))?;
        tx.send(Message::Text(json))
            .map_err(|_| anyhow!("signaling connection is closed"))
    }

    /// Sender task: sends messages from channel to WebSocket
    async fn sender_task(
        mut write: SplitSink<WsStream, Message>,
        mut rx: mpsc::UnboundedReceiver<Message>,
    ) {
        while let Some(msg) = rx.recv().await {
            let is_close = matches!(msg, Message::Close(_));
            if let Err(e) = write.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
            if is_close {
                break;
            }
        }

        debug!("Sender task terminated");
    }

    /// Receiver task: hands the first offer to `connect`, answers pings and
    /// reports socket failures to the registered handlers
    async fn receiver_task(
        mut read: SplitStream<WsStream>,
        tx: mpsc::UnboundedSender<Message>,
        offer_tx: oneshot::Sender<SignalingOffer>,
        handlers: Arc<Handlers>,
        closing: Arc<AtomicBool>,
    ) {
        let mut offer_tx = Some(offer_tx);

        while let Some(msg_result) = read.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match ServerMessage::from_json(&text) {
                    Ok(ServerMessage::Offer(offer)) => match offer_tx.take() {
                        Some(pending) => {
                            let _ = pending.send(offer.into());
                        }
                        None => debug!("Ignoring additional offer from signaling server"),
                    },
                    Ok(ServerMessage::Ping) => {
                        if let Ok(pong) = ClientMessage::Pong.to_json() {
                            let _ = tx.send(Message::Text(pong));
                        }
                    }
                    Ok(ServerMessage::Unknown) => {
                        debug!("Ignoring signaling message: {}", text);
                    }
                    Err(e) => {
                        warn!("Failed to parse signaling message: {}", e);
                    }
                },
                Ok(Message::Close(frame)) => {
                    info!("WebSocket connection closed: {:?}", frame);
                    break;
                }
                Err(e) => {
                    if !closing.load(Ordering::SeqCst) {
                        error!("WebSocket error: {}", e);
                        // Before the offer, `connect` reports the failure itself.
                        if offer_tx.is_none() {
                            handlers
                                .report_error(Error::Signaling(format!("WebSocket error: {e}")));
                        }
                    }
                    break;
                }
                _ => {}
            }
        }

        // Dropping a pending offer sender fails `connect`.
        drop(offer_tx);

        if !closing.load(Ordering::SeqCst) {
            handlers.report_disconnect();
        }

        debug!("Receiver task terminated");
    }
}

#[async_trait]
impl SignalingConnection for WsSignalingConnection {
    async fn connect(&self, request: ConnectRequest) -> anyhow::Result<SignalingOffer> {
        info!(
            url = %self.url,
            channel_id = %request.channel_id,
            "Connecting to signaling server"
        );
        self.closing.store(false, Ordering::SeqCst);

        let (ws_stream, _) = match connect_async(self.url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                let err =
                    anyhow::Error::new(e).context(format!("failed to connect to {}", self.url));
                error!("Signaling connection failed: {:#}", err);
                self.handlers.report_error(Error::Signaling(format!("{err:#}")));
                return Err(err);
            }
        };

        info!("Connected to signaling server");

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();
        let (offer_tx, offer_rx) = oneshot::channel();

        tokio::spawn(Self::sender_task(write, rx));
        tokio::spawn(Self::receiver_task(
            read,
            tx.clone(),
            offer_tx,
            Arc::clone(&self.handlers),
            Arc::clone(&self.closing),
        ));

        *self.outbound.lock() = Some(tx);
        self.send(&ClientMessage::Connect(request))?;

        let offer = match offer_rx.await {
            Ok(offer) => offer,
            Err(_) => {
                let err = anyhow!("signaling connection closed before an offer was received");
                if !self.closing.load(Ordering::SeqCst) {
                    self.handlers.report_error(Error::Signaling(format!("{err:#}")));
                }
                return Err(err);
            }
        };

        debug!(client_id = %offer.client_id, "Received offer");
        Ok(offer)
    }

    async fn answer(&self, sdp: String) -> anyhow::Result<()> {
        self.send(&ClientMessage::Answer { sdp })
            .context("failed to send answer")
    }

    async fn candidate(&self, candidate: IceCandidate) -> anyhow::Result<()> {
        self.send(&ClientMessage::Candidate(candidate))
            .context("failed to send ICE candidate")
    }

    async fn disconnect(&self) -> anyhow::Result<()> {
        self.closing.store(true, Ordering::SeqCst);

        let tx = self.outbound.lock().take();
        if let Some(tx) = tx {
            info!("Disconnecting from signaling server");
            // The sender task may already be gone if the server hung up.
            let _ = tx.send(Message::Close(None));
        }
        Ok(())
    }

    fn on_error(&self, handler: ErrorHandler) {
        *self.handlers.on_error.lock() = Some(handler);
    }

    fn on_disconnect(&self, handler: DisconnectHandler) {
        *self.handlers.on_disconnect.lock() = Some(handler);
    }
}
