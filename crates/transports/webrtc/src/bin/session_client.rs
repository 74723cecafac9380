//! Session client binary
//!
//! Joins a channel as publisher or subscriber and keeps the session open
//! until Ctrl+C or until the signaling server disconnects.
//!
//! # Usage
//!
//! ```bash
//! # Subscribe to a channel
//! cargo run --bin session_client -- \
//!   --role subscriber \
//!   --channel-id my-channel \
//!   --token "$ACCESS_TOKEN"
//!
//! # Publish audio only against a local signaling server
//! cargo run --bin session_client -- \
//!   --role publisher \
//!   --channel-id my-channel \
//!   --token "$ACCESS_TOKEN" \
//!   --no-video \
//!   --signaling-url ws://localhost:5000/signaling
//! ```

use clap::Parser;
use mediasession_core::{MediaConstraints, RemoteStreamPolicy, SessionConfig, SessionController};
use mediasession_webrtc::{WebRtcPlatform, WsSignalingClient};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Media session client
///
/// Sets up one WebRTC session through the signaling server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Session role: publisher or subscriber
    #[arg(short, long, env = "SESSION_ROLE")]
    role: String,

    /// Channel to join
    #[arg(short, long, env = "SESSION_CHANNEL_ID")]
    channel_id: String,

    /// Access token for the channel
    #[arg(short, long, env = "SESSION_ACCESS_TOKEN")]
    token: String,

    /// WebSocket signaling URL
    #[arg(long, env = "SESSION_SIGNALING_URL")]
    signaling_url: Option<String>,

    /// Session service base URL
    #[arg(long, env = "SESSION_SERVICE_URL")]
    session_service_url: Option<String>,

    /// Do not capture video (publisher only)
    #[arg(long, default_value_t = false)]
    no_video: bool,

    /// Do not capture audio (publisher only)
    #[arg(long, default_value_t = false)]
    no_audio: bool,

    /// When a subscriber session resolves: eager, await
    #[arg(long, default_value = "await", env = "SESSION_REMOTE_STREAM_POLICY")]
    remote_stream_policy: RemoteStreamPolicyArg,
}

/// Remote stream policy CLI argument wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum RemoteStreamPolicyArg {
    Eager,
    Await,
}

impl From<RemoteStreamPolicyArg> for RemoteStreamPolicy {
    fn from(arg: RemoteStreamPolicyArg) -> Self {
        match arg {
            RemoteStreamPolicyArg::Eager => RemoteStreamPolicy::ResolveEagerly,
            RemoteStreamPolicyArg::Await => RemoteStreamPolicy::AwaitRemoteStream,
        }
    }
}

impl Args {
    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            remote_stream_policy: self.remote_stream_policy.into(),
            ..SessionConfig::with_endpoints(
                self.signaling_url.clone(),
                self.session_service_url.clone(),
            )
        }
    }

    fn constraints(&self) -> MediaConstraints {
        MediaConstraints {
            video: !self.no_video,
            audio: !self.no_audio,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        role = %args.role,
        channel_id = %args.channel_id,
        "Session client starting"
    );

    let controller = SessionController::new(
        &args.role,
        args.session_config(),
        WebRtcPlatform::new()?,
        WsSignalingClient::new(),
    )?;

    let disconnected = Arc::new(Notify::new());
    let notify = Arc::clone(&disconnected);
    controller.on_disconnect(move || notify.notify_one());
    controller.on_error(|e| error!("Session error: {}", e));

    let session = match controller
        .start(&args.channel_id, &args.token, Some(args.constraints()))
        .await
    {
        Ok(session) => session,
        Err(e) => {
            controller.disconnect().await;
            return Err(e.into());
        }
    };

    match &session.stream {
        Some(stream) => info!(
            client_id = %session.client_id,
            stream_id = %stream.id(),
            audio = stream.has_audio(),
            video = stream.has_video(),
            "Session established"
        ),
        None => info!(client_id = %session.client_id, "Session established without a stream yet"),
    }

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for Ctrl+C: {}", e);
            }
            info!("Ctrl+C received, shutting down");
        }
        _ = disconnected.notified() => {
            info!("Signaling server disconnected");
        }
    }

    controller.disconnect().await;
    info!("Session client stopped");
    Ok(())
}

fn init_tracing() {
    // RUST_LOG wins; default to info
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
