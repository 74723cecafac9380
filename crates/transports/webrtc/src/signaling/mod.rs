//! WebSocket signaling
//!
//! [`WsSignalingClient`] implements the `SignalingClient` seam of
//! `mediasession-core` over a JSON message protocol (see [`protocol`]).

mod client;
pub mod protocol;

pub use client::{WsSignalingClient, WsSignalingConnection};
pub use protocol::{ClientMessage, OfferConfig, OfferMessage, ServerMessage};
