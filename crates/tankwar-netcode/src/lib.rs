//! Tankwar Netcode - Talking to the simulation
//!
//! This crate provides everything between the socket and the entity store:
//!
//! - **Framing**: varint length-delimited frames over any byte stream
//! - **Messages**: client and server message enums carried in those frames
//! - **Decoding**: observation payloads (raw or PNG images, scalars) to component values
//! - **Transport**: the `Connection` sending half, with a TCP implementation
//! - **Reconciliation**: alive/dead/assigned bookkeeping against authoritative lists
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  ClientMessage   ┌──────────────┐
//! │   caller   │ ───────────────▶ │  Connection  │ ──▶ socket (write half)
//! └────────────┘                  └──────────────┘
//!                                 ┌──────────────┐
//!  socket (read half) ──────────▶ │ FrameReader  │ ──▶ ServerMessage
//!                                 └──────────────┘
//!                                        │
//!                        ┌───────────────┴───────────────┐
//!                        ▼                               ▼
//!              ┌─────────────────┐           ┌────────────────────┐
//!              │ EntityLifecycle │           │ decode_observation │
//!              └─────────────────┘           └────────────────────┘
//! ```

mod decode;
mod error;
pub mod framing;
pub mod message;
mod reconciliation;
mod transport;

pub use decode::{decode_image, decode_observation};
pub use error::{Error, Result};
pub use framing::{encode_frame, read_frame, read_frame_limited, write_frame, FrameReader};
pub use message::{
    decode_message, encode_message, ClientMessage, ImagePayload, Observation, ObservationKind,
    ObservationUpdate, ServerMessage, TankInfo,
};
pub use reconciliation::{EntityLifecycle, Reconciliation};
pub use transport::{Connection, TcpConnection};
