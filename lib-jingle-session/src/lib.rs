//! Jingle peer-connection session core.
//!
//! Bridges an XMPP/Jingle signalling channel with a local WebRTC peer
//! connection: inbound Jingle stanzas become peer-connection operations,
//! outbound peer-connection events become Jingle stanzas, and a
//! modification queue keeps concurrent signalling from ever interleaving
//! inside a single offer/answer cycle.
//!
//! The enclosing conference provides the capabilities at the seams: a
//! [`PeerConnection`] wrapper, a [`StanzaTransport`] for the wire, and a
//! channel for [`SessionEvent`] notifications.

pub mod error;
pub mod events;
pub mod peer;
pub mod queue;
pub mod sdp;
mod session;
pub mod signaling;
pub mod stanza;
mod util;

pub use jingle_xmpp_parsers;
pub use xmpp_parsers;

pub use crate::{
  error::IqErrorRecord,
  events::SessionEvent,
  peer::{
    IceCandidate, IceConnectionState, MediaConstraints, PeerConnection, PeerConnectionEvent,
  },
  queue::ModificationQueue,
  sdp::{diff::SdpDiffer, Sdp},
  session::{JingleSession, Role, SessionConfig, SessionState},
  signaling::SignalingLayer,
  stanza::{IqResponse, StanzaFilter, StanzaTransport},
};

#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing(level: tracing::Level) {
  tracing_subscriber::fmt()
    .with_max_level(level)
    .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
    .with_target(false)
    .init();
}
