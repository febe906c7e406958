//! Typed Jingle elements as Jitsi Meet actually sends them.
//!
//! Upstream `xmpp-parsers` covers standards-track Jingle, but the Jitsi
//! dialect extends it: `source-add`/`source-remove` actions, `ssrc-info`
//! ownership tags, a `required` attribute on DTLS fingerprints, and SCTP
//! channel maps. The containers defined here accept and emit that dialect
//! while reusing the upstream leaf types wherever they fit.

pub mod jingle;
pub mod jingle_dtls_srtp;
pub mod jingle_ice_udp;
pub mod jingle_rtp;
pub mod jingle_sctp;
pub mod jingle_ssma;
pub mod ns;

pub use xmpp_parsers;

pub use crate::{
  jingle::{Action, Content, Description, Jingle, Transport},
  jingle_dtls_srtp::Fingerprint,
  jingle_ice_udp::{Candidate, CandidateType, IceUdpTransport},
  jingle_rtp::RtpDescription,
  jingle_sctp::SctpMap,
  jingle_ssma::{Parameter, Semantics, Source, SsrcGroup, SsrcInfo},
};
