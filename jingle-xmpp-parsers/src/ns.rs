/// Jitsi Meet proprietary extensions (ssrc-info ownership and friends).
pub const JITSI_MEET: &str = "http://jitsi.org/jitmeet";

/// XEP-0343: Signaling WebRTC datachannels in Jingle.
pub const JINGLE_DTLS_SCTP: &str = "urn:xmpp:jingle:transports:dtls-sctp:1";
