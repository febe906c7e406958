use crate::{error::IqErrorRecord, peer::IceConnectionState};

/// Events the session state machine emits for the enclosing conference.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
  /// Raw ICE connection state forwarded from the peer connection.
  IceConnectionStateChanged(IceConnectionState),

  /// ICE reconnected after an interruption.
  ConnectionRestored,

  /// ICE reported disconnected while the session was up.
  ConnectionInterrupted,

  /// ICE failed; the connection will not recover on its own.
  ConnectionIceFailed,

  /// The machine appears to have slept through the disconnection.
  SuspendDetected,

  /// The initial offer/answer cycle completed.
  PeerConnectionReady,

  /// A transport-replace triggered an ICE restart.
  IceRestarting,

  /// The session-accept IQ was never acknowledged.
  SessionAcceptTimeout(IqErrorRecord),

  /// The remote ICE username fragment changed.
  RemoteUfragChanged(String),

  /// The local ICE username fragment changed.
  LocalUfragChanged(String),

  /// A fatal renegotiation failure while setting up the call.
  ConferenceSetupFailed(String),

  /// A fatal Jingle-level error.
  JingleFatalError(String),
}
