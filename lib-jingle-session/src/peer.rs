use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

/// ICE connection states reported by the peer connection wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceConnectionState {
  New,
  Checking,
  Connected,
  Completed,
  Disconnected,
  Failed,
  Closed,
}

impl fmt::Display for IceConnectionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      IceConnectionState::New => "new",
      IceConnectionState::Checking => "checking",
      IceConnectionState::Connected => "connected",
      IceConnectionState::Completed => "completed",
      IceConnectionState::Disconnected => "disconnected",
      IceConnectionState::Failed => "failed",
      IceConnectionState::Closed => "closed",
    })
  }
}

/// A locally gathered or remotely signalled ICE candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct IceCandidate {
  /// The candidate line, with or without the leading `a=`.
  pub candidate: String,

  /// The `a=mid` of the media section the candidate belongs to.
  pub sdp_mid: String,

  /// Index of the media section the candidate belongs to.
  pub sdp_m_line_index: usize,
}

/// Events surfaced by the peer connection wrapper.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerConnectionEvent {
  /// A local candidate was gathered.
  IceCandidate(IceCandidate),

  /// The null-candidate marker: gathering finished.
  IceGatheringComplete,

  /// The ICE connection state changed.
  IceConnectionStateChanged(IceConnectionState),
}

/// Answer-generation constraints handed to the peer connection.
#[derive(Debug, Clone)]
pub struct MediaConstraints {
  pub offer_to_receive_audio: bool,
  pub offer_to_receive_video: bool,
}

impl Default for MediaConstraints {
  fn default() -> MediaConstraints {
    MediaConstraints {
      offer_to_receive_audio: true,
      offer_to_receive_video: true,
    }
  }
}

/// The low-level peer connection wrapper.
///
/// Everything that mutates the connection is async; the session serializes
/// those calls through its modification queue. Implementations surface
/// candidates and state changes through a [`PeerConnectionEvent`] channel
/// handed to the session at construction.
#[async_trait]
pub trait PeerConnection: Send + Sync {
  async fn set_remote_description(&self, sdp: &str) -> Result<()>;
  async fn create_answer(&self, constraints: &MediaConstraints) -> Result<String>;
  async fn set_local_description(&self, sdp: &str) -> Result<()>;

  /// Feed a remotely signalled candidate to the ICE agent.
  async fn add_remote_candidate(&self, candidate: IceCandidate) -> Result<()>;

  async fn add_stream(&self, stream_id: &str) -> Result<()>;
  async fn remove_stream(&self, stream_id: &str) -> Result<()>;

  fn local_description(&self) -> Option<String>;
  fn remote_description(&self) -> Option<String>;

  fn is_closed(&self) -> bool;
  fn close(&self);
}
