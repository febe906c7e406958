use std::{
  collections::BTreeMap,
  fmt,
  sync::{Arc, Weak},
  time::{Duration, Instant, SystemTime},
};

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use jingle_xmpp_parsers::{Action, Content, Description, IceUdpTransport, Jingle, Transport};
use tokio::{sync::{mpsc, Mutex}, time};
use tracing::{debug, error, info, warn};
use xmpp_parsers::{
  iq::{Iq, IqType},
  jingle::{ContentId, Creator, Reason, ReasonElement, SessionId},
  ns,
  stanza_error::{DefinedCondition, ErrorType, StanzaError},
  Element, Jid,
};

use crate::{
  error::IqErrorRecord,
  events::SessionEvent,
  peer::{IceCandidate, IceConnectionState, MediaConstraints, PeerConnection, PeerConnectionEvent},
  queue::ModificationQueue,
  sdp::{
    diff::SdpDiffer,
    util::{candidate_from_line, candidate_protocol, candidate_to_line, ssrc_group_line, ssrc_lines},
    Sdp, FAIL_ICE_ADDRESS,
  },
  signaling::SignalingLayer,
  stanza::{IqResponse, StanzaFilter, StanzaTransport},
  util::generate_id,
};

const MAX_SOURCE_READY_ATTEMPTS: u32 = 10;

/// A machine suspend shows up as the wall clock advancing far beyond the
/// monotonic clock between peer-connection events.
const SUSPEND_CLOCK_DRIFT: Duration = Duration::from_secs(2);

/// Session configuration, as handed down from the conference options.
#[derive(Debug, Clone)]
pub struct SessionConfig {
  pub webrtc_ice_udp_disable: bool,
  pub webrtc_ice_tcp_disable: bool,
  pub fail_ice: bool,
  pub use_drip: bool,
  pub disable_simulcast: bool,
  pub disable_rtx: bool,
  pub prefer_h264: bool,
  pub iq_timeout: Duration,
  pub drip_flush: Duration,
  pub source_ready_retry: Duration,
  pub media_constraints: MediaConstraints,
}

impl Default for SessionConfig {
  fn default() -> SessionConfig {
    SessionConfig {
      webrtc_ice_udp_disable: false,
      webrtc_ice_tcp_disable: false,
      fail_ice: false,
      use_drip: true,
      disable_simulcast: false,
      disable_rtx: false,
      prefer_h264: false,
      iq_timeout: Duration::from_millis(10_000),
      drip_flush: Duration::from_millis(20),
      source_ready_retry: Duration::from_millis(200),
      media_constraints: MediaConstraints::default(),
    }
  }
}

/// Which side of the session we are. The focus always initiates towards us
/// in a conference, but both roles are supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Initiator,
  Responder,
}

impl Role {
  pub(crate) fn creator(&self) -> Creator {
    match self {
      Role::Initiator => Creator::Initiator,
      Role::Responder => Creator::Responder,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Pending,
  Active,
  Ended,
}

struct SessionInner {
  state: SessionState,
  closed: bool,
  local_ufrag: Option<String>,
  remote_ufrag: Option<String>,
  interrupted: bool,
  gathering_complete: bool,
  last_event_instant: Instant,
  last_event_wall: SystemTime,
}

/// One Jingle session against the conference focus, bridging the signalling
/// channel and the local peer connection.
///
/// All peer-connection mutations run through the modification queue; at most
/// one offer/answer cycle is in flight at any time. ICE candidate traffic
/// deliberately bypasses the queue so that candidate delivery never waits on
/// a renegotiation.
pub struct JingleSession {
  sid: SessionId,
  role: Role,
  me: Jid,
  peer: Jid,
  config: SessionConfig,
  peer_connection: Arc<dyn PeerConnection>,
  transport: Arc<dyn StanzaTransport>,
  signaling: Arc<SignalingLayer>,
  queue: ModificationQueue,
  events: mpsc::Sender<SessionEvent>,
  inner: Mutex<SessionInner>,
  drip: Mutex<Vec<IceCandidate>>,
  weak: Weak<JingleSession>,
}

impl fmt::Debug for JingleSession {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("JingleSession")
      .field("sid", &self.sid.0)
      .field("peer", &self.peer)
      .finish()
  }
}

impl JingleSession {
  /// Create a session and start consuming peer-connection events. Must be
  /// called from within a tokio runtime.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    sid: SessionId,
    role: Role,
    me: Jid,
    peer: Jid,
    config: SessionConfig,
    peer_connection: Arc<dyn PeerConnection>,
    transport: Arc<dyn StanzaTransport>,
    events: mpsc::Sender<SessionEvent>,
    peer_connection_events: mpsc::Receiver<PeerConnectionEvent>,
  ) -> Arc<JingleSession> {
    let session = Arc::new_cyclic(|weak| JingleSession {
      sid,
      role,
      me,
      peer,
      config,
      peer_connection,
      transport,
      signaling: Arc::new(SignalingLayer::new()),
      queue: ModificationQueue::new(),
      events,
      inner: Mutex::new(SessionInner {
        state: SessionState::Pending,
        closed: false,
        local_ufrag: None,
        remote_ufrag: None,
        interrupted: false,
        gathering_complete: false,
        last_event_instant: Instant::now(),
        last_event_wall: SystemTime::now(),
      }),
      drip: Mutex::new(Vec::new()),
      weak: weak.clone(),
    });

    let pump = session.clone();
    tokio::spawn(async move {
      pump.signaling.attach().await;
      pump
        .pump_peer_connection_events(peer_connection_events)
        .await;
    });

    session
  }

  pub fn sid(&self) -> &SessionId {
    &self.sid
  }

  pub async fn state(&self) -> SessionState {
    self.inner.lock().await.state
  }

  /// Whether the peer connection reported the end of candidate gathering.
  /// Remembered only; end-of-candidates is never signalled on the wire.
  pub async fn gathering_complete(&self) -> bool {
    self.inner.lock().await.gathering_complete
  }

  /// The ssrc ownership table built from inbound contents.
  pub fn signaling_layer(&self) -> Arc<SignalingLayer> {
    self.signaling.clone()
  }

  fn handle(&self) -> Result<Arc<JingleSession>> {
    self.weak.upgrade().ok_or_else(|| anyhow!("session is gone"))
  }

  fn initiator_jid(&self) -> Jid {
    match self.role {
      Role::Initiator => self.me.clone(),
      Role::Responder => self.peer.clone(),
    }
  }

  fn responder_jid(&self) -> Jid {
    match self.role {
      Role::Initiator => self.peer.clone(),
      Role::Responder => self.me.clone(),
    }
  }

  async fn emit(&self, event: SessionEvent) {
    if self.events.send(event).await.is_err() {
      debug!("session event receiver is gone");
    }
  }

  fn apply_policy(&self, sdp: &mut Sdp) {
    sdp.remove_tcp_candidates = self.config.webrtc_ice_tcp_disable;
    sdp.remove_udp_candidates = self.config.webrtc_ice_udp_disable;
    sdp.fail_ice = self.config.fail_ice;
  }

  fn parse_sdp(&self, raw: &str) -> Sdp {
    let mut sdp = Sdp::parse(raw);
    self.apply_policy(&mut sdp);
    sdp
  }

  fn sdp_from_jingle(&self, jingle: &Jingle) -> Result<Sdp> {
    let mut sdp = Sdp::from_jingle(jingle)?;
    self.apply_policy(&mut sdp);
    Ok(sdp)
  }

  /// Record ssrc ownership announced in the given contents.
  async fn read_ssrc_info(&self, contents: &[Content]) {
    for content in contents {
      if let Some(Description::Rtp(description)) = &content.description {
        for source in &description.ssrcs {
          if let Some(info) = &source.info {
            self.signaling.set_ssrc_owner(source.id, &info.owner).await;
          }
        }
      }
    }
  }

  /// One offer/answer cycle against the peer connection. Must only run from
  /// inside a queued task.
  async fn renegotiate(&self, remote_override: Option<&Sdp>) -> Result<()> {
    let remote_raw = match remote_override {
      Some(sdp) => sdp.raw(),
      None => self
        .peer_connection
        .remote_description()
        .context("no remote description to renegotiate with")?,
    };

    let remote_sdp = Sdp::parse(&remote_raw);
    if let Some(ufrag) = remote_sdp.ufrag() {
      let changed = {
        let mut inner = self.inner.lock().await;
        if inner.remote_ufrag.as_deref() != Some(ufrag.as_str()) {
          inner.remote_ufrag = Some(ufrag.clone());
          true
        }
        else {
          false
        }
      };
      if changed {
        debug!("remote ufrag changed to {}", ufrag);
        self.emit(SessionEvent::RemoteUfragChanged(ufrag)).await;
      }
    }

    self
      .peer_connection
      .set_remote_description(&remote_raw)
      .await
      .context("failed to set remote description")?;

    if self.peer_connection.is_closed() {
      bail!("attempted to renegotiate in closed state");
    }

    let answer = self
      .peer_connection
      .create_answer(&self.config.media_constraints)
      .await
      .context("failed to create answer")?;

    let answer_sdp = Sdp::parse(&answer);
    if let Some(ufrag) = answer_sdp.ufrag() {
      let changed = {
        let mut inner = self.inner.lock().await;
        if inner.local_ufrag.as_deref() != Some(ufrag.as_str()) {
          inner.local_ufrag = Some(ufrag.clone());
          true
        }
        else {
          false
        }
      };
      if changed {
        debug!("local ufrag changed to {}", ufrag);
        self.emit(SessionEvent::LocalUfragChanged(ufrag)).await;
      }
    }

    self
      .peer_connection
      .set_local_description(&answer)
      .await
      .context("failed to set local description")?;

    Ok(())
  }

  async fn on_fatal_error(&self, error: &anyhow::Error) {
    error!("fatal renegotiation failure: {:?}", error);
    self
      .emit(SessionEvent::ConferenceSetupFailed(error.to_string()))
      .await;
    self
      .emit(SessionEvent::JingleFatalError(error.to_string()))
      .await;
  }

  /// Accept an inbound session-initiate: apply the offer, answer it, and
  /// send session-accept with the resulting local description.
  #[tracing::instrument(level = "debug", skip(self, offer), err)]
  pub async fn accept_offer(&self, offer: Jingle) -> Result<()> {
    self.read_ssrc_info(&offer.contents).await;
    let session = self.handle()?;
    self
      .queue
      .run(move || async move {
        let remote = session.sdp_from_jingle(&offer)?;
        if let Err(e) = session.renegotiate(Some(&remote)).await {
          session.on_fatal_error(&e).await;
          return Err(e);
        }
        session.inner.lock().await.state = SessionState::Active;
        debug!("initial offer/answer cycle complete");
        session.emit(SessionEvent::PeerConnectionReady).await;
        session.send_session_accept().await?;
        Ok(())
      })
      .await
  }

  async fn send_session_accept(&self) -> Result<()> {
    let local_raw = self
      .peer_connection
      .local_description()
      .context("no local description for session-accept")?;
    let local = self.parse_sdp(&local_raw);

    let mut jingle = Jingle::new(Action::SessionAccept, self.sid.clone())
      .with_initiator(self.initiator_jid())
      .with_responder(self.responder_jid());
    for content in local.to_jingle(self.role.creator())? {
      jingle = jingle.add_content(content);
    }
    if let Some(group) = local.bundle_group() {
      jingle = jingle.set_group(group);
    }
    self.send_jingle(jingle, true)
  }

  /// Apply a transport-replace offer from a new bridge. The datachannel
  /// content is dropped for the first cycle to force an SCTP teardown, then
  /// the full offer rebuilds it against the new transport.
  #[tracing::instrument(level = "debug", skip(self, offer), err)]
  pub async fn replace_transport(&self, offer: Jingle) -> Result<()> {
    info!("replacing transport (ICE restart)");
    self.emit(SessionEvent::IceRestarting).await;
    self.read_ssrc_info(&offer.contents).await;
    let session = self.handle()?;
    self
      .queue
      .run(move || async move {
        let old_local_raw = session.peer_connection.local_description();
        let mut stripped = offer.clone();
        stripped.contents.retain(|content| content.name.0 != "data");
        let remote = session.sdp_from_jingle(&stripped)?;
        if let Err(e) = session.renegotiate(Some(&remote)).await {
          session.on_fatal_error(&e).await;
          return Err(e);
        }
        let remote = session.sdp_from_jingle(&offer)?;
        if let Err(e) = session.renegotiate(Some(&remote)).await {
          session.on_fatal_error(&e).await;
          return Err(e);
        }
        let new_local_raw = session
          .peer_connection
          .local_description()
          .context("no local description after renegotiation")?;
        if let Some(old_local_raw) = old_local_raw {
          session
            .notify_my_ssrc_update(&old_local_raw, &new_local_raw)
            .await;
        }
        session.send_transport_accept().await?;
        Ok(())
      })
      .await
  }

  /// Acknowledge a transport-replace with the transports of the new local
  /// description; no media descriptions are included.
  async fn send_transport_accept(&self) -> Result<()> {
    let local_raw = self
      .peer_connection
      .local_description()
      .context("no local description for transport-accept")?;
    let local = self.parse_sdp(&local_raw);

    let mut jingle = Jingle::new(Action::TransportAccept, self.sid.clone())
      .with_initiator(self.initiator_jid())
      .with_responder(self.responder_jid());
    for index in 0..local.media.len() {
      let Some(mid) = local.mid_for_index(index) else {
        continue;
      };
      let Some(transport) = local.transport_to_jingle(index)? else {
        continue;
      };
      jingle = jingle.add_content(
        Content::new(self.role.creator(), ContentId(mid)).with_transport(transport),
      );
    }
    self.send_jingle(jingle, false)
  }

  /// Refuse a transport-replace.
  pub async fn send_transport_reject(&self) -> Result<()> {
    self.send_jingle(Jingle::new(Action::TransportReject, self.sid.clone()), false)
  }

  /// Apply an inbound source-add: new ssrcs for remote participants.
  pub async fn add_remote_stream(&self, contents: Vec<Content>) -> Result<()> {
    self.modify_remote_sources(contents, true).await
  }

  /// Apply an inbound source-remove.
  pub async fn remove_remote_stream(&self, contents: Vec<Content>) -> Result<()> {
    self.modify_remote_sources(contents, false).await
  }

  async fn modify_remote_sources(&self, contents: Vec<Content>, add: bool) -> Result<()> {
    // The first offer/answer cycle may still be running; give it a bounded
    // amount of time to produce a local description.
    let mut attempt = 0;
    while self.peer_connection.local_description().is_none() {
      attempt += 1;
      if attempt > MAX_SOURCE_READY_ATTEMPTS {
        bail!("local description still not ready, dropping source update");
      }
      warn!("local description not ready yet (attempt {})", attempt);
      time::sleep(self.config.source_ready_retry).await;
    }

    if add {
      self.read_ssrc_info(&contents).await;
    }

    let session = self.handle()?;
    self
      .queue
      .run(move || async move {
        let remote_raw = session
          .peer_connection
          .remote_description()
          .context("no remote description")?;
        let mut remote = session.parse_sdp(&remote_raw);
        let old_local_raw = session
          .peer_connection
          .local_description()
          .context("no local description")?;

        for content in &contents {
          let Some(Description::Rtp(description)) = &content.description else {
            continue;
          };
          let Some(index) = remote.media_index_by_mid(&content.name.0) else {
            warn!("no media section matching content '{}'", content.name.0);
            continue;
          };

          let mut lines: Vec<String> = Vec::new();
          for source in &description.ssrcs {
            if add && remote.contains_ssrc(source.id) {
              warn!("source-add for existing SSRC {}", source.id);
              continue;
            }
            if !add && !remote.contains_ssrc(source.id) {
              warn!("source-remove for unknown SSRC {}", source.id);
              continue;
            }
            if add {
              lines.extend(ssrc_lines(source));
            }
            else {
              // Strip every attribute line of the ssrc, not just the ones
              // repeated in the notification.
              let prefix = format!("a=ssrc:{} ", source.id);
              lines.extend(
                Sdp::find_lines(&remote.media[index], &prefix)
                  .into_iter()
                  .map(str::to_owned),
              );
            }
          }
          for group in &description.ssrc_groups {
            let line = ssrc_group_line(group);
            let present = remote.media[index].lines().any(|existing| existing == line);
            if add != present {
              lines.push(line);
            }
          }

          if lines.is_empty() {
            continue;
          }
          if add {
            remote.add_media_lines(index, &lines);
          }
          else {
            remote.remove_media_lines(index, &lines);
          }
        }

        session.renegotiate(Some(&remote)).await?;
        let new_local_raw = session
          .peer_connection
          .local_description()
          .context("no local description after renegotiation")?;
        session
          .notify_my_ssrc_update(&old_local_raw, &new_local_raw)
          .await;
        Ok(())
      })
      .await
  }

  /// Attach a local media stream and renegotiate.
  pub async fn add_local_stream(&self, stream_id: &str) -> Result<()> {
    self.modify_local_stream(stream_id.to_owned(), true).await
  }

  /// Detach a local media stream and renegotiate.
  pub async fn remove_local_stream(&self, stream_id: &str) -> Result<()> {
    self.modify_local_stream(stream_id.to_owned(), false).await
  }

  async fn modify_local_stream(&self, stream_id: String, add: bool) -> Result<()> {
    let session = self.handle()?;
    self
      .queue
      .run(move || async move {
        let old_local_raw = session.peer_connection.local_description();
        if add {
          session.peer_connection.add_stream(&stream_id).await?;
        }
        else {
          session.peer_connection.remove_stream(&stream_id).await?;
        }
        session.renegotiate(None).await?;
        let new_local_raw = session
          .peer_connection
          .local_description()
          .context("no local description after renegotiation")?;
        if let Some(old_local_raw) = old_local_raw {
          session
            .notify_my_ssrc_update(&old_local_raw, &new_local_raw)
            .await;
        }
        Ok(())
      })
      .await
  }

  /// Tell the conference which of our ssrcs appeared or vanished with the
  /// latest local description. Only an active session notifies anyone.
  async fn notify_my_ssrc_update(&self, old_local_raw: &str, new_local_raw: &str) {
    {
      let inner = self.inner.lock().await;
      if inner.state != SessionState::Active {
        debug!("skipping ssrc update in state {:?}", inner.state);
        return;
      }
    }

    let old = Sdp::parse(old_local_raw);
    let new = Sdp::parse(new_local_raw);

    let removed = SdpDiffer::new(&new, &old).to_contents(self.role.creator());
    if !removed.is_empty() {
      debug!("sending source-remove for {} contents", removed.len());
      let mut jingle = Jingle::new(Action::SourceRemove, self.sid.clone())
        .with_initiator(self.initiator_jid());
      for content in removed {
        jingle = jingle.add_content(content);
      }
      if let Err(e) = self.send_jingle(jingle, false) {
        error!("failed to send source-remove: {:?}", e);
      }
    }

    let added = SdpDiffer::new(&old, &new).to_contents(self.role.creator());
    if !added.is_empty() {
      debug!("sending source-add for {} contents", added.len());
      let mut jingle = Jingle::new(Action::SourceAdd, self.sid.clone())
        .with_initiator(self.initiator_jid());
      for content in added {
        jingle = jingle.add_content(content);
      }
      if let Err(e) = self.send_jingle(jingle, false) {
        error!("failed to send source-add: {:?}", e);
      }
    }
  }

  async fn pump_peer_connection_events(&self, mut events: mpsc::Receiver<PeerConnectionEvent>) {
    while let Some(event) = events.recv().await {
      match event {
        PeerConnectionEvent::IceCandidate(candidate) => self.on_ice_candidate(candidate).await,
        PeerConnectionEvent::IceGatheringComplete => {
          // Remembered only; end-of-candidates is implicit on the wire.
          debug!("end of ICE candidates");
          self.inner.lock().await.gathering_complete = true;
        },
        PeerConnectionEvent::IceConnectionStateChanged(state) => {
          self.on_ice_connection_state(state).await
        },
      }
    }
  }

  /// Candidate dispatch deliberately bypasses the modification queue.
  async fn on_ice_candidate(&self, candidate: IceCandidate) {
    if self.inner.lock().await.state == SessionState::Ended {
      return;
    }

    let protocol = candidate_protocol(&candidate.candidate).unwrap_or_default();
    if self.config.webrtc_ice_tcp_disable && (protocol == "tcp" || protocol == "ssltcp") {
      debug!("dropping {} candidate", protocol);
      return;
    }
    if self.config.webrtc_ice_udp_disable && protocol == "udp" {
      debug!("dropping udp candidate");
      return;
    }

    if !self.config.use_drip {
      self.send_ice_candidates(vec![candidate]).await;
      return;
    }

    let first = {
      let mut drip = self.drip.lock().await;
      drip.push(candidate);
      drip.len() == 1
    };
    if first {
      let Ok(session) = self.handle() else {
        return;
      };
      tokio::spawn(async move {
        time::sleep(session.config.drip_flush).await;
        let batch = std::mem::take(&mut *session.drip.lock().await);
        if !batch.is_empty() {
          session.send_ice_candidates(batch).await;
        }
      });
    }
  }

  /// Send one transport-info stanza carrying the given local candidates,
  /// grouped into per-media-section contents.
  async fn send_ice_candidates(&self, candidates: Vec<IceCandidate>) {
    debug!("sending {} ICE candidates", candidates.len());
    let Some(local_raw) = self.peer_connection.local_description() else {
      warn!("no local description, dropping {} candidates", candidates.len());
      return;
    };
    let local = self.parse_sdp(&local_raw);

    let mut grouped: Vec<(usize, Vec<IceCandidate>)> = Vec::new();
    for candidate in candidates {
      match grouped
        .iter_mut()
        .find(|(index, _)| *index == candidate.sdp_m_line_index)
      {
        Some((_, batch)) => batch.push(candidate),
        None => grouped.push((candidate.sdp_m_line_index, vec![candidate])),
      }
    }

    let mut jingle = Jingle::new(Action::TransportInfo, self.sid.clone())
      .with_initiator(self.initiator_jid());
    for (index, batch) in grouped {
      let mid = local
        .mid_for_index(index)
        .or_else(|| batch.first().map(|candidate| candidate.sdp_mid.clone()))
        .unwrap_or_default();

      // Credentials and the fingerprint come from the matching media
      // section; the candidates are ours alone.
      let mut transport = match local.transport_to_jingle(index) {
        Ok(Some(mut transport)) => {
          transport.candidates.clear();
          transport.sctp = None;
          transport
        },
        _ => IceUdpTransport::new(),
      };

      for candidate in &batch {
        match candidate_from_line(&candidate.candidate) {
          Ok(mut parsed) => {
            if self.config.fail_ice {
              if let Ok(ip) = FAIL_ICE_ADDRESS.parse() {
                parsed.ip = ip;
              }
            }
            transport.candidates.push(parsed);
          },
          Err(e) => warn!("skipping malformed candidate: {:?}", e),
        }
      }
      if transport.candidates.is_empty() {
        continue;
      }
      jingle = jingle.add_content(
        Content::new(self.role.creator(), ContentId(mid)).with_transport(transport),
      );
    }

    if jingle.contents.is_empty() {
      return;
    }
    if let Err(e) = self.send_jingle(jingle, false) {
      error!("failed to send transport-info: {:?}", e);
    }
  }

  async fn on_ice_connection_state(&self, state: IceConnectionState) {
    info!("ICE connection state: {}", state);
    self
      .emit(SessionEvent::IceConnectionStateChanged(state))
      .await;

    let mut inner = self.inner.lock().await;
    let wall_gap = SystemTime::now()
      .duration_since(inner.last_event_wall)
      .unwrap_or_default();
    let monotonic_gap = inner.last_event_instant.elapsed();
    inner.last_event_instant = Instant::now();
    inner.last_event_wall = SystemTime::now();

    match state {
      IceConnectionState::Connected | IceConnectionState::Completed => {
        if inner.interrupted {
          inner.interrupted = false;
          drop(inner);
          self.emit(SessionEvent::ConnectionRestored).await;
        }
      },
      IceConnectionState::Disconnected => {
        if wall_gap > monotonic_gap + SUSPEND_CLOCK_DRIFT {
          drop(inner);
          self.emit(SessionEvent::SuspendDetected).await;
        }
        else {
          inner.interrupted = true;
          drop(inner);
          self.emit(SessionEvent::ConnectionInterrupted).await;
        }
      },
      IceConnectionState::Failed => {
        drop(inner);
        self.emit(SessionEvent::ConnectionIceFailed).await;
      },
      _ => {},
    }
  }

  /// Feed remote candidates from a transport-info to the peer connection.
  pub async fn handle_transport_info(&self, jingle: &Jingle) -> Result<()> {
    let remote = self
      .peer_connection
      .remote_description()
      .map(|raw| Sdp::parse(&raw));
    for content in &jingle.contents {
      let Some(Transport::IceUdp(transport)) = &content.transport else {
        warn!(
          "transport-info content '{}' carries no ICE transport",
          content.name.0
        );
        continue;
      };
      let index = remote
        .as_ref()
        .and_then(|sdp| sdp.media_index_by_mid(&content.name.0))
        .unwrap_or(0);
      for candidate in &transport.candidates {
        let candidate = IceCandidate {
          candidate: candidate_to_line(candidate),
          sdp_mid: content.name.0.clone(),
          sdp_m_line_index: index,
        };
        if let Err(e) = self.peer_connection.add_remote_candidate(candidate).await {
          warn!("failed to add remote candidate: {:?}", e);
        }
      }
    }
    Ok(())
  }

  /// End the session from our side. Best-effort: a failed send does not
  /// resurrect the session.
  #[tracing::instrument(level = "debug", skip(self), err)]
  pub async fn terminate(&self, reason: Reason, text: Option<String>) -> Result<()> {
    {
      let mut inner = self.inner.lock().await;
      if inner.state == SessionState::Ended {
        debug!("session already ended");
        return Ok(());
      }
      inner.state = SessionState::Ended;
    }

    let mut texts = BTreeMap::new();
    if let Some(text) = text {
      texts.insert("en".to_owned(), text);
    }
    let jingle = Jingle::new(Action::SessionTerminate, self.sid.clone())
      .set_reason(ReasonElement { reason, texts });
    if let Err(e) = self.send_jingle(jingle, false) {
      debug!("failed to send session-terminate: {:?}", e);
    }
    Ok(())
  }

  async fn on_remote_terminate(&self, jingle: &Jingle) -> Result<()> {
    match &jingle.reason {
      Some(reason) => info!("session terminated by peer: {}", reason),
      None => info!("session terminated by peer"),
    }
    self.inner.lock().await.state = SessionState::Ended;
    self.close().await;
    Ok(())
  }

  /// Release everything. Idempotent; a second call is a no-op.
  pub async fn close(&self) {
    {
      let mut inner = self.inner.lock().await;
      if inner.closed {
        return;
      }
      inner.closed = true;
      inner.state = SessionState::Ended;
    }
    debug!("closing jingle session");
    self.signaling.detach().await;
    self.queue.close();
    if !self.peer_connection.is_closed() {
      self.peer_connection.close();
    }
  }

  /// Dispatch an inbound Jingle action to the matching handler.
  pub async fn handle_jingle(&self, jingle: Jingle) -> Result<()> {
    match jingle.action {
      Action::SessionInitiate => self.accept_offer(jingle).await,
      Action::TransportReplace => self.replace_transport(jingle).await,
      Action::SourceAdd => self.add_remote_stream(jingle.contents).await,
      Action::SourceRemove => self.remove_remote_stream(jingle.contents).await,
      Action::TransportInfo => self.handle_transport_info(&jingle).await,
      Action::SessionTerminate => self.on_remote_terminate(&jingle).await,
      other => {
        debug!("ignoring jingle action {}", other.as_str());
        Ok(())
      },
    }
  }

  /// Queue a stanza for sending and log the eventual outcome. The IQ
  /// round-trip happens on a background task so that queued work never
  /// waits on the network.
  fn send_jingle(&self, jingle: Jingle, elevate_timeout: bool) -> Result<()> {
    let action = jingle.action;
    let iq = Iq::from_set(generate_id(), jingle)
      .with_to(self.peer.clone())
      .with_from(self.me.clone());
    let element = Element::from(iq);
    let session = self.handle()?;
    tokio::spawn(async move {
      session
        .send_iq_and_log(element, action, elevate_timeout)
        .await;
    });
    Ok(())
  }

  async fn send_iq_and_log(&self, element: Element, action: Action, elevate_timeout: bool) {
    let request = element.clone();
    match time::timeout(self.config.iq_timeout, self.transport.send_iq(element)).await {
      Err(_) => {
        let record = IqErrorRecord::timeout(Some(&request), &self.sid.0);
        error!("{} timed out: {:?}", action.as_str(), record);
        if elevate_timeout {
          self.emit(SessionEvent::SessionAcceptTimeout(record)).await;
        }
      },
      Ok(Err(e)) => error!("failed to send {}: {:?}", action.as_str(), e),
      Ok(Ok(IqResponse::Error(stanza_error))) => {
        let record = IqErrorRecord::from_stanza_error(&stanza_error, Some(&request), &self.sid.0);
        error!("{} was rejected: {:?}", action.as_str(), record);
      },
      Ok(Ok(IqResponse::Result(_))) => debug!("{} acknowledged", action.as_str()),
    }
  }
}

#[async_trait]
impl StanzaFilter for JingleSession {
  fn filter(&self, element: &Element) -> bool {
    element.is("iq", ns::DEFAULT_NS)
      && element.attr("from") == Some(self.peer.to_string().as_str())
      && element.has_child("jingle", ns::JINGLE)
  }

  async fn take(&self, element: Element) -> Result<()> {
    let iq = Iq::try_from(element)?;
    let from = iq.from.clone().context("iq missing from")?;
    let IqType::Set(payload) = iq.payload else {
      debug!("ignoring non-set jingle iq");
      return Ok(());
    };

    match Jingle::try_from(payload) {
      Ok(jingle) if jingle.sid == self.sid || jingle.action == Action::SessionInitiate => {
        let result_iq = Iq::empty_result(from, iq.id.clone()).with_from(self.me.clone());
        self.transport.send(result_iq.into()).await?;
        self.handle_jingle(jingle).await
      },
      Ok(jingle) => {
        warn!("jingle for unknown session {}", jingle.sid.0);
        let error = StanzaError::new(
          ErrorType::Cancel,
          DefinedCondition::ItemNotFound,
          "en",
          format!("unknown jingle session: {}", jingle.sid.0),
        );
        let error_iq = Iq::from_error(iq.id.clone(), error)
          .with_to(from)
          .with_from(self.me.clone());
        self.transport.send(error_iq.into()).await?;
        Ok(())
      },
      Err(e) => {
        debug!("iq did not parse as jingle: {:?}", e);
        let error = StanzaError::new(
          ErrorType::Cancel,
          DefinedCondition::BadRequest,
          "en",
          format!("invalid jingle: {}", e),
        );
        let error_iq = Iq::from_error(iq.id.clone(), error)
          .with_to(from)
          .with_from(self.me.clone());
        self.transport.send(error_iq.into()).await?;
        Ok(())
      },
    }
  }
}
