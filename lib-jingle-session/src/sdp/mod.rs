//! Line-level SDP model and its translation to and from Jingle contents.

pub mod diff;
pub(crate) mod util;

use anyhow::{bail, Context as _, Result};
use jingle_xmpp_parsers::{
  Content, Description, Fingerprint, IceUdpTransport, Jingle, RtpDescription, SctpMap, Source,
  Transport,
};
use xmpp_parsers::{
  jingle::{ContentId, Creator, Senders},
  jingle_grouping::{Content as GroupContent, Group, Semantics as GroupSemantics},
  jingle_rtp::PayloadType,
};

use crate::sdp::util::{
  apply_fmtp, candidate_from_line, candidate_to_line, extmap_line, fmtp_line, parse_extmap,
  parse_fingerprint, parse_mline, parse_rtcp_fb, parse_rtpmap, parse_ssrc_group_line,
  parse_ssrc_line, rtcp_fb_lines, rtpmap_line, ssrc_group_line, ssrc_lines,
};

pub(crate) const FAIL_ICE_ADDRESS: &str = "1.1.1.1";

/// An SDP snapshot split into the session-level block and the per-media
/// sections, in order. The order of `media` matches the order of Jingle
/// `<content/>` elements and the `sdpMLineIndex` of ICE candidates.
#[derive(Debug, Clone, Default)]
pub struct Sdp {
  /// Everything before the first `m=` line.
  pub session: String,

  /// One block per media section, each with its trailing line ending.
  pub media: Vec<String>,

  /// Drop TCP and SSLTCP candidates when emitting Jingle.
  pub remove_tcp_candidates: bool,

  /// Drop UDP candidates when emitting Jingle.
  pub remove_udp_candidates: bool,

  /// Rewrite emitted candidate addresses so ICE cannot succeed.
  pub fail_ice: bool,
}

impl Sdp {
  /// Split a raw SDP string on its `m=` lines.
  pub fn parse(raw: &str) -> Sdp {
    let mut sdp = Sdp::default();
    for line in raw.split_inclusive('\n') {
      if line.starts_with("m=") {
        sdp.media.push(line.to_owned());
      }
      else if let Some(current) = sdp.media.last_mut() {
        current.push_str(line);
      }
      else {
        sdp.session.push_str(line);
      }
    }
    sdp
  }

  /// The full SDP text.
  pub fn raw(&self) -> String {
    let mut raw = self.session.clone();
    for block in &self.media {
      raw.push_str(block);
    }
    raw
  }

  /// First line of `block` starting with `prefix`.
  pub fn find_line<'a>(block: &'a str, prefix: &str) -> Option<&'a str> {
    block.lines().find(|line| line.starts_with(prefix))
  }

  /// Like [`Sdp::find_line`], searching `fallback` when `block` has no match.
  pub fn find_line_with_fallback<'a>(
    block: &'a str,
    prefix: &str,
    fallback: &'a str,
  ) -> Option<&'a str> {
    Sdp::find_line(block, prefix).or_else(|| Sdp::find_line(fallback, prefix))
  }

  /// All lines of `block` starting with `prefix`.
  pub fn find_lines<'a>(block: &'a str, prefix: &str) -> Vec<&'a str> {
    block
      .lines()
      .filter(|line| line.starts_with(prefix))
      .collect()
  }

  /// Whether any media section announces the given ssrc.
  pub fn contains_ssrc(&self, ssrc: u32) -> bool {
    let prefix = format!("a=ssrc:{} ", ssrc);
    self
      .media
      .iter()
      .any(|block| Sdp::find_line(block, &prefix).is_some())
  }

  /// The `a=mid` of a media section, falling back to its media kind.
  pub fn mid_for_index(&self, index: usize) -> Option<String> {
    let block = self.media.get(index)?;
    if let Some(line) = Sdp::find_line(block, "a=mid:") {
      return Some(line["a=mid:".len()..].to_owned());
    }
    self.media_kind(index).map(str::to_owned)
  }

  /// The media kind (`audio`, `video`, `application`) of a section.
  pub fn media_kind(&self, index: usize) -> Option<&str> {
    let line = Sdp::find_line(self.media.get(index)?, "m=")?;
    line["m=".len()..].split_whitespace().next()
  }

  /// Index of the media section with the given `a=mid`.
  pub fn media_index_by_mid(&self, mid: &str) -> Option<usize> {
    let exact = format!("a=mid:{}", mid);
    self
      .media
      .iter()
      .position(|block| block.lines().any(|line| line == exact))
  }

  /// The latest ICE username fragment present in this description.
  pub fn ufrag(&self) -> Option<String> {
    for block in &self.media {
      if let Some(line) = Sdp::find_line(block, "a=ice-ufrag:") {
        return Some(line["a=ice-ufrag:".len()..].to_owned());
      }
    }
    Sdp::find_line(&self.session, "a=ice-ufrag:")
      .map(|line| line["a=ice-ufrag:".len()..].to_owned())
  }

  /// Append attribute lines to a media section.
  pub fn add_media_lines(&mut self, index: usize, lines: &[String]) {
    let Some(block) = self.media.get_mut(index) else {
      return;
    };
    for line in lines {
      block.push_str(line);
      block.push_str("\r\n");
    }
  }

  /// Remove exactly matching attribute lines from a media section.
  pub fn remove_media_lines(&mut self, index: usize, lines: &[String]) {
    let Some(block) = self.media.get_mut(index) else {
      return;
    };
    let keep: Vec<&str> = block
      .lines()
      .filter(|line| !lines.iter().any(|removed| removed == line))
      .collect();
    let mut rebuilt = String::new();
    for line in keep {
      rebuilt.push_str(line);
      rebuilt.push_str("\r\n");
    }
    *block = rebuilt;
  }

  /// The session-level BUNDLE group, if present.
  pub fn bundle_group(&self) -> Option<Group> {
    let line = Sdp::find_line(&self.session, "a=group:BUNDLE")?;
    let mids = line["a=group:BUNDLE".len()..].split_whitespace();
    Some(Group {
      semantics: GroupSemantics::Bundle,
      contents: mids.map(GroupContent::new).collect(),
    })
  }

  /// Build a remote description from a Jingle offer, walking `<content/>`
  /// elements in document order.
  pub fn from_jingle(jingle: &Jingle) -> Result<Sdp> {
    let mut session = String::from("v=0\r\no=- 0 2 IN IP4 0.0.0.0\r\ns=-\r\nt=0 0\r\n");
    if let Some(group) = &jingle.group {
      let semantics = match group.semantics {
        GroupSemantics::Bundle => "BUNDLE",
        GroupSemantics::Ls => "LS",
      };
      let names: Vec<&str> = group
        .contents
        .iter()
        .map(|content| content.name.0.as_str())
        .collect();
      session.push_str(&format!("a=group:{} {}\r\n", semantics, names.join(" ")));
    }

    let mut media = Vec::with_capacity(jingle.contents.len());
    for content in &jingle.contents {
      media.push(Sdp::media_from_content(content)?);
    }

    Ok(Sdp {
      session,
      media,
      ..Default::default()
    })
  }

  fn media_from_content(content: &Content) -> Result<String> {
    let transport = match &content.transport {
      Some(Transport::IceUdp(transport)) => Some(transport),
      _ => None,
    };

    let mut lines: Vec<String> = Vec::new();
    match &content.description {
      Some(Description::Rtp(description)) => {
        let ids: Vec<String> = description
          .payload_types
          .iter()
          .map(|pt| pt.id.to_string())
          .collect();
        lines.push(
          format!("m={} 1 RTP/SAVPF {}", description.media, ids.join(" "))
            .trim_end()
            .to_owned(),
        );
        lines.push("c=IN IP4 0.0.0.0".to_owned());
        lines.push("a=rtcp:1 IN IP4 0.0.0.0".to_owned());
        Sdp::push_transport_lines(&mut lines, transport);
        lines.push(format!(
          "a={}",
          util::senders_to_direction(&content.senders)
        ));
        lines.push(format!("a=mid:{}", content.name.0));
        if description.rtcp_mux {
          lines.push("a=rtcp-mux".to_owned());
        }
        for pt in &description.payload_types {
          if let Some(line) = rtpmap_line(pt) {
            lines.push(line);
          }
          if let Some(line) = fmtp_line(pt) {
            lines.push(line);
          }
          lines.extend(rtcp_fb_lines(pt));
        }
        for hdrext in &description.hdrexts {
          lines.push(extmap_line(hdrext));
        }
        for source in &description.ssrcs {
          lines.extend(ssrc_lines(source));
        }
        for group in &description.ssrc_groups {
          lines.push(ssrc_group_line(group));
        }
      },
      _ => {
        // Datachannel content: no RTP description, SCTP rides the transport.
        let sctp = transport.and_then(|transport| transport.sctp.clone());
        if sctp.is_none() && content.name.0 != "data" {
          bail!("content '{}' has no usable description", content.name.0);
        }
        let sctp = sctp.unwrap_or_else(|| SctpMap::new(5000));
        lines.push(format!("m=application 1 DTLS/SCTP {}", sctp.number));
        lines.push("c=IN IP4 0.0.0.0".to_owned());
        Sdp::push_transport_lines(&mut lines, transport);
        lines.push(format!("a=mid:{}", content.name.0));
        match sctp.streams {
          Some(streams) => lines.push(format!(
            "a=sctpmap:{} {} {}",
            sctp.number, sctp.protocol, streams
          )),
          None => lines.push(format!("a=sctpmap:{} {}", sctp.number, sctp.protocol)),
        }
      },
    }

    let mut block = String::new();
    for line in lines {
      block.push_str(&line);
      block.push_str("\r\n");
    }
    Ok(block)
  }

  fn push_transport_lines(lines: &mut Vec<String>, transport: Option<&IceUdpTransport>) {
    let Some(transport) = transport else {
      return;
    };
    if let Some(ufrag) = &transport.ufrag {
      lines.push(format!("a=ice-ufrag:{}", ufrag));
    }
    if let Some(pwd) = &transport.pwd {
      lines.push(format!("a=ice-pwd:{}", pwd));
    }
    if let Some(fingerprint) = &transport.fingerprint {
      lines.push(format!("a=fingerprint:{} {}", fingerprint.hash, fingerprint.value));
      if let Some(setup) = &fingerprint.setup {
        let setup = match setup {
          jingle_xmpp_parsers::jingle_dtls_srtp::Setup::Active => "active",
          jingle_xmpp_parsers::jingle_dtls_srtp::Setup::Passive => "passive",
          jingle_xmpp_parsers::jingle_dtls_srtp::Setup::Actpass => "actpass",
        };
        lines.push(format!("a=setup:{}", setup));
      }
    }
    for candidate in &transport.candidates {
      lines.push(candidate_to_line(candidate));
    }
  }

  /// Render every media section as a Jingle `<content/>`, with
  /// `creator = our_role` and `name` taken from the `a=mid` line.
  pub fn to_jingle(&self, our_role: Creator) -> Result<Vec<Content>> {
    let mut contents = Vec::with_capacity(self.media.len());
    for index in 0..self.media.len() {
      contents.push(self.content_from_media(index, our_role.clone())?);
    }
    Ok(contents)
  }

  fn content_from_media(&self, index: usize, our_role: Creator) -> Result<Content> {
    let block = &self.media[index];
    let mline = parse_mline(
      Sdp::find_line(block, "m=").context("media section without m= line")?,
    )?;
    let mid = self
      .mid_for_index(index)
      .unwrap_or_else(|| mline.media.clone());

    let mut content = Content::new(our_role, ContentId(mid));
    content.senders = self.direction(block);

    if mline.media == "application" {
      if let Some(transport) = self.transport_to_jingle(index)? {
        content = content.with_transport(transport);
      }
      return Ok(content);
    }

    let mut description = RtpDescription::new(mline.media.clone());
    description.rtcp_mux = Sdp::find_line(block, "a=rtcp-mux").is_some();

    for format in &mline.formats {
      let Ok(id) = format.parse::<u8>() else {
        continue;
      };
      let mut pt = match Sdp::find_line(block, &format!("a=rtpmap:{} ", id)) {
        Some(line) => parse_rtpmap(line)?,
        None => PayloadType {
          channels: Default::default(),
          clockrate: None,
          id,
          maxptime: None,
          name: None,
          ptime: None,
          parameters: Vec::new(),
          rtcp_fbs: Vec::new(),
        },
      };
      if let Some(line) = Sdp::find_line(block, &format!("a=fmtp:{} ", id)) {
        apply_fmtp(&mut pt, line);
      }
      for line in Sdp::find_lines(block, &format!("a=rtcp-fb:{} ", id)) {
        let (_, fb) = parse_rtcp_fb(line)?;
        pt.rtcp_fbs.push(fb);
      }
      description.payload_types.push(pt);
    }

    // Wildcard feedback applies to every payload type.
    for line in Sdp::find_lines(block, "a=rtcp-fb:* ") {
      let (_, fb) = parse_rtcp_fb(line)?;
      for pt in description.payload_types.iter_mut() {
        pt.rtcp_fbs.push(fb.clone());
      }
    }

    for line in Sdp::find_lines(block, "a=extmap:") {
      description.hdrexts.push(parse_extmap(line)?);
    }

    for line in Sdp::find_lines(block, "a=ssrc:") {
      let (id, parameter) = parse_ssrc_line(line)?;
      match description.ssrcs.iter_mut().find(|source| source.id == id) {
        Some(source) => source.parameters.push(parameter),
        None => {
          let mut source = Source::new(id);
          source.parameters.push(parameter);
          description.ssrcs.push(source);
        },
      }
    }
    description.ssrc = description.ssrcs.first().map(|source| source.id.to_string());

    for line in Sdp::find_lines(block, "a=ssrc-group:") {
      description.ssrc_groups.push(parse_ssrc_group_line(line)?);
    }

    content = content.with_description(description);
    if let Some(transport) = self.transport_to_jingle(index)? {
      content = content.with_transport(transport);
    }
    Ok(content)
  }

  fn direction(&self, block: &str) -> Senders {
    // The media section wins over the session-level default.
    for scope in [block, self.session.as_str()] {
      for direction in ["sendrecv", "sendonly", "recvonly", "inactive"] {
        let line = format!("a={}", direction);
        if scope.lines().any(|existing| existing == line) {
          return util::direction_to_senders(direction);
        }
      }
    }
    Senders::Both
  }

  /// Render the transport of a media section, honouring the candidate
  /// filtering policy of this snapshot.
  pub fn transport_to_jingle(&self, index: usize) -> Result<Option<IceUdpTransport>> {
    let Some(block) = self.media.get(index) else {
      return Ok(None);
    };
    let ufrag = Sdp::find_line_with_fallback(block, "a=ice-ufrag:", &self.session)
      .map(|line| line["a=ice-ufrag:".len()..].to_owned());
    let pwd = Sdp::find_line_with_fallback(block, "a=ice-pwd:", &self.session)
      .map(|line| line["a=ice-pwd:".len()..].to_owned());
    if ufrag.is_none() && pwd.is_none() {
      return Ok(None);
    }

    let mut transport = IceUdpTransport {
      ufrag,
      pwd,
      fingerprint: None,
      candidates: Vec::new(),
      sctp: None,
    };

    if let Some(line) = Sdp::find_line_with_fallback(block, "a=fingerprint:", &self.session) {
      if let Some((hash, value)) = parse_fingerprint(line) {
        let mut fingerprint = Fingerprint::required(hash, value);
        if let Some(setup) = Sdp::find_line_with_fallback(block, "a=setup:", &self.session) {
          fingerprint.setup = setup["a=setup:".len()..].parse().ok();
        }
        transport.fingerprint = Some(fingerprint);
      }
    }

    if let Some(line) = Sdp::find_line(block, "a=sctpmap:") {
      let mut tokens = line["a=sctpmap:".len()..].split_whitespace();
      if let (Some(number), Some(protocol)) = (tokens.next(), tokens.next()) {
        transport.sctp = Some(SctpMap {
          number: number.parse().context("invalid sctpmap port")?,
          protocol: protocol.to_owned(),
          streams: tokens.next().map(str::parse).transpose().ok().flatten(),
        });
      }
    }

    for line in Sdp::find_lines(block, "a=candidate:") {
      let mut candidate = candidate_from_line(line)?;
      if self.remove_tcp_candidates
        && (candidate.protocol == "tcp" || candidate.protocol == "ssltcp")
      {
        continue;
      }
      if self.remove_udp_candidates && candidate.protocol == "udp" {
        continue;
      }
      if self.fail_ice {
        candidate.ip = FAIL_ICE_ADDRESS.parse().context("invalid fail address")?;
      }
      transport.candidates.push(candidate);
    }

    Ok(Some(transport))
  }
}

#[cfg(test)]
mod tests {
  use xmpp_parsers::Element;

  use super::*;

  const LOCAL_SDP: &str = "v=0\r\n\
o=- 0 2 IN IP4 0.0.0.0\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE audio video\r\n\
m=audio 1 RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtcp:1 IN IP4 0.0.0.0\r\n\
a=ice-ufrag:local1\r\n\
a=ice-pwd:localpwd1\r\n\
a=fingerprint:sha-256 AA:BB:CC\r\n\
a=setup:active\r\n\
a=sendrecv\r\n\
a=mid:audio\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=fmtp:111 minptime=10\r\n\
a=candidate:1 1 udp 2130706431 10.15.1.120 10000 typ host generation 0\r\n\
a=candidate:2 1 tcp 1010828030 10.15.1.120 443 typ host generation 0\r\n\
a=candidate:3 1 ssltcp 1010828031 10.15.1.120 444 typ host generation 0\r\n\
a=ssrc:555 cname:local\r\n\
m=video 1 RTP/SAVPF 100\r\n\
c=IN IP4 0.0.0.0\r\n\
a=rtcp:1 IN IP4 0.0.0.0\r\n\
a=ice-ufrag:local1\r\n\
a=ice-pwd:localpwd1\r\n\
a=fingerprint:sha-256 AA:BB:CC\r\n\
a=sendrecv\r\n\
a=mid:video\r\n\
a=rtcp-mux\r\n\
a=rtpmap:100 VP8/90000\r\n\
a=rtcp-fb:100 nack pli\r\n\
a=ssrc:556 cname:local\r\n";

  fn offer_jingle() -> Jingle {
    let elem: Element = "<jingle xmlns='urn:xmpp:jingle:1' action='session-initiate' sid='sid1'>
  <content creator='initiator' name='audio' senders='both'>
    <description media='audio' xmlns='urn:xmpp:jingle:apps:rtp:1'>
      <payload-type id='111' name='opus' clockrate='48000' channels='2'/>
      <rtcp-mux/>
      <source ssrc='111' xmlns='urn:xmpp:jingle:apps:rtp:ssma:0'>
        <parameter name='cname' value='mixed'/>
      </source>
    </description>
    <transport ufrag='remote1' pwd='remotepwd1' xmlns='urn:xmpp:jingle:transports:ice-udp:1'>
      <fingerprint hash='sha-256' setup='actpass' required='true' xmlns='urn:xmpp:jingle:apps:dtls:0'>11:22:33</fingerprint>
      <candidate type='host' protocol='udp' id='c1' ip='10.0.0.1' component='1' port='10000' foundation='1' generation='0' priority='2130706431' network='0'/>
    </transport>
  </content>
  <content creator='initiator' name='video' senders='both'>
    <description media='video' xmlns='urn:xmpp:jingle:apps:rtp:1'>
      <payload-type id='100' name='VP8' clockrate='90000'/>
      <rtcp-mux/>
      <source ssrc='222' xmlns='urn:xmpp:jingle:apps:rtp:ssma:0'>
        <parameter name='cname' value='mixed'/>
      </source>
      <source ssrc='223' xmlns='urn:xmpp:jingle:apps:rtp:ssma:0'>
        <parameter name='cname' value='mixed'/>
      </source>
      <ssrc-group semantics='FID' xmlns='urn:xmpp:jingle:apps:rtp:ssma:0'>
        <source ssrc='222'/>
        <source ssrc='223'/>
      </ssrc-group>
    </description>
    <transport ufrag='remote1' pwd='remotepwd1' xmlns='urn:xmpp:jingle:transports:ice-udp:1'>
      <fingerprint hash='sha-256' setup='actpass' required='true' xmlns='urn:xmpp:jingle:apps:dtls:0'>11:22:33</fingerprint>
    </transport>
  </content>
  <group xmlns='urn:xmpp:jingle:apps:grouping:0' semantics='BUNDLE'>
    <content name='audio'/>
    <content name='video'/>
  </group>
</jingle>"
      .parse()
      .unwrap();
    Jingle::try_from(elem).unwrap()
  }

  #[test]
  fn parse_splits_on_mlines() {
    let sdp = Sdp::parse(LOCAL_SDP);
    assert!(sdp.session.starts_with("v=0"));
    assert_eq!(sdp.media.len(), 2);
    assert!(sdp.media[0].starts_with("m=audio"));
    assert!(sdp.media[1].starts_with("m=video"));
    assert_eq!(sdp.raw(), LOCAL_SDP);
  }

  #[test]
  fn find_line_and_contains_ssrc() {
    let sdp = Sdp::parse(LOCAL_SDP);
    assert_eq!(
      Sdp::find_line(&sdp.media[0], "a=mid:"),
      Some("a=mid:audio")
    );
    assert_eq!(
      Sdp::find_line_with_fallback(&sdp.media[0], "a=group:", &sdp.session),
      Some("a=group:BUNDLE audio video")
    );
    assert!(sdp.contains_ssrc(555));
    assert!(sdp.contains_ssrc(556));
    assert!(!sdp.contains_ssrc(999));
    assert_eq!(sdp.media_index_by_mid("video"), Some(1));
    assert_eq!(sdp.ufrag().as_deref(), Some("local1"));
  }

  #[test]
  fn from_jingle_renders_media_sections() {
    let sdp = Sdp::from_jingle(&offer_jingle()).unwrap();
    assert_eq!(sdp.media.len(), 2);
    assert!(Sdp::find_line(&sdp.session, "a=group:BUNDLE audio video").is_some());

    let audio = &sdp.media[0];
    assert!(audio.starts_with("m=audio 1 RTP/SAVPF 111\r\n"));
    assert_eq!(Sdp::find_line(audio, "a=mid:"), Some("a=mid:audio"));
    assert_eq!(
      Sdp::find_line(audio, "a=ice-ufrag:"),
      Some("a=ice-ufrag:remote1")
    );
    assert_eq!(
      Sdp::find_line(audio, "a=fingerprint:"),
      Some("a=fingerprint:sha-256 11:22:33")
    );
    assert_eq!(Sdp::find_line(audio, "a=setup:"), Some("a=setup:actpass"));
    assert_eq!(
      Sdp::find_line(audio, "a=rtpmap:"),
      Some("a=rtpmap:111 opus/48000/2")
    );
    assert_eq!(
      Sdp::find_line(audio, "a=ssrc:"),
      Some("a=ssrc:111 cname:mixed")
    );
    assert!(Sdp::find_line(audio, "a=candidate:").is_some());

    let video = &sdp.media[1];
    assert_eq!(
      Sdp::find_line(video, "a=ssrc-group:"),
      Some("a=ssrc-group:FID 222 223")
    );
    assert!(sdp.contains_ssrc(222));
  }

  #[test]
  fn jingle_round_trip_is_semantically_stable() {
    let offer = offer_jingle();
    let sdp = Sdp::from_jingle(&offer).unwrap();
    let contents = sdp.to_jingle(Creator::Responder).unwrap();
    assert_eq!(contents.len(), offer.contents.len());

    for (content, original) in contents.iter().zip(&offer.contents) {
      assert_eq!(content.name, original.name);
      assert_eq!(content.senders, original.senders);

      let (Some(Description::Rtp(description)), Some(Description::Rtp(original_description))) =
        (&content.description, &original.description)
      else {
        panic!("round trip lost an RTP description");
      };
      assert_eq!(description.media, original_description.media);
      let ids: Vec<u8> = description.payload_types.iter().map(|pt| pt.id).collect();
      let original_ids: Vec<u8> = original_description
        .payload_types
        .iter()
        .map(|pt| pt.id)
        .collect();
      assert_eq!(ids, original_ids);
      let ssrcs: Vec<u32> = description.ssrcs.iter().map(|source| source.id).collect();
      let original_ssrcs: Vec<u32> = original_description
        .ssrcs
        .iter()
        .map(|source| source.id)
        .collect();
      assert_eq!(ssrcs, original_ssrcs);
      assert_eq!(description.ssrc_groups, original_description.ssrc_groups);

      let (Some(Transport::IceUdp(transport)), Some(Transport::IceUdp(original_transport))) =
        (&content.transport, &original.transport)
      else {
        panic!("round trip lost a transport");
      };
      assert_eq!(transport.ufrag, original_transport.ufrag);
      assert_eq!(transport.pwd, original_transport.pwd);
      assert_eq!(
        transport.candidates.len(),
        original_transport.candidates.len()
      );
      let fingerprint = transport.fingerprint.as_ref().unwrap();
      let original_fingerprint = original_transport.fingerprint.as_ref().unwrap();
      assert_eq!(fingerprint.hash, original_fingerprint.hash);
      assert_eq!(fingerprint.value, original_fingerprint.value);
    }
  }

  #[test]
  fn tcp_candidates_are_filtered_on_emission() {
    let mut sdp = Sdp::parse(LOCAL_SDP);
    sdp.remove_tcp_candidates = true;
    let transport = sdp.transport_to_jingle(0).unwrap().unwrap();
    assert_eq!(transport.candidates.len(), 1);
    assert_eq!(transport.candidates[0].protocol, "udp");

    sdp.remove_tcp_candidates = false;
    sdp.remove_udp_candidates = true;
    let transport = sdp.transport_to_jingle(0).unwrap().unwrap();
    assert!(transport
      .candidates
      .iter()
      .all(|candidate| candidate.protocol != "udp"));
  }

  #[test]
  fn fail_ice_rewrites_candidate_addresses() {
    let mut sdp = Sdp::parse(LOCAL_SDP);
    sdp.fail_ice = true;
    let transport = sdp.transport_to_jingle(0).unwrap().unwrap();
    assert!(!transport.candidates.is_empty());
    assert!(transport
      .candidates
      .iter()
      .all(|candidate| candidate.ip.to_string() == "1.1.1.1"));
  }

  #[test]
  fn data_content_renders_sctp() {
    let elem: Element = "<jingle xmlns='urn:xmpp:jingle:1' action='session-initiate' sid='sid1'>
  <content creator='initiator' name='data' senders='both'>
    <transport ufrag='u' pwd='p' xmlns='urn:xmpp:jingle:transports:ice-udp:1'>
      <sctpmap xmlns='urn:xmpp:jingle:transports:dtls-sctp:1' number='5000' protocol='webrtc-datachannel' streams='1024'/>
    </transport>
  </content>
</jingle>"
      .parse()
      .unwrap();
    let jingle = Jingle::try_from(elem).unwrap();
    let sdp = Sdp::from_jingle(&jingle).unwrap();
    assert!(sdp.media[0].starts_with("m=application 1 DTLS/SCTP 5000\r\n"));
    assert!(Sdp::find_line(&sdp.media[0], "a=sctpmap:5000 webrtc-datachannel 1024").is_some());

    let contents = sdp.to_jingle(Creator::Responder).unwrap();
    match &contents[0].transport {
      Some(Transport::IceUdp(transport)) => {
        assert_eq!(transport.sctp.as_ref().unwrap().number, 5000)
      },
      other => panic!("unexpected transport: {:?}", other),
    }
  }
}
