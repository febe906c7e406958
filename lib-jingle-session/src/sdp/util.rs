//! Line-level translation between SDP attributes and Jingle elements.

use anyhow::{anyhow, Context, Result};
use jingle_xmpp_parsers::{Candidate, CandidateType, Parameter, Semantics, Source, SsrcGroup};
use xmpp_parsers::{
  jingle::Senders,
  jingle_rtcp_fb::RtcpFb,
  jingle_rtp::{Channels, Parameter as PtParameter, PayloadType},
  jingle_rtp_hdrext::RtpHdrext,
};

use crate::util::generate_id;

/// A parsed `m=` line.
pub(crate) struct MLine {
  pub media: String,
  pub port: String,
  pub protocol: String,
  pub formats: Vec<String>,
}

pub(crate) fn parse_mline(line: &str) -> Result<MLine> {
  let rest = line
    .strip_prefix("m=")
    .ok_or_else(|| anyhow!("not an m= line: {}", line))?;
  let mut tokens = rest.split_whitespace();
  let media = tokens.next().context("m= line without media")?.to_owned();
  let port = tokens.next().context("m= line without port")?.to_owned();
  let protocol = tokens.next().context("m= line without protocol")?.to_owned();
  Ok(MLine {
    media,
    port,
    protocol,
    formats: tokens.map(str::to_owned).collect(),
  })
}

/// Parse `a=rtpmap:111 opus/48000/2` into a payload type.
pub(crate) fn parse_rtpmap(line: &str) -> Result<PayloadType> {
  let rest = line
    .strip_prefix("a=rtpmap:")
    .ok_or_else(|| anyhow!("not an rtpmap line: {}", line))?;
  let (id, codec) = rest.split_once(' ').context("malformed rtpmap line")?;
  let mut parts = codec.split('/');
  let name = parts.next().context("rtpmap line without codec name")?;
  let clockrate = parts
    .next()
    .map(str::parse::<u32>)
    .transpose()
    .context("invalid clockrate")?;
  let channels = parts
    .next()
    .map(str::parse::<u8>)
    .transpose()
    .context("invalid channel count")?
    .unwrap_or(1);
  Ok(PayloadType {
    channels: Channels(channels),
    clockrate,
    id: id.parse().context("invalid payload id")?,
    maxptime: None,
    name: Some(name.to_owned()),
    ptime: None,
    parameters: Vec::new(),
    rtcp_fbs: Vec::new(),
  })
}

pub(crate) fn rtpmap_line(pt: &PayloadType) -> Option<String> {
  let name = pt.name.as_ref()?;
  let clockrate = pt.clockrate?;
  let mut line = format!("a=rtpmap:{} {}/{}", pt.id, name, clockrate);
  if pt.channels.0 > 1 {
    line.push_str(&format!("/{}", pt.channels.0));
  }
  Some(line)
}

/// Apply `a=fmtp:111 minptime=10;useinbandfec=1` to a payload type.
pub(crate) fn apply_fmtp(pt: &mut PayloadType, line: &str) {
  let Some(rest) = line.strip_prefix(&format!("a=fmtp:{} ", pt.id)) else {
    return;
  };
  for part in rest.split(';') {
    let part = part.trim();
    if part.is_empty() {
      continue;
    }
    match part.split_once('=') {
      Some((name, value)) => pt.parameters.push(PtParameter {
        name: name.to_owned(),
        value: value.to_owned(),
      }),
      // Bare tokens like DTMF event ranges keep the whole token as value.
      None => pt.parameters.push(PtParameter {
        name: String::new(),
        value: part.to_owned(),
      }),
    }
  }
}

pub(crate) fn fmtp_line(pt: &PayloadType) -> Option<String> {
  if pt.parameters.is_empty() {
    return None;
  }
  let params: Vec<String> = pt
    .parameters
    .iter()
    .map(|p| {
      if p.name.is_empty() {
        p.value.clone()
      }
      else {
        format!("{}={}", p.name, p.value)
      }
    })
    .collect();
  Some(format!("a=fmtp:{} {}", pt.id, params.join(";")))
}

/// Parse `a=rtcp-fb:111 nack pli` into the payload id and the feedback entry.
pub(crate) fn parse_rtcp_fb(line: &str) -> Result<(String, RtcpFb)> {
  let rest = line
    .strip_prefix("a=rtcp-fb:")
    .ok_or_else(|| anyhow!("not an rtcp-fb line: {}", line))?;
  let (id, feedback) = rest.split_once(' ').context("malformed rtcp-fb line")?;
  let mut tokens = feedback.split_whitespace();
  let type_ = tokens.next().context("rtcp-fb line without type")?.to_owned();
  let subtype = tokens.next().map(str::to_owned);
  Ok((id.to_owned(), RtcpFb { type_, subtype }))
}

pub(crate) fn rtcp_fb_lines(pt: &PayloadType) -> Vec<String> {
  pt.rtcp_fbs
    .iter()
    .map(|fb| match &fb.subtype {
      Some(subtype) => format!("a=rtcp-fb:{} {} {}", pt.id, fb.type_, subtype),
      None => format!("a=rtcp-fb:{} {}", pt.id, fb.type_),
    })
    .collect()
}

/// Parse `a=extmap:5 http://example.com/ext` into a header extension.
pub(crate) fn parse_extmap(line: &str) -> Result<RtpHdrext> {
  let rest = line
    .strip_prefix("a=extmap:")
    .ok_or_else(|| anyhow!("not an extmap line: {}", line))?;
  let (id, uri) = rest.split_once(' ').context("malformed extmap line")?;
  // The id may carry a direction suffix, e.g. `2/recvonly`.
  let id = id.split('/').next().unwrap_or(id);
  Ok(RtpHdrext::new(
    id.parse().context("invalid extmap id")?,
    uri.to_owned(),
  ))
}

pub(crate) fn extmap_line(hdrext: &RtpHdrext) -> String {
  format!("a=extmap:{} {}", hdrext.id, hdrext.uri)
}

/// Render one `a=ssrc:` line per parameter of the source.
pub(crate) fn ssrc_lines(source: &Source) -> Vec<String> {
  source
    .parameters
    .iter()
    .map(|parameter| match &parameter.value {
      Some(value) => format!("a=ssrc:{} {}:{}", source.id, parameter.name, value),
      None => format!("a=ssrc:{} {}", source.id, parameter.name),
    })
    .collect()
}

/// Parse `a=ssrc:1234 cname:something` into the ssrc and its parameter.
pub(crate) fn parse_ssrc_line(line: &str) -> Result<(u32, Parameter)> {
  let rest = line
    .strip_prefix("a=ssrc:")
    .ok_or_else(|| anyhow!("not a ssrc line: {}", line))?;
  let (id, attribute) = rest.split_once(' ').context("malformed ssrc line")?;
  let parameter = match attribute.split_once(':') {
    Some((name, value)) => Parameter {
      name: name.to_owned(),
      value: Some(value.to_owned()),
    },
    None => Parameter {
      name: attribute.to_owned(),
      value: None,
    },
  };
  Ok((id.parse().context("invalid ssrc")?, parameter))
}

pub(crate) fn ssrc_group_line(group: &SsrcGroup) -> String {
  let ids: Vec<String> = group.sources.iter().map(u32::to_string).collect();
  format!("a=ssrc-group:{} {}", group.semantics.as_str(), ids.join(" "))
}

pub(crate) fn parse_ssrc_group_line(line: &str) -> Result<SsrcGroup> {
  let rest = line
    .strip_prefix("a=ssrc-group:")
    .ok_or_else(|| anyhow!("not a ssrc-group line: {}", line))?;
  let mut tokens = rest.split_whitespace();
  let semantics: Semantics = tokens
    .next()
    .context("ssrc-group line without semantics")?
    .parse()
    .map_err(|e| anyhow!("invalid group semantics: {:?}", e))?;
  let sources = tokens
    .map(|token| token.parse::<u32>().context("invalid ssrc in group"))
    .collect::<Result<Vec<u32>>>()?;
  Ok(SsrcGroup::new(semantics, sources))
}

/// The protocol token of a candidate line, lowercased.
pub(crate) fn candidate_protocol(line: &str) -> Option<String> {
  let line = line.trim();
  let rest = line.strip_prefix("a=").unwrap_or(line);
  let rest = rest.strip_prefix("candidate:")?;
  rest
    .split_whitespace()
    .nth(2)
    .map(|protocol| protocol.to_lowercase())
}

/// Parse a candidate line (with or without the leading `a=`) into a
/// Jingle candidate element.
pub(crate) fn candidate_from_line(line: &str) -> Result<Candidate> {
  let line = line.trim();
  let rest = line.strip_prefix("a=").unwrap_or(line);
  let rest = rest
    .strip_prefix("candidate:")
    .ok_or_else(|| anyhow!("not a candidate line: {}", line))?;
  let mut tokens = rest.split_whitespace();

  let foundation = tokens.next().context("candidate without foundation")?;
  let component = tokens.next().context("candidate without component")?;
  let protocol = tokens.next().context("candidate without protocol")?;
  let priority = tokens.next().context("candidate without priority")?;
  let ip = tokens.next().context("candidate without address")?;
  let port = tokens.next().context("candidate without port")?;
  if tokens.next() != Some("typ") {
    return Err(anyhow!("malformed candidate line: {}", line));
  }
  let type_ = tokens.next().context("candidate without type")?;

  let mut candidate = Candidate {
    component: component.parse().context("invalid component")?,
    foundation: foundation.to_owned(),
    generation: 0,
    id: generate_id(),
    ip: ip.parse().context("invalid candidate address")?,
    network: None,
    port: port.parse().context("invalid candidate port")?,
    priority: priority.parse().context("invalid candidate priority")?,
    protocol: protocol.to_lowercase(),
    rel_addr: None,
    rel_port: None,
    type_: type_
      .parse()
      .map_err(|e| anyhow!("invalid candidate type: {:?}", e))?,
  };

  while let Some(key) = tokens.next() {
    let value = tokens.next();
    match (key, value) {
      ("raddr", Some(addr)) => {
        candidate.rel_addr = Some(addr.parse().context("invalid raddr")?)
      },
      ("rport", Some(port)) => {
        candidate.rel_port = Some(port.parse().context("invalid rport")?)
      },
      ("generation", Some(generation)) => {
        candidate.generation = generation.parse().context("invalid generation")?
      },
      ("network-id", Some(network)) => candidate.network = network.parse().ok(),
      // tcptype, network-cost and future extensions are dropped.
      _ => {},
    }
  }

  Ok(candidate)
}

fn candidate_type_str(type_: &CandidateType) -> &'static str {
  match type_ {
    CandidateType::Host => "host",
    CandidateType::Prflx => "prflx",
    CandidateType::Relay => "relay",
    CandidateType::Srflx => "srflx",
  }
}

pub(crate) fn candidate_to_line(candidate: &Candidate) -> String {
  let mut line = format!(
    "a=candidate:{} {} {} {} {} {} typ {}",
    candidate.foundation,
    candidate.component,
    candidate.protocol,
    candidate.priority,
    candidate.ip,
    candidate.port,
    candidate_type_str(&candidate.type_),
  );
  if let (Some(addr), Some(port)) = (&candidate.rel_addr, &candidate.rel_port) {
    line.push_str(&format!(" raddr {} rport {}", addr, port));
  }
  line.push_str(&format!(" generation {}", candidate.generation));
  line
}

pub(crate) fn direction_to_senders(direction: &str) -> Senders {
  match direction {
    "sendonly" => Senders::Initiator,
    "recvonly" => Senders::Responder,
    "inactive" => Senders::None,
    _ => Senders::Both,
  }
}

pub(crate) fn senders_to_direction(senders: &Senders) -> &'static str {
  match senders {
    Senders::Initiator => "sendonly",
    Senders::Responder => "recvonly",
    Senders::None => "inactive",
    Senders::Both => "sendrecv",
  }
}

/// Split `a=fingerprint:sha-256 AB:CD:…` into hash algorithm and value.
pub(crate) fn parse_fingerprint(line: &str) -> Option<(&str, &str)> {
  line.strip_prefix("a=fingerprint:")?.split_once(' ')
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rtpmap_round_trip() {
    let pt = parse_rtpmap("a=rtpmap:111 opus/48000/2").unwrap();
    assert_eq!(pt.id, 111);
    assert_eq!(pt.name.as_deref(), Some("opus"));
    assert_eq!(pt.clockrate, Some(48000));
    assert_eq!(pt.channels.0, 2);
    assert_eq!(rtpmap_line(&pt).unwrap(), "a=rtpmap:111 opus/48000/2");

    let video = parse_rtpmap("a=rtpmap:100 VP8/90000").unwrap();
    assert_eq!(video.channels.0, 1);
    assert_eq!(rtpmap_line(&video).unwrap(), "a=rtpmap:100 VP8/90000");
  }

  #[test]
  fn fmtp_round_trip() {
    let mut pt = parse_rtpmap("a=rtpmap:111 opus/48000/2").unwrap();
    apply_fmtp(&mut pt, "a=fmtp:111 minptime=10;useinbandfec=1");
    assert_eq!(pt.parameters.len(), 2);
    assert_eq!(
      fmtp_line(&pt).unwrap(),
      "a=fmtp:111 minptime=10;useinbandfec=1"
    );
  }

  #[test]
  fn ssrc_line_round_trip() {
    let (id, parameter) = parse_ssrc_line("a=ssrc:1234 msid:stream track").unwrap();
    assert_eq!(id, 1234);
    assert_eq!(parameter.name, "msid");
    assert_eq!(parameter.value.as_deref(), Some("stream track"));

    let (_, flag) = parse_ssrc_line("a=ssrc:1234 somename").unwrap();
    assert_eq!(flag.name, "somename");
    assert_eq!(flag.value, None);
  }

  #[test]
  fn ssrc_group_round_trip() {
    let group = parse_ssrc_group_line("a=ssrc-group:FID 222 223").unwrap();
    assert_eq!(group.semantics, Semantics::Fid);
    assert_eq!(group.sources, vec![222, 223]);
    assert_eq!(ssrc_group_line(&group), "a=ssrc-group:FID 222 223");
  }

  #[test]
  fn candidate_round_trip() {
    let line = "a=candidate:1 1 udp 2130706431 10.15.1.120 10000 typ host generation 0";
    let candidate = candidate_from_line(line).unwrap();
    assert_eq!(candidate.protocol, "udp");
    assert_eq!(candidate.port, 10000);
    assert_eq!(candidate_to_line(&candidate), line);
  }

  #[test]
  fn candidate_with_related_address() {
    let line =
      "candidate:3 1 udp 1677724415 3.120.176.51 10000 typ srflx raddr 10.15.1.120 rport 9 generation 0";
    let candidate = candidate_from_line(line).unwrap();
    assert_eq!(candidate.rel_addr, Some("10.15.1.120".parse().unwrap()));
    assert_eq!(candidate.rel_port, Some(9));
    assert_eq!(candidate_protocol(line).as_deref(), Some("udp"));
  }

  #[test]
  fn ssltcp_protocol_is_detected() {
    let line = "a=candidate:2 1 ssltcp 1 10.0.0.1 443 typ host generation 0";
    assert_eq!(candidate_protocol(line).as_deref(), Some("ssltcp"));
  }
}
