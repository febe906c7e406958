use std::convert::TryFrom;

use xmpp_parsers::{
  iq::IqSetPayload,
  jingle_grouping::Group,
  ns::{JINGLE, JINGLE_GROUPING, JINGLE_ICE_UDP, JINGLE_RTP},
  Element, Error, Jid,
};

pub use xmpp_parsers::jingle::{ContentId, Creator, ReasonElement, Senders, SessionId};

use crate::{jingle_ice_udp::IceUdpTransport, jingle_rtp::RtpDescription};

/// The action attribute, including the Jitsi Meet extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  /// Accept a content-add action received from another party.
  ContentAccept,

  /// Add one or more new content definitions to the session.
  ContentAdd,

  /// Change the directionality of media sending.
  ContentModify,

  /// Reject a content-add action received from another party.
  ContentReject,

  /// Remove one or more content definitions from the session.
  ContentRemove,

  /// Exchange information about parameters for an application type.
  DescriptionInfo,

  /// Exchange information about security preconditions.
  SecurityInfo,

  /// Definitively accept a session negotiation.
  SessionAccept,

  /// Send session-level information, such as a ping or a ringing message.
  SessionInfo,

  /// Request negotiation of a new Jingle session.
  SessionInitiate,

  /// End an existing session.
  SessionTerminate,

  /// Accept a transport-replace action received from another party.
  TransportAccept,

  /// Exchange transport candidates.
  TransportInfo,

  /// Reject a transport-replace action received from another party.
  TransportReject,

  /// Redefine a transport method or replace it with a different method.
  TransportReplace,

  /// Add a source to existing content (Jitsi Meet extension).
  SourceAdd,

  /// Remove a source from existing content (Jitsi Meet extension).
  SourceRemove,
}

impl Action {
  pub fn as_str(&self) -> &'static str {
    match self {
      Action::ContentAccept => "content-accept",
      Action::ContentAdd => "content-add",
      Action::ContentModify => "content-modify",
      Action::ContentReject => "content-reject",
      Action::ContentRemove => "content-remove",
      Action::DescriptionInfo => "description-info",
      Action::SecurityInfo => "security-info",
      Action::SessionAccept => "session-accept",
      Action::SessionInfo => "session-info",
      Action::SessionInitiate => "session-initiate",
      Action::SessionTerminate => "session-terminate",
      Action::TransportAccept => "transport-accept",
      Action::TransportInfo => "transport-info",
      Action::TransportReject => "transport-reject",
      Action::TransportReplace => "transport-replace",
      Action::SourceAdd => "source-add",
      Action::SourceRemove => "source-remove",
    }
  }
}

impl std::str::FromStr for Action {
  type Err = Error;

  fn from_str(s: &str) -> Result<Action, Error> {
    Ok(match s {
      "content-accept" => Action::ContentAccept,
      "content-add" => Action::ContentAdd,
      "content-modify" => Action::ContentModify,
      "content-reject" => Action::ContentReject,
      "content-remove" => Action::ContentRemove,
      "description-info" => Action::DescriptionInfo,
      "security-info" => Action::SecurityInfo,
      "session-accept" => Action::SessionAccept,
      "session-info" => Action::SessionInfo,
      "session-initiate" => Action::SessionInitiate,
      "session-terminate" => Action::SessionTerminate,
      "transport-accept" => Action::TransportAccept,
      "transport-info" => Action::TransportInfo,
      "transport-reject" => Action::TransportReject,
      "transport-replace" => Action::TransportReplace,
      "source-add" => Action::SourceAdd,
      "source-remove" => Action::SourceRemove,
      _ => return Err(Error::ParseError("Unknown jingle action.")),
    })
  }
}

/// The main Jingle container, to be included in an iq stanza.
#[derive(Debug, Clone, PartialEq)]
pub struct Jingle {
  /// The action to execute on both ends.
  pub action: Action,

  /// Who the initiator is.
  pub initiator: Option<Jid>,

  /// Who the responder is.
  pub responder: Option<Jid>,

  /// Unique session identifier between two entities.
  pub sid: SessionId,

  /// A list of contents to be negotiated in this session.
  pub contents: Vec<Content>,

  /// An optional reason.
  pub reason: Option<ReasonElement>,

  /// An optional grouping.
  pub group: Option<Group>,

  /// Payloads not understood at this layer.
  pub other: Vec<Element>,
}

impl IqSetPayload for Jingle {}

impl Jingle {
  /// Create a new Jingle element.
  pub fn new(action: Action, sid: SessionId) -> Jingle {
    Jingle {
      action,
      sid,
      initiator: None,
      responder: None,
      contents: Vec::new(),
      reason: None,
      group: None,
      other: Vec::new(),
    }
  }

  /// Set the initiator's JID.
  pub fn with_initiator(mut self, initiator: Jid) -> Jingle {
    self.initiator = Some(initiator);
    self
  }

  /// Set the responder's JID.
  pub fn with_responder(mut self, responder: Jid) -> Jingle {
    self.responder = Some(responder);
    self
  }

  /// Add a content to this Jingle container.
  pub fn add_content(mut self, content: Content) -> Jingle {
    self.contents.push(content);
    self
  }

  /// Set the reason in this Jingle container.
  pub fn set_reason(mut self, reason: ReasonElement) -> Jingle {
    self.reason = Some(reason);
    self
  }

  /// Set the grouping in this Jingle container.
  pub fn set_group(mut self, group: Group) -> Jingle {
    self.group = Some(group);
    self
  }
}

impl TryFrom<Element> for Jingle {
  type Error = Error;

  fn try_from(root: Element) -> Result<Jingle, Error> {
    if !root.is("jingle", JINGLE) {
      return Err(Error::ParseError("This is not a jingle element."));
    }

    let mut jingle = Jingle {
      action: root
        .attr("action")
        .ok_or(Error::ParseError("Required attribute 'action' missing."))?
        .parse()?,
      initiator: root.attr("initiator").map(str::parse).transpose()?,
      responder: root.attr("responder").map(str::parse).transpose()?,
      sid: root
        .attr("sid")
        .ok_or(Error::ParseError("Required attribute 'sid' missing."))?
        .parse()?,
      contents: Vec::new(),
      reason: None,
      group: None,
      other: Vec::new(),
    };

    for child in root.children().cloned() {
      if child.is("content", JINGLE) {
        jingle.contents.push(Content::try_from(child)?);
      }
      else if child.is("reason", JINGLE) {
        if jingle.reason.is_some() {
          return Err(Error::ParseError(
            "Jingle must not have more than one reason.",
          ));
        }
        jingle.reason = Some(ReasonElement::try_from(child)?);
      }
      else if child.is("group", JINGLE_GROUPING) {
        if jingle.group.is_some() {
          return Err(Error::ParseError(
            "Jingle must not have more than one grouping.",
          ));
        }
        jingle.group = Some(Group::try_from(child)?);
      }
      else {
        jingle.other.push(child);
      }
    }

    Ok(jingle)
  }
}

impl From<Jingle> for Element {
  fn from(jingle: Jingle) -> Element {
    Element::builder("jingle", JINGLE)
      .attr("action", jingle.action.as_str())
      .attr("initiator", jingle.initiator)
      .attr("responder", jingle.responder)
      .attr("sid", jingle.sid)
      .append_all(jingle.contents)
      .append_all(jingle.reason.map(Element::from))
      .append_all(jingle.group.map(Element::from))
      .append_all(jingle.other)
      .build()
  }
}

/// Enum wrapping the supported descriptions of a content.
#[derive(Debug, Clone, PartialEq)]
pub enum Description {
  /// Jingle RTP Sessions (XEP-0167) description.
  Rtp(RtpDescription),

  /// Any description not known at compile-time.
  Unknown(Element),
}

impl TryFrom<Element> for Description {
  type Error = Error;

  fn try_from(elem: Element) -> Result<Description, Error> {
    Ok(if elem.is("description", JINGLE_RTP) {
      Description::Rtp(RtpDescription::try_from(elem)?)
    }
    else {
      Description::Unknown(elem)
    })
  }
}

impl From<RtpDescription> for Description {
  fn from(description: RtpDescription) -> Description {
    Description::Rtp(description)
  }
}

impl From<Description> for Element {
  fn from(description: Description) -> Element {
    match description {
      Description::Rtp(description) => description.into(),
      Description::Unknown(elem) => elem,
    }
  }
}

/// Enum wrapping the supported transports of a content.
#[derive(Debug, Clone, PartialEq)]
pub enum Transport {
  /// Jingle ICE-UDP (XEP-0176) transport.
  IceUdp(IceUdpTransport),

  /// Any transport not known at compile-time.
  Unknown(Element),
}

impl TryFrom<Element> for Transport {
  type Error = Error;

  fn try_from(elem: Element) -> Result<Transport, Error> {
    Ok(if elem.is("transport", JINGLE_ICE_UDP) {
      Transport::IceUdp(IceUdpTransport::try_from(elem)?)
    }
    else {
      Transport::Unknown(elem)
    })
  }
}

impl From<IceUdpTransport> for Transport {
  fn from(transport: IceUdpTransport) -> Transport {
    Transport::IceUdp(transport)
  }
}

impl From<Transport> for Element {
  fn from(transport: Transport) -> Element {
    match transport {
      Transport::IceUdp(transport) => transport.into(),
      Transport::Unknown(elem) => elem,
    }
  }
}

/// Describes a session's content; one session can carry several.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
  /// Who created this content.
  pub creator: Option<Creator>,

  /// A per-session unique identifier for this content.
  pub name: ContentId,

  /// Who can send data for this content.
  pub senders: Senders,

  /// What to send.
  pub description: Option<Description>,

  /// How to send it.
  pub transport: Option<Transport>,
}

impl Content {
  /// Create a new content.
  pub fn new(creator: Creator, name: ContentId) -> Content {
    Content {
      creator: Some(creator),
      name,
      senders: Senders::Both,
      description: None,
      transport: None,
    }
  }

  /// Specify who can send data for this content.
  pub fn with_senders(mut self, senders: Senders) -> Content {
    self.senders = senders;
    self
  }

  /// Set the description of this content.
  pub fn with_description<D: Into<Description>>(mut self, description: D) -> Content {
    self.description = Some(description.into());
    self
  }

  /// Set the transport of this content.
  pub fn with_transport<T: Into<Transport>>(mut self, transport: T) -> Content {
    self.transport = Some(transport.into());
    self
  }
}

impl TryFrom<Element> for Content {
  type Error = Error;

  fn try_from(root: Element) -> Result<Content, Error> {
    if !root.is("content", JINGLE) {
      return Err(Error::ParseError("This is not a content element."));
    }
    let mut content = Content {
      creator: root.attr("creator").map(str::parse).transpose()?,
      name: root
        .attr("name")
        .ok_or(Error::ParseError("Required attribute 'name' missing."))?
        .parse()?,
      senders: root
        .attr("senders")
        .map(str::parse)
        .transpose()?
        .unwrap_or(Senders::Both),
      description: None,
      transport: None,
    };
    for child in root.children().cloned() {
      if child.name() == "description" {
        content.description = Some(Description::try_from(child)?);
      }
      else if child.name() == "transport" {
        content.transport = Some(Transport::try_from(child)?);
      }
    }
    Ok(content)
  }
}

impl From<Content> for Element {
  fn from(content: Content) -> Element {
    Element::builder("content", JINGLE)
      .attr("creator", content.creator)
      .attr("name", content.name)
      .attr("senders", content.senders)
      .append_all(content.description.map(Element::from))
      .append_all(content.transport.map(Element::from))
      .build()
  }
}
