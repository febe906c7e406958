use std::convert::TryFrom;

use xmpp_parsers::{ns::JINGLE_SSMA, Element, Error};

use crate::ns::JITSI_MEET;

/// Source element for the ssrc SDP attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
  /// The 32-bit synchronization source identifier.
  pub id: u32,

  /// List of attributes for this source.
  pub parameters: Vec<Parameter>,

  /// Jitsi Meet ownership tag for this source.
  pub info: Option<SsrcInfo>,
}

impl Source {
  /// Create a new SSMA source element.
  pub fn new(id: u32) -> Source {
    Source {
      id,
      parameters: Vec::new(),
      info: None,
    }
  }

  /// Add a parameter to this source.
  pub fn add_parameter(mut self, name: &str, value: Option<&str>) -> Source {
    self.parameters.push(Parameter {
      name: name.to_owned(),
      value: value.map(str::to_owned),
    });
    self
  }
}

impl TryFrom<Element> for Source {
  type Error = Error;

  fn try_from(root: Element) -> Result<Source, Error> {
    if !root.is("source", JINGLE_SSMA) {
      return Err(Error::ParseError("This is not a source element."));
    }
    let mut source = Source {
      id: root
        .attr("ssrc")
        .ok_or(Error::ParseError("Required attribute 'ssrc' missing."))?
        .parse()?,
      parameters: Vec::new(),
      info: None,
    };
    for child in root.children().cloned() {
      // Match parameters by name regardless of namespace; Jicofo produces
      // them with the wrong one.
      // https://github.com/jitsi/jitsi-xmpp-extensions/issues/81
      if child.name() == "parameter" {
        source.parameters.push(Parameter::try_from(child)?);
      }
      else if child.is("ssrc-info", JITSI_MEET) {
        source.info = Some(SsrcInfo::try_from(child)?);
      }
    }
    Ok(source)
  }
}

impl From<Source> for Element {
  fn from(source: Source) -> Element {
    Element::builder("source", JINGLE_SSMA)
      .attr("ssrc", source.id.to_string())
      .append_all(source.parameters)
      .append_all(source.info.map(Element::from))
      .build()
  }
}

/// Parameter associated with a ssrc.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
  /// The parameter name, e.g. `cname` or `msid`.
  pub name: String,

  /// The parameter value, absent for flag parameters.
  pub value: Option<String>,
}

impl TryFrom<Element> for Parameter {
  type Error = Error;

  fn try_from(root: Element) -> Result<Parameter, Error> {
    if root.name() != "parameter" {
      return Err(Error::ParseError("This is not a parameter element."));
    }
    Ok(Parameter {
      name: root
        .attr("name")
        .ok_or(Error::ParseError("Required attribute 'name' missing."))?
        .to_owned(),
      value: root.attr("value").map(str::to_owned),
    })
  }
}

impl From<Parameter> for Element {
  fn from(parameter: Parameter) -> Element {
    Element::builder("parameter", JINGLE_SSMA)
      .attr("name", parameter.name)
      .attr("value", parameter.value)
      .build()
  }
}

/// ssrc-info associated with a ssrc.
#[derive(Debug, Clone, PartialEq)]
pub struct SsrcInfo {
  /// The MUC occupant owning the ssrc.
  pub owner: String,
}

impl TryFrom<Element> for SsrcInfo {
  type Error = Error;

  fn try_from(root: Element) -> Result<SsrcInfo, Error> {
    if !root.is("ssrc-info", JITSI_MEET) {
      return Err(Error::ParseError("This is not a ssrc-info element."));
    }
    Ok(SsrcInfo {
      owner: root
        .attr("owner")
        .ok_or(Error::ParseError("Required attribute 'owner' missing."))?
        .to_owned(),
    })
  }
}

impl From<SsrcInfo> for Element {
  fn from(info: SsrcInfo) -> Element {
    Element::builder("ssrc-info", JITSI_MEET)
      .attr("owner", info.owner)
      .build()
  }
}

/// Element grouping multiple ssrc.
#[derive(Debug, Clone, PartialEq)]
pub struct SsrcGroup {
  /// The semantics of this group.
  pub semantics: Semantics,

  /// The ssrcs concerned by this group.
  pub sources: Vec<u32>,
}

impl SsrcGroup {
  /// Create a new ssrc-group element.
  pub fn new(semantics: Semantics, sources: Vec<u32>) -> SsrcGroup {
    SsrcGroup { semantics, sources }
  }
}

impl TryFrom<Element> for SsrcGroup {
  type Error = Error;

  fn try_from(root: Element) -> Result<SsrcGroup, Error> {
    if !root.is("ssrc-group", JINGLE_SSMA) {
      return Err(Error::ParseError("This is not a ssrc-group element."));
    }
    let mut group = SsrcGroup {
      semantics: root
        .attr("semantics")
        .ok_or(Error::ParseError("Required attribute 'semantics' missing."))?
        .parse()?,
      sources: Vec::new(),
    };
    for child in root.children() {
      if child.is("source", JINGLE_SSMA) {
        group.sources.push(
          child
            .attr("ssrc")
            .ok_or(Error::ParseError("Required attribute 'ssrc' missing."))?
            .parse()?,
        );
      }
    }
    Ok(group)
  }
}

impl From<SsrcGroup> for Element {
  fn from(group: SsrcGroup) -> Element {
    Element::builder("ssrc-group", JINGLE_SSMA)
      .attr("semantics", group.semantics.as_str())
      .append_all(group.sources.into_iter().map(|ssrc| {
        Element::builder("source", JINGLE_SSMA)
          .attr("ssrc", ssrc.to_string())
          .build()
      }))
      .build()
  }
}

/// From RFC5888, the list of allowed group semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
  /// Lip Synchronization, defined in RFC5888.
  Ls,

  /// Flow Identification, defined in RFC5888.
  Fid,

  /// Single Reservation Flow, defined in RFC3524.
  Srf,

  /// Alternative Network Address Types, defined in RFC4091.
  Anat,

  /// Forward Error Correction, defined in RFC4756.
  Fec,

  /// Decoding Dependency, defined in RFC5583.
  Ddp,

  /// Simulcast.
  Sim,
}

impl Semantics {
  pub fn as_str(&self) -> &'static str {
    match self {
      Semantics::Ls => "LS",
      Semantics::Fid => "FID",
      Semantics::Srf => "SRF",
      Semantics::Anat => "ANAT",
      Semantics::Fec => "FEC",
      Semantics::Ddp => "DDP",
      Semantics::Sim => "SIM",
    }
  }
}

impl std::str::FromStr for Semantics {
  type Err = Error;

  fn from_str(s: &str) -> Result<Semantics, Error> {
    Ok(match s {
      "LS" => Semantics::Ls,
      "FID" => Semantics::Fid,
      "SRF" => Semantics::Srf,
      "ANAT" => Semantics::Anat,
      "FEC" => Semantics::Fec,
      "DDP" => Semantics::Ddp,
      "SIM" => Semantics::Sim,
      _ => return Err(Error::ParseError("Unknown group semantics.")),
    })
  }
}
