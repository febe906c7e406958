use anyhow::Result;
use async_trait::async_trait;
use xmpp_parsers::Element;

/// The reply to an IQ we sent.
#[derive(Debug, Clone)]
pub enum IqResponse {
  /// A result reply, with its optional payload.
  Result(Option<Element>),

  /// An error reply; the contained element is the `<error/>` child.
  Error(Element),
}

/// The XMPP send path, provided by the enclosing connection.
///
/// Implementations own stanza serialization and reply matching; the session
/// layers its own per-request timeout on top of `send_iq`.
#[async_trait]
pub trait StanzaTransport: Send + Sync {
  /// Send an iq stanza and wait for the matching result or error reply.
  async fn send_iq(&self, iq: Element) -> Result<IqResponse>;

  /// Send a stanza without waiting for a reply (acknowledgements, replies).
  async fn send(&self, stanza: Element) -> Result<()>;
}

/// Inbound stanza routing, implemented by anything that consumes stanzas
/// from the connection.
#[async_trait]
pub trait StanzaFilter {
  /// Whether this filter wants the element.
  fn filter(&self, element: &Element) -> bool;

  /// Consume a previously matched element.
  async fn take(&self, element: Element) -> Result<()>;
}
