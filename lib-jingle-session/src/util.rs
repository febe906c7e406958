use uuid::Uuid;
use xmpp_parsers::Element;

pub(crate) fn generate_id() -> String {
  Uuid::new_v4().to_string()
}

/// Serialize a stanza for logging and error records. Best-effort; an
/// unserializable element yields an empty string.
pub(crate) fn element_to_string(element: &Element) -> String {
  let mut bytes = Vec::new();
  if element.write_to(&mut bytes).is_err() {
    return String::new();
  }
  String::from_utf8(bytes).unwrap_or_default()
}
