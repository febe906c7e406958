use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

/// The signalling layer: tracks which conference participant owns each ssrc
/// announced on the wire.
///
/// Attached to the enclosing room for the lifetime of the session; detaching
/// clears the table.
#[derive(Debug, Default)]
pub struct SignalingLayer {
  ssrc_owners: Mutex<HashMap<u32, String>>,
  attached: Mutex<bool>,
}

impl SignalingLayer {
  pub fn new() -> SignalingLayer {
    Default::default()
  }

  pub async fn attach(&self) {
    *self.attached.lock().await = true;
  }

  /// Detach from the room and forget all ownership information.
  pub async fn detach(&self) {
    *self.attached.lock().await = false;
    self.ssrc_owners.lock().await.clear();
  }

  pub async fn is_attached(&self) -> bool {
    *self.attached.lock().await
  }

  /// Record the owner of a ssrc. Later writes overwrite.
  pub async fn set_ssrc_owner(&self, ssrc: u32, owner: &str) {
    debug!("ssrc {} owned by {}", ssrc, owner);
    self
      .ssrc_owners
      .lock()
      .await
      .insert(ssrc, owner.to_owned());
  }

  pub async fn get_ssrc_owner(&self, ssrc: u32) -> Option<String> {
    self.ssrc_owners.lock().await.get(&ssrc).cloned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn owner_overwrites_and_clears() {
    let signaling = SignalingLayer::new();
    signaling.attach().await;
    signaling.set_ssrc_owner(111, "room@conference/alice").await;
    signaling.set_ssrc_owner(111, "room@conference/bob").await;
    assert_eq!(
      signaling.get_ssrc_owner(111).await.as_deref(),
      Some("room@conference/bob")
    );
    signaling.detach().await;
    assert!(!signaling.is_attached().await);
    assert_eq!(signaling.get_ssrc_owner(111).await, None);
  }
}
