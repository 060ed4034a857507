use carecrew_bridge::alert::AlertPayload;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Creates a dispatcher and the queue an [`crate::overlay::OverlayHost`]
/// consumes it from.
pub fn channel() -> (AlertDispatcher, OverlayQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (AlertDispatcher { tx }, OverlayQueue { rx })
}

/// Call-and-forget entry point for showing alerts from any context.
///
/// Dispatching never waits on rendering: the payload is queued and the host
/// mounts it on its next turn.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    tx: UnboundedSender<AlertPayload>,
}

impl AlertDispatcher {
    pub fn dispatch(&self, payload: AlertPayload) {
        if let Err(error) = self.tx.send(payload) {
            log::warn!("Overlay host stopped, dropping alert {:?}", error.0.title);
        }
    }
}

/// Receiving end of an [`AlertDispatcher`].
#[derive(Debug)]
pub struct OverlayQueue {
    rx: UnboundedReceiver<AlertPayload>,
}

impl OverlayQueue {
    pub async fn recv(&mut self) -> Option<AlertPayload> {
        self.rx.recv().await
    }
}
