use tokio::sync::mpsc;

use crate::domain::ports::{DispatchEvent, DispatchObserver};

/// Forwards dispatch events into an unbounded tokio channel.
///
/// Sending never blocks the dispatcher. Events are dropped once the
/// receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<DispatchEvent>) -> Self {
        Self { tx }
    }

    /// Observer plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl DispatchObserver for ChannelObserver {
    fn on_dispatch(&self, event: &DispatchEvent) {
        if self.tx.send(event.clone()).is_err() {
            tracing::trace!(process_id = %event.process_id, "dispatch event dropped, receiver closed");
        }
    }
}
