use relay_common::api::daemon::NotifyEvent;
use tokio::sync::broadcast;

/// Sink for the monitor's lifecycle events. Kept as a trait so tests can
/// swap in a recording implementation instead of standing up a broadcast
/// channel.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: NotifyEvent);
}

/// Default emitter backed by a `tokio::sync::broadcast` channel, the same
/// fan-out primitive the rest of the corpus uses to push events out to
/// however many subscribers (RPC clients, logging, metrics) are listening.
pub struct BroadcastEventEmitter {
    sender: broadcast::Sender<NotifyEvent>,
}

impl BroadcastEventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotifyEvent> {
        self.sender.subscribe()
    }
}

impl EventEmitter for BroadcastEventEmitter {
    fn emit(&self, event: NotifyEvent) {
        // No receivers is the common case between discovery passes; the
        // send error just means nobody is listening right now.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let emitter = BroadcastEventEmitter::new(8);
        let mut rx = emitter.subscribe();
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        emitter.emit(NotifyEvent::PeerConnected { ip });
        let received = rx.recv().await.unwrap();
        assert_eq!(received, NotifyEvent::PeerConnected { ip });
    }
}
