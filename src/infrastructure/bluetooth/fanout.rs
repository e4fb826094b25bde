//! One notification source, many subscribers.

use super::NotificationStream;
use futures::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

type Senders = Vec<mpsc::UnboundedSender<Vec<u8>>>;

/// Delivers each value to every live subscriber
///
/// Subscribers whose stream was dropped are pruned on the next publish, so a
/// single platform handler per characteristic serves any number of
/// restarted observations.
#[derive(Clone, Default)]
pub(crate) struct NotifyFanout {
    senders: Arc<Mutex<Senders>>,
}

impl NotifyFanout {
    fn senders(&self) -> MutexGuard<'_, Senders> {
        self.senders.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn subscribe(&self) -> NotificationStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders().push(tx);
        futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|v| (v, rx)) })
            .boxed()
    }

    pub fn publish(&self, value: &[u8]) {
        self.senders().retain(|tx| tx.send(value.to_vec()).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.senders().len()
    }

    /// End every subscriber stream.
    pub fn close(&self) {
        self.senders().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let fanout = NotifyFanout::default();
        let mut first = fanout.subscribe();
        let mut second = fanout.subscribe();

        fanout.publish(&[0x01, 0x02]);
        assert_eq!(first.next().await, Some(vec![0x01, 0x02]));
        assert_eq!(second.next().await, Some(vec![0x01, 0x02]));
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let fanout = NotifyFanout::default();
        for _ in 0..5 {
            drop(fanout.subscribe());
        }
        let mut live = fanout.subscribe();
        assert_eq!(fanout.subscriber_count(), 6);

        fanout.publish(&[0x07]);
        assert_eq!(fanout.subscriber_count(), 1);
        assert_eq!(live.next().await, Some(vec![0x07]));
    }

    #[tokio::test]
    async fn test_close_ends_streams() {
        let fanout = NotifyFanout::default();
        let mut stream = fanout.subscribe();

        fanout.close();
        assert_eq!(stream.next().await, None);
        assert_eq!(fanout.subscriber_count(), 0);
    }
}
