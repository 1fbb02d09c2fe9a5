//! services/scribe/src/adapters/notifier.rs

use scribe_core::{Notification, NotificationLevel, Notifier};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Writes notices to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Success => info!("Notice: {}", notification.message),
            NotificationLevel::Error => warn!("Notice: {}", notification.message),
        }
    }
}

/// Logs each notice and forwards it to one panel connection.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::UnboundedSender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        LogNotifier.notify(notification.clone());
        // A closed panel just misses the notice.
        let _ = self.tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_in_order_and_ignores_closed_receivers() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        notifier.notify(Notification::success("Successfully saved"));
        notifier.notify(Notification::error("boom"));

        assert_eq!(rx.try_recv().unwrap().message, "Successfully saved");
        assert_eq!(rx.try_recv().unwrap().level, NotificationLevel::Error);

        drop(rx);
        notifier.notify(Notification::success("nobody listens"));
    }
}
