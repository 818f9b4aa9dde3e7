//! Quiet-period debouncing of edit events.
//!
//! Each call to [`Debouncer::schedule`] replaces the pending timer. When a
//! timer survives its whole quiet interval it sends a [`Settled`] on the
//! channel handed to [`Debouncer::new`]. A `Settled` may already be queued
//! when a newer edit arrives, so receivers check [`Debouncer::is_current`]
//! before acting on it.

use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

const LOG_TARGET: &str = "debounce";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settled<T> {
    pub ticket: Ticket,
    pub value: T,
}

pub struct Debouncer<T> {
    quiet: Duration,
    tx: UnboundedSender<Settled<T>>,
    pending: Option<JoinHandle<()>>,
    sequence: u64,
}

impl<T> Debouncer<T>
where
    T: Send + 'static,
{
    pub fn new(quiet: Duration, tx: UnboundedSender<Settled<T>>) -> Self {
        Self {
            quiet,
            tx,
            pending: None,
            sequence: 0,
        }
    }

    pub fn schedule(&mut self, value: T) -> Ticket {
        self.abort_timer();
        self.sequence += 1;
        let ticket = Ticket(self.sequence);
        let quiet = self.quiet;
        let tx = self.tx.clone();
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if tx.send(Settled { ticket, value }).is_err() {
                tracing::debug!(target: LOG_TARGET, ticket = ticket.0, "receiver gone, dropping settle");
            }
        }));
        ticket
    }

    pub fn cancel_pending(&mut self) {
        self.abort_timer();
        // Invalidates a Settled that fired but has not been received yet.
        self.sequence += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.sequence
    }

    pub fn has_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn abort_timer(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const QUIET: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(QUIET, tx);
        let ticket = debouncer.schedule("a".to_string());

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        let settled = rx.try_recv().expect("settled");
        assert_eq!(settled.ticket, ticket);
        assert_eq!(settled.value, "a");
        assert!(debouncer.is_current(settled.ticket));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_edits_settles_only_the_last() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(QUIET, tx);

        for text in ["p", "pr", "pri", "print('hi')"] {
            debouncer.schedule(text.to_string());
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        tokio::time::sleep(QUIET * 3).await;

        let settled = rx.try_recv().expect("one settle");
        assert_eq!(settled.value, "print('hi')");
        assert!(debouncer.is_current(settled.ticket));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(QUIET, tx);
        debouncer.schedule(1u32);
        assert!(debouncer.has_pending());
        debouncer.cancel_pending();

        tokio::time::sleep(QUIET * 2).await;
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_marks_already_queued_settle_stale() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(QUIET, tx);
        debouncer.schedule(7u32);
        tokio::time::sleep(QUIET * 2).await;

        // Timer already fired; the message sits in the channel.
        debouncer.cancel_pending();
        let settled = rx.try_recv().expect("queued");
        assert!(!debouncer.is_current(settled.ticket));
    }
}
