//! Stop-wait plumbing.
//!
//! A stop request registers a waiter *before* sending the abort command,
//! then waits (bounded) for any scan-complete notification. The raw
//! notification delivery path resolves waiters without touching the session
//! lock -- the lock is held by the stopping task for the whole handshake --
//! and only then queues up behind the lock to reconcile state.

use std::sync::Mutex;

use tokio::sync::oneshot;

/// Registry of tasks waiting for a scan-complete notification.
#[derive(Debug, Default)]
pub(crate) struct ScanDoneWaiters {
    senders: Mutex<Vec<oneshot::Sender<()>>>,
}

impl ScanDoneWaiters {
    /// Registers a waiter resolved by the next scan-complete notification.
    pub(crate) fn register(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.senders
            .lock()
            .expect("scan waiter registry poisoned")
            .push(tx);
        rx
    }

    /// Resolves every registered waiter. Waiters that already gave up
    /// (abort-send failure, timeout) are skipped silently.
    pub(crate) fn notify_all(&self) {
        let senders = std::mem::take(
            &mut *self
                .senders
                .lock()
                .expect("scan waiter registry poisoned"),
        );
        for sender in senders {
            let _ = sender.send(());
        }
    }
}
