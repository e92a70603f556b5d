//! Delivery on a worker thread behind a bounded queue.
//!
//! Dedup decisions stay with the caller: by the time an alert reaches the
//! queue it has already been registered as emitted. A single worker drains
//! the queue in FIFO order, so per-subject delivery order is preserved.
//! When the queue is full, `notify` blocks until the worker catches up.
//!
//! Delivery errors on the worker cannot be returned to the caller; they are
//! logged there instead.

use std::sync::mpsc::{sync_channel, SyncSender};
use std::thread::JoinHandle;

use super::Notifier;
use crate::alerts::Alert;
use crate::{SentinelError, SentinelResult};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub struct QueuedNotifier {
    tx: Option<SyncSender<Alert>>,
    worker: Option<JoinHandle<()>>,
}

impl QueuedNotifier {
    /// Start the worker thread that owns `inner`.
    pub fn spawn<N>(mut inner: N, capacity: usize) -> SentinelResult<Self>
    where
        N: Notifier + Send + 'static,
    {
        let (tx, rx) = sync_channel::<Alert>(capacity.max(1));
        let worker = std::thread::Builder::new()
            .name("alert-dispatch".into())
            .spawn(move || {
                for alert in rx {
                    if let Err(e) = inner.notify(&alert) {
                        log::error!("[DISPATCH] Delivery of {} failed: {}", alert.dedup_key(), e);
                    }
                }
                log::debug!("Alert dispatch worker exiting");
            })?;
        Ok(Self {
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    /// Close the queue and wait for every pending alert to be delivered.
    pub fn shutdown(mut self) {
        self.close();
    }

    fn close(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Alert dispatch worker panicked");
            }
        }
    }
}

impl Notifier for QueuedNotifier {
    fn notify(&mut self, alert: &Alert) -> SentinelResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| SentinelError::Notify("dispatch queue closed".into()))?;
        tx.send(alert.clone())
            .map_err(|_| SentinelError::Notify("dispatch worker stopped".into()))
    }
}

impl Drop for QueuedNotifier {
    fn drop(&mut self) {
        self.close();
    }
}
