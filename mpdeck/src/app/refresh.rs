//! Auto-refresh scheduler
//!
//! A self-rescheduling single-shot timer: each [`RefreshScheduler::arm`]
//! posts exactly one [`Message::Tick`] after the interval, and the
//! coordinator re-arms it when handling that tick. Stopping the scheduler
//! suppresses any tick still pending.

use crossbeam_channel::Sender;
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::message::Message;

pub struct RefreshScheduler {
    interval: Duration,
    tx: Sender<Message>,
    stopped: Arc<AtomicBool>,
}

impl RefreshScheduler {
    pub fn new(interval: Duration, tx: Sender<Message>) -> Self {
        Self { interval, tx, stopped: Arc::new(AtomicBool::new(false)) }
    }

    /// Schedule one tick.
    pub fn arm(&self) {
        if self.is_stopped() {
            return;
        }
        let interval = self.interval;
        let tx = self.tx.clone();
        let stopped = Arc::clone(&self.stopped);

        let spawned = thread::Builder::new().name("refresh-timer".to_string()).spawn(move || {
            thread::sleep(interval);
            if !stopped.load(Ordering::Acquire) {
                let _ = tx.send(Message::Tick);
            }
        });
        if let Err(e) = spawned {
            warn!("Failed to arm refresh timer: {e}");
        }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arm_fires_once() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let scheduler = RefreshScheduler::new(Duration::from_millis(10), tx);
        scheduler.arm();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), Message::Tick);
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_stop_suppresses_pending_tick() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let scheduler = RefreshScheduler::new(Duration::from_millis(50), tx);
        scheduler.arm();
        scheduler.stop();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        scheduler.arm();
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
