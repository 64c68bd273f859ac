//! One-shot handshake used to wait for a funnel to empty its mailbox.
//!
//! The tearing-down thread holds the [Coordinator] and blocks in [Coordinator::wait]. The
//! processing loop holds the [Target] and calls [Target::complete] once no requests remain.
//! Waiting happens off the processing thread, so the loop is free to keep writing while the
//! caller is parked.
//!
//! The wait parks the calling thread directly instead of driving an executor, so it may be
//! called from inside any async runtime (including a `futures` executor).

use crate::Error;
use std::sync::mpsc;

/// Create a new [Target] paired with the [Coordinator] waiting on it.
pub fn channel() -> (Target, Coordinator) {
    let (sender, receiver) = mpsc::sync_channel(1);
    (Target { sender }, Coordinator { receiver })
}

/// The completing half of a drain handshake.
///
/// Dropping a [Target] without calling [Target::complete] aborts the wait.
#[derive(Debug)]
pub struct Target {
    sender: mpsc::SyncSender<()>,
}

impl Target {
    /// Signal the waiting [Coordinator] that the drain is complete.
    pub fn complete(self) {
        // Never blocks (capacity of one, sent at most once). The waiter may have given up.
        let _ = self.sender.try_send(());
    }
}

/// The waiting half of a drain handshake.
#[derive(Debug)]
pub struct Coordinator {
    receiver: mpsc::Receiver<()>,
}

impl Coordinator {
    /// Block the calling thread until the paired [Target] completes.
    ///
    /// There is no timeout. Returns [Error::DrainAborted] if the [Target] is dropped first.
    pub fn wait(self) -> Result<(), Error> {
        self.receiver.recv().map_err(|_| Error::DrainAborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_wait_returns_after_complete() {
        let (target, coordinator) = channel();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            target.complete();
        });
        coordinator.wait().unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_complete_before_wait() {
        let (target, coordinator) = channel();
        target.complete();
        coordinator.wait().unwrap();
    }

    #[test]
    fn test_dropped_target_aborts() {
        let (target, coordinator) = channel();
        drop(target);
        assert!(matches!(coordinator.wait(), Err(Error::DrainAborted)));
    }

    #[test]
    fn test_wait_inside_executor() {
        let (target, coordinator) = channel();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            target.complete();
        });
        futures::executor::block_on(async move { coordinator.wait() }).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn test_complete_without_waiter() {
        let (target, coordinator) = channel();
        drop(coordinator);
        target.complete();
    }
}
