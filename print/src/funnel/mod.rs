//! Serialize printed lines from many producers into a single sink.
//!
//! # Overview
//!
//! The [Funnel] owns the sink and runs a processing loop on a dedicated thread. Producers submit
//! requests through a [Mailbox] (directly, or via a [`BufferedWriter`](crate::BufferedWriter)),
//! and the loop writes each request as one line in the order it arrived. Requests from the same
//! producer are printed in the order they were submitted.
//!
//! # Shutdown
//!
//! Shutting down (explicitly with [Funnel::shutdown] or by dropping the [Funnel]) moves through
//! `Active -> Draining -> Terminated`:
//! - If no requests are queued, the loop is stopped right away.
//! - Otherwise the caller hands the loop a [`drain::Target`](crate::drain::Target) and blocks
//!   until the loop reports the mailbox is empty.
//!
//! Once terminated, the sink is released and the funnel is removed from its [Registry].
//!
//! The drain waits without a timeout. Producers that keep submitting after shutdown begins can
//! keep the mailbox from ever emptying, so start the funnel before any producer and shut it down
//! after all of them have stopped.

mod actor;
mod config;
pub use config::{Config, Sink};
mod ingress;
pub use ingress::{Identity, Mailbox, Request};
mod metrics;
pub use metrics::Metrics;

use crate::{drain, Error, Registry};
use actor::Actor;
use futures::{channel::mpsc, executor::block_on};
use ingress::Control;
use std::{
    sync::{atomic::AtomicUsize, Arc},
    thread::{self, JoinHandle},
};
use tracing::{debug, error};

/// Handle to a running funnel.
pub struct Funnel {
    name: String,
    registry: Registry,
    mailbox: Mailbox,
    control: mpsc::UnboundedSender<Control>,
    metrics: Metrics,
    handle: Option<JoinHandle<Result<(), Error>>>,
}

impl Funnel {
    /// Open the configured sink, register the funnel, and start processing requests.
    pub fn start(registry: &Registry, cfg: Config) -> Result<Self, Error> {
        let name = cfg.name.unwrap_or_else(|| registry.generate());
        let (sender, requests) = mpsc::unbounded();
        let (control, control_receiver) = mpsc::unbounded();
        let pending = Arc::new(AtomicUsize::new(0));
        let mailbox = Mailbox::new(sender, pending.clone());
        registry.register(&name, mailbox.clone())?;

        // Only touch the sink once the name is ours
        let sink = match cfg.sink.open() {
            Ok(sink) => sink,
            Err(err) => {
                registry.deregister(&name);
                return Err(err);
            }
        };

        let metrics = Metrics::default();
        let actor = Actor::new(sink, requests, control_receiver, pending, metrics.clone());
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let result = block_on(actor.run());
                if let Err(err) = &result {
                    error!(?err, "funnel failed");
                }
                result
            });
        let handle = match handle {
            Ok(handle) => handle,
            Err(err) => {
                registry.deregister(&name);
                return Err(Error::Spawn(err));
            }
        };
        debug!(name = %name, "funnel started");

        Ok(Self {
            name,
            registry: registry.clone(),
            mailbox,
            control,
            metrics,
            handle: Some(handle),
        })
    }

    /// The name the funnel is registered under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// A mailbox that submits to this funnel.
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Number of submitted requests not yet printed.
    pub fn queue_depth(&self) -> usize {
        self.mailbox.queue_depth()
    }

    /// Register the funnel's metrics with a prometheus registry.
    pub fn register(&self, registry: &mut prometheus_client::registry::Registry) {
        self.metrics.register(registry);
    }

    /// Print every queued request, then stop the funnel and release the sink.
    ///
    /// Blocks until the mailbox is empty. Returns the error that stopped the processing loop,
    /// if any.
    pub fn shutdown(mut self) -> Result<(), Error> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), Error> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        // A closed control channel means the loop already exited, which join reports
        let pending = self.queue_depth();
        let drained = if pending == 0 {
            let _ = self.control.unbounded_send(Control::Stop);
            Ok(())
        } else {
            debug!(name = %self.name, pending, "waiting for drain");
            let (target, coordinator) = drain::channel();
            let _ = self.control.unbounded_send(Control::Drain(target));
            coordinator.wait()
        };

        let result = match handle.join() {
            Ok(result) => result.and(drained),
            Err(_) => Err(Error::Panicked),
        };
        self.registry.deregister(&self.name);
        debug!(name = %self.name, "funnel terminated");
        result
    }
}

impl Drop for Funnel {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            error!(?err, name = %self.name, "funnel teardown failed");
        }
    }
}
