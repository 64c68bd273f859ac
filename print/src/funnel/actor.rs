use super::{
    ingress::{Control, Request},
    metrics::Metrics,
};
use crate::{drain, Error};
use futures::{channel::mpsc, select_biased, StreamExt};
use std::{
    io::Write,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tracing::{debug, error, trace};

/// The processing loop of a [`Funnel`](super::Funnel).
///
/// It is the only owner of the sink, so lines are never interleaved.
pub(super) struct Actor {
    ////////////////////////////////////////
    // Output
    ////////////////////////////////////////
    sink: Box<dyn Write + Send>,

    ////////////////////////////////////////
    // Messaging
    ////////////////////////////////////////
    requests: mpsc::UnboundedReceiver<Request>,
    control: mpsc::UnboundedReceiver<Control>,

    /// Requests submitted but not yet printed.
    pending: Arc<AtomicUsize>,

    /// Set once teardown has started and requests remain.
    drain: Option<drain::Target>,

    ////////////////////////////////////////
    // Metrics
    ////////////////////////////////////////
    metrics: Metrics,
}

impl Actor {
    pub(super) fn new(
        sink: Box<dyn Write + Send>,
        requests: mpsc::UnboundedReceiver<Request>,
        control: mpsc::UnboundedReceiver<Control>,
        pending: Arc<AtomicUsize>,
        metrics: Metrics,
    ) -> Self {
        Self {
            sink,
            requests,
            control,
            pending,
            drain: None,
            metrics,
        }
    }

    /// Process requests until told to stop or until a drain completes.
    ///
    /// Any sink failure ends the loop (and aborts a pending drain).
    pub(super) async fn run(mut self) -> Result<(), Error> {
        loop {
            select_biased! {
                control = self.control.next() => {
                    match control {
                        Some(Control::Drain(target)) => {
                            let pending = self.pending.load(Ordering::Acquire);
                            if pending == 0 {
                                debug!("drained");
                                target.complete();
                                break;
                            }
                            debug!(pending, "draining");
                            self.drain = Some(target);
                        }
                        Some(Control::Stop) | None => {
                            debug!("stopped");
                            break;
                        }
                    }
                },
                request = self.requests.next() => {
                    let Some(request) = request else {
                        debug!("mailbox closed");
                        break;
                    };
                    self.print(request)?;

                    // The request was counted before it was sent
                    let pending = self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
                    self.metrics.pending.set(pending as i64);
                    if pending == 0 {
                        if let Some(target) = self.drain.take() {
                            debug!("drained");
                            target.complete();
                            break;
                        }
                    }
                },
            }
        }

        self.sink.flush().map_err(Error::Sink)
    }

    /// Write a request to the sink as a single line.
    fn print(&mut self, request: Request) -> Result<(), Error> {
        trace!(sender = %request.sender, len = request.text.len(), "printing");
        let mut line = request.text.into_bytes();
        line.push(b'\n');
        if let Err(err) = self.sink.write_all(&line).and_then(|_| self.sink.flush()) {
            error!(?err, "sink failed");
            return Err(Error::Sink(err));
        }
        self.metrics.printed.inc();
        self.metrics.bytes.inc_by(line.len() as u64);
        Ok(())
    }
}
