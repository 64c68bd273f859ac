use crate::{drain, Error};
use futures::channel::mpsc;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
};

/// Opaque handle naming the producer of a [Request].
///
/// Identities are allocated by [Mailbox::identity] and are unique per funnel. The default
/// identity (`0`) names a producer that was never bound to a funnel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u64);

impl Identity {
    /// Return the raw value of the identity.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "producer-{}", self.0)
    }
}

/// A line of text waiting to be printed.
#[derive(Debug)]
pub struct Request {
    /// The text to print, without a line terminator.
    pub text: String,

    /// The producer that submitted the text.
    pub sender: Identity,
}

/// Out-of-band instructions for the processing loop.
pub(super) enum Control {
    /// Exit once the mailbox is empty, completing the target when it is.
    Drain(drain::Target),

    /// Exit immediately.
    Stop,
}

/// Ingress mailbox for [`Funnel`](super::Funnel).
///
/// Cloning a mailbox is cheap and every clone submits to the same funnel. Submitting never
/// blocks: requests queue without bound until the funnel gets to them.
#[derive(Clone)]
pub struct Mailbox {
    sender: mpsc::UnboundedSender<Request>,
    pending: Arc<AtomicUsize>,
    identities: Arc<AtomicU64>,
}

impl fmt::Debug for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("pending", &self.queue_depth())
            .finish_non_exhaustive()
    }
}

impl Mailbox {
    pub(crate) fn new(sender: mpsc::UnboundedSender<Request>, pending: Arc<AtomicUsize>) -> Self {
        Self {
            sender,
            pending,
            identities: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate a fresh [Identity] for a producer.
    pub fn identity(&self) -> Identity {
        Identity(self.identities.fetch_add(1, Ordering::Relaxed))
    }

    /// Enqueue `text` to be printed as one line.
    ///
    /// Returns [Error::Unavailable] if the funnel has terminated.
    pub fn submit(&self, text: impl Into<String>, sender: Identity) -> Result<(), Error> {
        self.forward(text.into(), sender).map_err(|_| Error::Unavailable)
    }

    /// Enqueue `text`, handing it back if the funnel has terminated.
    pub(crate) fn forward(&self, text: String, sender: Identity) -> Result<(), String> {
        // Count the request before it can be observed by the funnel
        self.pending.fetch_add(1, Ordering::AcqRel);
        let request = Request { text, sender };
        if let Err(err) = self.sender.unbounded_send(request) {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            return Err(err.into_inner().text);
        }
        Ok(())
    }

    /// Number of submitted requests the funnel has not finished printing.
    ///
    /// This is only a snapshot while other producers are submitting.
    pub fn queue_depth(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether the funnel is still accepting requests.
    pub fn is_available(&self) -> bool {
        !self.sender.is_closed()
    }
}
