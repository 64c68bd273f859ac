use crate::{
    funnel::{Identity, Mailbox},
    Error, Registry,
};
use std::fmt;
use tracing::debug;

/// Accumulates text locally and commits it to a funnel as one line.
///
/// Nothing reaches the sink until [BufferedWriter::flush] is called or the writer is dropped,
/// so multi-part output from one producer is never split by output from another. Compose with
/// [BufferedWriter::append] or with `write!` (the writer implements [fmt::Write]).
///
/// The funnel is resolved once, when the writer is created, and never again. A writer created
/// while no funnel is registered stays unbound and silently discards what it flushes.
///
/// Use one writer per producer: all mutation goes through `&mut self`.
pub struct BufferedWriter {
    buffer: String,
    funnel: Option<Mailbox>,
    identity: Identity,
}

impl BufferedWriter {
    /// Create a writer bound to `mailbox`.
    pub fn new(mailbox: Mailbox) -> Self {
        Self {
            buffer: String::new(),
            identity: mailbox.identity(),
            funnel: Some(mailbox),
        }
    }

    /// Create a writer bound to the funnel currently in `registry` (if any).
    pub fn from_registry(registry: &Registry) -> Self {
        match registry.resolve() {
            Some(mailbox) => Self::new(mailbox),
            None => Self {
                buffer: String::new(),
                funnel: None,
                identity: Identity::default(),
            },
        }
    }

    /// Append `fragment` to the local buffer.
    pub fn append(&mut self, fragment: &str) -> &mut Self {
        self.buffer.push_str(fragment);
        self
    }

    /// Submit the buffered text as one line and clear the buffer.
    ///
    /// Does nothing if the buffer is empty. If the funnel is unbound or has terminated, the text
    /// is dropped.
    pub fn flush(&mut self) -> &mut Self {
        if let Err(err) = self.submit() {
            debug!(?err, identity = %self.identity, "dropping output");
            self.buffer.clear();
        }
        self
    }

    /// Submit the buffered text as one line and clear the buffer.
    ///
    /// Unlike [BufferedWriter::flush], a failed submission is reported and the buffer is kept.
    pub fn try_flush(&mut self) -> Result<&mut Self, Error> {
        self.submit()?;
        Ok(self)
    }

    fn submit(&mut self) -> Result<(), Error> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let Some(funnel) = &self.funnel else {
            return Err(Error::Unbound);
        };
        let text = std::mem::take(&mut self.buffer);
        if let Err(text) = funnel.forward(text, self.identity) {
            self.buffer = text;
            return Err(Error::Unavailable);
        }
        Ok(())
    }

    /// The text buffered since the last flush.
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    /// Length of the buffered text in bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Whether the writer is bound to a funnel.
    pub fn is_bound(&self) -> bool {
        self.funnel.is_some()
    }

    /// The identity the writer submits under.
    pub fn identity(&self) -> Identity {
        self.identity
    }
}

impl fmt::Write for BufferedWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer.push_str(s);
        Ok(())
    }
}

impl fmt::Debug for BufferedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedWriter")
            .field("identity", &self.identity)
            .field("buffered", &self.buffer.len())
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl Drop for BufferedWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        if let Err(err) = self.submit() {
            debug!(?err, identity = %self.identity, "dropping output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        funnel::{Config, Funnel, Sink},
        mocks::Capture,
    };
    use funnel_macros::test_traced;
    use std::fmt::Write;

    fn start(registry: &Registry) -> (Funnel, Capture) {
        let capture = Capture::default();
        let funnel = Funnel::start(
            registry,
            Config {
                name: None,
                sink: Sink::Writer(Box::new(capture.clone())),
            },
        )
        .unwrap();
        (funnel, capture)
    }

    #[test_traced]
    fn test_empty_flush_is_noop() {
        let registry = Registry::new();
        let (funnel, capture) = start(&registry);
        let mut writer = BufferedWriter::from_registry(&registry);
        writer.flush().flush();
        assert_eq!(funnel.queue_depth(), 0);
        drop(writer);
        funnel.shutdown().unwrap();
        assert!(capture.lines().is_empty());
    }

    #[test_traced]
    fn test_flush_clears_buffer() {
        let registry = Registry::new();
        let (funnel, capture) = start(&registry);
        let mut writer = BufferedWriter::from_registry(&registry);
        assert!(writer.is_bound());
        writer.append("hello").append(", ").append("world");
        assert_eq!(writer.as_str(), "hello, world");
        writer.flush();
        assert!(writer.is_empty());
        write!(writer, "{} + {} = {}", 1, 2, 3).unwrap();
        assert_eq!(writer.len(), 9);
        writer.flush();
        drop(writer);
        funnel.shutdown().unwrap();
        assert_eq!(capture.lines(), vec!["hello, world", "1 + 2 = 3"]);
    }

    #[test_traced]
    fn test_drop_submits_remaining() {
        let registry = Registry::new();
        let (funnel, capture) = start(&registry);
        let mut writer = BufferedWriter::from_registry(&registry);
        writer.append("x");
        writer.append("y");
        drop(writer);
        funnel.shutdown().unwrap();
        assert_eq!(capture.lines(), vec!["xy"]);
    }

    #[test_traced]
    fn test_flushes_keep_order() {
        let registry = Registry::new();
        let (funnel, capture) = start(&registry);
        let mut writer = BufferedWriter::new(funnel.mailbox());
        for i in 0..100 {
            write!(writer, "{i}").unwrap();
            writer.flush();
        }
        drop(writer);
        funnel.shutdown().unwrap();
        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(capture.lines(), expected);
    }

    #[test_traced]
    fn test_unbound_writer() {
        let registry = Registry::new();
        let mut writer = BufferedWriter::from_registry(&registry);
        assert!(!writer.is_bound());
        assert_eq!(writer.identity(), Identity::default());

        writer.append("nowhere");
        assert!(matches!(writer.try_flush(), Err(Error::Unbound)));
        assert_eq!(writer.as_str(), "nowhere");
        writer.flush();
        assert!(writer.is_empty());
    }

    #[test_traced]
    fn test_drop_after_termination() {
        let registry = Registry::new();
        let (funnel, capture) = start(&registry);
        let mut writer = BufferedWriter::from_registry(&registry);
        funnel.shutdown().unwrap();

        // Undeliverable output is discarded without panicking
        writer.append("late");
        drop(writer);
        assert!(capture.lines().is_empty());

        let mut unbound = BufferedWriter::from_registry(&registry);
        unbound.append("nowhere");
        drop(unbound);
    }

    #[test_traced]
    fn test_binding_is_cached() {
        let registry = Registry::new();
        let (funnel, first) = start(&registry);
        let mut writer = BufferedWriter::from_registry(&registry);
        funnel.shutdown().unwrap();

        // A new funnel does not rebind writers created earlier
        let (funnel, second) = start(&registry);
        writer.append("stale");
        assert!(matches!(writer.try_flush(), Err(Error::Unavailable)));
        assert_eq!(writer.as_str(), "stale");
        drop(writer);
        funnel.shutdown().unwrap();
        assert!(first.lines().is_empty());
        assert!(second.lines().is_empty());
    }
}
