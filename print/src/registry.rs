use crate::{funnel::Mailbox, Error};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

/// The funnel currently registered.
struct Entry {
    name: String,
    mailbox: Mailbox,
}

/// Directory that resolves the live [`Funnel`](crate::funnel::Funnel) by name.
///
/// At most one funnel is registered at a time: it is added when the funnel starts and removed
/// when it terminates. Cloning a [Registry] returns a handle to the same directory, so it can be
/// passed to every producer that needs to find the funnel.
#[derive(Clone, Default)]
pub struct Registry {
    entry: Arc<RwLock<Option<Entry>>>,
    generated: Arc<AtomicU64>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mailbox of the registered funnel, if any.
    pub fn resolve(&self) -> Option<Mailbox> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.as_ref().map(|entry| entry.mailbox.clone())
    }

    /// Mailbox of the registered funnel, if it is registered as `name`.
    pub fn lookup(&self, name: &str) -> Option<Mailbox> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry
            .as_ref()
            .filter(|entry| entry.name == name)
            .map(|entry| entry.mailbox.clone())
    }

    /// Name of the registered funnel, if any.
    pub fn name(&self) -> Option<String> {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        entry.as_ref().map(|entry| entry.name.clone())
    }

    /// Generate a name no previous call has returned.
    pub(crate) fn generate(&self) -> String {
        format!("funnel-{}", self.generated.fetch_add(1, Ordering::Relaxed))
    }

    /// Register `mailbox` as `name`.
    ///
    /// Fails with the name of the live funnel if one is already registered.
    pub(crate) fn register(&self, name: &str, mailbox: Mailbox) -> Result<(), Error> {
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = entry.as_ref() {
            return Err(Error::AlreadyRegistered(existing.name.clone()));
        }
        *entry = Some(Entry {
            name: name.to_string(),
            mailbox,
        });
        Ok(())
    }

    /// Remove the registration for `name`, leaving any other registration untouched.
    pub(crate) fn deregister(&self, name: &str) {
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        if entry.as_ref().is_some_and(|entry| entry.name == name) {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::mpsc;
    use std::sync::atomic::AtomicUsize;

    fn mailbox() -> Mailbox {
        let (sender, _) = mpsc::unbounded();
        Mailbox::new(sender, Arc::new(AtomicUsize::new(0)))
    }

    #[test]
    fn test_empty() {
        let registry = Registry::new();
        assert!(registry.resolve().is_none());
        assert!(registry.lookup("console").is_none());
        assert!(registry.name().is_none());
    }

    #[test]
    fn test_single_entry() {
        let registry = Registry::new();
        registry.register("console", mailbox()).unwrap();
        assert!(registry.resolve().is_some());
        assert!(registry.lookup("console").is_some());
        assert!(registry.lookup("other").is_none());

        let result = registry.register("other", mailbox());
        assert!(matches!(result, Err(Error::AlreadyRegistered(name)) if name == "console"));
        assert_eq!(registry.name().as_deref(), Some("console"));
    }

    #[test]
    fn test_deregister_matching_only() {
        let registry = Registry::new();
        registry.register("console", mailbox()).unwrap();
        registry.deregister("other");
        assert_eq!(registry.name().as_deref(), Some("console"));
        registry.deregister("console");
        assert!(registry.resolve().is_none());
        registry.register("other", mailbox()).unwrap();
    }

    #[test]
    fn test_clones_share_entry() {
        let registry = Registry::new();
        let clone = registry.clone();
        registry.register("console", mailbox()).unwrap();
        assert_eq!(clone.name().as_deref(), Some("console"));
        assert_ne!(registry.generate(), clone.generate());
    }
}
