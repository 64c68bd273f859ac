//! Serialize console output from many concurrent producers.
//!
//! Writing to a shared destination (like stdout) from many threads or tasks interleaves their
//! output into garbage. This crate routes every line through a single [funnel::Funnel] that owns
//! the destination and writes requests one at a time, in the order they arrive. Producers compose
//! their output in a [BufferedWriter] and commit it as one request with [BufferedWriter::flush]
//! (or by dropping the writer).
//!
//! # Lifecycle
//!
//! Start the [funnel::Funnel] before any producer and shut it down after all producers have
//! stopped. Shutdown drains every queued request before returning, but it cannot stop producers
//! from submitting more: if they keep going, the drain never completes.
//!
//! # Example
//!
//! ```rust
//! use funnel_print::{funnel::{Config, Funnel, Sink}, mocks::Capture, BufferedWriter, Registry};
//! use std::fmt::Write;
//!
//! let capture = Capture::default();
//! let registry = Registry::new();
//! let funnel = Funnel::start(
//!     &registry,
//!     Config {
//!         name: Some("console".into()),
//!         sink: Sink::Writer(Box::new(capture.clone())),
//!     },
//! )
//! .unwrap();
//!
//! let mut writer = BufferedWriter::from_registry(&registry);
//! write!(writer, "answer={}", 42).unwrap();
//! writer.flush();
//!
//! funnel.shutdown().unwrap();
//! assert_eq!(capture.lines(), vec!["answer=42".to_string()]);
//! ```

use thiserror::Error;

pub mod drain;
pub mod funnel;
pub mod mocks;
mod registry;
pub use registry::Registry;
mod writer;
pub use writer::BufferedWriter;

/// Errors that can occur when interacting with a [funnel::Funnel].
#[derive(Error, Debug)]
pub enum Error {
    #[error("funnel already registered: {0}")]
    AlreadyRegistered(String),
    #[error("no funnel bound")]
    Unbound,
    #[error("funnel unavailable")]
    Unavailable,
    #[error("sink failed: {0}")]
    Sink(#[source] std::io::Error),
    #[error("spawn failed: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("drain aborted")]
    DrainAborted,
    #[error("funnel panicked")]
    Panicked,
}
