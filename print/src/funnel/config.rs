use crate::Error;
use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
};

/// Destination every line printed by a [`Funnel`](super::Funnel) is written to.
#[derive(Default)]
pub enum Sink {
    /// Standard output.
    #[default]
    Stdout,

    /// Standard error.
    Stderr,

    /// A file, created (or truncated) when the funnel starts.
    File(PathBuf),

    /// Any other writer.
    Writer(Box<dyn Write + Send>),
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sink::Stdout => f.write_str("Stdout"),
            Sink::Stderr => f.write_str("Stderr"),
            Sink::File(path) => f.debug_tuple("File").field(path).finish(),
            Sink::Writer(_) => f.write_str("Writer"),
        }
    }
}

impl Sink {
    /// Open the destination for writing.
    pub(super) fn open(self) -> Result<Box<dyn Write + Send>, Error> {
        Ok(match self {
            Sink::Stdout => Box::new(io::stdout()),
            Sink::Stderr => Box::new(io::stderr()),
            Sink::File(path) => Box::new(BufWriter::new(File::create(path).map_err(Error::Sink)?)),
            Sink::Writer(writer) => writer,
        })
    }
}

/// Configuration for the [`Funnel`](super::Funnel).
#[derive(Debug, Default)]
pub struct Config {
    /// Symbolic name the funnel is registered under.
    ///
    /// If not set, a unique name is generated by the registry.
    pub name: Option<String>,

    /// Destination of all printed lines.
    pub sink: Sink,
}
