//! Sinks for testing code that prints through a funnel.

use std::{
    io::{self, Write},
    sync::{Arc, Condvar, Mutex, PoisonError},
};

/// A sink that records everything written to it.
///
/// Clones share the same buffer, so keep one to inspect what the funnel wrote.
#[derive(Clone, Default)]
pub struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Every complete line written so far, without terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that blocks every write until [Gate::open] is called.
///
/// Useful for holding requests in a funnel's mailbox.
#[derive(Clone, Default)]
pub struct Gate {
    open: Arc<(Mutex<bool>, Condvar)>,
    capture: Capture,
}

impl Gate {
    /// Let all current and future writes through.
    pub fn open(&self) {
        let (open, condvar) = &*self.open;
        *open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    /// The [Capture] writes land in once the gate is open.
    pub fn capture(&self) -> Capture {
        self.capture.clone()
    }
}

impl Write for Gate {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let (open, condvar) = &*self.open;
        let mut guard = open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*guard {
            guard = condvar.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
        drop(guard);
        self.capture.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.capture.flush()
    }
}

/// A sink whose every write fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Broken;

impl Write for Broken {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn test_capture_shares_buffer() {
        let capture = Capture::default();
        let mut clone = capture.clone();
        clone.write_all(b"one\ntwo\n").unwrap();
        assert_eq!(capture.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_gate_blocks_until_open() {
        let gate = Gate::default();
        let mut writer = gate.clone();
        let handle = thread::spawn(move || writer.write_all(b"late\n"));
        thread::sleep(Duration::from_millis(20));
        assert!(gate.capture().contents().is_empty());
        gate.open();
        handle.join().unwrap().unwrap();
        assert_eq!(gate.capture().lines(), vec!["late"]);
    }

    #[test]
    fn test_broken_fails() {
        assert!(Broken.write_all(b"x").is_err());
    }
}
