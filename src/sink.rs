use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Destination for fully formatted log records.
///
/// Each call to [`write`](Sink::write) carries exactly one complete
/// record. Implementations must tolerate concurrent writers, either
/// because the medium is append-safe or because they serialize
/// internally.
pub trait Sink: Send + Sync {
    /// Write one formatted record.
    ///
    /// **Returns**
    /// - `Ok(n)` with the number of bytes accepted.
    /// - `Err(..)` if the underlying medium failed.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Release resources held by the sink.
    ///
    /// Must be idempotent: a second call is a no-op that returns `Ok(())`.
    fn close(&self) -> io::Result<()>;
}

/// Process standard output. The stream is not owned, so closing is a no-op.
#[derive(Debug, Default)]
pub struct Console;

impl Sink for Console {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut out = io::stdout().lock();
        out.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

static CONSOLE: OnceLock<Arc<Console>> = OnceLock::new();

/// Shared console sink. Every call returns the same instance.
pub fn stdout() -> Arc<dyn Sink> {
    CONSOLE.get_or_init(|| Arc::new(Console)).clone()
}

/// Broadcasts every record to an ordered list of child sinks.
///
/// Child write errors are swallowed so one broken destination cannot
/// starve the others; close is fail-soft and reports the first error.
pub struct Multi {
    sinks: Vec<Arc<dyn Sink>>,
    closed: AtomicBool,
}

impl Multi {
    pub fn new(sinks: Vec<Arc<dyn Sink>>) -> Self {
        Multi { sinks, closed: AtomicBool::new(false) }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for Multi {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        for sink in &self.sinks {
            let _ = sink.write(buf);
        }
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.close() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Combine several sinks into one fan-out sink.
pub fn multi(sinks: Vec<Arc<dyn Sink>>) -> Arc<dyn Sink> {
    Arc::new(Multi::new(sinks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;

    struct Failing(&'static str);

    impl Sink for Failing {
        fn write(&self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, self.0))
        }

        fn close(&self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, self.0))
        }
    }

    #[test]
    fn stdout_is_a_singleton() {
        assert!(Arc::ptr_eq(&stdout(), &stdout()));
        assert_eq!(stdout().write(b"").unwrap(), 0);
        assert!(stdout().close().is_ok());
    }

    #[test]
    fn multi_broadcasts_identical_bytes() {
        let a = Arc::new(MemorySink::new());
        let b = Arc::new(MemorySink::new());
        let fanout = Multi::new(vec![a.clone() as Arc<dyn Sink>, b.clone()]);

        assert_eq!(fanout.write(b"line\n").unwrap(), 5);
        assert_eq!(a.contents(), b"line\n");
        assert_eq!(b.contents(), b"line\n");
    }

    #[test]
    fn multi_write_ignores_failing_children() {
        let tail = Arc::new(MemorySink::new());
        let fanout = Multi::new(vec![Arc::new(Failing("boom")) as Arc<dyn Sink>, tail.clone()]);

        assert_eq!(fanout.write(b"abc").unwrap(), 3);
        assert_eq!(tail.contents(), b"abc");
    }

    #[test]
    fn multi_close_reports_first_error_and_closes_all() {
        let tail = Arc::new(MemorySink::new());
        let fanout = Multi::new(vec![
            Arc::new(Failing("first")) as Arc<dyn Sink>,
            Arc::new(Failing("second")),
            tail.clone(),
        ]);

        let err = fanout.close().unwrap_err();
        assert_eq!(err.to_string(), "first");
        assert_eq!(tail.close_count(), 1);

        assert!(fanout.close().is_ok());
        assert_eq!(tail.close_count(), 1);
    }

    #[test]
    fn empty_multi_is_usable() {
        let fanout = Multi::new(Vec::new());
        assert!(fanout.is_empty());
        assert_eq!(fanout.write(b"x").unwrap(), 1);
        assert!(fanout.close().is_ok());
    }
}
