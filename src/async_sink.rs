use crate::sink::Sink;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;

/// Largest queue capacity accepted by [`AsyncSink::new`]; tokio's bounded
/// channel rejects anything above `usize::MAX >> 3`.
pub const MAX_CAPACITY: usize = usize::MAX >> 3;

/// Decouples callers from a slow sink with a bounded queue and a single
/// background worker.
///
/// `write` copies the record and tries to enqueue it without blocking.
/// When the queue is full the record is dropped and the call still
/// reports success: delivery is best-effort, at most once. Records that
/// are accepted reach the wrapped sink in the order they were enqueued,
/// because exactly one worker drains the queue.
///
/// Write errors from the wrapped sink happen on the worker thread after
/// the caller has returned and are not reported.
pub struct AsyncSink {
    inner: Arc<dyn Sink>,
    sender: RwLock<Option<mpsc::Sender<Vec<u8>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    /// Records accepted into the queue.
    pub enqueued: Arc<AtomicU64>,
    /// Records dropped because the queue was full.
    pub dropped: Arc<AtomicU64>,
}

impl AsyncSink {
    /// Wrap `inner` behind a queue holding up to `capacity` records.
    ///
    /// The capacity is clamped to `1..=MAX_CAPACITY`.
    pub fn new(inner: Arc<dyn Sink>, capacity: usize) -> io::Result<Self> {
        let capacity = capacity.clamp(1, MAX_CAPACITY);
        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(capacity);

        let sink = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("log-async-sink".to_string())
            .spawn(move || {
                while let Some(buf) = rx.blocking_recv() {
                    let _ = sink.write(&buf);
                }
            })?;

        Ok(AsyncSink {
            inner,
            sender: RwLock::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            closed: AtomicBool::new(false),
            enqueued: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Sink for AsyncSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Ok(buf.len());
        }
        let sender = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(tx) = sender.as_ref() {
            match tx.try_send(buf.to_vec()) {
                Ok(()) => {
                    self.enqueued.fetch_add(1, Ordering::Relaxed);
                }
                Err(_) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        Ok(buf.len())
    }

    /// Stop accepting records, wait until everything already queued has
    /// been written, then close the wrapped sink.
    ///
    /// Only the first call does this work; later or concurrent calls
    /// return `Ok(())` immediately.
    fn close(&self) -> io::Result<()> {
        if self
            .closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        // dropping the sender lets the worker finish the backlog and exit
        drop(self.sender.write().unwrap_or_else(PoisonError::into_inner).take());

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                eprintln!("async log sink worker panicked");
            }
        }
        self.inner.close()
    }
}

impl Drop for AsyncSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Wrap `inner` in an [`AsyncSink`] with the given queue capacity.
pub fn buffered(inner: Arc<dyn Sink>, capacity: usize) -> io::Result<Arc<dyn Sink>> {
    Ok(Arc::new(AsyncSink::new(inner, capacity)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Barrier;

    /// Blocks every write until the test releases it.
    struct Gated {
        inner: MemorySink,
        started: Mutex<Option<std_mpsc::Sender<()>>>,
        release: Mutex<std_mpsc::Receiver<()>>,
        open: AtomicBool,
    }

    impl Sink for Gated {
        fn write(&self, buf: &[u8]) -> io::Result<usize> {
            if let Some(tx) = self.started.lock().unwrap().take() {
                let _ = tx.send(());
            }
            if !self.open.load(Ordering::SeqCst) {
                let _ = self.release.lock().unwrap().recv();
                self.open.store(true, Ordering::SeqCst);
            }
            self.inner.write(buf)
        }

        fn close(&self) -> io::Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn delivers_in_order_and_drains_on_close() {
        let memory = Arc::new(MemorySink::new());
        let sink = AsyncSink::new(memory.clone(), 1024).unwrap();

        for i in 0..100 {
            sink.write(format!("{}\n", i).as_bytes()).unwrap();
        }
        sink.close().unwrap();

        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(memory.lines(), expected);
        assert_eq!(memory.close_count(), 1);
    }

    #[test]
    fn caller_buffer_can_be_reused_after_write() {
        let memory = Arc::new(MemorySink::new());
        let sink = AsyncSink::new(memory.clone(), 16).unwrap();

        let mut buf = b"first\n".to_vec();
        sink.write(&buf).unwrap();
        buf.copy_from_slice(b"XXXXX\n");
        sink.close().unwrap();

        assert_eq!(memory.text(), "first\n");
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (started_tx, started_rx) = std_mpsc::channel();
        let (release_tx, release_rx) = std_mpsc::channel();
        let gated = Arc::new(Gated {
            inner: MemorySink::new(),
            started: Mutex::new(Some(started_tx)),
            release: Mutex::new(release_rx),
            open: AtomicBool::new(false),
        });
        let capacity = 4;
        let sink = AsyncSink::new(gated.clone(), capacity).unwrap();

        sink.write(b"0\n").unwrap();
        // the worker now holds record 0 and is parked in the child write
        started_rx.recv().unwrap();
        for i in 1..20 {
            assert_eq!(sink.write(format!("{}\n", i).as_bytes()).unwrap(), 2 + (i >= 10) as usize);
        }
        release_tx.send(()).unwrap();
        sink.close().unwrap();

        let delivered: Vec<u32> = gated.inner.lines().iter().map(|l| l.parse().unwrap()).collect();
        // one in flight plus a full queue
        assert_eq!(delivered.len(), capacity + 1);
        assert!(delivered.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(sink.dropped(), 19 - capacity as u64);
    }

    #[test]
    fn concurrent_close_runs_child_close_once() {
        let memory = Arc::new(MemorySink::new());
        let sink = Arc::new(AsyncSink::new(memory.clone(), 8).unwrap());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let sink = Arc::clone(&sink);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    sink.close()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }

        drop(sink);
        assert_eq!(memory.close_count(), 1);
    }

    #[test]
    fn writes_after_close_are_discarded() {
        let memory = Arc::new(MemorySink::new());
        let sink = AsyncSink::new(memory.clone(), 8).unwrap();
        sink.close().unwrap();

        assert_eq!(sink.write(b"late\n").unwrap(), 5);
        assert!(sink.close().is_ok());
        assert!(memory.contents().is_empty());
    }

    #[test]
    fn concurrent_writers_lose_nothing_with_room_to_spare() {
        let memory = Arc::new(MemorySink::new());
        let sink = Arc::new(AsyncSink::new(memory.clone(), 10_000).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for i in 0..100 {
                        sink.write(format!("{}-{}\n", t, i).as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.close().unwrap();

        assert_eq!(memory.lines().len(), 400);
    }

    #[test]
    fn capacity_is_clamped_to_channel_limits() {
        for capacity in [0, usize::MAX] {
            let memory = Arc::new(MemorySink::new());
            let sink = AsyncSink::new(memory.clone(), capacity).unwrap();
            sink.write(b"ok\n").unwrap();
            sink.close().unwrap();
            assert_eq!(memory.text(), "ok\n");
        }
    }
}
