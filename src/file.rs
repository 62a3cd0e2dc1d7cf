use crate::rotation::{self, RotationConfig};
use crate::sink::Sink;
use file_rotate::suffix::AppendTimestamp;
use file_rotate::FileRotate;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Size-rotated log file sink.
///
/// Writes are serialized through an internal lock, so one record is
/// always written contiguously even with many concurrent callers. The
/// caller blocks for the duration of the disk write; wrap the sink in an
/// [`AsyncSink`](crate::async_sink::AsyncSink) to move that off the hot
/// path.
///
/// The file is opened on first write, so constructing a sink never
/// touches the filesystem. A write after `close` opens it again.
pub struct FileSink {
    path: PathBuf,
    config: RotationConfig,
    inner: Mutex<Option<FileRotate<AppendTimestamp>>>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, config: RotationConfig) -> Self {
        FileSink { path: path.into(), config, inner: Mutex::new(None) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Option<FileRotate<AppendTimestamp>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn opened<'a>(
        &self,
        slot: &'a mut Option<FileRotate<AppendTimestamp>>,
    ) -> io::Result<&'a mut FileRotate<AppendTimestamp>> {
        if slot.is_none() {
            *slot = Some(rotation::open(&self.path, &self.config)?);
        }
        slot.as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "log file is not open"))
    }

    /// Roll the file over immediately, regardless of its size.
    pub fn rotate(&self) -> io::Result<()> {
        let mut slot = self.lock();
        self.opened(&mut slot)?.rotate()
    }

    /// Rotated files next to the active one.
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        let mut slot = self.lock();
        Ok(self.opened(&mut slot)?.log_paths())
    }
}

impl Sink for FileSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut slot = self.lock();
        let file = self.opened(&mut slot)?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        match self.lock().take() {
            Some(mut file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Rotating file sink with the given settings.
pub fn file(path: impl Into<PathBuf>, config: RotationConfig) -> Arc<dyn Sink> {
    Arc::new(FileSink::new(path, config))
}
