use chrono::Duration;
use file_rotate::compression::Compression;
use file_rotate::suffix::{AppendTimestamp, DateFrom, FileLimit};
use file_rotate::{ContentLimit, FileRotate};
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;

const MEGABYTE: u64 = 1024 * 1024;

/// Timestamp appended to rotated files, e.g. `app.log.2024-05-01T10-00-00`.
/// Rotations within the same second get a numeric suffix.
const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Rollover and retention settings for a rotating log file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Size in bytes after which the active file is rotated.
    pub max_size: u64,
    /// Rotated files to keep; `0` keeps all of them.
    pub max_backups: usize,
    /// Days to keep rotated files. Applies when `max_backups` is `0`;
    /// `0` disables age-based removal.
    pub max_age_days: u32,
    /// Gzip rotated files.
    pub compress: bool,
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            max_size: 100 * MEGABYTE,
            max_backups: 7,
            max_age_days: 30,
            compress: true,
        }
    }
}

impl RotationConfig {
    /// Set the size limit in megabytes and the number of kept backups.
    pub fn rotation(mut self, max_size_mb: u64, max_backups: usize) -> Self {
        self.max_size = max_size_mb.saturating_mul(MEGABYTE);
        self.max_backups = max_backups;
        self
    }

    pub fn max_size_bytes(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn max_age(mut self, days: u32) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    fn file_limit(&self) -> FileLimit {
        if self.max_backups > 0 {
            FileLimit::MaxFiles(self.max_backups)
        } else if self.max_age_days > 0 {
            FileLimit::Age(Duration::days(i64::from(self.max_age_days)))
        } else {
            FileLimit::Unlimited
        }
    }

    fn content_limit(&self) -> ContentLimit {
        let bytes = usize::try_from(self.max_size).unwrap_or(usize::MAX);
        // rotate after the limit is passed so a record never spans two files
        ContentLimit::BytesSurpassed(bytes.max(1))
    }

    fn compression(&self) -> Compression {
        if self.compress {
            Compression::OnRotate(0)
        } else {
            Compression::None
        }
    }
}

/// Rotating file at `path` configured by `config`.
///
/// Creates missing parent directories first so the provider can open the
/// file.
pub(crate) fn open(path: &Path, config: &RotationConfig) -> io::Result<FileRotate<AppendTimestamp>> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(FileRotate::new(
        path,
        AppendTimestamp::with_format(BACKUP_TIME_FORMAT, config.file_limit(), DateFrom::Now),
        config.content_limit(),
        config.compression(),
        #[cfg(unix)]
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn small(max_size: u64) -> RotationConfig {
        RotationConfig::default().max_size_bytes(max_size).compress(false)
    }

    #[test]
    fn defaults() {
        let config = RotationConfig::default();
        assert_eq!(config.max_size, 100 * MEGABYTE);
        assert_eq!(config.max_backups, 7);
        assert_eq!(config.max_age_days, 30);
        assert!(config.compress);
    }

    #[test]
    fn backups_take_priority_over_age() {
        assert!(matches!(small(1).file_limit(), FileLimit::MaxFiles(7)));

        let by_age = RotationConfig { max_backups: 0, ..small(1) };
        assert!(matches!(by_age.file_limit(), FileLimit::Age(d) if d == Duration::days(30)));

        let forever = RotationConfig { max_backups: 0, max_age_days: 0, ..small(1) };
        assert!(matches!(forever.file_limit(), FileLimit::Unlimited));
    }

    #[test]
    fn records_are_not_split_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = open(&path, &small(8)).unwrap();

        for chunk in [b"12345\n", b"67890\n", b"abcde\n"] {
            file.write_all(chunk).unwrap();
        }
        file.flush().unwrap();

        let backups = file.log_paths();
        assert!(!backups.is_empty());
        let mut all = fs::read_to_string(&path).unwrap();
        for backup in &backups {
            let content = fs::read_to_string(backup).unwrap();
            assert!(content.lines().all(|l| l.len() == 5));
            all.push_str(&content);
        }
        let mut lines: Vec<_> = all.lines().collect();
        lines.sort();
        assert_eq!(lines, ["12345", "67890", "abcde"]);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/app.log");
        let mut file = open(&path, &small(1024)).unwrap();
        file.write_all(b"x\n").unwrap();
        file.flush().unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"x\n");
    }

    #[test]
    fn compresses_rotated_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut file = open(&path, &small(4).compress(true)).unwrap();

        file.write_all(b"aaaaa").unwrap();
        file.write_all(b"bbbbb").unwrap();
        file.flush().unwrap();

        let backups = file.log_paths();
        assert!(!backups.is_empty());
        assert!(backups.iter().all(|b| b.to_string_lossy().ends_with(".gz")));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: RotationConfig = serde_json::from_str(r#"{"max_backups": 2}"#).unwrap();
        assert_eq!(config.max_backups, 2);
        assert_eq!(config.max_size, 100 * MEGABYTE);
    }
}
