use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};

/// Severity of a [`Record`](crate::record::Record).
///
/// Levels are plain integers so callers can define fine-grained custom
/// levels between the four named ones. Higher is more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    /// Parse a level name, case-insensitively.
    ///
    /// Accepts `debug`, `info`, `warn`/`warning` and `error`. Anything
    /// else maps to [`Level::INFO`]; a bad level string is never fatal.
    pub fn parse(s: &str) -> Level {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Level::DEBUG,
            "warn" | "warning" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, base) = if self.0 < Level::INFO.0 {
            ("DEBUG", Level::DEBUG.0)
        } else if self.0 < Level::WARN.0 {
            ("INFO", Level::INFO.0)
        } else if self.0 < Level::ERROR.0 {
            ("WARN", Level::WARN.0)
        } else {
            ("ERROR", Level::ERROR.0)
        };
        let delta = self.0 - base;
        if delta == 0 {
            f.write_str(name)
        } else {
            write!(f, "{}{:+}", name, delta)
        }
    }
}

impl From<&tracing::Level> for Level {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => Level(Level::DEBUG.0 - 4),
            tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARN,
            tracing::Level::ERROR => Level::ERROR,
        }
    }
}

/// Minimum level that can be changed at runtime from any thread.
#[derive(Debug, Default)]
pub struct LevelVar(AtomicI32);

impl LevelVar {
    pub fn new(level: Level) -> Self {
        LevelVar(AtomicI32::new(level.0))
    }

    pub fn level(&self) -> Level {
        Level(self.0.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: Level) {
        self.0.store(level.0, Ordering::Relaxed);
    }
}
