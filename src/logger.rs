use crate::config::LoggerConfig;
use crate::context::Context;
use crate::error::Error;
use crate::level::{Level, LevelVar};
use crate::pipeline::Pipeline;
use crate::record::{Record, Source};
use crate::value::Attr;
use std::panic::Location;
use std::sync::{Arc, PoisonError, RwLock};

struct Shared {
    pipeline: RwLock<Arc<Pipeline>>,
    level: LevelVar,
}

/// Attributes added with [`Logger::with`] under one open group.
#[derive(Clone, Default)]
struct Frame {
    name: String,
    attrs: Vec<Attr>,
}

/// Cloneable handle to a pipeline and its level gate.
///
/// Clones share the pipeline and the level; [`with`](Logger::with) and
/// [`with_group`](Logger::with_group) return handles that additionally
/// carry contextual attributes. Emitting never fails from the caller's
/// point of view: records below the level cost nothing, and sink errors
/// are discarded.
#[derive(Clone)]
pub struct Logger {
    shared: Arc<Shared>,
    frames: Arc<Vec<Frame>>,
}

impl Logger {
    /// Build a pipeline from `config` and wrap it in a new handle.
    pub fn new(config: &LoggerConfig) -> Result<Self, Error> {
        Ok(Logger::from_pipeline(config.build()?, config.level))
    }

    pub fn from_pipeline(pipeline: Pipeline, level: Level) -> Self {
        Logger {
            shared: Arc::new(Shared {
                pipeline: RwLock::new(Arc::new(pipeline)),
                level: LevelVar::new(level),
            }),
            frames: Arc::new(vec![Frame::default()]),
        }
    }

    /// Current pipeline. Holders keep it alive across a reconfiguration.
    pub fn pipeline(&self) -> Arc<Pipeline> {
        Arc::clone(&self.shared.pipeline.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the pipeline with one built from `config`.
    ///
    /// Emitters observe either the old or the new pipeline, never a mix.
    /// The swap waits for records already being handled, then the old
    /// sink is closed unless the new pipeline writes to the very same sink.
    pub fn reconfigure(&self, config: &LoggerConfig) -> Result<(), Error> {
        let next = Arc::new(config.build()?);
        self.shared.level.set(config.level);
        let previous = {
            let mut current = self.shared.pipeline.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, Arc::clone(&next))
        };
        if !Arc::ptr_eq(previous.sink(), next.sink()) {
            previous.close()?;
        }
        Ok(())
    }

    /// Close the active sink, draining any buffered records.
    pub fn close(&self) -> Result<(), Error> {
        Ok(self.pipeline().close()?)
    }

    pub fn level(&self) -> Level {
        self.shared.level.level()
    }

    pub fn set_min_level(&self, level: Level) {
        self.shared.level.set(level);
    }

    /// Change the level by name; unknown names mean `info`.
    pub fn set_level(&self, level: &str) {
        self.set_min_level(Level::parse(level));
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Handle that adds `attrs` to every record, inside the current group.
    pub fn with(&self, attrs: &[Attr]) -> Logger {
        if attrs.is_empty() {
            return self.clone();
        }
        let mut frames = (*self.frames).clone();
        if let Some(last) = frames.last_mut() {
            last.attrs.extend_from_slice(attrs);
        }
        Logger { shared: Arc::clone(&self.shared), frames: Arc::new(frames) }
    }

    /// Handle that nests all later attributes under `name`.
    pub fn with_group(&self, name: &str) -> Logger {
        if name.is_empty() {
            return self.clone();
        }
        let mut frames = (*self.frames).clone();
        frames.push(Frame { name: name.to_string(), attrs: Vec::new() });
        Logger { shared: Arc::clone(&self.shared), frames: Arc::new(frames) }
    }

    /// Handle carrying the request id of `ctx` as `request_id`, if any.
    pub fn from_context(&self, ctx: &Context) -> Logger {
        match ctx.request_id() {
            Some(id) => self.with(&[Attr::string("request_id", id)]),
            None => self.clone(),
        }
    }

    /// Handle `record` while holding the read lock, so a concurrent
    /// `reconfigure` cannot close this pipeline's sink mid-write.
    fn dispatch(&self, ctx: &Context, record: Record) -> Result<(), Error> {
        let pipeline = self.shared.pipeline.read().unwrap_or_else(PoisonError::into_inner);
        pipeline.handle(ctx, record)
    }

    fn assemble(&self, attrs: &[Attr]) -> Vec<Attr> {
        let frames = &self.frames;
        if frames.len() == 1 && frames[0].attrs.is_empty() {
            return attrs.to_vec();
        }
        let last = frames.len() - 1;
        let mut current = frames[last].attrs.clone();
        current.extend_from_slice(attrs);
        for i in (1..=last).rev() {
            let group = Attr::group(frames[i].name.clone(), current);
            current = frames[i - 1].attrs.clone();
            current.push(group);
        }
        current
    }

    /// Send a prepared record through the pipeline, subject to the level
    /// gate and the contextual attributes of this handle.
    pub fn log_record(&self, ctx: &Context, mut record: Record) -> Result<(), Error> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        if self.frames.len() > 1 || !self.frames[0].attrs.is_empty() {
            record.attrs = self.assemble(&record.attrs);
        }
        self.dispatch(ctx, record)
    }

    #[track_caller]
    pub fn log_ctx(&self, ctx: &Context, level: Level, msg: &str, attrs: &[Attr]) {
        if !self.enabled(level) {
            return;
        }
        let record = Record::new(level, msg)
            .with_attrs(self.assemble(attrs))
            .with_source(Source::from(Location::caller()));
        let _ = self.dispatch(ctx, record);
    }

    #[track_caller]
    pub fn log(&self, level: Level, msg: &str, attrs: &[Attr]) {
        self.log_ctx(&Context::default(), level, msg, attrs);
    }

    #[track_caller]
    pub fn debug(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::DEBUG, msg, attrs);
    }

    #[track_caller]
    pub fn info(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::INFO, msg, attrs);
    }

    #[track_caller]
    pub fn warn(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::WARN, msg, attrs);
    }

    #[track_caller]
    pub fn error(&self, msg: &str, attrs: &[Attr]) {
        self.log(Level::ERROR, msg, attrs);
    }

    #[track_caller]
    pub fn debug_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log_ctx(ctx, Level::DEBUG, msg, attrs);
    }

    #[track_caller]
    pub fn info_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log_ctx(ctx, Level::INFO, msg, attrs);
    }

    #[track_caller]
    pub fn warn_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log_ctx(ctx, Level::WARN, msg, attrs);
    }

    #[track_caller]
    pub fn error_ctx(&self, ctx: &Context, msg: &str, attrs: &[Attr]) {
        self.log_ctx(ctx, Level::ERROR, msg, attrs);
    }
}
