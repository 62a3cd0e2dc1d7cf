use crate::context::Context;
use crate::error::Error;
use crate::format::{Formatter, Handler, HandlerOptions};
use crate::interceptor::Interceptor;
use crate::record::Record;
use crate::sink::Sink;
use std::io;
use std::sync::Arc;

/// Interceptor -> formatter -> sink, composed once and then immutable.
///
/// Reconfiguration builds a new pipeline and swaps it in; a pipeline is
/// never mutated after construction.
pub struct Pipeline {
    handler: Box<dyn Handler>,
    sink: Arc<dyn Sink>,
    interceptor: Option<Interceptor>,
}

impl Pipeline {
    pub fn new(
        formatter: &dyn Formatter,
        sink: Arc<dyn Sink>,
        opts: HandlerOptions,
        interceptor: Option<Interceptor>,
    ) -> Self {
        Pipeline {
            handler: formatter.format(Arc::clone(&sink), opts),
            sink,
            interceptor,
        }
    }

    /// Run one record through the pipeline.
    ///
    /// A record vetoed by the interceptor produces no output and is not
    /// an error. Sink failures are returned to the caller.
    pub fn handle(&self, ctx: &Context, record: Record) -> Result<(), Error> {
        let record = match &self.interceptor {
            Some(intercept) => match intercept(ctx, record) {
                Some(record) => record,
                None => return Ok(()),
            },
            None => record,
        };
        self.handler.handle(&record)
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Close the sink. Buffered sinks drain before this returns.
    pub fn close(&self) -> io::Result<()> {
        self.sink.close()
    }
}
