//! Destinations for streamed model output

use std::io::Write;

/// Receives model output while a reply is still being generated.
pub trait StreamSink: Send + Sync {
    fn on_chunk(&self, chunk: &str);

    /// Called once after the last chunk of a reply.
    fn on_complete(&self) {}
}

/// Prints chunks to stdout as they arrive, ending each reply with a newline.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl StreamSink for StdoutSink {
    fn on_chunk(&self, chunk: &str) {
        let mut out = std::io::stdout().lock();
        // A closed stdout must not abort the run.
        let _ = out.write_all(chunk.as_bytes());
        let _ = out.flush();
    }

    fn on_complete(&self) {
        println!();
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl StreamSink for NullSink {
    fn on_chunk(&self, _chunk: &str) {}
}
