// Log sink adapters
// The "output channel": a terminal stream or an append-only log file
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

use dlfmt_core::port::LogSink;

/// Sink writing to any `Write` (stderr in the CLI)
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl WriterSink<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn append(&self, text: &str) {
        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = writer.write_all(text.as_bytes()).and_then(|_| writer.flush()) {
            warn!(error = %e, "Failed to write to log sink");
        }
    }
}

/// Append-only log file
pub struct FileSink {
    inner: WriterSink<File>,
}

impl FileSink {
    /// Open (or create) `path` for appending
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            inner: WriterSink::new(file),
        })
    }
}

impl LogSink for FileSink {
    fn append(&self, text: &str) {
        self.inner.append(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_sink_appends() {
        let sink = WriterSink::new(Vec::new());
        sink.append_line("> \"dlfmt\" --help");
        sink.append("usage\n");

        let written = sink.writer.into_inner().unwrap();
        assert_eq!(String::from_utf8(written).unwrap(), "> \"dlfmt\" --help\nusage\n");
    }

    #[test]
    fn test_file_sink_appends_across_opens() {
        let path = std::env::temp_dir().join(format!("dlfmt-sink-{}.log", uuid::Uuid::new_v4()));

        FileSink::open(&path).unwrap().append_line("first");
        FileSink::open(&path).unwrap().append_line("second");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
        std::fs::remove_file(&path).unwrap();
    }
}
