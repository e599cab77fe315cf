// Log Sink Port
// Append-only destination for audit lines and captured process output

/// Append-only text destination (the "output channel")
///
/// Writes must not fail from the caller's point of view; adapters that can
/// fail log the problem and move on.
pub trait LogSink: Send + Sync {
    /// Append text as-is
    fn append(&self, text: &str);

    /// Append text followed by a newline
    fn append_line(&self, line: &str) {
        self.append(line);
        self.append("\n");
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory sink that keeps everything written to it
    #[derive(Clone, Default)]
    pub struct BufferSink {
        buffer: Arc<Mutex<String>>,
    }

    impl BufferSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn contents(&self) -> String {
            self.buffer.lock().unwrap().clone()
        }

        pub fn lines(&self) -> Vec<String> {
            self.contents().lines().map(str::to_string).collect()
        }
    }

    impl LogSink for BufferSink {
        fn append(&self, text: &str) {
            self.buffer.lock().unwrap().push_str(text);
        }
    }
}
