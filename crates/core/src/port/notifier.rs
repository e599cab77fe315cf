// Notifier Port
// Transient user-facing messages (toasts in an editor, colored lines in a terminal)

pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Notification {
        Info(String),
        Error(String),
    }

    /// Records notifications in arrival order
    #[derive(Default)]
    pub struct RecordingNotifier {
        seen: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn notifications(&self) -> Vec<Notification> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Notifier for RecordingNotifier {
        fn info(&self, message: &str) {
            self.seen
                .lock()
                .unwrap()
                .push(Notification::Info(message.to_string()));
        }

        fn error(&self, message: &str) {
            self.seen
                .lock()
                .unwrap()
                .push(Notification::Error(message.to_string()));
        }
    }
}
