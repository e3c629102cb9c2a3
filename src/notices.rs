//! Transient user-facing notices about sync outcomes.

use console::Term;
use std::sync::Mutex;
use tracing::warn;

/// Short, one-shot messages shown to the user after a sync action. One
/// notice per outcome; structured detail belongs in the log.
pub trait Notifier: Send + Sync {
    fn notice(&self, message: &str);
}

/// Writes notices to the terminal.
#[derive(Debug, Default, Clone)]
pub struct TermNotifier;

impl TermNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for TermNotifier {
    fn notice(&self, message: &str) {
        let term = Term::stdout();
        if term.write_line(message).is_err() {
            warn!("failed to write notice: {}", message);
        }
    }
}

/// Collects notices instead of printing them.
///
/// This implementation is primarily used in tests to assert on what the
/// user would have seen.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().expect("notice lock poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notice(&self, message: &str) {
        self.notices
            .lock()
            .expect("notice lock poisoned")
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_captures_in_order() {
        let notifier = RecordingNotifier::new();
        notifier.notice("first");
        notifier.notice("second");

        assert_eq!(notifier.notices(), vec!["first", "second"]);
    }
}
