//! User notification sink.
//!
//! The consolidation trigger reports outcomes through the [`Notifier`]
//! trait: fire-and-forget, nothing downstream depends on a return value.
//! The storefront binary wires [`TracingNotifier`]; the HTMX surface shows
//! the same notice as a rendered fragment, and tests capture notices with
//! [`RecordingNotifier`].

use std::sync::{Mutex, PoisonError};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A short title/description pair shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    /// A success notice.
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    /// A failure notice.
    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Fire-and-forget notice sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that emits notices as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => {
                tracing::info!(title = %notice.title, description = %notice.description, "notice");
            }
            NoticeLevel::Error => {
                tracing::warn!(title = %notice.title, description = %notice.description, "notice");
            }
        }
    }
}

/// Notifier that records notices for later assertion. Test use only.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all notices recorded so far, clearing the recorder.
    pub fn take(&self) -> Vec<Notice> {
        std::mem::take(
            &mut *self
                .notices
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Number of notices recorded so far.
    pub fn len(&self) -> usize {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let recorder = RecordingNotifier::new();
        assert!(recorder.is_empty());

        recorder.notify(Notice::success("Cart cleaned up", "Merged 2 carts"));
        recorder.notify(Notice::error("Cart cleanup failed", "Try again"));

        let notices = recorder.take();
        assert_eq!(notices.len(), 2);
        assert_eq!(
            notices.first().map(|notice| notice.level),
            Some(NoticeLevel::Success)
        );
        assert!(recorder.is_empty());
    }
}
