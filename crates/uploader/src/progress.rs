use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Status update delivered to the caller while an upload runs.
///
/// Serializes as `{"message": ..}`, `{"error": ..}` or `{"url": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Status narration.
    Message(String),
    /// Terminal failure.
    Error(String),
    /// Terminal success, carrying the hosted image URL.
    Url(String),
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProgressEvent::Message(_))
    }
}

/// Observer for upload progress. Fire-and-forget.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

impl ProgressSink for mpsc::UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // receiver gone means nobody is listening
        let _ = self.send(event);
    }
}

/// Sink that drops every event.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Bytes handed to the connection so far, out of `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytesSent {
    pub sent: u64,
    pub total: u64,
}

impl BytesSent {
    /// `round(sent / total * 100)`, or `None` when the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let ratio = self.sent.min(self.total) as f64 / self.total as f64;
        Some((ratio * 100.0).round() as u8)
    }
}

/// Handle a transport uses to report transmitted bytes.
///
/// Reports are queued and surfaced to the progress sink by the upload
/// driver, so the handle can move into connection tasks freely.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    tx: mpsc::UnboundedSender<BytesSent>,
}

impl TransferProgress {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BytesSent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// A handle whose reports go nowhere.
    pub fn detached() -> Self {
        Self::channel().0
    }

    pub fn report(&self, sent: u64, total: u64) {
        let _ = self.tx.send(BytesSent { sent, total });
    }
}
