use std::future::Future;

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{TransportError, UploadError};
use crate::progress::{BytesSent, ProgressEvent, ProgressSink, TransferProgress};
use crate::request::UploadRequest;

/// Lifecycle of one upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Preparing,
    Signing,
    Uploading,
    Succeeded,
    Failed,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, UploadState::Succeeded | UploadState::Failed)
    }

    /// Whether `self -> next` is a legal transition. Any live state may fail.
    pub fn can_advance_to(self, next: UploadState) -> bool {
        use UploadState::*;
        match (self, next) {
            (Idle, Preparing) | (Preparing, Signing) | (Signing, Uploading) | (Uploading, Succeeded) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

/// Drives the state machine for one upload and guards the progress sink.
///
/// Events after a terminal state are dropped, and [`finish`](Self::finish)
/// consumes the session, so the sink sees exactly one `Url` or `Error`.
pub struct UploadSession<'a> {
    sink: &'a dyn ProgressSink,
    state: UploadState,
    last_percent: Option<u8>,
}

impl<'a> UploadSession<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            state: UploadState::Idle,
            last_percent: None,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Moves to `next` if the transition is legal.
    pub fn advance(&mut self, next: UploadState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!(from = ?self.state, to = ?next, "rejected upload state transition");
            return false;
        }
        debug!(from = ?self.state, to = ?next, "upload state");
        self.state = next;
        true
    }

    pub fn message(&self, text: impl Into<String>) {
        if !self.state.is_terminal() {
            self.sink.emit(ProgressEvent::Message(text.into()));
        }
    }

    /// Emits `Uploading N%` when the rounded percentage changes.
    pub fn transferred(&mut self, bytes: BytesSent) {
        if self.state != UploadState::Uploading {
            return;
        }
        let Some(percent) = bytes.percent() else {
            return;
        };
        if self.last_percent == Some(percent) {
            return;
        }
        self.last_percent = Some(percent);
        self.message(format!("Uploading {percent}%"));
    }

    /// Enters the terminal state matching `result` and emits the terminal event.
    pub fn finish(mut self, result: Result<String, UploadError>) -> Result<String, UploadError> {
        let (target, event) = match &result {
            Ok(url) => (UploadState::Succeeded, ProgressEvent::Url(url.clone())),
            Err(err) => (UploadState::Failed, ProgressEvent::Error(err.to_string())),
        };
        if self.advance(target) {
            self.sink.emit(event);
        }
        result
    }
}

/// Raw outcome of an upload request that got a response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Bytes,
}

/// Sends an [`UploadRequest`] and reports transmitted bytes.
///
/// `Err` means no response arrived at all; any HTTP status is `Ok`.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: UploadRequest,
        progress: TransferProgress,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

#[derive(Debug, Deserialize)]
struct UploadResponseBody {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Maps a server response onto the hosted URL or an [`UploadError`].
pub fn interpret_response(response: &TransportResponse) -> Result<String, UploadError> {
    if response.status != 200 {
        return Err(UploadError::HttpFailure {
            status: response.status,
            status_text: response.status_text.clone(),
        });
    }

    let body: UploadResponseBody =
        serde_json::from_slice(&response.body).map_err(|_| UploadError::MalformedResponse)?;

    match (body.url, body.error) {
        (Some(url), _) if !url.is_empty() => Ok(url),
        (_, Some(error)) if !error.is_empty() => Err(UploadError::ServerError(error)),
        _ => Err(UploadError::MalformedResponse),
    }
}
