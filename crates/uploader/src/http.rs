use std::future::Future;

use bytes::Bytes;
use futures::{StreamExt, stream};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode};
use tracing::{debug, warn};

use crate::config::UploaderConfig;
use crate::error::{ConfigError, TransportError};
use crate::progress::TransferProgress;
use crate::request::{FILE_FIELD, UploadRequest};
use crate::transfer::{Transport, TransportResponse};

/// Size of the body chunks handed to the connection.
const CHUNK_SIZE: usize = 64 * 1024;

/// [`Transport`] over HTTP(S) using `reqwest`.
///
/// The file part is streamed in chunks; each chunk taken by the
/// connection is reported as progress.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    pub fn new(config: &UploaderConfig) -> Result<Self, ConfigError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
        })
    }

    fn file_part(request: &UploadRequest, progress: &TransferProgress) -> Part {
        let total = request.body_len();
        let part = || {
            Part::stream_with_length(progress_body(request.data.clone(), progress.clone()), total)
                .file_name(request.file_name.clone())
        };

        part().mime_str(&request.content_type).unwrap_or_else(|e| {
            warn!(content_type = %request.content_type, error = %e, "ignoring invalid content type");
            part()
        })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: UploadRequest,
        progress: TransferProgress,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        async move {
            let form = Form::new().part(FILE_FIELD, Self::file_part(&request, &progress));

            debug!(url = %request.url, bytes = request.body_len(), "sending upload request");
            let response = self.http.post(&request.url).multipart(form).send().await?;

            let status = response.status();
            let status_text = status_text(status);
            let body = response.bytes().await?;
            debug!(status = status.as_u16(), body_len = body.len(), "upload response received");

            Ok(TransportResponse {
                status: status.as_u16(),
                status_text,
                body,
            })
        }
    }
}

/// Reason phrase for the status, or the bare code when it has none.
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_owned)
        .unwrap_or_else(|| status.as_str().to_owned())
}

fn progress_body(data: Bytes, progress: TransferProgress) -> Body {
    let total = data.len() as u64;
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(CHUNK_SIZE)
        .map(|start| data.slice(start..(start + CHUNK_SIZE).min(data.len())))
        .collect();

    let mut sent = 0u64;
    let stream = stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        progress.report(sent, total);
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}
