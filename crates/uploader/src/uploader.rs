use anyhow::Context;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::UploaderConfig;
use crate::error::{ConfigError, UploadError};
use crate::file::ImageFile;
use crate::http::HttpTransport;
use crate::identity::{Identity, IdentityProvider};
use crate::progress::{ProgressSink, TransferProgress};
use crate::request::UploadRequest;
use crate::signing::{ImageSignature, PostingKey, Secp256k1Signer, sign_image};
use crate::transfer::{Transport, TransportResponse, UploadSession, UploadState, interpret_response};

/// Uploads images to the hosting endpoint, authenticated by a signature
/// made with the user's posting key.
///
/// Each call to [`upload`](Self::upload) is independent; the uploader
/// holds no per-upload state and can serve concurrent uploads.
pub struct ImageUploader<T = HttpTransport> {
    config: UploaderConfig,
    transport: T,
    cancel: CancellationToken,
}

impl ImageUploader<HttpTransport> {
    pub fn new(config: UploaderConfig) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> ImageUploader<T> {
    pub fn with_transport(config: UploaderConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Token that aborts every in-flight and later upload of this uploader.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signs and uploads `file` as the user from `identity`.
    ///
    /// Resolves to the hosted image URL. `sink` receives any number of
    /// status messages followed by exactly one `Url` or `Error` event
    /// whose text matches the returned value.
    pub async fn upload(
        &self,
        identity: &dyn IdentityProvider,
        file: &ImageFile,
        sink: &dyn ProgressSink,
    ) -> Result<String, UploadError> {
        debug!(file = %file.name(), bytes = ?file.known_len(), "image upload started");
        let mut session = UploadSession::new(sink);
        let result = self.run(&mut session, identity, file).await;

        match &result {
            Ok(url) => info!(file = %file.name(), %url, "image uploaded"),
            Err(err) if err.is_local() => info!(file = %file.name(), error = %err, "image upload refused"),
            Err(err) => warn!(file = %file.name(), state = ?session.state(), error = %err, "image upload failed"),
        }
        session.finish(result)
    }

    async fn run(
        &self,
        session: &mut UploadSession<'_>,
        identity: &dyn IdentityProvider,
        file: &ImageFile,
    ) -> Result<String, UploadError> {
        let Some(identity) = Identity::resolve(identity) else {
            return Err(UploadError::AuthRequired);
        };
        self.check_cancelled()?;

        session.advance(UploadState::Preparing);
        session.message("Preparing image...");
        let data = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
            read = file.read() => read.map_err(UploadError::FileRead)?,
        };
        debug!(user = %identity.user, file = %file.name(), bytes = data.len(), "image read");

        session.advance(UploadState::Signing);
        let signing = tokio::task::spawn_blocking({
            let posting_key = identity.posting_key.clone();
            let data = data.clone();
            move || sign_with_posting_key(&posting_key, &data)
        });
        let signed = signing
            .await
            .map_err(|e| UploadError::SigningFailure(anyhow::Error::new(e).context("signing task")))??;
        self.check_cancelled()?;

        let request = UploadRequest::new(
            self.config.endpoint(),
            &identity.user,
            &signed.signature,
            file.name(),
            file.content_type(),
            data,
        );

        session.advance(UploadState::Uploading);
        let response = self.transfer(session, request).await?;
        interpret_response(&response)
    }

    /// Runs the transport, relaying its byte counts to the session.
    async fn transfer(
        &self,
        session: &mut UploadSession<'_>,
        request: UploadRequest,
    ) -> Result<TransportResponse, UploadError> {
        let (progress, mut reports) = TransferProgress::channel();
        let send = self.transport.send(request, progress);
        tokio::pin!(send);

        let outcome = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                Some(bytes) = reports.recv() => session.transferred(bytes),
                outcome = &mut send => break outcome,
            }
        };
        while let Ok(bytes) = reports.try_recv() {
            session.transferred(bytes);
        }

        outcome.map_err(UploadError::NetworkFailure)
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }
}

fn sign_with_posting_key(wif: &str, data: &Bytes) -> Result<ImageSignature, UploadError> {
    let key = PostingKey::from_wif(wif)
        .context("parsing posting key")
        .map_err(UploadError::SigningFailure)?;
    let signer = Secp256k1Signer::new(key);
    sign_image(&signer, data).map_err(UploadError::SigningFailure)
}
