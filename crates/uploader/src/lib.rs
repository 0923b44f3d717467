//! Signed image uploads.
//!
//! An image is authenticated by signing `"ImageSigningChallenge" ++ bytes`
//! with the user's secp256k1 posting key, then posted as multipart form
//! data to `<endpoint>/<user>/<signature>`. Progress and the final
//! outcome are reported through a [`ProgressSink`].

pub mod config;
pub mod error;
pub mod file;
pub mod http;
pub mod identity;
pub mod progress;
pub mod request;
pub mod signing;
pub mod transfer;
mod uploader;

pub use config::UploaderConfig;
pub use error::{ConfigError, TransportError, UploadError};
pub use file::ImageFile;
pub use http::HttpTransport;
pub use identity::{IdentityProvider, StaticIdentity};
pub use progress::{NoProgress, ProgressEvent, ProgressSink, TransferProgress};
pub use signing::{ImageSigner, PostingKey, Secp256k1Signer};
pub use transfer::{Transport, TransportResponse, UploadState};
pub use uploader::ImageUploader;
