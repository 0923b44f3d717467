mod key;
mod payload;
mod secp256k1;
mod signer;

pub use key::{POSTING_ROLE, PostingKey};
pub use payload::{SIGNING_CHALLENGE, signing_payload};
pub use secp256k1::{Secp256k1Signer, recover_public_key};
pub use signer::ImageSigner;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Signature over one image, bound to the signing payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSignature {
    /// SHA-256 of the signing payload.
    pub digest: Vec<u8>,
    /// Hex-encoded signature bytes, as sent in the upload URL.
    pub signature: String,
}

/// Hashes the signing payload for `image` and signs the digest.
pub fn sign_image(signer: &dyn ImageSigner, image: &[u8]) -> Result<ImageSignature> {
    let payload = signing_payload(image);
    let digest = Sha256::digest(&payload);

    let signature_bytes = signer
        .sign_digest(&digest)
        .context("signing image digest")?;

    Ok(ImageSignature {
        digest: digest.to_vec(),
        signature: hex::encode(signature_bytes),
    })
}
