use anyhow::{Result, anyhow, bail};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey, signature::hazmat::PrehashSigner};

use super::key::PostingKey;
use super::signer::ImageSigner;

/// Header offset marking a recoverable signature for a compressed public key.
const COMPRESSED_RECOVERY_OFFSET: u8 = 31;
const DIGEST_LEN: usize = 32;
const SIGNATURE_LEN: usize = 65;

/// ECDSA signer using the secp256k1 curve with recoverable signatures
/// (65 bytes: header + r + s).
///
/// The header byte is `recovery_id + 31`, letting the server recover the
/// posting public key from the signature and digest alone. Nonces follow
/// RFC 6979, so signing is deterministic.
pub struct Secp256k1Signer {
    key: PostingKey,
}

impl Secp256k1Signer {
    pub fn new(key: PostingKey) -> Self {
        Self { key }
    }
}

impl ImageSigner for Secp256k1Signer {
    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>> {
        if digest.len() != DIGEST_LEN {
            bail!("expected a {DIGEST_LEN}-byte digest, got {} bytes", digest.len());
        }

        let (signature, recovery_id): (Signature, RecoveryId) = self
            .key
            .signing_key()
            .sign_prehash(digest)
            .map_err(|e| anyhow!("secp256k1 sign_prehash failed: {e}"))?;

        let mut sig_bytes = Vec::with_capacity(SIGNATURE_LEN);
        sig_bytes.push(recovery_id.to_byte() + COMPRESSED_RECOVERY_OFFSET);
        sig_bytes.extend_from_slice(&signature.to_bytes());
        Ok(sig_bytes)
    }

    fn public_key_bytes(&self) -> Vec<u8> {
        self.key.public_key_bytes()
    }

    fn algorithm(&self) -> &str {
        "secp256k1-recoverable"
    }
}

/// Recovers the compressed public key that produced `signature` over `digest`.
///
/// This is the check the upload server performs against the account's
/// posting authority.
pub fn recover_public_key(digest: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
    if signature.len() != SIGNATURE_LEN {
        bail!("expected a {SIGNATURE_LEN}-byte signature, got {} bytes", signature.len());
    }

    let recovery_id = signature[0]
        .checked_sub(COMPRESSED_RECOVERY_OFFSET)
        .and_then(RecoveryId::from_byte)
        .ok_or_else(|| anyhow!("invalid recovery header 0x{:02x}", signature[0]))?;
    let signature = Signature::from_slice(&signature[1..])
        .map_err(|e| anyhow!("invalid signature: {e}"))?;

    let recovered = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|e| anyhow!("public key recovery failed: {e}"))?;
    Ok(recovered.to_encoded_point(true).as_bytes().to_vec())
}
