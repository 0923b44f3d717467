/// Trait for signing the digest of an image signing payload.
///
/// Implementations are sync — signing is CPU-bound.
pub trait ImageSigner: Send + Sync {
    /// Sign a 32-byte SHA-256 digest. Returns raw signature bytes.
    fn sign_digest(&self, digest: &[u8]) -> anyhow::Result<Vec<u8>>;

    /// Compressed public key bytes (33 bytes for secp256k1).
    fn public_key_bytes(&self) -> Vec<u8>;

    /// Algorithm identifier string (e.g. "secp256k1-recoverable").
    fn algorithm(&self) -> &str;
}
