use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use base58::{FromBase58, ToBase58};
use k256::ecdsa::SigningKey;
use sha2::{Digest, Sha256};

const WIF_VERSION: u8 = 0x80;
const WIF_CHECKSUM_LEN: usize = 4;
const SECRET_LEN: usize = 32;

/// Role name mixed into login-derived keys for image uploads.
pub const POSTING_ROLE: &str = "posting";

/// A user's private posting key on the secp256k1 curve.
///
/// Usually imported from its WIF string form (Base58Check with version
/// byte `0x80`). The secret never appears in `Debug` output.
pub struct PostingKey {
    signing_key: SigningKey,
}

impl PostingKey {
    /// Parses a WIF-encoded private key.
    pub fn from_wif(wif: &str) -> Result<Self> {
        let raw = wif
            .trim()
            .from_base58()
            .map_err(|e| anyhow!("posting key is not valid base58: {e:?}"))?;

        if raw.len() != 1 + SECRET_LEN + WIF_CHECKSUM_LEN {
            bail!("posting key has wrong length: {} bytes", raw.len());
        }

        let (body, checksum) = raw.split_at(raw.len() - WIF_CHECKSUM_LEN);
        if body[0] != WIF_VERSION {
            bail!("posting key has unexpected version byte 0x{:02x}", body[0]);
        }
        if checksum != &wif_checksum(body)[..] {
            bail!("posting key checksum mismatch");
        }

        Self::from_secret(&body[1..])
    }

    /// Builds a key from a raw 32-byte secret scalar.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret)
            .map_err(|e| anyhow!("invalid secret key: {e}"))?;
        Ok(Self { signing_key })
    }

    /// Derives a key from a seed string — the SHA-256 hash of the seed
    /// becomes the 32-byte private key.
    pub fn from_seed(seed: &str) -> Result<Self> {
        let hash = Sha256::digest(seed.as_bytes());
        let signing_key = SigningKey::from_bytes((&hash).into())
            .map_err(|e| anyhow!("invalid seed: {e}"))?;
        Ok(Self { signing_key })
    }

    /// Derives the key for `role` from an account name and master password.
    pub fn from_login(user: &str, password: &str, role: &str) -> Result<Self> {
        Self::from_seed(&format!("{user}{role}{password}"))
    }

    /// Encodes the key back into WIF.
    pub fn to_wif(&self) -> String {
        let mut body = Vec::with_capacity(1 + SECRET_LEN + WIF_CHECKSUM_LEN);
        body.push(WIF_VERSION);
        body.extend_from_slice(&self.signing_key.to_bytes());
        let checksum = wif_checksum(&body);
        body.extend_from_slice(&checksum);
        body.to_base58()
    }

    /// Compressed SEC1 public key (33 bytes).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }
}

impl FromStr for PostingKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_wif(s)
    }
}

impl fmt::Debug for PostingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostingKey")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

fn wif_checksum(body: &[u8]) -> [u8; WIF_CHECKSUM_LEN] {
    let hash = Sha256::digest(Sha256::digest(body));
    let mut checksum = [0u8; WIF_CHECKSUM_LEN];
    checksum.copy_from_slice(&hash[..WIF_CHECKSUM_LEN]);
    checksum
}
