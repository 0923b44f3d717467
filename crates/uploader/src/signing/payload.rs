/// Challenge literal shared with the server's verification logic.
pub const SIGNING_CHALLENGE: &str = "ImageSigningChallenge";

/// Builds the bytes that get hashed and signed for an upload:
/// the challenge followed by the untouched image bytes.
pub fn signing_payload(image: &[u8]) -> Vec<u8> {
    let challenge = SIGNING_CHALLENGE.as_bytes();
    let mut payload = Vec::with_capacity(challenge.len() + image.len());
    payload.extend_from_slice(challenge);
    payload.extend_from_slice(image);
    payload
}
