use bytes::Bytes;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left as-is inside a path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// One signed upload: destination and the single file field of the body.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadRequest {
    pub fn new(
        endpoint: &str,
        user: &str,
        signature: &str,
        file_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> Self {
        Self {
            url: build_upload_url(endpoint, user, signature),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data,
        }
    }

    pub fn body_len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// `<endpoint>/<user>/<signature>`, each segment percent-encoded.
pub fn build_upload_url(endpoint: &str, user: &str, signature: &str) -> String {
    format!(
        "{}/{}/{}",
        endpoint.trim_end_matches('/'),
        encode_segment(user),
        encode_segment(signature)
    )
}

fn encode_segment(segment: &str) -> String {
    // "." and ".." would be collapsed by URL normalization
    if !segment.is_empty() && segment.bytes().all(|b| b == b'.') {
        return "%2E".repeat(segment.len());
    }
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
