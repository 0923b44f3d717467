use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Image handed to the uploader. Never modified by it.
#[derive(Debug, Clone)]
pub struct ImageFile {
    name: String,
    content_type: String,
    source: Source,
}

#[derive(Debug, Clone)]
enum Source {
    Memory(Bytes),
    Path(PathBuf),
}

impl ImageFile {
    /// An image already held in memory.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        Self {
            content_type: content_type_for(&name).to_string(),
            name,
            source: Source::Memory(data.into()),
        }
    }

    /// An image on disk; the bytes are read when the upload starts.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Self {
            content_type: content_type_for(&name).to_string(),
            name,
            source: Source::Path(path),
        }
    }

    /// Overrides the content type guessed from the file name.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Byte length, if known without reading the file.
    pub fn known_len(&self) -> Option<u64> {
        match &self.source {
            Source::Memory(data) => Some(data.len() as u64),
            Source::Path(_) => None,
        }
    }

    /// Reads the full image contents.
    pub async fn read(&self) -> io::Result<Bytes> {
        match &self.source {
            Source::Memory(data) => Ok(data.clone()),
            Source::Path(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }
}

/// MIME type guessed from a file name's extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("svg") => "image/svg+xml",
        _ => FALLBACK_CONTENT_TYPE,
    }
}
