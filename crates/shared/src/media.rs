use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use base64::Engine as _;
use thiserror::Error;

use crate::llm::Part;

pub type BlobFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BlobError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} is not a UTF-8 text file")]
    NotText(PathBuf),
}

/// Base64-encoded image payload ready to be placed into a message part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub source: String,
    pub mime_type: String,
    pub data_base64: String,
}

impl InlineImage {
    pub fn from_bytes(
        source: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            source: source.into(),
            mime_type: mime_type.into(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn to_part(&self) -> Part {
        Part::inline(self.mime_type.clone(), self.data_base64.clone())
    }
}

/// File-reading capability used by the image and document tools.
pub trait BlobReader: Send + Sync {
    fn read_inline_image<'a>(&'a self, path: &'a Path) -> BlobFuture<'a, InlineImage>;
    fn read_text<'a>(&'a self, path: &'a Path) -> BlobFuture<'a, String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsBlobReader;

impl BlobReader for FsBlobReader {
    fn read_inline_image<'a>(&'a self, path: &'a Path) -> BlobFuture<'a, InlineImage> {
        Box::pin(async move {
            let bytes = read_bytes(path).await?;
            Ok(InlineImage::from_bytes(
                format!("file://{}", path.display()),
                mime_type_for_path(path),
                &bytes,
            ))
        })
    }

    fn read_text<'a>(&'a self, path: &'a Path) -> BlobFuture<'a, String> {
        Box::pin(async move {
            let bytes = read_bytes(path).await?;
            String::from_utf8(bytes).map_err(|_| BlobError::NotText(path.to_path_buf()))
        })
    }
}

async fn read_bytes(path: &Path) -> Result<Vec<u8>, BlobError> {
    tokio::fs::read(path)
        .await
        .map_err(|source| BlobError::Unreadable {
            path: path.to_path_buf(),
            source,
        })
}

pub fn mime_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
