//! Single-field file uploads.
//!
//! DESIGN
//! ======
//! One named multipart field (default `photo`) is streamed straight to the
//! upload directory as `<token>-<original name>`. Every other text part is
//! collected as an ordinary form field; file parts under any other name are
//! skipped. A request without the field is valid and yields no file, so
//! handlers decide for themselves whether a photo is required.
//!
//! Stored files are addressed publicly under one canonical prefix,
//! `/uploads/<file>`, regardless of which router renders the page.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use rand::Rng;
use tokio::io::AsyncWriteExt;

pub const TOKEN_LEN: usize = 8;
const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
pub const PUBLIC_PREFIX: &str = "/uploads";
const FALLBACK_NAME: &str = "upload";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("upload write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A file written to the upload directory by the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub original_name: String,
    pub filename: String,
    pub path: PathBuf,
    /// Public URL, always under `/uploads`.
    pub url: String,
    pub bytes: u64,
}

/// Form fields plus the optional uploaded file.
#[derive(Debug, Default)]
pub struct UploadParts {
    pub fields: HashMap<String, String>,
    pub file: Option<StoredFile>,
}

#[must_use]
pub fn generate_file_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LEN)
        .map(|_| {
            let idx = rng.random_range(0..TOKEN_ALPHABET.len());
            TOKEN_ALPHABET[idx] as char
        })
        .collect()
}

/// Reduce a client-supplied name to its final path component.
#[must_use]
pub fn sanitize_filename(original: &str) -> String {
    let last = original.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if last.is_empty() || last == "." || last == ".." {
        FALLBACK_NAME.to_owned()
    } else {
        last.to_owned()
    }
}

#[must_use]
pub fn stored_filename(original: &str) -> String {
    format!("{}-{}", generate_file_token(), sanitize_filename(original))
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    field: String,
}

impl UploadStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, field: impl Into<String>) -> Self {
        Self { dir: dir.into(), field: field.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn public_url(filename: &str) -> String {
        format!("{PUBLIC_PREFIX}/{filename}")
    }

    /// Drain a multipart body, storing the configured file field.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed or the file cannot be written.
    pub async fn accept(&self, mut multipart: Multipart) -> Result<UploadParts, UploadError> {
        let mut parts = UploadParts::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match field.file_name().map(str::to_owned) {
                // Browsers send an empty filename when no file was chosen.
                Some(original) if name == self.field && parts.file.is_none() && !original.is_empty() => {
                    parts.file = Some(self.write_field(field, &original).await?);
                }
                Some(_) => {}
                None => {
                    parts.fields.insert(name, field.text().await?);
                }
            }
        }

        Ok(parts)
    }

    async fn write_field(&self, mut field: Field<'_>, original: &str) -> Result<StoredFile, UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let filename = stored_filename(original);
        let path = self.dir.join(&filename);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut bytes = 0u64;

        let written: Result<(), UploadError> = async {
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                bytes += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;

        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        tracing::info!(file = %filename, bytes, "stored upload");
        Ok(StoredFile { original_name: original.to_owned(), url: Self::public_url(&filename), filename, path, bytes })
    }

    /// Best-effort removal of a previously stored file by its public URL.
    ///
    /// URLs outside `/uploads` are ignored.
    pub async fn remove(&self, url: &str) {
        let Some(name) = url.strip_prefix(PUBLIC_PREFIX).and_then(|rest| rest.strip_prefix('/')) else {
            return;
        };
        let path = self.dir.join(sanitize_filename(name));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove upload"),
        }
    }
}

#[cfg(test)]
#[path = "upload_test.rs"]
mod tests;
