//! `UploadForm` extractor: the request-side half of the upload middleware.
//!
//! Multipart bodies go through `UploadStore::accept`, which writes the
//! configured file field to disk. Plain urlencoded bodies are accepted too
//! and simply carry no file.

use std::collections::HashMap;

use axum::extract::{FromRef, FromRequest, Multipart, Request};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Form;

use crate::services::upload::{StoredFile, UploadError};
use crate::state::AppState;

pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<StoredFile>,
}

impl UploadForm {
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.url.as_str())
    }

    /// Delete the stored file when the request fails after the upload.
    pub async fn discard(&self, state: &AppState) {
        if let Some(url) = self.photo_url() {
            state.uploads.remove(url).await;
        }
    }
}

pub(crate) fn upload_error_to_status(err: &UploadError) -> StatusCode {
    match err {
        UploadError::Multipart(e) => e.status(),
        UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
}

impl<S> FromRequest<S> for UploadForm
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&request) {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self { fields, file: None });
        }

        let uploads = AppState::from_ref(state).uploads;
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;

        let parts = uploads.accept(multipart).await.map_err(|e| {
            tracing::warn!(error = %e, "upload rejected");
            upload_error_to_status(&e).into_response()
        })?;

        if let Some(file) = &parts.file {
            tracing::debug!(original = %file.original_name, path = %file.path.display(), bytes = file.bytes, "upload attached");
        }
        Ok(Self { fields: parts.fields, file: parts.file })
    }
}
