//! Document upload endpoints

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::domain::document::ProcessingOptions;
use crate::infrastructure::services::{
    DocumentRequest, EnhancedBatchItem, EnhancedOutcome, EnhancedResult,
};

use super::state::AppState;
use super::types::ApiError;

const MAX_BATCH_CONCURRENCY: usize = 256;

/// One file part of a multipart upload
#[derive(Debug)]
struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    fn into_request(self, options: ProcessingOptions) -> DocumentRequest {
        let request = DocumentRequest::new(self.data, self.filename).with_options(options);

        match self.content_type {
            Some(content_type) => request.with_mime_type(content_type),
            None => request,
        }
    }
}

/// Multipart body: any number of file parts plus an optional `options` JSON part
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadedFile>,
    options: Option<String>,
}

impl UploadForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            match name.as_str() {
                "options" => form.options = Some(field.text().await?),
                "file" | "files" => {
                    let filename = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .map(str::to_string)
                        .ok_or_else(|| ApiError::bad_request("file part has no filename"))?;
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await?;

                    form.files.push(UploadedFile {
                        filename,
                        content_type,
                        data,
                    });
                }
                other => debug!(field = %other, "Ignoring unknown multipart field"),
            }
        }

        Ok(form)
    }

    fn options(&self, defaults: &ProcessingOptions) -> Result<ProcessingOptions, ApiError> {
        merge_options(defaults, self.options.as_deref())
    }
}

/// Overlay a partial JSON object onto the configured defaults
///
/// `max_file_size_bytes` is capped at the configured value.
fn merge_options(
    defaults: &ProcessingOptions,
    overrides: Option<&str>,
) -> Result<ProcessingOptions, ApiError> {
    let Some(raw) = overrides.filter(|raw| !raw.trim().is_empty()) else {
        return Ok(defaults.clone());
    };

    let overrides: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
        ApiError::bad_request(format!("Invalid options JSON: {}", e)).with_code("invalid_options")
    })?;

    let serde_json::Value::Object(overrides) = overrides else {
        return Err(
            ApiError::bad_request("options must be a JSON object").with_code("invalid_options")
        );
    };

    let mut merged =
        serde_json::to_value(defaults).map_err(|e| ApiError::internal(e.to_string()))?;

    if let Some(base) = merged.as_object_mut() {
        base.extend(overrides);
    }

    let mut options: ProcessingOptions = serde_json::from_value(merged).map_err(|e| {
        ApiError::bad_request(format!("Invalid options: {}", e)).with_code("invalid_options")
    })?;

    // Requests may tighten the size bound, never raise it
    options.max_file_size_bytes = options.max_file_size_bytes.min(defaults.max_file_size_bytes);

    Ok(options)
}

/// Process a single uploaded file
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<EnhancedResult>, ApiError> {
    let form = UploadForm::read(&mut multipart).await?;
    let options = form.options(&state.default_options)?;

    let file = form
        .files
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("missing 'file' field"))?;

    info!(filename = %file.filename, size = file.data.len(), "Document upload received");

    let result = state.processor.process_file(file.into_request(options)).await?;

    Ok(Json(result))
}

#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub results: Vec<EnhancedBatchItem>,
}

impl BatchResponse {
    fn from_items(results: Vec<EnhancedBatchItem>) -> Self {
        let mut response = Self {
            total: results.len(),
            completed: 0,
            failed: 0,
            cancelled: 0,
            results: Vec::new(),
        };

        for item in &results {
            match item.outcome {
                EnhancedOutcome::Completed(_) => response.completed += 1,
                EnhancedOutcome::Failed { .. } => response.failed += 1,
                EnhancedOutcome::Cancelled => response.cancelled += 1,
            }
        }

        response.results = results;
        response
    }
}

/// Process every uploaded file; results follow upload order
///
/// Jobs that have not started are cancelled if the client goes away.
pub async fn upload_batch(
    State(state): State<AppState>,
    Query(query): Query<BatchQuery>,
    mut multipart: Multipart,
) -> Result<Json<BatchResponse>, ApiError> {
    if let Some(max_concurrent) = query.max_concurrent {
        if !(1..=MAX_BATCH_CONCURRENCY).contains(&max_concurrent) {
            return Err(ApiError::bad_request(format!(
                "max_concurrent must be between 1 and {}",
                MAX_BATCH_CONCURRENCY
            )));
        }
    }

    let form = UploadForm::read(&mut multipart).await?;
    let options = form.options(&state.default_options)?;

    if form.files.is_empty() {
        return Err(ApiError::bad_request("no files uploaded"));
    }

    info!(files = form.files.len(), "Batch upload received");

    let requests = form
        .files
        .into_iter()
        .map(|file| file.into_request(options.clone()))
        .collect();

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let items = state
        .processor
        .process_batch(requests, query.max_concurrent, &cancel)
        .await?;

    Ok(Json(BatchResponse::from_items(items)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::ProcessingMode;

    #[test]
    fn test_missing_options_use_defaults() {
        let defaults = ProcessingOptions {
            enable_ocr: true,
            ..Default::default()
        };

        assert_eq!(merge_options(&defaults, None).unwrap(), defaults);
        assert_eq!(merge_options(&defaults, Some("  ")).unwrap(), defaults);
    }

    #[test]
    fn test_partial_options_overlay_configured_defaults() {
        let defaults = ProcessingOptions {
            enable_ocr: true,
            timeout_seconds: 30,
            ..Default::default()
        };

        let merged =
            merge_options(&defaults, Some(r#"{"processing_mode": "fast", "generate_summary": true}"#))
                .unwrap();

        assert_eq!(merged.processing_mode, ProcessingMode::Fast);
        assert!(merged.generate_summary);
        // untouched fields come from the configured defaults, not the type defaults
        assert!(merged.enable_ocr);
        assert_eq!(merged.timeout_seconds, 30);
    }

    #[test]
    fn test_size_bound_cannot_be_raised() {
        let defaults = ProcessingOptions {
            max_file_size_bytes: 1024,
            ..Default::default()
        };

        let raised = merge_options(&defaults, Some(r#"{"max_file_size_bytes": 1073741824}"#)).unwrap();
        let lowered = merge_options(&defaults, Some(r#"{"max_file_size_bytes": 16}"#)).unwrap();

        assert_eq!(raised.max_file_size_bytes, 1024);
        assert_eq!(lowered.max_file_size_bytes, 16);
    }

    #[test]
    fn test_malformed_options_are_rejected() {
        let defaults = ProcessingOptions::default();

        for raw in ["{not json", "[1, 2]", r#"{"processing_mode": "thorough"}"#] {
            let err = merge_options(&defaults, Some(raw)).unwrap_err();
            assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST, "{}", raw);
        }
    }
}
