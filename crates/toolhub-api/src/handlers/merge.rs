//! PDF merge submission handler.

use axum::Json;
use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde_json::{Map, Value};

use toolhub_core::error::AppError;
use toolhub_entity::blob::NewBlob;
use toolhub_entity::job::model::FILE_IDS_ARG;
use toolhub_worker::commands::merge_pdfs::COMMAND_NAME;

use crate::dto::response::{CommandStartedResponse, UploadedFile};
use crate::error::ApiResult;
use crate::extractors::Caller;
use crate::state::AppState;

/// Multipart field carrying the PDFs.
pub const FILES_FIELD: &str = "files";

/// Blob metadata `purpose` of merge inputs.
pub const MERGE_INPUT_PURPOSE: &str = "merge_input";

const PDF_CONTENT_TYPE: &str = "application/pdf";
const MIN_MERGE_FILES: usize = 2;

/// One file read from the multipart body.
#[derive(Debug)]
struct Upload {
    filename: String,
    content_type: String,
    data: Bytes,
}

/// POST /api/mergePdfs
///
/// Every file is validated before any is stored, so a rejected request
/// leaves nothing behind.
pub async fn merge_pdfs(
    State(state): State<AppState>,
    caller: Caller,
    mut multipart: Multipart,
) -> ApiResult<Json<CommandStartedResponse>> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload.pdf").to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Read error: {e}")))?;
        uploads.push(Upload {
            filename,
            content_type,
            data,
        });
    }

    validate_uploads(&uploads)?;

    let mut uploaded_files = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let blob = NewBlob::new(upload.filename.clone(), upload.data)
            .content_type(upload.content_type)
            .meta("purpose", MERGE_INPUT_PURPOSE)
            .meta("user_id", caller.user_id.clone())
            .meta("user_email", caller.email.clone());
        let file_id = state.blobs.store(blob).await?;
        uploaded_files.push(UploadedFile {
            filename: upload.filename,
            file_id,
        });
    }

    let mut arguments = Map::new();
    arguments.insert(
        FILE_IDS_ARG.to_string(),
        Value::Array(
            uploaded_files
                .iter()
                .map(|f| Value::String(f.file_id.to_string()))
                .collect(),
        ),
    );
    arguments.insert("user_id".to_string(), Value::String(caller.user_id.clone()));
    arguments.insert("user_email".to_string(), Value::String(caller.email.clone()));

    let command_id = state.dispatcher.submit(COMMAND_NAME, arguments).await?;

    tracing::info!(
        command_id = %command_id,
        user_id = %caller.user_id,
        files = uploaded_files.len(),
        "PDF merge submitted"
    );

    Ok(Json(CommandStartedResponse {
        success: true,
        command_id,
        message: format!("PDF merge started for {} files", uploaded_files.len()),
        uploaded_files,
    }))
}

fn validate_uploads(uploads: &[Upload]) -> Result<(), AppError> {
    if uploads.len() < MIN_MERGE_FILES {
        return Err(AppError::validation(
            "At least 2 PDF files are required for merging",
        ));
    }

    for upload in uploads {
        if !upload.content_type.starts_with(PDF_CONTENT_TYPE) {
            return Err(AppError::validation(format!(
                "File '{}' is not a PDF. Only PDF files are allowed.",
                upload.filename
            )));
        }
        if upload.data.is_empty() {
            return Err(AppError::validation(format!(
                "File '{}' is empty",
                upload.filename
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str, data: &'static [u8]) -> Upload {
        Upload {
            filename: name.to_string(),
            content_type: content_type.to_string(),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_requires_two_files() {
        let err = validate_uploads(&[upload("a.pdf", "application/pdf", b"%PDF")]).unwrap_err();
        assert_eq!(err.message, "At least 2 PDF files are required for merging");
    }

    #[test]
    fn test_rejects_non_pdf_and_empty() {
        let err = validate_uploads(&[
            upload("a.pdf", "application/pdf", b"%PDF"),
            upload("notes.txt", "text/plain", b"hello"),
        ])
        .unwrap_err();
        assert!(err.message.contains("'notes.txt' is not a PDF"));

        let err = validate_uploads(&[
            upload("a.pdf", "application/pdf", b"%PDF"),
            upload("b.pdf", "application/pdf", b""),
        ])
        .unwrap_err();
        assert_eq!(err.message, "File 'b.pdf' is empty");
    }

    #[test]
    fn test_accepts_pdf_with_parameters() {
        assert!(
            validate_uploads(&[
                upload("a.pdf", "application/pdf", b"%PDF"),
                upload("b.pdf", "application/pdf; charset=binary", b"%PDF"),
            ])
            .is_ok()
        );
    }
}
