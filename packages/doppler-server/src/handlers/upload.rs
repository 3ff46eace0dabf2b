use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use doppler_rs::DopplerError;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{error, info};

pub(crate) const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

pub(crate) type ApiError = (StatusCode, String);

/// An uploaded audio file held in memory until it is written out
pub(crate) struct AudioUpload {
    pub filename: String,
    pub data: Bytes,
}

pub(crate) fn invalid_multipart(e: MultipartError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        format!("Invalid multipart data: {}", e),
    )
}

pub(crate) fn internal_error(context: &str, e: impl std::fmt::Display) -> ApiError {
    error!("{}: {}", context, e);
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

pub(crate) fn unavailable(message: String) -> ApiError {
    (StatusCode::SERVICE_UNAVAILABLE, message)
}

pub(crate) fn decode_error(e: DopplerError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        format!("Could not decode WAV audio: {}", e),
    )
}

fn check_extension(filename: &str) -> Result<(), ApiError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Unsupported file type '{}'. Supported: {}",
                filename,
                SUPPORTED_EXTENSIONS.join(", ")
            ),
        ))
    }
}

/// Read an audio file field, rejecting unsupported containers and
/// oversized payloads
pub(crate) async fn read_audio_field(
    field: Field<'_>,
    max_upload_size: u64,
) -> Result<AudioUpload, ApiError> {
    let filename = field
        .file_name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "upload.wav".to_string());
    check_extension(&filename)?;

    let data = field.bytes().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read file: {}", e),
        )
    })?;

    if data.len() as u64 > max_upload_size {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File too large. Maximum size: {} bytes", max_upload_size),
        ));
    }

    Ok(AudioUpload { filename, data })
}

/// Write an upload to a temporary file in the upload directory.
///
/// Blocking; call from the worker that consumes the file. The file is removed
/// when the returned handle drops, including on every error path here.
pub(crate) fn stage_upload(
    upload_directory: &Path,
    upload: &AudioUpload,
) -> Result<NamedTempFile, ApiError> {
    std::fs::create_dir_all(upload_directory)
        .map_err(|e| internal_error("Failed to create upload directory", e))?;

    let stem = Path::new(&upload.filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let mut file = tempfile::Builder::new()
        .prefix(&format!("{}-", sanitize_filename(stem)))
        .suffix(".wav")
        .tempfile_in(upload_directory)
        .map_err(|e| internal_error("Failed to create upload file", e))?;

    file.write_all(&upload.data)
        .and_then(|_| file.flush())
        .map_err(|e| internal_error("Failed to save file", e))?;

    info!(
        "File uploaded: {} ({} bytes)",
        file.path().display(),
        upload.data.len()
    );
    Ok(file)
}

fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .take(100)
        .collect()
}
