use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use doppler_rs::{decode_wav, summarize, AudioSummary};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::upload::{
    decode_error, internal_error, invalid_multipart, read_audio_field, stage_upload, ApiError,
    AudioUpload,
};
use crate::state::ServerState;

#[derive(Debug, Serialize, Deserialize)]
pub struct AudioSummaryResponse {
    pub filename: String,
    #[serde(flatten)]
    pub summary: AudioSummary,
}

/// Summarize an uploaded WAV file without estimating velocity
pub async fn analyze_audio(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> Result<Json<AudioSummaryResponse>, ApiError> {
    let mut upload: Option<AudioUpload> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            upload = Some(read_audio_field(field, state.config.max_upload_size).await?);
        } else {
            debug!("Ignoring multipart field '{}'", name);
        }
    }

    let upload = upload.ok_or((
        StatusCode::BAD_REQUEST,
        "Missing 'file' field".to_string(),
    ))?;

    let filename = upload.filename.clone();
    let upload_directory = state.config.upload_directory.clone();
    let summary = tokio::task::spawn_blocking(move || -> Result<AudioSummary, ApiError> {
        let staged = stage_upload(&upload_directory, &upload)?;
        let bytes = std::fs::read(staged.path())
            .map_err(|e| internal_error("Failed to read upload", e))?;
        let decoded = decode_wav(&bytes).map_err(decode_error)?;
        Ok(summarize(&decoded))
    })
    .await
    .map_err(|e| internal_error("Summary task failed", e))??;

    info!(
        "Summarized {}: {:.2}s, peak {:.1} Hz",
        filename, summary.duration_seconds, summary.peak_frequency_hz
    );

    Ok(Json(AudioSummaryResponse { filename, summary }))
}
