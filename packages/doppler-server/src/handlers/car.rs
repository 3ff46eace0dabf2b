use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, StatusCode},
    Json,
};
use doppler_rs::{encode_wav, read_wav, AnalysisReport, DopplerError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::upload::{
    decode_error, internal_error, invalid_multipart, read_audio_field, stage_upload,
    unavailable, ApiError, AudioUpload,
};
use crate::components::ComponentStatus;
use crate::state::ServerState;

fn default_frequency() -> f64 {
    120.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSoundRequest {
    /// Car speed (m/s)
    pub velocity: f64,
    /// Source frequency (Hz)
    #[serde(default = "default_frequency")]
    pub frequency: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CarHealthResponse {
    pub status: String,
    pub sound_generator_available: bool,
    pub sound_analyzer_available: bool,
    pub components: BTreeMap<String, ComponentStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiTestResponse {
    pub message: String,
    pub endpoints: Vec<String>,
}

/// Reports whether the generator and analyzer could be built
pub async fn car_health(State(state): State<Arc<ServerState>>) -> Json<CarHealthResponse> {
    let generator = state.synthesizer().is_ok();
    let analyzer = state.analyzer().is_ok();

    let components = state
        .component_statuses()
        .into_iter()
        .map(|(name, status)| (name.to_string(), status))
        .collect();

    Json(CarHealthResponse {
        status: if generator && analyzer {
            "healthy".to_string()
        } else {
            "degraded".to_string()
        },
        sound_generator_available: generator,
        sound_analyzer_available: analyzer,
        components,
    })
}

pub async fn car_test() -> Json<ApiTestResponse> {
    Json(ApiTestResponse {
        message: "Car sound API is working".to_string(),
        endpoints: vec![
            "/api/car/generate-sound".to_string(),
            "/api/car/analyze-sound".to_string(),
            "/api/car/health".to_string(),
        ],
    })
}

fn validate_generate_request(
    state: &ServerState,
    request: &GenerateSoundRequest,
) -> Result<(), ApiError> {
    let config = &state.config;
    if !request.velocity.is_finite()
        || request.velocity < 0.0
        || request.velocity > config.max_car_speed
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "velocity must be between 0 and {} m/s, got {}",
                config.max_car_speed, request.velocity
            ),
        ));
    }
    if !request.frequency.is_finite()
        || request.frequency < config.min_frequency
        || request.frequency > config.max_frequency
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "frequency must be between {} and {} Hz, got {}",
                config.min_frequency, config.max_frequency, request.frequency
            ),
        ));
    }
    Ok(())
}

/// Synthesize a pass and return it as a WAV attachment
pub async fn generate_sound(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<GenerateSoundRequest>,
) -> Result<([(HeaderName, &'static str); 2], Vec<u8>), ApiError> {
    validate_generate_request(&state, &request)?;
    state.synthesizer().map_err(unavailable)?;

    info!(
        "Generating pass: {} m/s at {} Hz",
        request.velocity, request.frequency
    );

    let worker_state = state.clone();
    let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ApiError> {
        let synthesizer = worker_state.synthesizer().map_err(unavailable)?;
        let waveform = synthesizer
            .synthesize(request.frequency, request.velocity)
            .map_err(|e| match e {
                DopplerError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
                other => internal_error("Synthesis failed", other),
            })?;
        encode_wav(&waveform).map_err(|e| internal_error("Failed to encode WAV", e))
    })
    .await
    .map_err(|e| internal_error("Synthesis task failed", e))??;

    debug!("Generated {} bytes of WAV audio", bytes.len());

    Ok((
        [
            (header::CONTENT_TYPE, "audio/wav"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"doppler_saturated_tone.wav\"",
            ),
        ],
        bytes,
    ))
}

fn parse_expected_frequency(text: &str) -> Result<Option<f64>, ApiError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    match text.parse::<f64>() {
        Ok(f) if f.is_finite() && f > 0.0 => Ok(Some(f)),
        _ => Err((
            StatusCode::BAD_REQUEST,
            format!("expected_frequency must be a positive number, got '{}'", text),
        )),
    }
}

/// Estimate speed and trend from an uploaded WAV recording
pub async fn analyze_sound(
    State(state): State<Arc<ServerState>>,
    mut multipart: Multipart,
) -> Result<Json<AnalysisReport>, ApiError> {
    let mut audio: Option<AudioUpload> = None;
    let mut expected_frequency: Option<f64> = None;

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "audio" => {
                audio = Some(read_audio_field(field, state.config.max_upload_size).await?);
            }
            "expected_frequency" => {
                let text = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read expected_frequency: {}", e),
                    )
                })?;
                expected_frequency = parse_expected_frequency(&text)?;
            }
            _ => debug!("Ignoring multipart field '{}'", name),
        }
    }

    let audio = audio.ok_or((
        StatusCode::BAD_REQUEST,
        "Missing 'audio' file field".to_string(),
    ))?;
    state.analyzer().map_err(unavailable)?;

    // Staged inside the blocking task; removed when the task ends, even if
    // this request is dropped first
    let filename = audio.filename.clone();
    let worker_state = state.clone();
    let report = tokio::task::spawn_blocking(move || -> Result<AnalysisReport, ApiError> {
        let staged = stage_upload(&worker_state.config.upload_directory, &audio)?;
        let analyzer = worker_state.analyzer().map_err(unavailable)?;
        let decoded = read_wav(staged.path()).map_err(decode_error)?;
        Ok(analyzer.analyze(&decoded.waveform, expected_frequency))
    })
    .await
    .map_err(|e| internal_error("Analysis task failed", e))??;

    info!(
        "Analyzed {}: success={}, quality={:?}",
        filename,
        report.success,
        report.data_quality()
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_parse_expected_frequency() {
        assert_eq!(parse_expected_frequency("").unwrap(), None);
        assert_eq!(parse_expected_frequency(" 150 ").unwrap(), Some(150.0));
        assert!(parse_expected_frequency("0").is_err());
        assert!(parse_expected_frequency("-120").is_err());
        assert!(parse_expected_frequency("NaN").is_err());
        assert!(parse_expected_frequency("loud").is_err());
    }

    #[test]
    fn test_validate_generate_request() {
        let state = ServerState::new(ServerConfig::default());
        let request = |velocity, frequency| GenerateSoundRequest {
            velocity,
            frequency,
        };

        assert!(validate_generate_request(&state, &request(0.0, 20.0)).is_ok());
        assert!(validate_generate_request(&state, &request(100.0, 1000.0)).is_ok());
        assert!(validate_generate_request(&state, &request(-1.0, 120.0)).is_err());
        assert!(validate_generate_request(&state, &request(100.5, 120.0)).is_err());
        assert!(validate_generate_request(&state, &request(30.0, 19.0)).is_err());
        assert!(validate_generate_request(&state, &request(30.0, f64::NAN)).is_err());
    }

    #[test]
    fn test_default_frequency() {
        let request: GenerateSoundRequest = serde_json::from_str(r#"{"velocity": 30}"#).unwrap();
        assert_eq!(request.frequency, 120.0);
    }
}
