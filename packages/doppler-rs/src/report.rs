use serde::{Deserialize, Serialize};

use crate::spectral::Spectrogram;
use crate::types::{
    DataQuality, EstimationMethod, FrequencyTrack, MovementTrend, VelocityEstimate, Waveform,
};

const MS_TO_KMH: f64 = 3.6;

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformStats {
    pub duration_seconds: f64,
    pub max_amplitude: i32,
    pub avg_amplitude: i32,
    pub dynamic_range: String,
}

impl WaveformStats {
    pub fn from_waveform(waveform: &Waveform) -> Self {
        let samples = waveform.samples();
        if samples.is_empty() {
            return Self {
                duration_seconds: 0.0,
                max_amplitude: 0,
                avg_amplitude: 0,
                dynamic_range: "0 to 0".to_string(),
            };
        }

        let last_time = (samples.len() - 1) as f64 / waveform.sample_rate() as f64;
        let max_amplitude = samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
        let total: i64 = samples.iter().map(|&s| (s as i64).abs()).sum();
        let avg_amplitude = (total / samples.len() as i64) as i32;
        let min = samples.iter().copied().min().unwrap_or(0);
        let max = samples.iter().copied().max().unwrap_or(0);

        Self {
            duration_seconds: round_to(last_time, 2),
            max_amplitude,
            avg_amplitude,
            dynamic_range: format!("{} to {}", min, max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrequencyStability {
    Stable,
    Varying,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramStats {
    /// Mean of the per-slice strongest bin (Hz)
    pub dominant_frequency: f64,
    pub frequency_range: String,
    pub frequency_stability: FrequencyStability,
}

impl SpectrogramStats {
    /// Spread (standard deviation, Hz) below which the dominant frequency counts as stable
    pub const STABILITY_THRESHOLD_HZ: f64 = 20.0;

    pub fn from_spectrogram(spec: &Spectrogram) -> Self {
        let dominant: Vec<f64> = spec
            .power
            .iter()
            .filter_map(|slice| {
                let (k, &p) = slice
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.total_cmp(b.1))?;
                (p > 0.0).then(|| spec.frequencies[k])
            })
            .collect();

        if dominant.is_empty() {
            return Self {
                dominant_frequency: 0.0,
                frequency_range: "N/A".to_string(),
                frequency_stability: FrequencyStability::Stable,
            };
        }

        let n = dominant.len() as f64;
        let mean = dominant.iter().sum::<f64>() / n;
        let variance = dominant.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n;
        let min = dominant.iter().copied().fold(f64::INFINITY, f64::min);
        let max = dominant.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            dominant_frequency: round_to(mean, 1),
            frequency_range: format!("{}-{} Hz", min as i64, max as i64),
            frequency_stability: if variance.sqrt() < Self::STABILITY_THRESHOLD_HZ {
                FrequencyStability::Stable
            } else {
                FrequencyStability::Varying
            },
        }
    }
}

/// Speed and Doppler statistics of one analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityStats {
    pub max_speed_ms: f64,
    pub min_speed_ms: f64,
    pub avg_speed_ms: f64,
    pub max_speed_kmh: f64,
    pub min_speed_kmh: f64,
    pub avg_speed_kmh: f64,
    pub movement_trend: Option<MovementTrend>,
    pub max_radial_velocity_ms: Option<f64>,
    pub detected_frequency_hz: Option<f64>,
    pub source_frequency_hz: f64,
    pub frequency_shift_hz: Option<f64>,
    pub data_quality: DataQuality,
    pub valid_data_points: usize,
    pub estimation_method: Option<EstimationMethod>,
    pub note: String,
}

impl VelocityStats {
    pub fn from_estimate(
        estimate: &VelocityEstimate,
        track: &FrequencyTrack,
        radial_velocities: &[f64],
        source_frequency: f64,
    ) -> Self {
        // A constant-velocity model has a single speed; min/avg/max coincide
        let speed = round_to(estimate.car_speed_estimate, 2);
        let speed_kmh = round_to(estimate.car_speed_estimate * MS_TO_KMH, 1);
        let max_radial = radial_velocities
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));
        let mean_frequency = track.mean_frequency();

        let note = match estimate.method {
            EstimationMethod::CurveFit => {
                "Constant-speed fit of the pass-by radial velocity model".to_string()
            }
            EstimationMethod::Fallback => {
                "Curve fit did not converge; speed estimated from the peak radial velocity"
                    .to_string()
            }
        };

        Self {
            max_speed_ms: speed,
            min_speed_ms: speed,
            avg_speed_ms: speed,
            max_speed_kmh: speed_kmh,
            min_speed_kmh: speed_kmh,
            avg_speed_kmh: speed_kmh,
            movement_trend: Some(estimate.movement_trend),
            max_radial_velocity_ms: Some(round_to(max_radial, 2)),
            detected_frequency_hz: mean_frequency.map(|f| round_to(f, 1)),
            source_frequency_hz: round_to(source_frequency, 1),
            frequency_shift_hz: mean_frequency.map(|f| round_to(f - source_frequency, 1)),
            data_quality: estimate.data_quality,
            valid_data_points: track.len(),
            estimation_method: Some(estimate.method),
            note,
        }
    }

    pub fn failed(source_frequency: f64, valid_data_points: usize, reason: &str) -> Self {
        Self {
            max_speed_ms: 0.0,
            min_speed_ms: 0.0,
            avg_speed_ms: 0.0,
            max_speed_kmh: 0.0,
            min_speed_kmh: 0.0,
            avg_speed_kmh: 0.0,
            movement_trend: None,
            max_radial_velocity_ms: None,
            detected_frequency_hz: None,
            source_frequency_hz: if source_frequency.is_finite() {
                round_to(source_frequency, 1)
            } else {
                0.0
            },
            frequency_shift_hz: None,
            data_quality: DataQuality::Failed,
            valid_data_points,
            estimation_method: None,
            note: format!("Analysis failed: {}", reason),
        }
    }
}

/// Everything one analysis call produces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: String,
    pub created_at: String,
    /// True when a velocity could be estimated
    pub success: bool,
    /// Encoding of the three plots (base64 of this format)
    pub plot_format: String,
    pub waveform_plot: String,
    pub spectrogram_plot: String,
    pub velocity_plot: String,
    pub waveform_stats: WaveformStats,
    pub spectrogram_stats: SpectrogramStats,
    pub velocity_stats: VelocityStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity_estimate: Option<VelocityEstimate>,
}

impl AnalysisReport {
    pub fn data_quality(&self) -> DataQuality {
        self.velocity_stats.data_quality
    }
}
