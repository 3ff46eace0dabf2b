use serde::{Deserialize, Serialize};

use crate::error::{DopplerError, Result};

/// Speed of sound in air at roughly 20 °C (m/s)
pub const SPEED_OF_SOUND: f64 = 343.0;

/// Geometry of a straight-line pass by a stationary observer.
///
/// The Synthesizer and the Analyzer both work from one value of this type, so
/// the forward model and its inversion always agree on the constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassGeometry {
    /// Perpendicular distance between the path and the observer (m)
    pub closest_approach: f64,
    /// Length of the pass (s); the closest point is reached at `duration / 2`
    pub duration: f64,
    /// Propagation speed (m/s)
    pub speed_of_sound: f64,
}

impl Default for PassGeometry {
    fn default() -> Self {
        Self {
            closest_approach: 10.0,
            duration: 12.0,
            speed_of_sound: SPEED_OF_SOUND,
        }
    }
}

impl PassGeometry {
    pub fn validate(&self) -> Result<()> {
        if !self.closest_approach.is_finite() || self.closest_approach <= 0.0 {
            return Err(DopplerError::Validation(format!(
                "closest_approach must be positive, got {}",
                self.closest_approach
            )));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(DopplerError::Validation(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if !self.speed_of_sound.is_finite() || self.speed_of_sound <= 0.0 {
            return Err(DopplerError::Validation(format!(
                "speed_of_sound must be positive, got {}",
                self.speed_of_sound
            )));
        }
        Ok(())
    }

    /// Position along the path at time `t`, zero at closest approach
    #[inline]
    pub fn position(&self, t: f64, car_speed: f64) -> f64 {
        car_speed * (t - self.duration / 2.0)
    }

    /// Source-to-observer distance at time `t`
    #[inline]
    pub fn distance(&self, t: f64, car_speed: f64) -> f64 {
        let x = self.position(t, car_speed);
        (x * x + self.closest_approach * self.closest_approach).sqrt()
    }

    /// Velocity component along the line of sight: `car_speed * x / d`.
    ///
    /// Zero at closest approach, tends to `±car_speed` far from it.
    #[inline]
    pub fn radial_velocity(&self, t: f64, car_speed: f64) -> f64 {
        let x = self.position(t, car_speed);
        car_speed * x / (x * x + self.closest_approach * self.closest_approach).sqrt()
    }

    /// Derivative of [`radial_velocity`](Self::radial_velocity) with respect to `car_speed`
    #[inline]
    pub fn radial_velocity_derivative(&self, t: f64, car_speed: f64) -> f64 {
        let s = t - self.duration / 2.0;
        let x = car_speed * s;
        let d2 = x * x + self.closest_approach * self.closest_approach;
        let d = d2.sqrt();
        s * car_speed * (x * x + 2.0 * self.closest_approach * self.closest_approach) / (d2 * d)
    }

    /// Stationary-observer / moving-source Doppler formula
    #[inline]
    pub fn observed_frequency(&self, source_frequency: f64, radial_velocity: f64) -> f64 {
        source_frequency * self.speed_of_sound / (self.speed_of_sound - radial_velocity)
    }

    /// Inverse of [`observed_frequency`](Self::observed_frequency)
    #[inline]
    pub fn radial_velocity_from_frequency(&self, source_frequency: f64, observed: f64) -> f64 {
        self.speed_of_sound * (1.0 - source_frequency / observed)
    }
}

/// A constant-velocity pass of a tonal source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionModel {
    /// Emitted frequency (Hz)
    pub source_frequency: f64,
    /// Speed along the path (m/s)
    pub car_speed: f64,
    pub geometry: PassGeometry,
}

impl MotionModel {
    /// Build a validated model.
    ///
    /// Rejects `car_speed` outside `[0, speed_of_sound)` and non-positive
    /// source frequencies; nothing is clamped.
    pub fn new(source_frequency: f64, car_speed: f64, geometry: PassGeometry) -> Result<Self> {
        geometry.validate()?;

        if !source_frequency.is_finite() || source_frequency <= 0.0 {
            return Err(DopplerError::Validation(format!(
                "source_frequency must be positive, got {} Hz",
                source_frequency
            )));
        }
        if !car_speed.is_finite() || car_speed < 0.0 {
            return Err(DopplerError::Validation(format!(
                "car_speed must be non-negative, got {} m/s",
                car_speed
            )));
        }
        if car_speed >= geometry.speed_of_sound {
            return Err(DopplerError::Validation(format!(
                "car_speed {} m/s must be below the speed of sound ({} m/s)",
                car_speed, geometry.speed_of_sound
            )));
        }

        Ok(Self {
            source_frequency,
            car_speed,
            geometry,
        })
    }

    pub fn position(&self, t: f64) -> f64 {
        self.geometry.position(t, self.car_speed)
    }

    pub fn distance(&self, t: f64) -> f64 {
        self.geometry.distance(t, self.car_speed)
    }

    pub fn radial_velocity(&self, t: f64) -> f64 {
        self.geometry.radial_velocity(t, self.car_speed)
    }

    pub fn observed_frequency(&self, t: f64) -> f64 {
        self.geometry
            .observed_frequency(self.source_frequency, self.radial_velocity(t))
    }
}

/// Mono 16-bit PCM audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    samples: Vec<i16>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<i16>, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DopplerError::Validation(
                "sample_rate must be positive".to_string(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn to_f64(&self) -> Vec<f64> {
        self.samples.iter().map(|&s| s as f64).collect()
    }

    /// Copy with the samples in reverse order
    pub fn reversed(&self) -> Waveform {
        let mut samples = self.samples.clone();
        samples.reverse();
        Waveform {
            samples,
            sample_rate: self.sample_rate,
        }
    }
}

/// One accepted spectrogram slice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: f64,
    pub frequency: f64,
}

/// Time-ordered dominant-frequency track; sparse, may contain gaps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTrack {
    pub points: Vec<TrackPoint>,
}

impl FrequencyTrack {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.time).collect()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.frequency).collect()
    }

    pub fn max_frequency(&self) -> Option<f64> {
        self.points.iter().map(|p| p.frequency).reduce(f64::max)
    }

    pub fn min_frequency(&self) -> Option<f64> {
        self.points.iter().map(|p| p.frequency).reduce(f64::min)
    }

    pub fn mean_frequency(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|p| p.frequency).sum::<f64>() / self.points.len() as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementTrend {
    Approaching,
    Receding,
    PassingBy,
}

impl std::fmt::Display for MovementTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementTrend::Approaching => write!(f, "approaching"),
            MovementTrend::Receding => write!(f, "receding"),
            MovementTrend::PassingBy => write!(f, "passing_by"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    High,
    Failed,
}

/// How the speed estimate was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimationMethod {
    CurveFit,
    Fallback,
}

/// Result of inverting a frequency track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityEstimate {
    /// Constant speed along the path (m/s)
    pub car_speed_estimate: f64,
    pub movement_trend: MovementTrend,
    pub data_quality: DataQuality,
    pub method: EstimationMethod,
}
