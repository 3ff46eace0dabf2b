use serde::{Deserialize, Serialize};

use crate::error::{DopplerError, Result};
use crate::types::{MotionModel, PassGeometry, Waveform};

/// Output format and timbre of the synthesized pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthesizerConfig {
    pub sample_rate: u32,
    /// `tanh` saturation gain
    pub drive: f64,
    /// Amplitude numerator of the `1/d` envelope
    pub base_amplitude: f64,
    /// Relative level of the second harmonic
    pub harmonic_gain: f64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            drive: 4.0,
            base_amplitude: 1.5,
            harmonic_gain: 0.5,
        }
    }
}

/// Forward model: turns a constant-velocity pass into a saturated,
/// Doppler-shifted tone as heard by a stationary observer.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    geometry: PassGeometry,
    config: SynthesizerConfig,
}

impl Synthesizer {
    pub fn new(geometry: PassGeometry, config: SynthesizerConfig) -> Result<Self> {
        geometry.validate()?;
        if config.sample_rate == 0 {
            return Err(DopplerError::Validation(
                "sample_rate must be positive".to_string(),
            ));
        }
        if !config.drive.is_finite() || config.drive <= 0.0 {
            return Err(DopplerError::Validation(format!(
                "drive must be positive, got {}",
                config.drive
            )));
        }
        if !config.base_amplitude.is_finite() || config.base_amplitude <= 0.0 {
            return Err(DopplerError::Validation(format!(
                "base_amplitude must be positive, got {}",
                config.base_amplitude
            )));
        }
        Ok(Self { geometry, config })
    }

    pub fn geometry(&self) -> &PassGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Number of samples every waveform from this synthesizer will have
    pub fn sample_count(&self) -> usize {
        (self.geometry.duration * self.config.sample_rate as f64).round() as usize
    }

    /// Synthesize a pass at `car_speed` (m/s) of a tone at `source_frequency` (Hz).
    pub fn synthesize(&self, source_frequency: f64, car_speed: f64) -> Result<Waveform> {
        let model = MotionModel::new(source_frequency, car_speed, self.geometry)?;
        self.render(&model)
    }

    /// Render an already validated model
    pub fn render(&self, model: &MotionModel) -> Result<Waveform> {
        let n = self.sample_count();
        let fs = self.config.sample_rate as f64;

        log::info!(
            "Synthesizing {} samples at {} Hz: f_source={:.1} Hz, car_speed={:.2} m/s",
            n,
            self.config.sample_rate,
            model.source_frequency,
            model.car_speed
        );

        // linspace(0, duration, n) including the endpoint
        let dt = if n > 1 {
            model.geometry.duration / (n - 1) as f64
        } else {
            0.0
        };

        let two_pi = 2.0 * std::f64::consts::PI;
        let mut cumulative_frequency = 0.0;
        let mut shaped = Vec::with_capacity(n);
        let mut peak = 0.0f64;

        for i in 0..n {
            let t = i as f64 * dt;
            let v_r = model.radial_velocity(t);
            if v_r >= model.geometry.speed_of_sound {
                return Err(DopplerError::Validation(format!(
                    "radial velocity {:.2} m/s reached the speed of sound",
                    v_r
                )));
            }
            cumulative_frequency += model.geometry.observed_frequency(model.source_frequency, v_r);
            let phase = two_pi * cumulative_frequency / fs;

            let clean = phase.sin() + self.config.harmonic_gain * (2.0 * phase).sin();
            let saturated = (clean * self.config.drive).tanh();
            let value = saturated * self.config.base_amplitude / model.distance(t);

            peak = peak.max(value.abs());
            shaped.push(value);
        }

        let samples: Vec<i16> = if peak > 0.0 {
            shaped
                .iter()
                .map(|&v| (v / peak * i16::MAX as f64).round() as i16)
                .collect()
        } else {
            vec![0; n]
        };

        log::debug!("Synthesis peak amplitude before normalization: {:.6}", peak);

        Waveform::new(samples, self.config.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_synth() -> Synthesizer {
        let geometry = PassGeometry {
            duration: 2.0,
            ..PassGeometry::default()
        };
        let config = SynthesizerConfig {
            sample_rate: 8000,
            ..SynthesizerConfig::default()
        };
        Synthesizer::new(geometry, config).unwrap()
    }

    #[test]
    fn test_default_sample_count() {
        let synth = Synthesizer::new(PassGeometry::default(), SynthesizerConfig::default()).unwrap();
        assert_eq!(synth.sample_count(), 529_200);
    }

    #[test]
    fn test_synthesize_length_and_full_scale() {
        let synth = short_synth();
        let wf = synth.synthesize(200.0, 20.0).unwrap();

        assert_eq!(wf.len(), 16_000);
        assert_eq!(wf.sample_rate(), 8000);
        let peak = wf.samples().iter().map(|&s| (s as i32).abs()).max().unwrap();
        assert_eq!(peak, i16::MAX as i32);
    }

    #[test]
    fn test_loudest_near_closest_approach() {
        let synth = short_synth();
        let wf = synth.synthesize(200.0, 30.0).unwrap();
        let samples = wf.samples();

        let window_peak = |range: std::ops::Range<usize>| {
            samples[range].iter().map(|&s| (s as i32).abs()).max().unwrap()
        };
        let edge = window_peak(0..400);
        let centre = window_peak(7800..8200);
        assert!(centre > edge * 2, "centre {} edge {}", centre, edge);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let synth = short_synth();
        assert!(matches!(
            synth.synthesize(120.0, 400.0),
            Err(DopplerError::Validation(_))
        ));
        assert!(matches!(
            synth.synthesize(0.0, 10.0),
            Err(DopplerError::Validation(_))
        ));
        assert!(matches!(
            synth.synthesize(120.0, -1.0),
            Err(DopplerError::Validation(_))
        ));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SynthesizerConfig {
            sample_rate: 0,
            ..SynthesizerConfig::default()
        };
        assert!(Synthesizer::new(PassGeometry::default(), config).is_err());

        let config = SynthesizerConfig {
            drive: 0.0,
            ..SynthesizerConfig::default()
        };
        assert!(Synthesizer::new(PassGeometry::default(), config).is_err());
    }
}
