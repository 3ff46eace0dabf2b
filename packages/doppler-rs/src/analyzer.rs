//! Inverse model: recover source frequency, frequency track, speed and
//! movement trend from a recorded pass.

use serde::{Deserialize, Serialize};

use crate::error::{DopplerError, Result};
use crate::fit::{fit_car_speed, FitOptions};
use crate::plot::{self, VelocityPlot};
use crate::report::{AnalysisReport, SpectrogramStats, VelocityStats, WaveformStats};
use crate::spectral::{parabolic_offset, percentile, spectrogram, welch, Spectrogram, SpectrogramConfig};
use crate::types::{
    DataQuality, EstimationMethod, FrequencyTrack, MovementTrend, PassGeometry, TrackPoint,
    VelocityEstimate, Waveform,
};

/// Closed frequency interval, either absolute (Hz) or relative to the
/// source frequency depending on where it is used
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    pub fn scaled(&self, factor: f64) -> Band {
        Band::new(self.low * factor, self.high * factor)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() || self.low < 0.0 || self.low >= self.high
        {
            return Err(DopplerError::Validation(format!(
                "{} must satisfy 0 <= low < high, got [{}, {}]",
                name, self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Analyzer tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub spectrogram: SpectrogramConfig,
    /// Welch segment length for source-frequency detection
    pub psd_segment: usize,
    /// Absolute band (Hz) searched for the source frequency
    pub detection_band: Band,
    pub default_source_frequency: f64,
    /// Per-slice search band, relative to the source frequency
    pub search_band: Band,
    /// Band the picked peak must fall in, relative to the source frequency
    pub acceptance_band: Band,
    /// Slice peak must exceed this percentile of the slice spectrum.
    /// Heuristic; calibrate against recorded passes.
    pub acceptance_percentile: f64,
    pub refine_peaks: bool,
    /// Fit bounds for the speed (m/s)
    pub speed_bounds: Band,
    pub initial_guess_scale: f64,
    /// Iteration budget of the speed fit; running out falls back to the
    /// peak radial velocity estimate
    pub fit_max_iterations: usize,
    /// Divisor applied to the peak radial velocity when the fit diverges.
    /// Heuristic; calibrate against recorded passes.
    pub fallback_correction: f64,
    pub min_track_points: usize,
    pub trend_tolerance: f64,
    pub trend_floor_hz: f64,
    pub display_max_frequency: f64,
    pub render_plots: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            spectrogram: SpectrogramConfig::default(),
            psd_segment: 4096,
            detection_band: Band::new(50.0, 500.0),
            default_source_frequency: 120.0,
            search_band: Band::new(0.6, 1.6),
            acceptance_band: Band::new(0.7, 1.5),
            acceptance_percentile: 90.0,
            refine_peaks: true,
            speed_bounds: Band::new(0.0, 200.0),
            initial_guess_scale: 1.2,
            fit_max_iterations: FitOptions::default().max_iterations,
            fallback_correction: 0.97,
            min_track_points: 2,
            trend_tolerance: 0.5,
            trend_floor_hz: 2.0,
            display_max_frequency: 1000.0,
            render_plots: true,
        }
    }
}

impl AnalyzerConfig {
    pub fn validate(&self) -> Result<()> {
        let window = &self.spectrogram;
        if window.window_size < 4 || window.overlap >= window.window_size {
            return Err(DopplerError::Validation(format!(
                "spectrogram window_size {} / overlap {} invalid",
                window.window_size, window.overlap
            )));
        }
        if self.psd_segment < 4 {
            return Err(DopplerError::Validation(format!(
                "psd_segment must be at least 4, got {}",
                self.psd_segment
            )));
        }
        self.detection_band.validate("detection_band")?;
        self.search_band.validate("search_band")?;
        self.acceptance_band.validate("acceptance_band")?;
        self.speed_bounds.validate("speed_bounds")?;
        if !(0.0..=100.0).contains(&self.acceptance_percentile) {
            return Err(DopplerError::Validation(format!(
                "acceptance_percentile must be within [0, 100], got {}",
                self.acceptance_percentile
            )));
        }
        for (name, value) in [
            ("default_source_frequency", self.default_source_frequency),
            ("initial_guess_scale", self.initial_guess_scale),
            ("fallback_correction", self.fallback_correction),
            ("display_max_frequency", self.display_max_frequency),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DopplerError::Validation(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.min_track_points == 0 {
            return Err(DopplerError::Validation(
                "min_track_points must be at least 1".to_string(),
            ));
        }
        if self.trend_tolerance < 0.0 || self.trend_floor_hz < 0.0 {
            return Err(DopplerError::Validation(
                "trend tolerances must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Velocity estimate together with the series it was derived from
#[derive(Debug, Clone)]
pub struct VelocityAnalysis {
    pub track: FrequencyTrack,
    /// Radial velocity per track point (m/s)
    pub radial_velocities: Vec<f64>,
    pub estimate: VelocityEstimate,
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    geometry: PassGeometry,
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new(geometry: PassGeometry, config: AnalyzerConfig) -> Result<Self> {
        geometry.validate()?;
        config.validate()?;
        Ok(Self { geometry, config })
    }

    pub fn geometry(&self) -> &PassGeometry {
        &self.geometry
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Strongest Welch PSD bin inside the detection band.
    ///
    /// Falls back to `default_source_frequency` when the waveform carries no
    /// energy in the band.
    pub fn detect_source_frequency(&self, waveform: &Waveform) -> f64 {
        let samples = waveform.to_f64();
        let (frequencies, psd) = welch(
            &samples,
            waveform.sample_rate() as f64,
            self.config.psd_segment,
        );

        let best = frequencies
            .iter()
            .zip(&psd)
            .filter(|(f, _)| self.config.detection_band.contains(**f))
            .max_by(|a, b| a.1.total_cmp(b.1));

        match best {
            Some((&f, &p)) if p > 0.0 => {
                log::info!("Detected source frequency: {:.1} Hz", f);
                f
            }
            _ => {
                log::warn!(
                    "No spectral peak in {:.0}-{:.0} Hz; using default source frequency {:.1} Hz",
                    self.config.detection_band.low,
                    self.config.detection_band.high,
                    self.config.default_source_frequency
                );
                self.config.default_source_frequency
            }
        }
    }

    pub fn spectrogram(&self, waveform: &Waveform) -> Spectrogram {
        spectrogram(
            &waveform.to_f64(),
            waveform.sample_rate() as f64,
            &self.config.spectrogram,
        )
    }

    /// Strongest in-band peak of every slice that clears the percentile gate
    /// and lands inside the acceptance band.
    pub fn extract_frequency_track(&self, spec: &Spectrogram, source_frequency: f64) -> FrequencyTrack {
        let search = self.config.search_band.scaled(source_frequency);
        let accept = self.config.acceptance_band.scaled(source_frequency);
        let resolution = spec.resolution();

        let in_band: Vec<usize> = spec
            .frequencies
            .iter()
            .enumerate()
            .filter(|(_, f)| search.contains(**f))
            .map(|(k, _)| k)
            .collect();

        if in_band.is_empty() {
            log::warn!(
                "No spectrogram bins within {:.1}-{:.1} Hz",
                search.low,
                search.high
            );
            return FrequencyTrack::default();
        }

        let mut points = Vec::new();
        for (slice, &time) in spec.power.iter().zip(&spec.times) {
            let Some(&peak_bin) = in_band
                .iter()
                .max_by(|a, b| slice[**a].total_cmp(&slice[**b]))
            else {
                continue;
            };

            let threshold = percentile(slice, self.config.acceptance_percentile);
            if slice[peak_bin] <= threshold {
                continue;
            }

            let offset = if self.config.refine_peaks {
                parabolic_offset(slice, peak_bin)
            } else {
                0.0
            };
            let frequency = spec.frequencies[peak_bin] + offset * resolution;

            if frequency > 0.0 && accept.contains(frequency) {
                points.push(TrackPoint { time, frequency });
            }
        }

        log::debug!(
            "Frequency track: {} of {} slices accepted",
            points.len(),
            spec.slice_count()
        );
        FrequencyTrack { points }
    }

    /// `v_r = c·(1 − f_source/f_obs)` per track point
    pub fn radial_velocities(&self, track: &FrequencyTrack, source_frequency: f64) -> Vec<f64> {
        track
            .points
            .iter()
            .filter(|p| p.frequency > 0.0)
            .map(|p| {
                self.geometry
                    .radial_velocity_from_frequency(source_frequency, p.frequency)
            })
            .collect()
    }

    /// Movement trend from the spread of the track around the source frequency
    pub fn classify_trend(&self, track: &FrequencyTrack, source_frequency: f64) -> MovementTrend {
        match (track.max_frequency(), track.min_frequency()) {
            (Some(max), Some(min)) => classify_shifts(
                max - source_frequency,
                source_frequency - min,
                self.config.trend_tolerance,
                self.config.trend_floor_hz,
            ),
            _ => MovementTrend::PassingBy,
        }
    }

    /// Fit the constant car speed to a frequency track
    pub fn estimate_velocity(
        &self,
        track: FrequencyTrack,
        source_frequency: f64,
    ) -> Result<VelocityAnalysis> {
        let track = FrequencyTrack {
            points: track
                .points
                .into_iter()
                .filter(|p| p.frequency > 0.0)
                .collect(),
        };
        if track.len() < self.config.min_track_points {
            return Err(DopplerError::InsufficientData(format!(
                "{} valid track points, need at least {}",
                track.len(),
                self.config.min_track_points
            )));
        }

        let radial_velocities = self.radial_velocities(&track, source_frequency);
        let times = track.times();
        let peak_radial = radial_velocities
            .iter()
            .fold(0.0f64, |m, v| m.max(v.abs()));

        let options = FitOptions {
            lower: self.config.speed_bounds.low,
            upper: self.config.speed_bounds.high,
            max_iterations: self.config.fit_max_iterations,
            ..FitOptions::default()
        };
        let initial = self.config.initial_guess_scale * peak_radial;

        let (speed, method) = match fit_car_speed(
            &self.geometry,
            &times,
            &radial_velocities,
            initial,
            &options,
        ) {
            Ok(speed) => (speed, EstimationMethod::CurveFit),
            Err(DopplerError::FitDivergence(reason)) => {
                let speed = peak_radial / self.config.fallback_correction;
                log::warn!(
                    "Speed fit diverged ({}); falling back to {:.2} m/s",
                    reason,
                    speed
                );
                (speed, EstimationMethod::Fallback)
            }
            Err(e) => return Err(e),
        };

        let movement_trend = self.classify_trend(&track, source_frequency);
        log::info!(
            "Estimated car speed {:.2} m/s ({:.1} km/h), trend {}, {} track points",
            speed,
            speed * 3.6,
            movement_trend,
            track.len()
        );

        Ok(VelocityAnalysis {
            track,
            radial_velocities,
            estimate: VelocityEstimate {
                car_speed_estimate: speed,
                movement_trend,
                data_quality: DataQuality::High,
                method,
            },
        })
    }

    /// Run the full pipeline. Never fails: data problems end up as a report
    /// with `data_quality = failed`.
    pub fn analyze(&self, waveform: &Waveform, source_frequency: Option<f64>) -> AnalysisReport {
        log::info!(
            "Analyzing {} samples at {} Hz ({:.2} s)",
            waveform.len(),
            waveform.sample_rate(),
            waveform.duration()
        );

        let samples = waveform.to_f64();
        let sample_rate = waveform.sample_rate() as f64;
        let render = self.config.render_plots;

        let waveform_stats = WaveformStats::from_waveform(waveform);
        let waveform_plot = if render {
            plot::waveform_svg(&samples, sample_rate)
        } else {
            String::new()
        };

        let spec = self.spectrogram(waveform);
        let spectrogram_stats = SpectrogramStats::from_spectrogram(&spec);
        let spectrogram_plot = if render {
            plot::spectrogram_svg(&spec, self.config.display_max_frequency)
        } else {
            String::new()
        };

        let source = match source_frequency {
            Some(f) if f.is_finite() && f > 0.0 => Ok(f),
            Some(f) => Err(DopplerError::Validation(format!(
                "source frequency must be positive, got {}",
                f
            ))),
            None => Ok(self.detect_source_frequency(waveform)),
        };
        let reported_source = source.as_ref().copied().unwrap_or(f64::NAN);

        let outcome = source.and_then(|f| {
            if spec.is_empty() {
                return Err(DopplerError::InsufficientData(format!(
                    "waveform shorter than one {}-sample analysis window",
                    self.config.spectrogram.window_size
                )));
            }
            let track = self.extract_frequency_track(&spec, f);
            self.estimate_velocity(track, f).map(|analysis| (f, analysis))
        });

        let (velocity_stats, velocity_plot, velocity_estimate) = match outcome {
            Ok((f, analysis)) => {
                let stats = VelocityStats::from_estimate(
                    &analysis.estimate,
                    &analysis.track,
                    &analysis.radial_velocities,
                    f,
                );
                let svg = if render {
                    plot::velocity_svg(&VelocityPlot {
                        geometry: &self.geometry,
                        track: &analysis.track,
                        radial_velocities: &analysis.radial_velocities,
                        source_frequency: f,
                        car_speed: analysis.estimate.car_speed_estimate,
                    })
                } else {
                    String::new()
                };
                (stats, svg, Some(analysis.estimate))
            }
            Err(e) => {
                log::warn!("Velocity analysis failed: {}", e);
                let stats = VelocityStats::failed(reported_source, 0, &e.to_string());
                let svg = if render {
                    plot::failure_svg(&stats.note)
                } else {
                    String::new()
                };
                (stats, svg, None)
            }
        };

        AnalysisReport {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            success: velocity_estimate.is_some(),
            plot_format: plot::PLOT_FORMAT.to_string(),
            waveform_plot: plot::encode_base64(&waveform_plot),
            spectrogram_plot: plot::encode_base64(&spectrogram_plot),
            velocity_plot: plot::encode_base64(&velocity_plot),
            waveform_stats,
            spectrogram_stats,
            velocity_stats,
            velocity_estimate,
        }
    }
}

/// Trend from the upward (`max − f_source`) and downward (`f_source − min`)
/// shifts. Near-equal shifts mean the whole pass was observed.
pub fn classify_shifts(up: f64, down: f64, tolerance: f64, floor_hz: f64) -> MovementTrend {
    let margin = (tolerance * up.abs().max(down.abs())).max(floor_hz);
    if (up - down).abs() <= margin {
        MovementTrend::PassingBy
    } else if up > down {
        MovementTrend::Approaching
    } else {
        MovementTrend::Receding
    }
}
