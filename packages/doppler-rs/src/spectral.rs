//! Short-time spectral estimates.
//!
//! Scaling follows the usual one-sided power-spectral-density convention
//! (`|X|² / (fs · Σw²)`, doubled except at DC and Nyquist) and segments are
//! mean-detrended before tapering, so absolute levels line up with common
//! scientific tooling. Only relative levels matter to the analyzer.

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Segment taper
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowKind {
    Hann,
    Tukey { alpha: f64 },
    Rectangular,
}

impl WindowKind {
    /// Periodic (DFT-even) window of `size` points
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        match *self {
            WindowKind::Hann => (0..size)
                .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / size as f64).cos())
                .collect(),
            WindowKind::Tukey { alpha } => tukey_periodic(size, alpha),
            WindowKind::Rectangular => vec![1.0; size],
        }
    }
}

fn tukey_periodic(size: usize, alpha: f64) -> Vec<f64> {
    if alpha <= 0.0 {
        return vec![1.0; size];
    }
    if alpha >= 1.0 {
        return WindowKind::Hann.coefficients(size);
    }
    // Symmetric window of size + 1 points with the last one dropped
    let m = size + 1;
    let span = alpha * (m - 1) as f64 / 2.0;
    (0..size)
        .map(|i| {
            let n = i as f64;
            let tail = (m - 1) as f64 - n;
            if n < span {
                0.5 * (1.0 + (PI * (n / span - 1.0)).cos())
            } else if tail < span {
                0.5 * (1.0 + (PI * (tail / span - 1.0)).cos())
            } else {
                1.0
            }
        })
        .collect()
}

/// Sliding-window parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrogramConfig {
    pub window_size: usize,
    pub overlap: usize,
    pub window: WindowKind,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            window_size: 4096,
            overlap: 3584,
            window: WindowKind::Hann,
        }
    }
}

impl SpectrogramConfig {
    pub fn step(&self) -> usize {
        self.window_size.saturating_sub(self.overlap).max(1)
    }
}

/// Power spectral density per time slice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrogram {
    /// Bin centre frequencies (Hz), `window_size / 2 + 1` entries
    pub frequencies: Vec<f64>,
    /// Segment centre times (s)
    pub times: Vec<f64>,
    /// `power[slice][bin]`
    pub power: Vec<Vec<f64>>,
}

impl Spectrogram {
    pub fn slice_count(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Spacing between frequency bins (Hz)
    pub fn resolution(&self) -> f64 {
        if self.frequencies.len() > 1 {
            self.frequencies[1] - self.frequencies[0]
        } else {
            0.0
        }
    }
}

/// Compute a spectrogram over `samples`.
///
/// Returns an empty spectrogram when the signal is shorter than one window.
pub fn spectrogram(samples: &[f64], sample_rate: f64, config: &SpectrogramConfig) -> Spectrogram {
    let nperseg = config.window_size;
    if nperseg == 0 || samples.len() < nperseg || sample_rate <= 0.0 {
        return Spectrogram::default();
    }

    let step = config.step();
    let overlap = nperseg - step;
    let n_slices = (samples.len() - overlap) / step;
    let n_bins = nperseg / 2 + 1;

    let window = config.window.coefficients(nperseg);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = if window_power > 0.0 {
        1.0 / (sample_rate * window_power)
    } else {
        0.0
    };

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(nperseg);
    let mut buffer = vec![Complex::new(0.0, 0.0); nperseg];

    let mut power = Vec::with_capacity(n_slices);
    let mut times = Vec::with_capacity(n_slices);

    for k in 0..n_slices {
        let start = k * step;
        let segment = &samples[start..start + nperseg];
        let mean = segment.iter().sum::<f64>() / nperseg as f64;

        for ((slot, &s), &w) in buffer.iter_mut().zip(segment).zip(&window) {
            *slot = Complex::new((s - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        let mut slice: Vec<f64> = buffer[..n_bins]
            .iter()
            .map(|c| c.norm_sqr() * scale)
            .collect();
        let last = if nperseg % 2 == 0 { n_bins - 1 } else { n_bins };
        for p in slice.iter_mut().take(last).skip(1) {
            *p *= 2.0;
        }

        power.push(slice);
        times.push((start as f64 + nperseg as f64 / 2.0) / sample_rate);
    }

    let frequencies = (0..n_bins)
        .map(|i| i as f64 * sample_rate / nperseg as f64)
        .collect();

    Spectrogram {
        frequencies,
        times,
        power,
    }
}

/// Welch power spectral density: frequencies and averaged density.
///
/// Hann taper, 50 % overlap. The segment shrinks to the signal length for
/// short inputs; an empty input yields empty vectors.
pub fn welch(samples: &[f64], sample_rate: f64, segment: usize) -> (Vec<f64>, Vec<f64>) {
    let nperseg = segment.min(samples.len());
    if nperseg == 0 {
        return (Vec::new(), Vec::new());
    }

    let config = SpectrogramConfig {
        window_size: nperseg,
        overlap: nperseg / 2,
        window: WindowKind::Hann,
    };
    let spec = spectrogram(samples, sample_rate, &config);
    if spec.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let n_bins = spec.frequencies.len();
    let mut average = vec![0.0; n_bins];
    for slice in &spec.power {
        for (acc, &p) in average.iter_mut().zip(slice) {
            *acc += p;
        }
    }
    let count = spec.slice_count() as f64;
    for acc in average.iter_mut() {
        *acc /= count;
    }

    (spec.frequencies, average)
}

/// Percentile with linear interpolation between closest ranks
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Sub-bin offset of a spectral peak from a parabola through the log power
/// of bins `k-1, k, k+1`. Result lies in `[-0.5, 0.5]`.
pub fn parabolic_offset(power: &[f64], k: usize) -> f64 {
    if k == 0 || k + 1 >= power.len() {
        return 0.0;
    }
    let (a, b, c) = (power[k - 1], power[k], power[k + 1]);
    if a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return 0.0;
    }
    let (a, b, c) = (a.ln(), b.ln(), c.ln());
    let denom = a - 2.0 * b + c;
    if denom.abs() < f64::EPSILON {
        return 0.0;
    }
    (0.5 * (a - c) / denom).clamp(-0.5, 0.5)
}

/// Frequency of the strongest component of the full-length spectrum,
/// ignoring DC. Returns `None` for signals shorter than three samples.
pub fn dominant_frequency(samples: &[f64], sample_rate: f64) -> Option<f64> {
    let n = samples.len();
    if n < 3 {
        return None;
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft.process(&mut buffer);

    let half = n / 2;
    let (bin, _) = buffer[1..half]
        .iter()
        .enumerate()
        .map(|(i, c)| (i + 1, c.norm_sqr()))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    Some(bin as f64 * sample_rate / n as f64)
}
