use serde::{Deserialize, Serialize};

use crate::report::round_to;
use crate::spectral::dominant_frequency;
use crate::wav::DecodedWav;

/// Peak frequencies in this range (Hz, exclusive) are flagged as a
/// plausible engine tone
pub const DOPPLER_BAND_HZ: (f64, f64) = (80.0, 400.0);

/// Quick look at an uploaded recording, without velocity estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSummary {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: String,
    pub peak_frequency_hz: f64,
    pub rms_amplitude: f64,
    pub doppler_detected: bool,
}

pub fn channel_label(channels: u16) -> String {
    match channels {
        1 => "Mono".to_string(),
        2 => "Stereo".to_string(),
        n => format!("{} channels", n),
    }
}

pub fn summarize(decoded: &DecodedWav) -> AudioSummary {
    let waveform = &decoded.waveform;
    let samples = waveform.to_f64();

    let rms = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
    };
    let peak = dominant_frequency(&samples, waveform.sample_rate() as f64).unwrap_or(0.0);

    AudioSummary {
        duration_seconds: round_to(waveform.duration(), 2),
        sample_rate: waveform.sample_rate(),
        channels: channel_label(decoded.channels),
        peak_frequency_hz: round_to(peak, 1),
        rms_amplitude: round_to(rms, 2),
        doppler_detected: peak > DOPPLER_BAND_HZ.0 && peak < DOPPLER_BAND_HZ.1,
    }
}
