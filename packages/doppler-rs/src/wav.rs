//! WAV container transport for waveforms.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use crate::error::{DopplerError, Result};
use crate::types::Waveform;

/// Decoded file: the first channel as 16-bit PCM plus the source layout
#[derive(Debug, Clone)]
pub struct DecodedWav {
    pub waveform: Waveform,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub format: WavSampleFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WavSampleFormat {
    Int,
    Float,
}

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Mono 16-bit PCM WAV bytes
pub fn encode_wav(waveform: &Waveform) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + waveform.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, mono_spec(waveform.sample_rate()))?;
        for &s in waveform.samples() {
            writer.write_sample(s)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

pub fn write_wav(path: impl AsRef<Path>, waveform: &Waveform) -> Result<()> {
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, mono_spec(waveform.sample_rate()))?;
    for &s in waveform.samples() {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    log::info!(
        "Wrote {} samples ({:.2} s) to {}",
        waveform.len(),
        waveform.duration(),
        path.display()
    );
    Ok(())
}

pub fn decode_wav(bytes: &[u8]) -> Result<DecodedWav> {
    let reader = WavReader::new(Cursor::new(bytes))?;
    read_first_channel(reader)
}

pub fn read_wav(path: impl AsRef<Path>) -> Result<DecodedWav> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let decoded = read_first_channel(reader)?;
    log::debug!(
        "Read {}: {} Hz, {} channel(s), {} bit",
        path.display(),
        decoded.waveform.sample_rate(),
        decoded.channels,
        decoded.bits_per_sample
    );
    Ok(decoded)
}

fn read_first_channel<R: std::io::Read>(mut reader: WavReader<R>) -> Result<DecodedWav> {
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(DopplerError::Audio("WAV file declares no channels".to_string()));
    }
    let stride = spec.channels as usize;
    let bits = spec.bits_per_sample;

    let samples: Vec<i16> = match spec.sample_format {
        SampleFormat::Int => {
            if bits == 0 || bits > 32 {
                return Err(DopplerError::Audio(format!(
                    "unsupported integer sample width: {} bits",
                    bits
                )));
            }
            reader
                .samples::<i32>()
                .step_by(stride)
                .map(|s| s.map(|v| rescale_int(v, bits)))
                .collect::<std::result::Result<_, _>>()?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .step_by(stride)
            .map(|s| s.map(rescale_float))
            .collect::<std::result::Result<_, _>>()?,
    };

    let format = match spec.sample_format {
        SampleFormat::Int => WavSampleFormat::Int,
        SampleFormat::Float => WavSampleFormat::Float,
    };

    Ok(DecodedWav {
        waveform: Waveform::new(samples, spec.sample_rate)?,
        channels: spec.channels,
        bits_per_sample: bits,
        format,
    })
}

fn rescale_int(value: i32, bits: u16) -> i16 {
    if bits > 16 {
        (value >> (bits - 16)) as i16
    } else {
        (value << (16 - bits)) as i16
    }
}

fn rescale_float(value: f32) -> i16 {
    (value as f64 * i16::MAX as f64)
        .round()
        .clamp(i16::MIN as f64, i16::MAX as f64) as i16
}
