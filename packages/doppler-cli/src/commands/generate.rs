use crate::cli::GenerateArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use doppler_rs::{write_wav, Synthesizer, SynthesizerConfig};
use serde::Serialize;

#[derive(Serialize)]
struct GenerateOutput {
    file: String,
    car_speed_ms: f64,
    car_speed_kmh: f64,
    source_frequency_hz: f64,
    sample_rate: u32,
    samples: usize,
    duration_seconds: f64,
}

pub fn execute(args: GenerateArgs) -> i32 {
    let geometry = match params::build_geometry(&args.geometry) {
        Ok(g) => g,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let config = SynthesizerConfig {
        sample_rate: args.sample_rate,
        ..SynthesizerConfig::default()
    };
    let synth = match Synthesizer::new(geometry, config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "Synthesizing {:.1} Hz source passing at {:.2} m/s ({:.1} s)...",
            args.frequency, args.speed, geometry.duration
        );
    }

    let waveform = match synth.synthesize(args.frequency, args.speed) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Err(e) = write_wav(&args.output, &waveform) {
        eprintln!("Error: Failed to write '{}': {}", args.output, e);
        return exit_codes::EXECUTION_ERROR;
    }

    let summary = GenerateOutput {
        file: args.output.clone(),
        car_speed_ms: args.speed,
        car_speed_kmh: args.speed * 3.6,
        source_frequency_hz: args.frequency,
        sample_rate: waveform.sample_rate(),
        samples: waveform.len(),
        duration_seconds: waveform.duration(),
    };

    if args.json {
        if let Err(e) = output::emit_json(&summary, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else if !args.quiet {
        eprintln!(
            "Wrote {} samples at {} Hz to {}",
            summary.samples, summary.sample_rate, summary.file
        );
    }

    exit_codes::SUCCESS
}
