use crate::cli::InfoArgs;
use crate::exit_codes;
use crate::output;
use doppler_rs::{AnalyzerConfig, PassGeometry, SynthesizerConfig};
use serde::Serialize;

#[derive(Serialize)]
struct InfoOutput {
    cli_version: String,
    platform: String,
    arch: String,
    geometry: PassGeometry,
    synthesizer: SynthesizerConfig,
    analyzer: AnalyzerConfig,
}

pub fn execute(args: InfoArgs) -> i32 {
    let info = InfoOutput {
        cli_version: env!("CARGO_PKG_VERSION").to_string(),
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        geometry: PassGeometry::default(),
        synthesizer: SynthesizerConfig::default(),
        analyzer: AnalyzerConfig::default(),
    };

    if args.json {
        if let Err(e) = output::emit_json(&info, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("doppler CLI v{}", info.cli_version);
        println!("Platform: {} ({})", info.platform, info.arch);
        println!();
        println!(
            "Pass geometry: closest approach {} m, duration {} s, speed of sound {} m/s",
            info.geometry.closest_approach, info.geometry.duration, info.geometry.speed_of_sound
        );
        println!(
            "Synthesis: {} Hz, drive {}, harmonic gain {}",
            info.synthesizer.sample_rate, info.synthesizer.drive, info.synthesizer.harmonic_gain
        );
        println!(
            "Analysis: window {} / overlap {}, acceptance percentile {}, fallback correction {}",
            info.analyzer.spectrogram.window_size,
            info.analyzer.spectrogram.overlap,
            info.analyzer.acceptance_percentile,
            info.analyzer.fallback_correction
        );
    }

    exit_codes::SUCCESS
}
