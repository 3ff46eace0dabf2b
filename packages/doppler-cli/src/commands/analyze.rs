use crate::cli::AnalyzeArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use doppler_rs::{read_wav, DataQuality};
use std::path::Path;

pub fn execute(args: AnalyzeArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let analyzer = match params::build_analyzer(&args.geometry, &args.analyzer) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let decoded = match read_wav(&args.file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", args.file, e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if !args.quiet {
        eprintln!(
            "Analyzing {} ({:.2} s at {} Hz)...",
            args.file,
            decoded.waveform.duration(),
            decoded.waveform.sample_rate()
        );
    }

    let report = analyzer.analyze(&decoded.waveform, args.analyzer.frequency);

    if let Err(e) = output::emit_json(&report, args.compact, args.output.as_deref().map(Path::new)) {
        eprintln!("Error: {}", e);
        return exit_codes::EXECUTION_ERROR;
    }

    if !args.quiet {
        let stats = &report.velocity_stats;
        match stats.data_quality {
            DataQuality::High => eprintln!(
                "Estimated speed: {:.2} m/s ({:.1} km/h), trend: {}",
                stats.avg_speed_ms,
                stats.avg_speed_kmh,
                stats
                    .movement_trend
                    .map(|t| t.to_string())
                    .unwrap_or_default()
            ),
            DataQuality::Failed => eprintln!("{}", stats.note),
        }
        if let Some(ref path) = args.output {
            eprintln!("Report written to {}", path);
        }
    }

    exit_codes::SUCCESS
}
