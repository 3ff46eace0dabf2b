use crate::cli::SummaryArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use doppler_rs::{read_wav, summarize};

pub fn execute(args: SummaryArgs) -> i32 {
    if let Err(msg) = params::validate_file(&args.file) {
        eprintln!("Error: {}", msg);
        return exit_codes::INPUT_ERROR;
    }

    let decoded = match read_wav(&args.file) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: Failed to read '{}': {}", args.file, e);
            return exit_codes::INPUT_ERROR;
        }
    };
    let summary = summarize(&decoded);

    if args.json {
        if let Err(e) = output::emit_json(&summary, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("File: {}", args.file);
        println!("Duration: {:.2} s", summary.duration_seconds);
        println!("Sample rate: {} Hz ({})", summary.sample_rate, summary.channels);
        println!("Peak frequency: {:.1} Hz", summary.peak_frequency_hz);
        println!("RMS amplitude: {:.2}", summary.rms_amplitude);
        println!(
            "Engine-band tone: {}",
            if summary.doppler_detected { "yes" } else { "no" }
        );
    }

    exit_codes::SUCCESS
}
