use crate::cli::BatchArgs;
use crate::exit_codes;
use crate::output;
use crate::params;
use doppler_rs::{read_wav, AnalysisReport, Analyzer};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

pub fn execute(args: BatchArgs) -> i32 {
    let files = match resolve_files(&args) {
        Ok(f) => f,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if files.is_empty() {
        eprintln!("Error: No matching files found");
        return exit_codes::INPUT_ERROR;
    }

    if args.dry_run {
        for f in &files {
            println!("{}", f);
        }
        if !args.quiet {
            eprintln!("Found {} file(s)", files.len());
        }
        return exit_codes::SUCCESS;
    }

    let analyzer = match params::build_analyzer(&args.geometry, &args.analyzer) {
        Ok(a) => a,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(ref dir) = args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Error: Failed to create output directory '{}': {}", dir, e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    let total = files.len();
    let start_time = Instant::now();
    if !args.quiet {
        eprintln!("Analyzing {} file(s)...", total);
    }

    let tally = run_batch(&files, rayon::current_num_threads(), &analyzer, &args);

    if !args.quiet {
        eprintln!(
            "Batch complete: {}/{} succeeded, {}/{} failed, {:.1}s",
            tally.succeeded,
            total,
            tally.failed,
            total,
            start_time.elapsed().as_secs_f64()
        );
        if tally.skipped > 0 {
            eprintln!("Stopped early, {} file(s) not analyzed", tally.skipped);
        }
    }

    if tally.failed == 0 {
        exit_codes::SUCCESS
    } else if tally.succeeded > 0 {
        exit_codes::PARTIAL_FAILURE
    } else {
        exit_codes::EXECUTION_ERROR
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct BatchTally {
    succeeded: usize,
    failed: usize,
    skipped: usize,
}

/// Analyze `files` in chunks of `chunk_size`, writing each report in input
/// order. Without `--continue-on-error` nothing past the chunk holding the
/// first failure is analyzed.
fn run_batch(
    files: &[String],
    chunk_size: usize,
    analyzer: &Analyzer,
    args: &BatchArgs,
) -> BatchTally {
    let total = files.len();
    let mut tally = BatchTally::default();

    for (chunk_index, chunk) in files.chunks(chunk_size.max(1)).enumerate() {
        let results: Vec<Result<AnalysisReport, String>> = chunk
            .par_iter()
            .map(|file| analyze_file(analyzer, file, args.analyzer.frequency))
            .collect();

        let offset = chunk_index * chunk_size.max(1);
        for (i, (file_path, result)) in chunk.iter().zip(results).enumerate() {
            if !args.quiet {
                eprintln!("[{}/{}] {}", offset + i + 1, total, file_path);
            }

            let written = result.and_then(|report| match args.output_dir {
                Some(ref dir) => {
                    let out_path = output::report_path(Path::new(dir), file_path);
                    output::emit_json(&report, args.compact, Some(&out_path))
                }
                // JSON lines on stdout
                None => output::emit_json(&report, true, None),
            });

            match written {
                Ok(()) => tally.succeeded += 1,
                Err(msg) => {
                    eprintln!("  Error: {}", msg);
                    tally.failed += 1;
                    if !args.continue_on_error {
                        tally.skipped = total - (offset + i + 1);
                        return tally;
                    }
                }
            }
        }
    }
    tally
}

fn analyze_file(
    analyzer: &Analyzer,
    file_path: &str,
    source_frequency: Option<f64>,
) -> Result<AnalysisReport, String> {
    params::validate_file(file_path)?;
    let decoded = read_wav(file_path).map_err(|e| format!("Failed to read: {}", e))?;
    Ok(analyzer.analyze(&decoded.waveform, source_frequency))
}

fn resolve_files(args: &BatchArgs) -> Result<Vec<String>, String> {
    if let Some(ref pattern) = args.glob {
        resolve_glob(pattern)
    } else if let Some(ref files) = args.files {
        Ok(files.clone())
    } else {
        Err("One of --glob or --files must be specified".to_string())
    }
}

fn resolve_glob(pattern: &str) -> Result<Vec<String>, String> {
    let paths =
        glob::glob(pattern).map_err(|e| format!("Invalid glob pattern '{}': {}", pattern, e))?;

    let mut files: Vec<String> = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => {
                if let Some(s) = path.to_str() {
                    files.push(s.to_string());
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("glob error: {}", e),
        }
    }
    files.sort();
    Ok(files)
}
