use crate::cli::{AnalyzerArgs, GeometryArgs};
use doppler_rs::{Analyzer, AnalyzerConfig, PassGeometry};
use std::path::Path;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav"];

pub fn build_geometry(args: &GeometryArgs) -> Result<PassGeometry, String> {
    let geometry = PassGeometry {
        closest_approach: args.closest_approach,
        duration: args.duration,
        speed_of_sound: args.speed_of_sound,
    };
    geometry.validate().map_err(|e| e.to_string())?;
    Ok(geometry)
}

pub fn build_analyzer(geometry: &GeometryArgs, args: &AnalyzerArgs) -> Result<Analyzer, String> {
    if let Some(f) = args.frequency {
        if !f.is_finite() || f <= 0.0 {
            return Err(format!("--frequency must be positive, got {}", f));
        }
    }

    let config = AnalyzerConfig {
        acceptance_percentile: args.percentile,
        fallback_correction: args.fallback_correction,
        render_plots: !args.no_plots,
        ..AnalyzerConfig::default()
    };
    Analyzer::new(build_geometry(geometry)?, config).map_err(|e| e.to_string())
}

/// Validate a single input path: existence and supported extension.
pub fn validate_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);
    if !path.is_file() {
        return Err(format!("Input file not found: {}", file_path));
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "Unsupported file extension '{}'. Supported: {}",
            ext,
            SUPPORTED_EXTENSIONS.join(", ")
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry_args() -> GeometryArgs {
        GeometryArgs {
            closest_approach: 10.0,
            duration: 12.0,
            speed_of_sound: 343.0,
        }
    }

    fn analyzer_args() -> AnalyzerArgs {
        AnalyzerArgs {
            frequency: None,
            percentile: 90.0,
            fallback_correction: 0.97,
            no_plots: false,
        }
    }

    #[test]
    fn test_build_geometry_rejects_zero_distance() {
        let mut args = geometry_args();
        args.closest_approach = 0.0;
        assert!(build_geometry(&args).is_err());
        assert!(build_geometry(&geometry_args()).is_ok());
    }

    #[test]
    fn test_build_analyzer_applies_overrides() {
        let mut args = analyzer_args();
        args.percentile = 80.0;
        args.no_plots = true;
        let analyzer = build_analyzer(&geometry_args(), &args).unwrap();
        assert_eq!(analyzer.config().acceptance_percentile, 80.0);
        assert!(!analyzer.config().render_plots);
    }

    #[test]
    fn test_build_analyzer_rejects_bad_frequency() {
        let mut args = analyzer_args();
        args.frequency = Some(-3.0);
        assert!(build_analyzer(&geometry_args(), &args).is_err());

        let mut args = analyzer_args();
        args.fallback_correction = 0.0;
        assert!(build_analyzer(&geometry_args(), &args).is_err());
    }

    #[test]
    fn test_validate_file() {
        let tmp = tempfile::tempdir().unwrap();
        let wav = tmp.path().join("pass.WAV");
        let mp3 = tmp.path().join("pass.mp3");
        std::fs::write(&wav, b"").unwrap();
        std::fs::write(&mp3, b"").unwrap();

        assert!(validate_file(wav.to_str().unwrap()).is_ok());
        assert!(validate_file(mp3.to_str().unwrap())
            .unwrap_err()
            .contains("Unsupported"));
        assert!(validate_file("/nonexistent_dir_12345/a.wav")
            .unwrap_err()
            .contains("not found"));
    }
}
