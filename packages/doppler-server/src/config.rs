use doppler_rs::{AnalyzerConfig, PassGeometry, SynthesizerConfig, SPEED_OF_SOUND};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
    /// Bind address (0.0.0.0 for LAN, 127.0.0.1 for localhost)
    pub bind_addr: String,
    /// CORS allowed origins; a single "*" allows any origin
    pub cors_origins: Vec<String>,
    /// Directory for uploaded files while they are analyzed
    pub upload_directory: PathBuf,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
    /// Highest car speed accepted by the generator (m/s)
    pub max_car_speed: f64,
    /// Accepted source frequency range (Hz)
    pub min_frequency: f64,
    pub max_frequency: f64,
    /// Closest distance between the path and the listener (m)
    pub closest_approach: f64,
    /// Length of a synthesized pass (s)
    pub pass_duration: f64,
    pub sample_rate: u32,
    /// Slice peak percentile gate of the track extraction
    pub acceptance_percentile: f64,
    /// Divisor of the peak radial velocity when the curve fit diverges
    pub fallback_correction: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let analyzer = AnalyzerConfig::default();
        let geometry = PassGeometry::default();
        Self {
            port: 8000,
            bind_addr: "0.0.0.0".to_string(),
            cors_origins: vec!["*".to_string()],
            upload_directory: env::temp_dir().join("doppler-uploads"),
            max_upload_size: 50 * 1024 * 1024,
            max_car_speed: 100.0,
            min_frequency: 20.0,
            max_frequency: 1000.0,
            closest_approach: geometry.closest_approach,
            pass_duration: geometry.duration,
            sample_rate: SynthesizerConfig::default().sample_rate,
            acceptance_percentile: analyzer.acceptance_percentile,
            fallback_correction: analyzer.fallback_correction,
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, raw))),
        None => Ok(default),
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key/value source; unset keys keep
    /// their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("DOPPLER_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let config = Self {
            port,
            bind_addr: lookup("DOPPLER_BIND_ADDR").unwrap_or(defaults.bind_addr),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.cors_origins),
            upload_directory: lookup("UPLOAD_DIRECTORY")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_directory),
            max_upload_size: parse_var(&lookup, "MAX_UPLOAD_SIZE", defaults.max_upload_size)?,
            max_car_speed: parse_var(&lookup, "MAX_CAR_SPEED", defaults.max_car_speed)?,
            min_frequency: parse_var(&lookup, "MIN_FREQUENCY", defaults.min_frequency)?,
            max_frequency: parse_var(&lookup, "MAX_FREQUENCY", defaults.max_frequency)?,
            closest_approach: parse_var(&lookup, "CLOSEST_APPROACH_M", defaults.closest_approach)?,
            pass_duration: parse_var(&lookup, "PASS_DURATION_S", defaults.pass_duration)?,
            sample_rate: parse_var(&lookup, "SAMPLE_RATE", defaults.sample_rate)?,
            acceptance_percentile: parse_var(
                &lookup,
                "ACCEPTANCE_PERCENTILE",
                defaults.acceptance_percentile,
            )?,
            fallback_correction: parse_var(
                &lookup,
                "FALLBACK_CORRECTION",
                defaults.fallback_correction,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_car_speed > 0.0 && self.max_car_speed < SPEED_OF_SOUND) {
            return Err(ConfigError::InvalidValue(format!(
                "MAX_CAR_SPEED must be within (0, {}), got {}",
                SPEED_OF_SOUND, self.max_car_speed
            )));
        }
        if !(self.min_frequency > 0.0 && self.min_frequency < self.max_frequency) {
            return Err(ConfigError::InvalidValue(format!(
                "frequency range [{}, {}] is empty",
                self.min_frequency, self.max_frequency
            )));
        }
        if self.max_upload_size == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_UPLOAD_SIZE must be positive".to_string(),
            ));
        }
        if self.cors_origins.is_empty() {
            return Err(ConfigError::InvalidValue(
                "CORS_ORIGINS must name at least one origin".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the full bind address (addr:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }

    pub fn pass_geometry(&self) -> PassGeometry {
        PassGeometry {
            closest_approach: self.closest_approach,
            duration: self.pass_duration,
            speed_of_sound: SPEED_OF_SOUND,
        }
    }

    pub fn synthesizer_config(&self) -> SynthesizerConfig {
        SynthesizerConfig {
            sample_rate: self.sample_rate,
            ..SynthesizerConfig::default()
        }
    }

    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            acceptance_percentile: self.acceptance_percentile,
            fallback_correction: self.fallback_correction,
            ..AnalyzerConfig::default()
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid port number")]
    InvalidPort,
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert!(config.allows_any_origin());
        assert_eq!(config.max_upload_size, 50 * 1024 * 1024);
        assert_eq!(config.analyzer_config().fallback_correction, 0.97);
        assert_eq!(config.pass_geometry(), PassGeometry::default());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("DOPPLER_PORT", "9100"),
            ("CORS_ORIGINS", "http://localhost:3000, http://127.0.0.1:3000"),
            ("ACCEPTANCE_PERCENTILE", "85"),
            ("PASS_DURATION_S", "6"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9100);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.allows_any_origin());
        assert_eq!(config.analyzer_config().acceptance_percentile, 85.0);
        assert_eq!(config.pass_geometry().duration, 6.0);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("DOPPLER_PORT", "http")])),
            Err(ConfigError::InvalidPort)
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("MAX_CAR_SPEED", "fast")])),
            Err(ConfigError::InvalidValue(_))
        ));
        assert!(matches!(
            ServerConfig::from_lookup(lookup(&[("MIN_FREQUENCY", "2000")])),
            Err(ConfigError::InvalidValue(_))
        ));
    }
}
