use doppler_rs::{Analyzer, Synthesizer};
use std::time::Instant;

use crate::components::{ComponentSlot, ComponentStatus};
use crate::config::ServerConfig;

/// Main server state shared across all handlers
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    generator: ComponentSlot<Synthesizer>,
    analyzer: ComponentSlot<Analyzer>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            generator: ComponentSlot::new("sound_generator"),
            analyzer: ComponentSlot::new("sound_analyzer"),
        }
    }

    /// Build both components now instead of on first request
    pub fn initialize(&self) {
        let _ = self.synthesizer();
        let _ = self.analyzer();
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn synthesizer(&self) -> Result<&Synthesizer, String> {
        self.generator.get_or_load(|| {
            Synthesizer::new(
                self.config.pass_geometry(),
                self.config.synthesizer_config(),
            )
            .map_err(|e| e.to_string())
        })
    }

    pub fn analyzer(&self) -> Result<&Analyzer, String> {
        self.analyzer.get_or_load(|| {
            Analyzer::new(self.config.pass_geometry(), self.config.analyzer_config())
                .map_err(|e| e.to_string())
        })
    }

    pub fn component_statuses(&self) -> Vec<(&'static str, ComponentStatus)> {
        vec![
            (self.generator.name(), self.generator.status()),
            (self.analyzer.name(), self.analyzer.status()),
        ]
    }
}
