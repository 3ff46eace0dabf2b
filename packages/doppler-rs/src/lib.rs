pub mod analyzer;
pub mod error;
pub mod fit;
pub mod plot;
pub mod report;
pub mod spectral;
pub mod summary;
pub mod synth;
pub mod types;
pub mod wav;

pub use analyzer::{Analyzer, AnalyzerConfig, Band, VelocityAnalysis};
pub use error::{DopplerError, Result};
pub use report::{AnalysisReport, SpectrogramStats, VelocityStats, WaveformStats};
pub use summary::{summarize, AudioSummary};
pub use synth::{Synthesizer, SynthesizerConfig};
pub use types::*;
pub use wav::{decode_wav, encode_wav, read_wav, write_wav, DecodedWav};
