use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "doppler",
    version,
    about = "Doppler pass-by synthesis and speed estimation tool",
    long_about = "Synthesize the sound of a tone passing a stationary listener and estimate\n\
                  the speed of the source back from a WAV recording (spectrogram + curve fit)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Synthesize a pass-by recording to a WAV file
    Generate(GenerateArgs),
    /// Estimate speed and movement trend from a WAV file
    Analyze(AnalyzeArgs),
    /// Analyze many WAV files
    Batch(BatchArgs),
    /// Quick summary of a WAV file (duration, peak frequency, level)
    Summary(SummaryArgs),
    /// Show version and default model parameters
    Info(InfoArgs),
}

/// Pass geometry shared by the forward model and the analysis
#[derive(Args, Clone, Debug)]
pub struct GeometryArgs {
    /// Perpendicular distance between the path and the listener (m)
    #[arg(long, default_value_t = 10.0, env = "CLOSEST_APPROACH_M")]
    pub closest_approach: f64,

    /// Length of the pass (s); the closest point is reached half way
    #[arg(long, default_value_t = 12.0, env = "PASS_DURATION_S")]
    pub duration: f64,

    /// Speed of sound (m/s)
    #[arg(long, default_value_t = doppler_rs::SPEED_OF_SOUND)]
    pub speed_of_sound: f64,
}

#[derive(Args, Clone, Debug)]
pub struct AnalyzerArgs {
    /// Source frequency in Hz (auto-detected when omitted)
    #[arg(long)]
    pub frequency: Option<f64>,

    /// Slice peaks must exceed this percentile of the slice spectrum
    #[arg(long, default_value_t = 90.0, env = "ACCEPTANCE_PERCENTILE")]
    pub percentile: f64,

    /// Divisor of the peak radial velocity when the curve fit diverges
    #[arg(long, default_value_t = 0.97, env = "FALLBACK_CORRECTION")]
    pub fallback_correction: f64,

    /// Skip the SVG plots in the report
    #[arg(long, default_value_t = false)]
    pub no_plots: bool,
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Car speed in m/s
    #[arg(long)]
    pub speed: f64,

    /// Source frequency in Hz
    #[arg(long, default_value_t = 120.0)]
    pub frequency: f64,

    /// Output WAV file
    #[arg(short, long)]
    pub output: String,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 44100, env = "SAMPLE_RATE")]
    pub sample_rate: u32,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    /// Print a JSON description of the generated file
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input WAV file
    #[arg(long)]
    pub file: String,

    #[command(flatten)]
    pub analyzer: AnalyzerArgs,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern selecting input files (e.g. "recordings/*.wav")
    #[arg(long, conflicts_with = "files")]
    pub glob: Option<String>,

    /// Explicit list of input files
    #[arg(long, num_args = 1..)]
    pub files: Option<Vec<String>>,

    #[command(flatten)]
    pub analyzer: AnalyzerArgs,

    #[command(flatten)]
    pub geometry: GeometryArgs,

    /// Write one <stem>_report.json per file here (default: JSON lines on stdout)
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Keep going after a file fails
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// List the matched files and exit
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Compact JSON in per-file reports
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct SummaryArgs {
    /// Input WAV file
    #[arg(long)]
    pub file: String,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
