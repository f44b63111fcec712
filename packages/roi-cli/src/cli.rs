use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "roits",
    version,
    about = "Atlas region time-series extraction for fMRI volumes",
    long_about = "Align a labeled atlas to 4D NIfTI functional runs and write one mean\n\
                  time series per atlas region. Registration-based alignment requires\n\
                  antsApplyTransforms. Set $ANTS_APPLY_TRANSFORMS or use --ants."
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
    /// Extract a region time-series table from one functional run
    Extract(ExtractArgs),
    /// Extract tables for every functional run under a directory
    Batch(BatchArgs),
    /// Concatenate each subject's run tables
    Concat(ConcatArgs),
    /// Show registration tool path and version information
    Info(InfoArgs),
    /// Validate a NIfTI volume
    Validate(ValidateArgs),
}

/// Options shared by `extract` and `batch`
#[derive(Args, Debug, Clone, Default)]
pub struct AlignmentArgs {
    /// Brain mask restricting which voxels contribute
    #[arg(long)]
    pub mask: Option<PathBuf>,

    /// Transform mapping atlas space to functional space (enables registration)
    #[arg(long)]
    pub transform: Option<PathBuf>,

    /// Path to antsApplyTransforms
    #[arg(long, env = "ANTS_APPLY_TRANSFORMS")]
    pub ants: Option<String>,

    /// Directory for temporary volumes
    #[arg(long, env = "ROITS_SCRATCH_DIR")]
    pub scratch_dir: Option<PathBuf>,
}

/// Where the JSON report of `extract` and `batch` goes
#[derive(Args, Debug, Clone, Default)]
pub struct ReportArgs {
    /// Print the report as JSON on stdout
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write the JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct ExtractArgs {
    /// Functional volume (.nii or .nii.gz)
    pub input: PathBuf,

    /// Labeled atlas volume
    pub atlas: PathBuf,

    /// Output CSV table
    pub output: PathBuf,

    #[command(flatten)]
    pub alignment: AlignmentArgs,

    /// Also save the aligned atlas to this path
    #[arg(long)]
    pub save_aligned: Option<PathBuf>,

    #[command(flatten)]
    pub report: ReportArgs,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct BatchArgs {
    /// Directory searched recursively for functional runs
    pub data_dir: PathBuf,

    /// Labeled atlas volume
    pub atlas: PathBuf,

    #[command(flatten)]
    pub alignment: AlignmentArgs,

    /// Write tables here instead of next to each input
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Glob pattern relative to the data directory
    #[arg(long, default_value = roi_rs::naming::DEFAULT_INPUT_PATTERN)]
    pub pattern: String,

    /// Comma-separated subject ids to skip (e.g. "sub-01,sub-07")
    #[arg(long, default_value = "")]
    pub exclude_subjects: String,

    /// Comma-separated run tokens to skip (e.g. "run-01,run-03")
    #[arg(long, default_value = "")]
    pub exclude_runs: String,

    /// Number of inputs processed in parallel
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    pub jobs: u16,

    /// List what would be processed and exit
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Re-extract inputs whose table already exists
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    #[command(flatten)]
    pub report: ReportArgs,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct ConcatArgs {
    /// Directory searched recursively for *_timeseries.csv tables
    pub data_dir: PathBuf,

    /// Directory for the concatenated tables
    #[arg(long, default_value = "timeseries_concatenated")]
    pub output_dir: PathBuf,

    /// Comma-separated run tokens to leave out (e.g. "run-01,run-03")
    #[arg(long, default_value = "")]
    pub exclude_runs: String,

    /// Print per-subject results as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Path to antsApplyTransforms
    #[arg(long, env = "ANTS_APPLY_TRANSFORMS")]
    pub ants: Option<String>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// NIfTI volume to inspect
    pub file: PathBuf,

    /// Treat the file as a label atlas and count its regions
    #[arg(long, default_value_t = false)]
    pub atlas: bool,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
