use clap::{Args, Parser, Subcommand, ValueEnum};
use marquee_config::VerifyMode;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "marquee", version)]
#[command(about = "Builds a normalized catalog snapshot and its release manifest, and keeps local copies current")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON). Defaults to
    /// `<config_dir>/marquee/config.toml` when present.
    #[arg(long, short, global = true, env = "MARQUEE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Normalize a catalog into a snapshot and write its manifest.
    Build(BuildArgs),
    /// Compare the local snapshot with a published manifest.
    Check(CheckArgs),
    /// Fetch, verify and install the published snapshot if it changed.
    Update(UpdateArgs),
}

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Catalog document on disk.
    #[arg(long, short, conflicts_with = "url")]
    pub input: Option<PathBuf>,

    /// Catalog document URL. Defaults to `source.url` from the configuration.
    #[arg(long)]
    pub url: Option<String>,

    /// Version tag. Defaults to the current UTC time as `YYYYMMDD_HHMMSS`.
    #[arg(long = "release", visible_alias = "tag")]
    pub version: Option<String>,

    #[arg(long, short)]
    pub description: Option<String>,

    /// Where the snapshot and manifest are written.
    #[arg(long, short, default_value = ".")]
    pub out_dir: PathBuf,

    /// Published snapshot URL, overriding `manifest.base_url`.
    #[arg(long)]
    pub db_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct LocalArgs {
    /// Published manifest, as a path or URL.
    #[arg(long, short)]
    pub manifest: String,

    /// Local snapshot. Defaults to `snapshot.filename` in the current directory.
    #[arg(long, short)]
    pub local: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub target: LocalArgs,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub target: LocalArgs,

    /// Where to download the snapshot from, overriding the manifest's URL.
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Verification mode, overriding `verify.mode`.
    #[arg(long, value_enum)]
    pub verify: Option<VerifyArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerifyArg {
    Strict,
    Tolerant,
}
impl From<VerifyArg> for VerifyMode {
    fn from(arg: VerifyArg) -> Self {
        match arg {
            VerifyArg::Strict => Self::Strict,
            VerifyArg::Tolerant => Self::Tolerant,
        }
    }
}
