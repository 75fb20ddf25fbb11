use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

mod config;
mod convert;
mod info;
mod link;
mod validate;

pub use config::Config;

/// csstar - cryoSPARC metadata to STAR converter
#[derive(Parser)]
#[command(name = "csstar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level
    #[arg(short = 'l', long, global = true, value_enum, default_value = "info")]
    loglevel: LogLevel,

    /// Load settings from a TOML config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Verbosity of the log output
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Progress messages
    #[default]
    Info,
    /// Per-file details
    Debug,
    /// Everything
    Trace,
}

impl LogLevel {
    fn filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Conversion flags; unset flags fall back to the config file
#[derive(clap::Args, Debug, Default)]
pub struct ConvertArgs {
    /// Refinement box size in pixels; shifts are rescaled to each particle box
    #[arg(long, value_name = "PX")]
    pub boxsize: Option<f64>,

    /// Keep only this class (repeatable)
    #[arg(long = "class", value_name = "INT")]
    pub classes: Vec<i64>,

    /// Minimum class posterior
    #[arg(long = "minphic", value_name = "F")]
    pub min_phic: Option<f64>,

    /// Replace the directory of every micrograph name
    #[arg(long, value_name = "DIR")]
    pub micrograph_path: Option<PathBuf>,

    /// Take coordinates from matching particles of other STAR files
    #[arg(long, value_name = "PATH_OR_GLOB")]
    pub copy_micrograph_coordinates: Option<String>,

    /// Swap X and Y coordinates
    #[arg(long = "swapxy")]
    pub swap_xy: bool,

    /// Mirror X coordinates within the micrograph
    #[arg(long = "invertx")]
    pub invert_x: bool,

    /// Mirror Y coordinates within the micrograph
    #[arg(long = "inverty")]
    pub invert_y: bool,

    /// Keep cache paths instead of rebasing at the job directory
    #[arg(long)]
    pub cached: bool,

    /// JSON 3x3 rotation or 3x4 rotation + translation applied to every pose
    #[arg(long, value_name = "JSON")]
    pub transform: Option<String>,

    /// Write the legacy schema (also `-r2`)
    #[arg(long)]
    pub relion2: bool,

    /// Strip N leading `<uid>_` prefixes from file names, all when N is omitted
    #[arg(long, value_name = "N", num_args = 0..=1, default_missing_value = "0")]
    pub strip_uid: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert cryoSPARC .cs arrays to a STAR particle table
    Convert {
        /// Primary .cs file, any passthrough files, then the output STAR file
        #[arg(value_name = "FILES", num_args = 2.., required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Export a STAR particle table with its stacks for the engine
    Link {
        /// Input STAR file
        #[arg(value_name = "STAR")]
        star: PathBuf,

        /// Directory receiving the stacks and particles.star
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Extension of the exported stacks
        #[arg(long, value_name = "EXT")]
        ext: Option<String>,

        /// Command re-encoding stacks with another extension
        #[arg(long, value_name = "COMMAND")]
        converter: Option<String>,
    },

    /// Display information about a .cs or STAR file
    Info {
        /// File to inspect
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Validate a STAR particle file
    Validate {
        /// STAR file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    /// Parse the process arguments, accepting `-r2` for `--relion2`
    pub fn parse_args() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Selected log level
    pub fn loglevel(&self) -> LogLevel {
        self.loglevel
    }
}

fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            if arg == "-r2" {
                OsString::from("--relion2")
            } else {
                arg
            }
        })
        .collect()
}

pub fn init_logging(level: LogLevel) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.filter()))
        .init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Convert { mut files, args } => {
            // num_args guarantees an output
            let output = files.pop().unwrap_or_default();
            convert::run(files, output, args, config.convert)
        }
        Commands::Link {
            star,
            output_dir,
            ext,
            converter,
        } => link::run(star, output_dir, ext, converter, config.link),
        Commands::Info { file } => info::run(file),
        Commands::Validate { file } => validate::run(file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().map(OsString::from))).unwrap()
    }

    #[test]
    fn test_convert_args() {
        let cli = parse(&[
            "csstar", "convert", "a.cs", "b.cs", "out.star", "--class", "1", "--class", "3",
            "--minphic", "0.5", "-r2", "--strip-uid",
        ]);
        match cli.command {
            Commands::Convert { files, args } => {
                assert_eq!(files.len(), 3);
                assert_eq!(args.classes, vec![1, 3]);
                assert_eq!(args.min_phic, Some(0.5));
                assert!(args.relion2);
                assert_eq!(args.strip_uid, Some(0));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_strip_uid_count() {
        let cli = parse(&["csstar", "convert", "a.cs", "out.star", "--strip-uid", "2"]);
        match cli.command {
            Commands::Convert { args, .. } => assert_eq!(args.strip_uid, Some(2)),
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_convert_needs_output() {
        assert!(Cli::try_parse_from(["csstar", "convert", "a.cs"]).is_err());
    }

    #[test]
    fn test_global_options() {
        let cli = parse(&["csstar", "info", "x.cs", "-l", "debug", "--config", "c.toml"]);
        assert!(matches!(cli.loglevel(), LogLevel::Debug));
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }
}
