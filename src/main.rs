//! headerless: strip a sentinel-delimited header from text streams
//!
//! Usage: headerless <COMMAND> [OPTIONS]

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use headerless::commands::StripCommand;
use headerless::config::{DEFAULT_MAX_LINE_LEN, DEFAULT_SENTINEL};
use headerless::PipelineError;

#[derive(Parser)]
#[command(name = "headerless")]
#[command(version)]
#[command(about = "Strip a sentinel-delimited header from text streams", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(long, short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every line after the header sentinel to the output
    Strip {
        /// Input file (use - or omit for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output file, truncated if it exists (use - or omit for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Line that ends the header
        #[arg(short, long, default_value = DEFAULT_SENTINEL)]
        sentinel: String,

        /// Treat any line containing the sentinel as the header end
        #[arg(long)]
        contains: bool,

        /// Maximum line length in bytes, terminator included
        #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
        max_line: usize,

        /// Fail on lines longer than --max-line instead of splitting them
        #[arg(long)]
        reject_long_lines: bool,

        /// Use smaller I/O buffers
        #[arg(long)]
        low_memory: bool,

        /// Print pipeline statistics to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Strip {
            input,
            output,
            sentinel,
            contains,
            max_line,
            reject_long_lines,
            low_memory,
            stats,
        } => run_strip(
            input,
            output,
            sentinel,
            contains,
            max_line,
            reject_long_lines,
            low_memory,
            stats,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn run_strip(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    sentinel: String,
    contains: bool,
    max_line: usize,
    reject_long_lines: bool,
    low_memory: bool,
    stats: bool,
) -> Result<(), PipelineError> {
    let cmd = StripCommand::new()
        .with_sentinel(sentinel)
        .with_contains(contains)
        .with_max_line_len(max_line)
        .with_reject_long_lines(reject_long_lines)
        .with_low_memory(low_memory);

    let result = cmd.run(input.as_deref(), output.as_deref())?;

    if stats {
        eprintln!("Strip stats: {}", result);
    }
    Ok(())
}
