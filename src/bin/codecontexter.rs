//! codecontexter CLI - Flatten a source tree into one Markdown report.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use clap_complete::{generate, Shell};
use codecontexter::builder::Contexter;
use codecontexter::config::Config;
use codecontexter::errors::{exit_code, ContexterError};
use codecontexter::output::{format_number, format_size, write_report, OutputOptions};
use codecontexter::progress::reporter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codecontexter")]
#[command(about = "Generate a Markdown summary of a codebase for LLM context")]
#[command(version)]
struct Cli {
    /// Directory to scan
    #[arg(required_unless_present = "completions")]
    directory: Option<PathBuf>,

    /// Output Markdown file
    #[arg(short, long, default_value = "code_summary.md")]
    output: PathBuf,

    /// Print each processed file and enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Omit the per-file metadata table
    #[arg(long)]
    no_metadata_table: bool,

    /// Include a SHA-256 digest for each file
    #[arg(long)]
    include_hash: bool,

    /// Worker threads for stat collection
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    jobs: Option<u16>,

    /// TOML file extending the built-in file types and ignore patterns
    #[arg(long)]
    config: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Generate shell completions and exit
    #[arg(long, value_enum, exclusive = true)]
    completions: Option<Shell>,
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate(shell, &mut Cli::command(), "codecontexter", &mut std::io::stdout());
        return;
    }

    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(exit_code(&e));
    }
}

fn init_logging(verbose: bool) {
    // Skipped entries are only reported with --verbose.
    let default = if verbose { "warn,codecontexter=debug" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), ContexterError> {
    let Some(directory) = cli.directory else {
        return Ok(());
    };
    let config = Config::load(cli.config.as_deref())?;

    let mut contexter = Contexter::new(&directory)
        .config(config)
        .include_hash(cli.include_hash)
        .skip(&cli.output);
    if let Some(jobs) = cli.jobs {
        contexter = contexter.jobs(usize::from(jobs));
    }

    eprintln!("🔍 Scanning {}", directory.display());
    let progress = reporter(cli.verbose, !cli.no_progress);
    let scan = contexter.scan(progress.as_ref())?;
    if scan.project_root != scan.root {
        eprintln!("📁 Project root: {}", scan.project_root.display());
    }

    let options = OutputOptions {
        include_metadata_table: !cli.no_metadata_table,
        include_hash: cli.include_hash,
    };
    write_report(&cli.output, &scan.render(&options))?;

    let stats = &scan.stats;
    println!("✅ Summary written to {}", cli.output.display());
    println!("   Files processed: {}", format_number(stats.total_files));
    println!("   Total lines: {}", format_number(stats.total_lines));
    println!("   Total size: {}", format_size(stats.total_size));
    if stats.unreadable > 0 {
        println!("   Unreadable files: {}", stats.unreadable);
    }

    Ok(())
}
