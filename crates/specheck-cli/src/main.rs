mod display;
mod render;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use specheck_core::{check, CheckOptions, HttpProbe, Registry, Report, Severity};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "specheck",
    version,
    about = "specheck — static analyzer for RPM spec files",
    long_about = "Check RPM spec files for style and correctness problems, merge in rpmlint \
                  findings, and render the result as text, JSON, XML, or GitHub annotations."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check one or more spec files
    Check {
        /// Spec files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Comma-separated check IDs to suppress (e.g. PF3,PF20)
        #[arg(short = 'A', long = "ignore", value_delimiter = ',')]
        ignore: Vec<String>,

        /// Minimum severity that drives a non-zero exit code
        #[arg(short, long, value_enum, default_value_t = ErrorLevel::Notice)]
        error_level: ErrorLevel,

        /// Config file passed to the external linter via -f
        #[arg(short = 'c', long)]
        lint_config: Option<String>,

        /// Skip the external linter
        #[arg(long)]
        no_lint: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Print nothing, exit code only
        #[arg(short, long)]
        quiet: bool,
    },

    /// Generate a shell completion script
    Completion {
        /// Shell to generate the script for
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
    Xml,
    Github,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ErrorLevel {
    Notice,
    Warning,
    Error,
    Critical,
}

impl From<ErrorLevel> for Severity {
    fn from(level: ErrorLevel) -> Severity {
        match level {
            ErrorLevel::Notice => Severity::Notice,
            ErrorLevel::Warning => Severity::Warning,
            ErrorLevel::Error => Severity::Error,
            ErrorLevel::Critical => Severity::Critical,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check {
            files,
            format,
            ignore,
            error_level,
            lint_config,
            no_lint,
            no_color,
            quiet,
        } => cmd_check(
            &files,
            format,
            ignore,
            error_level.into(),
            lint_config,
            no_lint,
            no_color,
            quiet,
        ),
        Commands::Completion { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "specheck",
                &mut std::io::stdout(),
            );
            Ok(0)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(2);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_check(
    files: &[PathBuf],
    format: Format,
    ignore: Vec<String>,
    error_level: Severity,
    lint_config: Option<String>,
    no_lint: bool,
    no_color: bool,
    quiet: bool,
) -> Result<i32> {
    if no_color {
        colored::control::set_override(false);
    }

    let registry = Registry::standard(Arc::new(HttpProbe::new()));
    let options = CheckOptions {
        lint: !no_lint,
        linter_config: lint_config,
        ignored: ignore,
        ..CheckOptions::default()
    };

    let mut exit_code = 0;

    // Each file is parsed, checked, and rendered independently; one broken
    // file never stops the rest of the run
    for file in files {
        let spec = match specheck_core::read(file) {
            Ok(spec) => spec,
            Err(err) => {
                if !quiet {
                    display::print_file_error(&err.to_string());
                }
                exit_code = exit_code.max(2);
                continue;
            }
        };

        let report = check(&spec, &registry, &options);

        if report.is_skipped {
            if !quiet {
                display::print_skipped(&spec.file);
            }
            continue;
        }

        if !quiet {
            match format {
                Format::Text => display::print_report(&spec.file, &report),
                Format::Json => println!(
                    "{}",
                    render::to_json(&report).context("Failed to render JSON report")?
                ),
                Format::Xml => println!(
                    "{}",
                    render::to_xml(&report).context("Failed to render XML report")?
                ),
                Format::Github => render::print_github(&spec.file, &report),
            }
        }

        exit_code = exit_code.max(report_exit_code(&report, error_level));
    }

    Ok(exit_code)
}

/// 2 for errors and criticals, 1 for notices and warnings, 0 for a clean
/// (or fully suppressed) report, honoring the severity threshold.
fn report_exit_code(report: &Report, min: Severity) -> i32 {
    let active = |severity: Severity| {
        severity >= min && report.bucket(severity).iter().any(|a| !a.ignored)
    };

    if active(Severity::Critical) || active(Severity::Error) {
        2
    } else if active(Severity::Warning) || active(Severity::Notice) {
        1
    } else {
        0
    }
}
