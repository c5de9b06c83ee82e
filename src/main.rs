use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use regex::Regex;
use tracing_subscriber::EnvFilter;

use covdelta::cli::{self, AnnotationLevel, OutputOptions, Style};
use covdelta::compare::CoberturaDiff;
use covdelta::diff::DEFAULT_CONTEXT;
use covdelta::ingest::{load_cobertura, SourceOptions};
use covdelta::report;

/// covdelta: summarize Cobertura coverage reports and compare two of them.
#[derive(Parser)]
#[command(name = "covdelta", version, about)]
struct Cli {
    /// Log debug output to stderr (otherwise controlled by COVDELTA_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct OutputArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value = "text")]
    format: Style,

    /// Field delimiter for csv output.
    #[arg(long, default_value_t = ';')]
    delimiter: char,

    /// Write the report to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Drop files whose name matches this regular expression.
    #[arg(long)]
    ignore_regex: Option<String>,

    /// Severity of github-annotation output.
    #[arg(long, value_enum, default_value = "notice")]
    annotation_level: AnnotationLevel,

    /// Title of github-annotation output.
    #[arg(long, default_value = report::DEFAULT_ANNOTATION_TITLE)]
    annotation_title: String,

    /// Message of github-annotation output.
    #[arg(long, default_value = report::DEFAULT_ANNOTATION_MESSAGE)]
    annotation_message: String,
}

impl OutputArgs {
    fn options(&self) -> OutputOptions {
        OutputOptions {
            style: self.format,
            delimiter: self.delimiter,
            annotation_level: self.annotation_level,
            annotation_title: self.annotation_title.clone(),
            annotation_message: self.annotation_message.clone(),
        }
    }

    fn ignore(&self) -> Result<Option<Regex>> {
        self.ignore_regex
            .as_deref()
            .map(|re| Regex::new(re).with_context(|| format!("Invalid --ignore-regex '{re}'")))
            .transpose()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a single coverage report.
    Show {
        /// Path to the Cobertura XML report.
        report: PathBuf,

        /// Source directory, zip archive or git repository
        /// (default: the report's directory).
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Prefix prepended to file names when reading sources.
        #[arg(long)]
        source_prefix: Option<String>,

        /// Read sources at this git revision of --source.
        #[arg(long = "ref")]
        rev: Option<String>,

        /// Do not read any source files.
        #[arg(long)]
        no_source: bool,

        /// Print the annotated source of this file instead of the summary.
        #[arg(long, value_name = "FILE")]
        source_view: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Compare two coverage reports, older first.
    Diff {
        /// Older Cobertura XML report.
        report1: PathBuf,

        /// Newer Cobertura XML report.
        report2: PathBuf,

        /// Sources of the older report.
        #[arg(long)]
        source1: Option<PathBuf>,

        /// Sources of the newer report.
        #[arg(long)]
        source2: Option<PathBuf>,

        #[arg(long)]
        source_prefix1: Option<String>,

        #[arg(long)]
        source_prefix2: Option<String>,

        /// Git revision of the older sources.
        #[arg(long)]
        ref1: Option<String>,

        /// Git revision of the newer sources.
        #[arg(long)]
        ref2: Option<String>,

        /// Do not read any source files.
        #[arg(long)]
        no_source: bool,

        /// Print the change hunks of this file instead of the delta table.
        #[arg(long, value_name = "FILE")]
        source_view: Option<String>,

        /// Lines of context around each hunk.
        #[arg(long, default_value_t = DEFAULT_CONTEXT)]
        context: usize,

        #[command(flatten)]
        output: OutputArgs,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("COVDELTA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Show {
            report,
            source,
            source_prefix,
            rev,
            no_source,
            source_view,
            output,
        } => {
            let sources = SourceOptions {
                source,
                prefix: source_prefix,
                rev,
                disabled: no_source,
            };
            let cobertura = load_cobertura(&report, &sources, output.ignore()?.as_ref())
                .with_context(|| format!("Failed to load {}", report.display()))?;

            let text = match source_view {
                Some(file) => cli::cmd_show_source(&cobertura, &file)?,
                None => cli::cmd_show(&cobertura, &output.options())?,
            };
            write_output(output.output.as_deref(), &text)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Diff {
            report1,
            report2,
            source1,
            source2,
            source_prefix1,
            source_prefix2,
            ref1,
            ref2,
            no_source,
            source_view,
            context,
            output,
        } => {
            let ignore = output.ignore()?;
            let sources1 = SourceOptions {
                source: source1,
                prefix: source_prefix1,
                rev: ref1,
                disabled: no_source,
            };
            let sources2 = SourceOptions {
                source: source2,
                prefix: source_prefix2,
                rev: ref2,
                disabled: no_source,
            };
            let cobertura1 = load_cobertura(&report1, &sources1, ignore.as_ref())
                .with_context(|| format!("Failed to load {}", report1.display()))?;
            let cobertura2 = load_cobertura(&report2, &sources2, ignore.as_ref())
                .with_context(|| format!("Failed to load {}", report2.display()))?;
            let diff = CoberturaDiff::new(cobertura1, cobertura2);

            if let Some(file) = source_view {
                let text = cli::cmd_diff_source(&diff, &file, context)?;
                write_output(output.output.as_deref(), &text)?;
                return Ok(ExitCode::SUCCESS);
            }

            let (text, outcome) = cli::cmd_diff(&diff, &output.options())?;
            write_output(output.output.as_deref(), &text)?;
            Ok(ExitCode::from(outcome.exit_code() as u8))
        }
    }
}
