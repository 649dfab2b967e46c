//! Form filler binary
//!
//! Fills a template PDF once per record and merges each data file's records
//! into one document.

use anyhow::Context;
use clap::Parser;
use formfill_cli::config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "formfill")]
#[command(version, about = "Fill a PDF form template for every record and merge the results")]
struct Args {
    /// TOML configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = "formfill.toml")]
    config: PathBuf,

    /// Directory holding the single template PDF
    #[arg(long)]
    template_dir: Option<PathBuf>,

    /// Directory of JSON record files, one group per file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory receiving the merged documents
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Prefix for generated file names
    #[arg(short, long)]
    prefix: Option<String>,

    /// 0-based page carrying the form; earlier pages are headers
    #[arg(long)]
    form_page: Option<usize>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_to(self, config: &mut Config) {
        if let Some(dir) = self.template_dir {
            config.template.dir = dir;
        }
        if let Some(dir) = self.data_dir {
            config.data.dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output.dir = dir;
        }
        if let Some(prefix) = self.prefix {
            config.output.prefix = prefix;
        }
        if let Some(page) = self.form_page {
            config.template.form_page = page;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting formfill v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration {}", args.config.display()))?;
    args.apply_to(&mut config);

    let written = formfill_cli::run(&config)?;
    tracing::info!("Process complete: {} document(s) written", written.len());
    Ok(())
}
