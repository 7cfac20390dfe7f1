//! tplconv - converts a template library to the block-templating dialect

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tplconv_core::{Definitions, TranspileError, transpile_dir};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tplconv")]
#[command(version)]
#[command(about = "Convert `<$ $>` templates to the block-templating dialect", long_about = None)]
struct Cli {
    /// Conversion definitions file (parameter maps, group parameter, sequences)
    definitions: PathBuf,

    /// Directory holding `document/` and `block/` template sources
    input_dir: PathBuf,

    /// Directory to write `.tpl` files to (created if missing)
    output_dir: PathBuf,

    /// Log every loaded template and context adjustment
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn default_filter(&self) -> &'static str {
        if self.verbose {
            "tplconv=debug,tplconv_core=debug"
        } else if self.quiet {
            "tplconv=warn,tplconv_core=warn"
        } else {
            "tplconv=info,tplconv_core=info"
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.default_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<TranspileError>() {
                Some(err) => eprint!("{}", err.report()),
                None => eprintln!("Error: {:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if !cli.input_dir.is_dir() {
        bail!("Input directory {} does not exist", cli.input_dir.display());
    }

    let definitions = Definitions::from_file(&cli.definitions)?;
    let written = transpile_dir(&definitions, &cli.input_dir, &cli.output_dir)?;
    tracing::info!(
        "Converted {} template(s) into {}",
        written.len(),
        cli.output_dir.display()
    );
    Ok(())
}
