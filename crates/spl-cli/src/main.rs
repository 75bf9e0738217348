use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use spl_lang::{analysis, header, syntax, CompileOptions, Error};

#[derive(Debug, Parser)]
#[command(name = "splc")]
#[command(version, about = "Resolve an SPL module against the headers of its imports")]
struct Cli {
    /// Source file to compile
    file: PathBuf,

    /// Module name recorded in the emitted header (defaults to the file stem)
    #[arg(long)]
    module: Option<String>,

    /// Directory searched for headers, ahead of the configured ones
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// JSON options file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Where to write the module's header (defaults to next to the source)
    #[arg(long, value_name = "FILE")]
    emit_header: Option<PathBuf>,

    /// Print the resolved program
    #[arg(long)]
    dump: bool,

    /// Treat warnings as errors
    #[arg(long)]
    deny_warnings: bool,
}

fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("{e:#}");
        return ExitCode::FAILURE;
    }
    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

/// Returns whether the module resolved.
fn run(cli: Cli) -> Result<bool> {
    let options = options(&cli)?;
    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("cannot read `{}`", cli.file.display()))?;

    let program = match syntax::parse(&source) {
        Ok(p) => p,
        Err(errs) => {
            report(&errs);
            return Ok(false);
        }
    };

    let modules = program.imports.iter().map(|i| i.module.as_str());
    let headers = header::load(modules, &options.header_dirs, &options.header_extension)?;
    debug!(found = headers.len(), "headers loaded");

    let result = match analysis::resolve(program, &headers, &options) {
        Ok(r) => r,
        Err(errs) => {
            report(&errs);
            return Ok(false);
        }
    };
    report(&result.warnings);

    if cli.dump {
        print!("{}", result.program);
    }

    let target = cli
        .emit_header
        .clone()
        .unwrap_or_else(|| cli.file.with_extension(&options.header_extension));
    let text = result.header()?;
    std::fs::write(&target, text).with_context(|| format!("cannot write `{}`", target.display()))?;
    info!(module = %options.module, header = %target.display(), "module resolved");
    Ok(true)
}

fn options(cli: &Cli) -> Result<CompileOptions> {
    let mut options = match &cli.config {
        Some(path) => CompileOptions::from_file(path)?,
        None => CompileOptions::new(),
    };
    for dir in cli.include.iter().rev() {
        options = options.with_header_dir(dir.clone());
    }
    // an options file names its own module unless overridden
    let module = match (&cli.module, &cli.config) {
        (Some(m), _) => Some(m.clone()),
        (None, None) => file_stem(&cli.file),
        (None, Some(_)) => None,
    };
    if let Some(module) = module {
        options = options.with_module(module);
    }
    if cli.deny_warnings {
        options = options.with_warnings_as_errors(true);
    }
    Ok(options)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

fn report(diagnostics: &[Error]) {
    for e in diagnostics {
        eprintln!("{e}");
    }
}
