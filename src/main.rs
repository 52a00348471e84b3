use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use modeguard::baseline::SecurityBaseline;
use modeguard::companion::FsCompanionResolver;
use modeguard::config::ValidatorConfig;
use modeguard::error::{EXIT_FATAL, FatalError};
use modeguard::linters::{self, LinterReport};
use modeguard::pipeline::Pipeline;
use modeguard::project::resolve_target;
use modeguard::report::{self, EXIT_FAILED, Summary};
use modeguard::schema::ModeSchema;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Validate a `.roomodes` agent-mode configuration and its companion rules.
#[derive(Parser)]
#[command(name = "modeguard", version)]
struct Cli {
    /// Configuration file or project directory. Defaults to the nearest
    /// ancestor of the working directory that holds a `.roomodes`.
    path: Option<PathBuf>,

    /// Validator settings (TOML).
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON Schema to validate against instead of the discovered one.
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Security baseline instead of the discovered one.
    #[arg(long)]
    baseline: Option<PathBuf>,

    /// Override the indentation unit.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    indent: Option<u64>,

    /// Also run the external linters and policy engines that are installed.
    #[arg(long)]
    external_linters: bool,

    /// Write summary and handoff files under the project root.
    #[arg(long)]
    summary: bool,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            err.downcast_ref::<FatalError>()
                .map(FatalError::exit_code)
                .unwrap_or(EXIT_FATAL)
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("could not determine working directory")?;

    let explicit_config = cli.config.as_deref().map(ValidatorConfig::load_from).transpose()?;
    let file_name = explicit_config
        .as_ref()
        .map(|c| c.config_file_name.clone())
        .unwrap_or_else(|| ValidatorConfig::default().config_file_name);
    let target = resolve_target(cli.path.as_deref(), &cwd, &file_name)?;
    tracing::debug!(root = %target.root.display(), file = %target.file.display(), "resolved target");

    let mut config = match explicit_config {
        Some(config) => config,
        None => ValidatorConfig::discover(&target.root, None)?,
    };
    if let Some(indent) = cli.indent {
        config.indent = usize::try_from(indent).context("indentation unit out of range")?;
    }

    let tools_dir = config.tools_path(&target.root);
    let schema = ModeSchema::discover(&tools_dir, cli.schema.as_deref())?;
    let baseline = SecurityBaseline::discover(&tools_dir, cli.baseline.as_deref())?;
    let pipeline = Pipeline::new(&config, schema, baseline)?;
    let companions = FsCompanionResolver::new(config.rules_path(&target.root), config.companion_prefix.clone());

    let report = pipeline.run_file(&target.file, &companions)?;

    let linter_reports: Vec<LinterReport> = if cli.external_linters {
        linters::run_all(&tools_dir, &target.file)
    } else {
        Vec::new()
    };
    let linters_ok = linter_reports.iter().all(LinterReport::is_ok);
    let exit_code = if linters_ok { report.exit_code() } else { EXIT_FAILED };

    let summary = Summary::new(&target.root, &target.file, report, linter_reports);
    match cli.format {
        Format::Text => print_text(&summary)?,
        Format::Json => {
            let mut out = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut out, &summary)?;
            writeln!(out)?;
        }
    }

    if cli.summary {
        let paths = report::write_summary(
            &summary,
            &target.root,
            &config.reports_path(&target.root),
            &config.handoff_path(&target.root),
        )
        .context("could not write validation summary")?;
        if matches!(cli.format, Format::Text) {
            println!("Wrote {}", display_relative(&paths.summary_json, &target.root));
            println!("Wrote {}", display_relative(&paths.summary_md, &target.root));
            println!("Wrote {}", display_relative(&paths.handoff, &target.root));
        }
    }

    Ok(exit_code)
}

fn print_text(summary: &Summary) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    let mut err = std::io::stderr().lock();
    summary.report.write_text(&mut out, &mut err)?;
    for linter in &summary.linters {
        match &linter.hint {
            Some(hint) if !linter.available => {
                writeln!(out, "! {} not found; skipping. {}", linter.name, hint)?
            }
            _ => writeln!(out, "-> {}: {}", linter.name, linter.summary_line())?,
        }
    }
    Ok(())
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}
