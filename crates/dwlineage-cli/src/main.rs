//! dwlineage CLI - warehouse catalog and lineage from SQL scripts

use dwlineage_cli::cli::{self, Command, LayerArg, OutputFormat, RunArgs};
use dwlineage_cli::input;
use dwlineage_cli::logging;
use dwlineage_cli::output;
use dwlineage_cli::Settings;

use anyhow::{Context, Result};
use clap::Parser;
use dwlineage_core::{
    ids, BatchProcessor, BatchReport, Dialect, EngineConfig, ErrorReport, ProcessOutcome,
    ProcessStatus, UpdateCoordinator,
};
use dwlineage_export::{
    export_lineage, write_all_lineage, write_script_lineage, DuckDbCatalog, Scope,
};
use is_terminal::IsTerminal;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};

use cli::Args;

/// One or more scripts failed.
const EXIT_FAILURE: u8 = 1;
/// Configuration or input error (unreadable file, bad config, catalog unavailable).
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(EXIT_FAILURE),
        Err(e) => {
            eprintln!("dwlineage: error: {e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// Returns whether every processed script succeeded.
fn run(args: Args) -> Result<bool> {
    let settings = Settings::load(args.config.as_deref())?;
    let db = settings.db_path(args.db.as_deref());

    match args.command {
        Command::Init => {
            open_catalog(&db)?;
            println!("Initialized catalog at {}", db.display());
            Ok(true)
        }
        Command::Process { file, run } => {
            let catalog = open_catalog(&db)?;
            let config = settings.engine;
            let source = input::read_script(&file, dialect_for(&run, &config))?;
            let coordinator = UpdateCoordinator::new(&catalog, config);
            let outcome = coordinator.process(&source, run.mode.into());
            print_report(&BatchReport::from_outcomes(vec![outcome.clone()]), Some(&outcome), run.format)?;
            Ok(outcome.is_success())
        }
        Command::Batch { dir, run, workers } => {
            let catalog = open_catalog(&db)?;
            let mut config = settings.engine;
            if let Some(workers) = workers {
                config = config.with_workers(workers);
            }
            let dialect = dialect_for(&run, &config);

            let files = input::discover_sql_files(&dir)?;
            info!(target: "cli", "found {} script(s) under {}", files.len(), dir.display());
            let mut sources = Vec::with_capacity(files.len());
            let mut unreadable = Vec::new();
            for path in &files {
                match input::read_script(path, dialect) {
                    Ok(source) => sources.push(source),
                    Err(err) => unreadable.push(read_failure(path, &err)),
                }
            }

            let coordinator = UpdateCoordinator::new(&catalog, config);
            let mut report = BatchProcessor::new(&coordinator).run(&sources, run.mode.into())?;
            for outcome in unreadable {
                report.push(outcome);
            }
            print_report(&report, None, run.format)?;
            Ok(report.is_success())
        }
        Command::Export {
            script,
            layer,
            output,
        } => {
            let catalog = open_catalog(&db)?;
            export(&catalog, script.as_deref(), layer, output)?;
            Ok(true)
        }
    }
}

fn open_catalog(path: &Path) -> Result<DuckDbCatalog> {
    debug!(target: "cli", "opening catalog {}", path.display());
    DuckDbCatalog::open(path).with_context(|| format!("Failed to open catalog: {}", path.display()))
}

fn dialect_for(run: &RunArgs, config: &EngineConfig) -> Dialect {
    run.dialect.map(Into::into).unwrap_or(config.dialect)
}

/// A script that could not be read is reported like any other failure.
fn read_failure(path: &Path, err: &anyhow::Error) -> ProcessOutcome {
    let name = path.display().to_string();
    ProcessOutcome {
        script_id: ids::script_id_from_path(&name),
        name,
        status: ProcessStatus::Failed,
        report: None,
        error: Some(ErrorReport {
            code: "READ_ERROR".to_string(),
            message: format!("{err:#}"),
        }),
    }
}

fn print_report(
    report: &BatchReport,
    single: Option<&ProcessOutcome>,
    format: OutputFormat,
) -> Result<()> {
    let text = match (format, single) {
        (OutputFormat::Json, Some(outcome)) => output::format_outcome_json(outcome)?,
        (OutputFormat::Json, None) => output::format_batch_json(report)?,
        (OutputFormat::Table, _) => output::format_table(report, std::io::stdout().is_terminal()),
    };
    println!("{}", text.trim_end());
    Ok(())
}

fn export(
    catalog: &DuckDbCatalog,
    script: Option<&str>,
    layer: Option<LayerArg>,
    output: Option<PathBuf>,
) -> Result<()> {
    let script_id = script.map(ids::script_id_from_path);

    let Some(layer) = layer else {
        let dir = output.unwrap_or_else(|| PathBuf::from("."));
        let files = match &script_id {
            Some(id) => write_script_lineage(catalog, id, &dir)?,
            None => write_all_lineage(catalog, &dir)?,
        };
        info!(target: "cli", "wrote {} and {}", files.detail.display(), files.summary.display());
        println!("{}\n{}", files.detail.display(), files.summary.display());
        return Ok(());
    };

    let scope = match script_id {
        Some(id) => Scope::Script(id),
        None => Scope::All,
    };
    let json = export_lineage(catalog, layer.into(), &scope)?.to_json()?;
    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(target: "cli", "wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
