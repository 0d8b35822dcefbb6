use crate::{OutputMode, emit_success};
use anyhow::Context;
use owo_colors::OwoColorize;
use placesmerge::config::{MergeConfig, default_config_path, ensure_db_dir, load_config, write_config};
use placesmerge::merge::MergeReport;
use placesmerge::source::{Liveness, SourceKind, open_source};
use placesmerge::ui::{Icons, ProgressManager, Spinner, TableBuilder, error, header, section, success, theme, warn};
use placesmerge::{HistoryStore, MergeOrchestrator};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct MergeArgs {
    pub from: PathBuf,
    pub to: PathBuf,
    pub format: Option<String>,
    pub config: Option<PathBuf>,
    pub create: bool,
}

/// Checks that can fail before anything is read or written
fn check_source(path: &Path) -> anyhow::Result<()> {
    std::fs::File::open(path)
        .with_context(|| format!("cannot read source database {}", path.display()))?;
    Ok(())
}

fn open_destination(path: &Path, create: bool) -> anyhow::Result<HistoryStore> {
    if path.exists() {
        let metadata = std::fs::metadata(path)?;
        if metadata.permissions().readonly() {
            anyhow::bail!("destination {} is not writable", path.display());
        }
        return Ok(HistoryStore::open(path)?);
    }

    if !create {
        anyhow::bail!(
            "destination {} does not exist (use --create to start a new one)",
            path.display()
        );
    }
    ensure_db_dir(path)?;
    tracing::info!("Creating destination {}", path.display());
    Ok(HistoryStore::create(path)?)
}

pub fn run_merge(args: &MergeArgs, output_mode: OutputMode) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?.unwrap_or_default();
    let format = match &args.format {
        Some(f) => Some(f.parse::<SourceKind>()?),
        None => config.format,
    };

    check_source(&args.from)?;
    if args.from.canonicalize().ok() == args.to.canonicalize().ok() && args.to.exists() {
        anyhow::bail!("source and destination are the same file");
    }
    let mut store = open_destination(&args.to, args.create || config.create_destination())?;

    if output_mode.is_human() {
        header(&format!("Merging {} into {}", args.from.display(), args.to.display()));
    }

    let started = Instant::now();
    let (progress, sink) = if output_mode.is_human() {
        let (pm, sink) = ProgressManager::new();
        (Some(pm), sink)
    } else {
        (None, Default::default())
    };

    let liveness = Liveness::new(sink.clone(), config.liveness_ops());
    let result = open_source(&args.from, format, &liveness).and_then(|source| {
        MergeOrchestrator::new(&mut store)
            .with_progress(sink)
            .run(source.as_ref())
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            if let Some(pm) = progress {
                pm.finish();
            }
            if output_mode.is_human() {
                error(&e.to_string());
            }
            return Err(e.into());
        }
    };

    if let Some(pm) = progress {
        pm.finish_with_summary(started.elapsed(), report.places.inserted, report.visits.inserted);
    }

    if output_mode.is_human() {
        print_report(&report);
        if report.visits.cleared > 0 {
            warn(&format!(
                "{} visits pointed at a predecessor missing from the source; their from_visit was cleared",
                report.visits.cleared
            ));
        }
    } else {
        emit_success(output_mode, "merge", serde_json::to_value(&report)?)?;
    }
    Ok(())
}

fn print_report(report: &MergeReport) {
    section(&format!(" {} source, {} ", report.source, report.policy));
    let mut table = TableBuilder::new();
    table.add_row("Origins added", &report.origins_added.to_string());
    table.add_row("Places added", &report.places.inserted.to_string());
    table.add_row("Places refreshed", &report.places.refreshed.to_string());
    table.add_row("Places already present", &report.places.unchanged.to_string());
    table.add_row("Visits added", &report.visits.inserted.to_string());
    table.add_row("Visits already present", &report.visits.reused.to_string());
    table.add_row("from_visit linked", &report.visits.linked.to_string());
    table.add_row("from_visit cleared", &report.visits.cleared.to_string());
    println!("{}", table.build());
}

pub fn run_stats(database: &Path, output_mode: OutputMode) -> anyhow::Result<()> {
    let store = HistoryStore::inspect(database)?;
    let stats = store.stats()?;

    if output_mode.is_human() {
        println!("{} History statistics ({})", Icons::STATS, database.display());
        let mut table = TableBuilder::new();
        table.add_row("Origins", &stats.origins.to_string());
        table.add_row("Places", &stats.places.to_string());
        table.add_row("Visits", &stats.visits.to_string());
        println!("{}", table.build());
    } else {
        emit_success(output_mode, "stats", serde_json::to_value(stats)?)?;
    }
    Ok(())
}

/// Returns whether the database is free of duplicate and dangling rows
pub fn run_verify(database: &Path, output_mode: OutputMode) -> anyhow::Result<bool> {
    let store = HistoryStore::inspect(database)?;
    let spinner = Spinner::new("Checking history integrity");
    let report = store.verify()?;
    spinner.finish_and_clear();

    if !output_mode.is_human() {
        emit_success(output_mode, "verify", serde_json::json!({
            "clean": report.is_clean(),
            "report": report,
        }))?;
        return Ok(report.is_clean());
    }

    if report.is_clean() {
        success(&format!("{} is consistent", database.display()));
        return Ok(true);
    }

    let mut table = TableBuilder::new();
    table.add_row("Duplicate place hashes", &report.duplicate_hashes.len().to_string());
    table.add_row("Duplicate origins", &report.duplicate_origins.len().to_string());
    table.add_row("Duplicate visits", &report.duplicate_visits.len().to_string());
    table.add_row("Dangling from_visit edges", &report.dangling_from_visits.len().to_string());
    println!("{}", table.build());
    for (id, from_visit) in report.dangling_from_visits.iter().take(10) {
        println!(
            "  {} visit {} -> {}",
            Icons::CROSS,
            id,
            from_visit.style(theme().dim)
        );
    }
    error(&format!("{} violates the merge invariants", database.display()));
    Ok(false)
}

pub fn run_hash(url: &str, output_mode: OutputMode) -> anyhow::Result<()> {
    let hash = placesmerge::url_hash(url)?;
    if output_mode.is_human() {
        println!("{}", hash);
        println!("{}", format!("0x{:012x}", hash).style(theme().dim));
    } else {
        emit_success(output_mode, "hash", serde_json::json!({ "url": url, "hash": hash }))?;
    }
    Ok(())
}

pub fn run_init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    let config = MergeConfig {
        format: None,
        liveness_ops: Some(placesmerge::source::DEFAULT_LIVENESS_OPS),
        create_destination: Some(false),
    };
    write_config(&path, &config, force)?;
    success(&format!("Wrote {}", path.display()));
    Ok(())
}
