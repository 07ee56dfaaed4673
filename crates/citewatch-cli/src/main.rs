use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use citewatch_core::AppConfig;
use citewatch_core::sync::{NoteWatcher, WatchLoop, list_notes};
use citewatch_science::{NotePipeline, NoteReport};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "citewatch",
    about = "Watch a folder of notes and append citations for arXiv links",
    version,
    long_about = None
)]
struct Cli {
    /// Directory of notes to watch (default: ./papers).
    #[arg(short = 'w', long = "watch")]
    watch: Option<PathBuf>,

    /// Where downloaded PDFs go (default: <watch dir>/pdfs).
    #[arg(short = 'p', long = "pdf-dir")]
    pdf_dir: Option<PathBuf>,

    /// Scan every note once and exit instead of watching.
    #[arg(short = 'o', long)]
    once: bool,

    /// Route all requests through this proxy, e.g. http://127.0.0.1:7897.
    #[arg(long)]
    proxy: Option<String>,

    /// Do not use the configured proxy. Wins over --proxy.
    #[arg(long)]
    no_proxy: bool,

    /// Config file to load instead of the default location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short = 'v', long)]
    verbose: bool,
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let mut config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    apply_overrides(&mut config, &cli)?;

    let watch_dir = config.watch.directory.clone();
    let pdf_dir = config.resolved_pdf_dir();
    std::fs::create_dir_all(&watch_dir)
        .with_context(|| format!("creating watch directory {}", watch_dir.display()))?;
    std::fs::create_dir_all(&pdf_dir)
        .with_context(|| format!("creating PDF directory {}", pdf_dir.display()))?;

    info!(
        watch = %watch_dir.display(),
        pdfs = %pdf_dir.display(),
        proxy = config.network.active_proxy().unwrap_or("off"),
        "citewatch v{}",
        env!("CARGO_PKG_VERSION")
    );

    let mut pipeline = NotePipeline::from_config(&config).context("building HTTP clients")?;
    info!(
        state = %pipeline.state().path().display(),
        processed = pipeline.state().processed_count(),
        "state loaded"
    );

    if cli.once {
        scan_once(&mut pipeline, &watch_dir, &config.watch.extensions).await
    } else {
        watch(&mut pipeline, &config).await
    }
}

// ─── Modes ──────────────────────────────────────────────────────────────────

async fn scan_once(pipeline: &mut NotePipeline, dir: &Path, extensions: &[String]) -> Result<()> {
    let start = Instant::now();
    let notes = list_notes(dir, extensions)?;
    info!(count = notes.len(), "single scan");

    let mut total = NoteReport::default();
    let mut failed = 0usize;
    for note in &notes {
        info!(note = %note.display(), "scanning");
        match pipeline.process_note(note).await {
            Ok(report) => add_report(&mut total, &report),
            Err(e) => {
                failed += 1;
                error!(note = %note.display(), error = %e, "failed to process note");
            }
        }
    }

    println!(
        "Scanned {} note(s) in {:.1}s: {} citation(s) added, {} PDF(s) downloaded, \
         {} DOI link(s) recorded, {} unresolved, {} failed.",
        notes.len(),
        start.elapsed().as_secs_f64(),
        total.cited,
        total.pdfs,
        total.dois,
        total.unresolved,
        failed
    );
    Ok(())
}

async fn watch(pipeline: &mut NotePipeline, config: &AppConfig) -> Result<()> {
    let (watcher, events) = NoteWatcher::start(
        config.watch.directory.clone(),
        config.watch.extensions.clone(),
    )
    .context("starting directory watcher")?;
    info!(directory = %watcher.directory().display(), "watching for note changes (Ctrl-C to stop)");

    let watch_loop = WatchLoop::new(events, config.watch.debounce(), config.watch.poll_interval());
    watch_loop
        .run(pipeline, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "could not listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    drop(watcher);
    info!("stopped watching");
    Ok(())
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) -> Result<()> {
    if let Some(dir) = &cli.watch {
        config.watch.directory = dir.clone();
    }
    config.watch.directory = std::path::absolute(&config.watch.directory)
        .with_context(|| format!("resolving {}", config.watch.directory.display()))?;

    if let Some(dir) = &cli.pdf_dir {
        config.watch.pdf_directory = Some(std::path::absolute(dir)?);
    }

    if cli.no_proxy {
        config.network.use_proxy = false;
    } else if let Some(proxy) = &cli.proxy {
        config.network.use_proxy = true;
        config.network.proxy = Some(proxy.clone());
    }
    Ok(())
}

fn add_report(total: &mut NoteReport, report: &NoteReport) {
    total.links += report.links;
    total.already_processed += report.already_processed;
    total.cited += report.cited;
    total.pdfs += report.pdfs;
    total.dois += report.dois;
    total.unresolved += report.unresolved;
}
