//! Main module for the Profile Search CLI (psearch).
//!
//! Parses the command line, loads configuration, builds the Gemini and
//! MongoDB clients and hands them to the requested command.
//!
//! # Examples
//!
//! ```sh
//! psearch check
//! psearch backfill
//! psearch search "young doctors with high income" --limit 10
//! psearch interactive
//! ```

use std::{
    fs,
    io::{self, Write},
    process::ExitCode,
};

use clap::Parser;
use once_cell::sync::OnceCell;
use profile_search::{
    backfill::run_backfill,
    commands::{Cli, Commands},
    config::{FileConfig, SearchConfig},
    config_dir,
    embedding::GeminiEmbedder,
    error::AppError,
    search::{SearchOptions, SearchView, is_blank_query, run_search},
    store::MongoStore,
    ui,
};
use tracing::{debug, error, info};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> ExitCode {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt().with_writer(io::stderr).init();
    });
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: unable to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Runs the parsed command.
///
/// # Errors
///
/// Configuration problems, an unreachable database and terminal IO failures
/// are returned; per-search and per-record failures are rendered or logged
/// where they happen instead.
async fn run(cli: Cli) -> Result<ExitCode, AppError> {
    let load = || SearchConfig::from_env(cli.config.as_deref());

    match cli.command {
        Commands::Init => {
            init()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => {
            let config = load()?;
            println!("Configuration loaded successfully.");
            println!("   {}", config.summary());
            Ok(ExitCode::SUCCESS)
        }
        Commands::Backfill => backfill(&load()?).await,
        Commands::Search {
            query,
            search,
            json,
        } => search_once(&load()?, &query.join(" "), search.into(), json).await,
        Commands::Interactive { search } => interactive(&load()?, search.into()).await,
    }
}

async fn backfill(config: &SearchConfig) -> Result<ExitCode, AppError> {
    let embedder = GeminiEmbedder::from_config(config);
    let store = MongoStore::connect(config).await?;
    info!("Backfilling with model {}", embedder.model());

    let progress = ui::spinner("Scanning for records without an embedding...");
    let result = run_backfill(&store, &embedder, &progress).await;
    progress.finish_and_clear();
    store.shutdown().await;

    let report = result?;
    println!(
        "\nFinished processing. Added embeddings to {} documents.",
        report.processed
    );
    if report.failed > 0 {
        println!("{} documents failed; run again to retry them.", report.failed);
    }

    Ok(match report.scan_error {
        Some(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
        None => ExitCode::SUCCESS,
    })
}

async fn search_once(
    config: &SearchConfig,
    query: &str,
    options: SearchOptions,
    json: bool,
) -> Result<ExitCode, AppError> {
    if is_blank_query(query) {
        return print_view(&SearchView::EmptyQuery, json);
    }

    let embedder = GeminiEmbedder::from_config(config);
    let store = MongoStore::connect(config).await?;

    let progress = ui::spinner("Searching for similar customers...");
    let view = run_search(query, &embedder, &store, &config.vector_search_index, options).await;
    progress.finish_and_clear();
    store.shutdown().await;

    print_view(&view, json)
}

fn print_view(view: &SearchView, json: bool) -> Result<ExitCode, AppError> {
    let mut stdout = io::stdout().lock();
    if json {
        ui::render_json(&mut stdout, &mut io::stderr(), view)?;
    } else {
        ui::render_view(&mut stdout, view)?;
    }
    stdout.flush()?;

    Ok(if view.is_failure() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn interactive(config: &SearchConfig, options: SearchOptions) -> Result<ExitCode, AppError> {
    let embedder = GeminiEmbedder::from_config(config);
    let store = MongoStore::connect(config).await?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let result = ui::interactive(
        &embedder,
        &store,
        &config.vector_search_index,
        options,
        stdin.lock(),
        &mut stdout,
    )
    .await;
    store.shutdown().await;

    let searches = result?;
    debug!("Interactive session ended after {} searches", searches);
    Ok(ExitCode::SUCCESS)
}

/// Writes a template `config.yaml` into the configuration directory.
///
/// An existing file is left untouched.
fn init() -> Result<(), AppError> {
    let dir = config_dir()?;
    info!("Creating config directory: {}", dir.display());
    fs::create_dir_all(&dir)?;

    let path = dir.join("config.yaml");
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    let yaml = serde_yaml::to_string(&FileConfig::template())?;
    fs::write(&path, yaml)?;
    println!("Wrote {}", path.display());
    Ok(())
}
