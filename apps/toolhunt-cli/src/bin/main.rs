use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use toolhunt_core::config::{expand_path, AppConfig, Config};
use toolhunt_core::traits::Embedder;
use toolhunt_core::Catalog;
use toolhunt_embed::get_default_embedder;
use toolhunt_hybrid::{BuildOptions, HybridEngine, ResponseStatus, SearchService};
use toolhunt_text::TantivyIndexer;
use toolhunt_vector::EmbeddingCache;

#[derive(Parser)]
#[command(name = "toolhunt", about = "Hybrid lexical and semantic search over a security tool catalog")]
struct Cli {
    /// Catalog CSV, overrides `catalog.path`
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Show a progress bar while embedding the catalog
    #[arg(long, global = true, default_value_t = false)]
    progress: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print ranked matches for a query as JSON
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Add a tool to the catalog, skipping case-insensitive duplicates
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "")]
        url: String,
    },
    /// Delete cached document embeddings
    InvalidateCache,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(false).init();
}

fn build_engine(app: &AppConfig, catalog_path: &Path, cache: Option<&EmbeddingCache>, show_progress: bool) -> anyhow::Result<HybridEngine<TantivyIndexer>> {
    let catalog = Catalog::load_csv(catalog_path)?;
    let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&app.embedding)?);
    let text = TantivyIndexer::new()?;
    let engine = HybridEngine::build(catalog.snapshot(), text, embedder, app.engine.clone(), BuildOptions { cache, show_progress })?;
    Ok(engine)
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let app = Config::load()?.app()?;
    let catalog_path = cli.catalog.clone().unwrap_or_else(|| expand_path(&app.catalog.path));
    let cache = EmbeddingCache::new(expand_path(&app.cache.path));

    match cli.command {
        Command::Search { query } => {
            let query = query.join(" ");
            let service = SearchService::new();
            if !query.trim().is_empty() {
                let cache = app.cache.enabled.then_some(&cache);
                match build_engine(&app, &catalog_path, cache, cli.progress) {
                    Ok(engine) => { service.publish(engine); }
                    Err(e) => error!(error = %format!("{:#}", e), "engine build failed"),
                }
            }
            let (status, body) = service.handle(&query);
            println!("{}", body.to_json());
            Ok(if status == ResponseStatus::Ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Command::Add { name, description, url } => {
            let mut catalog = Catalog::load_csv(&catalog_path)?;
            if catalog.insert(&name, &description, &url)? {
                catalog.save_csv(&catalog_path)?;
                let removed = cache.invalidate()?;
                info!(name = %name.trim(), cache_removed = removed, "tool added");
                println!("Added '{}' ({} tools)", name.trim(), catalog.len());
            } else {
                println!("Skipped '{}': a tool with that name already exists", name.trim());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::InvalidateCache => {
            if cache.invalidate()? {
                println!("Removed {}", cache.path().display());
            } else {
                println!("No cache at {}", cache.path().display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
