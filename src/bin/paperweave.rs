//! PaperWeave CLI: harvest, match and link bibliographic records.
//!
//! Usage:
//!   paperweave load-snapshot <file> [--limit N] [--batch-size N]
//!   paperweave update | daemon [--at HH:MM]
//!   paperweave match-dois [--strategy store|client] [--file part.gz]
//!   paperweave cite [--file part.gz]
//!   paperweave analyze | identify | status
//!
//! Every option also reads its environment variable; `.env` is loaded first.

use chrono::Local;
use clap::{Parser, Subcommand};
use paperweave::config::{ConfigError, Settings, DEFAULT_BASE_URL, DEFAULT_CORPUS_DIR};
use paperweave::harvest::{HttpTransport, OaiClient, DEFAULT_CONTACT};
use paperweave::pipeline::{
    load_snapshot, CitationBuilder, IdentifierMatcher, KeySet, MatchStrategy, RunStats,
    UpsertEngine, DEFAULT_BATCH_SIZE, DEFAULT_CITATION_BATCH_SIZE, DEFAULT_MATCH_BATCH_SIZE,
};
use paperweave::source::CorpusLayout;
use paperweave::update::{run_daily, UpdateLedger, Updater, CHECK_INTERVAL};
use paperweave::{GraphStore, OpenStore, PaperColumn, SqliteStore};
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_CONFIG: i32 = 2;

#[derive(Parser)]
#[command(
    name = "paperweave",
    version,
    about = "Harvest arXiv metadata and reconcile it with a bulk work corpus"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to SQLite database file
    #[arg(long, global = true, env = "PAPERWEAVE_DB")]
    db: Option<PathBuf>,

    /// OAI-PMH endpoint
    #[arg(long, global = true, env = "OAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Contact e-mail sent in the User-Agent
    #[arg(long, global = true, env = "EMAIL", default_value = DEFAULT_CONTACT)]
    email: String,

    /// Metadata format to harvest
    #[arg(long, global = true, env = "OAI_METADATA_PREFIX", default_value = "oai_dc")]
    metadata_prefix: String,

    /// Restrict the harvest to one set
    #[arg(long, global = true, env = "OAI_SET")]
    set: Option<String>,

    /// Root of the work corpus (updated_date=*/part_*.gz)
    #[arg(long, global = true, env = "OPENALEX_DATA_DIR", default_value = DEFAULT_CORPUS_DIR)]
    corpus: PathBuf,

    /// Records per store batch (default depends on the command)
    #[arg(long, global = true, env = "PAPERWEAVE_BATCH_SIZE")]
    batch_size: Option<usize>,

    /// Stop after this many records per file
    #[arg(long, global = true)]
    limit: Option<usize>,

    /// Daily run time for the daemon, HH:MM local
    #[arg(long, global = true, env = "UPDATE_TIME", default_value = "23:30")]
    at: String,

    /// Give up a harvest after this many consecutive failed requests
    #[arg(long, global = true, env = "HARVEST_MAX_FAILURES")]
    max_failures: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the arXiv metadata snapshot (JSON lines, optionally gzipped)
    LoadSnapshot {
        /// Snapshot file
        path: PathBuf,
    },
    /// Run one incremental update now
    Update,
    /// Run the incremental update daily until interrupted
    Daemon,
    /// Set openalex_id on Papers whose DOI appears in the work corpus
    MatchDois {
        /// Where DOI lookups happen: store or client
        #[arg(long, default_value = "store")]
        strategy: MatchStrategy,
        /// Process one part file instead of the whole corpus
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Create CITES edges between matched Papers
    Cite {
        /// Process one part file instead of the whole corpus
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Summarize the work corpus without decoding it
    Analyze,
    /// Show repository information, metadata formats and sets
    Identify,
    /// Show graph totals and the update ledger
    Status,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            db_path: self.db.clone().unwrap_or_else(paperweave::config::default_db_path),
            base_url: self.base_url.clone(),
            email: self.email.clone(),
            metadata_prefix: self.metadata_prefix.clone(),
            set: self.set.clone(),
            corpus_dir: self.corpus.clone(),
            batch_size: self.batch_size,
            limit: self.limit,
            update_time: self.at.clone(),
            max_failures: self.max_failures,
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn open_store(settings: &Settings) -> Result<SqliteStore, String> {
    if let Some(parent) = settings.db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    SqliteStore::open(&settings.db_path).map_err(|e| format!("Failed to open database: {}", e))
}

fn open_client(settings: &Settings) -> Result<OaiClient<HttpTransport>, String> {
    let transport = HttpTransport::new(settings.base_url.clone(), &settings.email)
        .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
    Ok(OaiClient::new(transport))
}

fn log_store_status(store: &SqliteStore) {
    match store.counts() {
        Ok(counts) => info!(
            papers = counts.papers,
            with_doi = counts.papers_with_doi,
            already_matched = counts.papers_with_openalex_id,
            pending = counts.papers_with_doi.saturating_sub(counts.papers_with_openalex_id),
            cites = counts.cites,
            "Store status"
        ),
        Err(e) => error!(error = %e, "Failed to read store status"),
    }
}

fn print_run_stats(label: &str, stats: &RunStats) {
    println!("{}:", label);
    println!("  files:       {}", stats.files);
    println!("  records:     {}", stats.lines);
    println!("  malformed:   {}", stats.malformed);
    println!("  candidates:  {}", stats.candidates);
    println!("  matched:     {}", stats.matched);
    println!("  failed:      {} batches", stats.failed_batches);
    println!("  elapsed:     {:.2}s", stats.elapsed.as_secs_f64());
    println!(
        "  throughput:  {:.0} records/s, {:.2} MB/s",
        stats.records_per_sec(),
        stats.mb_per_sec()
    );
}

fn cmd_load_snapshot(store: &SqliteStore, settings: &Settings, path: &Path) -> i32 {
    let engine = UpsertEngine::new(store, settings.batch_size_or(DEFAULT_BATCH_SIZE));
    match load_snapshot(&engine, path, settings.limit) {
        Ok(stats) => {
            println!(
                "Loaded {} papers from {} lines ({} malformed, {} skipped, {} errors) in {:.1}s",
                stats.outcome.updated,
                stats.lines,
                stats.malformed,
                stats.skipped,
                stats.outcome.errors,
                stats.elapsed.as_secs_f64()
            );
            if stats.outcome.errors > 0 {
                EXIT_FAILURE
            } else {
                EXIT_OK
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

async fn cmd_update(store: &SqliteStore, settings: &Settings) -> i32 {
    let client = match open_client(settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    let updater = Updater::new(store, &client, settings.update_options(DEFAULT_BATCH_SIZE));
    match updater.run_incremental_update().await {
        Ok(summary) => {
            println!(
                "Update completed: {} updated, {} deleted, {} errors in {:.1}s ({:.0} records/s)",
                summary.updated,
                summary.deleted,
                summary.errors,
                summary.elapsed.as_secs_f64(),
                summary.records_per_sec()
            );
            if summary.processed() == 0 {
                println!("No new papers found");
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

async fn cmd_daemon(store: &SqliteStore, settings: &Settings) -> i32 {
    let schedule = match settings.schedule() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_CONFIG;
        }
    };
    let client = match open_client(settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    let updater = Updater::new(store, &client, settings.update_options(DEFAULT_BATCH_SIZE));
    let updater = &updater;

    info!(base_url = %settings.base_url, db = %settings.db_path.display(), "Press Ctrl+C to stop");
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Cannot listen for Ctrl+C; stop the process to exit");
            std::future::pending::<()>().await;
        }
    };

    run_daily(schedule, CHECK_INTERVAL, Local::now, shutdown, move || async move {
        info!("Starting scheduled update");
        match updater.run_incremental_update().await {
            Ok(summary) => info!(
                updated = summary.updated,
                deleted = summary.deleted,
                errors = summary.errors,
                "Scheduled update completed"
            ),
            Err(e) => error!(error = %e, "Scheduled update failed"),
        }
    })
    .await;
    EXIT_OK
}

fn cmd_match(store: &SqliteStore, settings: &Settings, strategy: MatchStrategy, file: Option<&Path>) -> i32 {
    log_store_status(store);
    let batch_size = settings.batch_size_or(DEFAULT_MATCH_BATCH_SIZE);
    let matcher = match IdentifierMatcher::new(store, strategy, batch_size) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };

    let stats = match file {
        Some(path) => match matcher.match_file(path, settings.limit) {
            Ok(stats) => stats,
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_FAILURE;
            }
        },
        None => match CorpusLayout::discover(&settings.corpus_dir) {
            Ok(layout) => matcher.match_corpus(&layout, settings.limit),
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_FAILURE;
            }
        },
    };
    print_run_stats("Identifier matching", &stats);
    EXIT_OK
}

fn cmd_cite(store: &SqliteStore, settings: &Settings, file: Option<&Path>) -> i32 {
    log_store_status(store);
    let known = match KeySet::load(store, PaperColumn::OpenalexId) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    let builder = CitationBuilder::new(
        store,
        &known,
        settings.batch_size_or(DEFAULT_CITATION_BATCH_SIZE),
    );

    let stats = match file {
        Some(path) => match builder.build_file(path, settings.limit) {
            Ok(stats) => stats,
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_FAILURE;
            }
        },
        None => match CorpusLayout::discover(&settings.corpus_dir) {
            Ok(layout) => builder.build_corpus(&layout, settings.limit),
            Err(e) => {
                eprintln!("Error: {}", e);
                return EXIT_FAILURE;
            }
        },
    };
    print_run_stats("Citation building", &stats);
    EXIT_OK
}

fn cmd_analyze(settings: &Settings) -> i32 {
    let layout = match CorpusLayout::discover(&settings.corpus_dir) {
        Ok(layout) => layout,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    for partition in layout.partitions() {
        let parts: Vec<_> = layout.parts().iter().filter(|p| p.partition == partition).collect();
        let mb: f64 = parts.iter().map(|p| p.size_mb()).sum();
        println!("  {}  {:>4} files  {:>10.1} MB", partition, parts.len(), mb);
    }
    let overview = layout.overview();
    println!("Corpus: {}", layout.root().display());
    println!("  partitions:         {}", overview.partitions);
    println!("  files:              {}", overview.files);
    println!("  size:               {:.1} MB", overview.total_mb);
    println!("  estimated records:  {}", overview.estimated_records);
    EXIT_OK
}

async fn cmd_identify(settings: &Settings) -> i32 {
    let client = match open_client(settings) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };

    match client.identify().await {
        Ok(info) => {
            for (key, value) in &info {
                println!("{}: {}", key, value);
            }
        }
        Err(e) => {
            eprintln!("Error: Identify failed: {}", e);
            return EXIT_FAILURE;
        }
    }

    match client.list_metadata_formats().await {
        Ok(formats) => {
            let prefixes: Vec<&str> = formats
                .iter()
                .filter_map(|f| f.get("metadataPrefix").map(String::as_str))
                .collect();
            println!("metadataFormats: {}", prefixes.join(", "));
        }
        Err(e) => eprintln!("Warning: ListMetadataFormats failed: {}", e),
    }

    match client.list_sets().await {
        Ok(sets) => {
            println!("sets: {}", sets.len());
            for set in &sets {
                println!(
                    "  {}  {}",
                    set.get("setSpec").map(String::as_str).unwrap_or(""),
                    set.get("setName").map(String::as_str).unwrap_or("")
                );
            }
        }
        Err(e) => eprintln!("Warning: ListSets failed: {}", e),
    }
    EXIT_OK
}

fn cmd_status(store: &SqliteStore) -> i32 {
    let counts = match store.counts() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    };
    println!("Papers:            {}", counts.papers);
    println!("  with DOI:        {}", counts.papers_with_doi);
    println!("  with OpenAlex:   {}", counts.papers_with_openalex_id);
    println!("Authors:           {}", counts.authors);
    println!("Categories:        {}", counts.categories);
    println!("WROTE:             {}", counts.wrote);
    println!("HAS_CATEGORY:      {}", counts.has_category);
    println!("CITES:             {}", counts.cites);

    let ledger = UpdateLedger::new(store);
    match ledger.entry() {
        Ok(Some(entry)) => println!(
            "Last update:       {} ({} runs)",
            entry.last_update_time, entry.update_count
        ),
        Ok(None) => println!("Last update:       never"),
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    }
    match ledger.last_update_timestamp(chrono::Utc::now()) {
        Ok(mark) => println!("Next harvest from: {} ({:?})", mark.timestamp, mark.source),
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FAILURE;
        }
    }
    EXIT_OK
}

/// Validate everything the command needs before any store is opened.
fn validate(settings: &Settings, command: &Commands) -> Result<(), ConfigError> {
    match command {
        Commands::LoadSnapshot { path } => settings.validate_input(path),
        Commands::Update | Commands::Identify => settings.validate_harvest(),
        Commands::Daemon => settings.validate_schedule().map(|_| ()),
        Commands::MatchDois { file: Some(path), .. } | Commands::Cite { file: Some(path) } => {
            settings.validate_input(path)
        }
        Commands::MatchDois { file: None, .. } | Commands::Cite { file: None } | Commands::Analyze => {
            settings.validate_corpus()
        }
        Commands::Status => settings.validate(),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let settings = cli.settings();
    if let Err(e) = validate(&settings, &cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_CONFIG);
    }

    let code = match &cli.command {
        Commands::Analyze => cmd_analyze(&settings),
        Commands::Identify => cmd_identify(&settings).await,
        command => {
            let store = match open_store(&settings) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(EXIT_FAILURE);
                }
            };
            match command {
                Commands::LoadSnapshot { path } => cmd_load_snapshot(&store, &settings, path),
                Commands::Update => cmd_update(&store, &settings).await,
                Commands::Daemon => cmd_daemon(&store, &settings).await,
                Commands::MatchDois { strategy, file } => {
                    cmd_match(&store, &settings, *strategy, file.as_deref())
                }
                Commands::Cite { file } => cmd_cite(&store, &settings, file.as_deref()),
                Commands::Status => cmd_status(&store),
                Commands::Analyze | Commands::Identify => EXIT_OK,
            }
        }
    };
    std::process::exit(code);
}
