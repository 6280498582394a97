use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use subtitle_search_core::{
    sample_documents, CharacterNgramEmbedder, Embedder, PlaceholderTranscriber, Relevance,
    SearchCoordinator, SearchMode, SearchOptions, SearchRequest, SqliteCorpus, Transcriber,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "subtitle-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// SQLite database holding the zipfiles table
    #[arg(long, env = "SUBTITLE_DB", default_value = "data/eng_subtitles_database.db")]
    database: PathBuf,

    /// TOML file with search options
    #[arg(long, env = "SUBTITLE_SEARCH_CONFIG")]
    config: Option<PathBuf>,

    /// Words per chunk for ranked search
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Words shared between consecutive chunks
    #[arg(long)]
    overlap: Option<usize>,

    /// Fraction of the corpus to index, in (0, 1]
    #[arg(long)]
    sample_ratio: Option<f64>,

    /// Embed with the local all-MiniLM-L6-v2 model instead of hashed trigrams
    #[cfg(feature = "local-embeddings")]
    #[arg(long, default_value_t = false)]
    local_embeddings: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Write the five reference subtitles into the database.
    Seed,
    /// Search subtitles.
    Search {
        /// Text to search for
        query: Option<String>,
        /// exact, keyword (TF-IDF) or semantic
        #[arg(long, default_value = "exact")]
        mode: String,
        /// Documents to return in ranked modes
        #[arg(long)]
        top_k: Option<usize>,
        /// Documents to return in exact mode
        #[arg(long)]
        max_results: Option<usize>,
        /// Match case exactly in exact mode
        #[arg(long, default_value_t = false)]
        case_sensitive: bool,
        /// Audio file to transcribe into the query
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Print results as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show details for one subtitle.
    Info {
        /// Subtitle id (num)
        id: i64,
    },
    /// Extract every subtitle into a directory of .srt files.
    Export {
        #[arg(long, default_value = "extracted_subtitles")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        database = %cli.database.display(),
        "subtitle-search boot"
    );

    let options = load_options(&cli).await?;
    dispatch(cli, options).await
}

#[cfg(feature = "local-embeddings")]
async fn dispatch(cli: Cli, options: SearchOptions) -> anyhow::Result<()> {
    if cli.local_embeddings {
        let embedder = subtitle_search_core::FastEmbedder::try_new()?;
        return run(cli, options, embedder).await;
    }
    run(cli, options, CharacterNgramEmbedder::default()).await
}

#[cfg(not(feature = "local-embeddings"))]
async fn dispatch(cli: Cli, options: SearchOptions) -> anyhow::Result<()> {
    run(cli, options, CharacterNgramEmbedder::default()).await
}

async fn load_options(cli: &Cli) -> anyhow::Result<SearchOptions> {
    let mut options = match &cli.config {
        Some(path) => SearchOptions::from_toml(&tokio::fs::read_to_string(path).await?)?,
        None => SearchOptions::default(),
    };

    if let Some(chunk_size) = cli.chunk_size {
        options.chunk_size = chunk_size;
    }
    if let Some(overlap) = cli.overlap {
        options.overlap = overlap;
    }
    if let Some(sample_ratio) = cli.sample_ratio {
        options.sample_ratio = sample_ratio;
    }

    options.validate()?;
    Ok(options)
}

async fn run<E: Embedder>(cli: Cli, options: SearchOptions, embedder: E) -> anyhow::Result<()> {
    if let Command::Seed = cli.command {
        if let Some(parent) = cli.database.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let documents = sample_documents()?;
        let count = documents.len();
        SqliteCorpus::create(&cli.database, documents).await?;
        println!(
            "seeded {} subtitle documents into {}",
            count,
            cli.database.display()
        );
        return Ok(());
    }

    if !cli.database.exists() {
        anyhow::bail!(
            "database not found at {}; run `subtitle-search seed` or point --database at an existing corpus",
            cli.database.display()
        );
    }

    let corpus = SqliteCorpus::new(&cli.database);
    let coordinator = SearchCoordinator::new(corpus, embedder, options)?;

    match cli.command {
        Command::Seed => {}
        Command::Search {
            query,
            mode,
            top_k,
            max_results,
            case_sensitive,
            audio,
            json,
        } => {
            let mode: SearchMode = mode.parse()?;
            let query = match (query, audio) {
                (_, Some(path)) => {
                    let bytes = tokio::fs::read(&path).await?;
                    let transcript = PlaceholderTranscriber.transcribe(&bytes)?;
                    warn!(audio = %path.display(), "audio transcription is a placeholder");
                    transcript
                }
                (Some(query), None) => query,
                (None, None) => anyhow::bail!("provide a query or --audio"),
            };

            if let Some(index_mode) = mode.index_mode() {
                let index = coordinator.build_index(index_mode).await?;
                info!(mode = %index_mode, chunks = index.len(), "index ready");
            }

            let request = SearchRequest {
                query,
                mode,
                top_k: top_k.unwrap_or(coordinator.options().top_k),
                max_results: max_results.unwrap_or(coordinator.options().max_results),
                case_sensitive: case_sensitive || coordinator.options().case_sensitive,
            };
            let results = coordinator.search(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
                return Ok(());
            }

            if results.is_empty() {
                println!("no matches for {:?}", request.query);
            }

            for result in results {
                println!("{}", "-".repeat(50));
                println!("ID: {} - {}", result.document_id, result.name);
                println!("URL: {}", result.url);
                match result.relevance {
                    Relevance::Similarity(score) => println!("score={score:.4}"),
                    Relevance::MatchCount(count) => println!("matches={count}"),
                }
                if let Some(snippet) = &result.snippet {
                    println!("\nSnippet: {snippet}");
                }
                for line in &result.matches {
                    println!("  [{}] {}", line.timestamp_range, line.text);
                }
            }
        }
        Command::Info { id } => {
            let info = coordinator.document_info(id).await?;
            println!("ID: {}", info.id);
            println!("Name: {}", info.name);
            println!("URL: {}", info.url);
            if info.text_available {
                println!("Line Count: {}", info.line_count);
                println!("Word Count: {}", info.word_count);
                println!("\nPreview:\n{}", info.preview);
            } else {
                println!("\nSubtitle text not available.");
            }
        }
        Command::Export { output_dir } => {
            let report = coordinator.export_documents(&output_dir).await?;

            for skipped in &report.skipped {
                warn!(document_id = skipped.document_id, reason = %skipped.reason, "skipped subtitle");
            }
            println!(
                "{} subtitles written to {} ({} skipped)",
                report.written.len(),
                output_dir.display(),
                report.skipped.len()
            );
        }
    }

    Ok(())
}
