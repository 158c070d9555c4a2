use anyhow::Result;
use clap::{Parser, Subcommand};
use docindex_core::{IndexConfig, IndexedDocument, IndexingService, SearchResult};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod ingest;

#[derive(Parser)]
#[command(name = "docindex")]
#[command(about = "Index extracted document text and search it", long_about = None)]
struct Cli {
    /// Directory of the index store
    #[arg(long, global = true, default_value = "./docindex")]
    store: PathBuf,
    /// JSON file with index settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the number of characters kept as preview
    #[arg(long, global = true)]
    preview_chars: Option<usize>,
    /// Print JSON instead of text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index text, markdown or json/jsonl files (directories are walked)
    Add { paths: Vec<PathBuf> },
    /// Clear the index and index the given inputs from scratch
    Rebuild { paths: Vec<PathBuf> },
    /// Remove a document by id
    Remove { id: String },
    /// Remove every document
    Clear,
    /// Ranked keyword search
    Search {
        query: String,
        /// Maximum number of results
        #[arg(short, long)]
        k: Option<usize>,
    },
    /// Most recently indexed documents
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Index size counters
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => IndexConfig::from_json_file(path)?,
        None => IndexConfig::default(),
    };
    if let Some(n) = cli.preview_chars {
        config.preview_chars = n;
    }
    let service = IndexingService::open(&cli.store, config)?;
    let outcome = run(&service, cli.command, cli.json).await;
    service.shutdown().await?;
    outcome
}

async fn run(service: &IndexingService, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Add { paths } => {
            let docs = ingest::collect_documents(&paths)?;
            let total = docs.len();
            let mut failed = 0usize;
            for doc in docs {
                let id = doc.id.clone();
                if let Err(e) = service.index_document(doc).await {
                    failed += 1;
                    tracing::warn!(%id, error = %e, "failed to index document");
                }
            }
            tracing::info!(total, failed, "add complete");
            emit(json, &serde_json::json!({ "indexed": total - failed, "failed": failed }), || {
                format!("indexed {} of {total} documents", total - failed)
            })
        }
        Commands::Rebuild { paths } => {
            let docs = ingest::collect_documents(&paths)?;
            let summary = service.rebuild_index(docs).await?;
            emit(json, &summary, || {
                format!("rebuilt index: {} indexed, {} failed", summary.indexed, summary.failed)
            })
        }
        Commands::Remove { id } => {
            let removed = service.remove_document(&id).await?;
            emit(json, &serde_json::json!({ "id": id, "removed": removed }), || {
                if removed { format!("removed {id}") } else { format!("{id} is not indexed") }
            })
        }
        Commands::Clear => {
            service.clear_index().await?;
            emit(json, &serde_json::json!({ "cleared": true }), || "index cleared".to_string())
        }
        Commands::Search { query, k } => {
            let results = service.search(&query, k).await?;
            emit(json, &results, || render_results(&results))
        }
        Commands::Recent { limit } => {
            let docs = service.recently_indexed(limit).await?;
            emit(json, &docs, || render_recent(&docs))
        }
        Commands::Stats => {
            let stats = service.stats().await?;
            emit(json, &stats, || {
                format!(
                    "documents: {}\nvocabulary: {}\nwords: {}\nlast indexed: {}",
                    stats.document_count,
                    stats.vocabulary_size,
                    stats.total_words,
                    stats.last_indexed_at.map(format_millis).unwrap_or_else(|| "never".into()),
                )
            })
        }
    }
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", text());
    }
    Ok(())
}

fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "no matches".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let preview: String = r.preview.chars().take(160).collect();
            format!("{:>2}. {} [{}] score={:.2}\n    {}\n    {}", i + 1, r.name, r.doc_type, r.score, r.document_id, preview.replace('\n', " "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_recent(docs: &[IndexedDocument]) -> String {
    if docs.is_empty() {
        return "index is empty".to_string();
    }
    docs.iter()
        .map(|d| format!("{}  {} [{}] {} words  {}", format_millis(d.indexed_at), d.name, d.doc_type, d.word_count, d.id))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_millis(ms: i64) -> String {
    time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| ms.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["docindex", "search", "invoice", "-k", "5", "--store", "/tmp/idx", "--json"]).unwrap();
        assert_eq!(cli.store, PathBuf::from("/tmp/idx"));
        assert!(cli.json);
        match cli.command {
            Commands::Search { query, k } => {
                assert_eq!(query, "invoice");
                assert_eq!(k, Some(5));
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn formats_epoch_millis_as_rfc3339() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_millis(86_400_000), "1970-01-02T00:00:00Z");
    }

    #[tokio::test]
    async fn add_then_search_through_commands() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.txt");
        std::fs::write(&input, "quarterly budget review").unwrap();
        let service = IndexingService::open(dir.path().join("store"), IndexConfig::default()).unwrap();

        run(&service, Commands::Add { paths: vec![input.clone()] }, false).await.unwrap();
        let hits = service.search("budget", None).await.unwrap();
        assert_eq!(hits[0].document_id, input.to_string_lossy());

        run(&service, Commands::Remove { id: input.to_string_lossy().into_owned() }, true).await.unwrap();
        assert!(service.search("budget", None).await.unwrap().is_empty());
        service.shutdown().await.unwrap();
    }
}
