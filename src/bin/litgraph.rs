//! Litgraph CLI — query a literature graph from the shell.
//!
//! Usage:
//!   litgraph stats [--db path]
//!   litgraph related <paper-id> [--db path] [--hops N] [--min-weight W]
//!   litgraph query <text> [--db path] [--config file]   (embeddings builds)

use clap::{Parser, Subcommand};
use litgraph::retrieval::GraphTraversalEngine;
use litgraph::storage::SqliteGraphStore;
use litgraph::NodeId;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "litgraph",
    version,
    about = "Graph-augmented retrieval over scientific literature"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show node and edge counts for the graph database
    Stats {
        /// Path to the graph SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Discover papers structurally related to a seed paper
    Related {
        /// Seed paper id (with or without the `paper:` prefix)
        paper_id: String,
        /// Path to the graph SQLite database
        #[arg(long)]
        db: Option<PathBuf>,
        /// Maximum traversal depth
        #[arg(long, default_value_t = 2)]
        hops: usize,
        /// Minimum weight for weighted edges
        #[arg(long, default_value_t = 2)]
        min_weight: u32,
        /// Maximum papers to return
        #[arg(long, default_value_t = 10)]
        cap: usize,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Run the full retrieval pipeline for a query (requires the
    /// `embeddings` feature)
    #[cfg(feature = "embeddings")]
    Query {
        /// Natural-language query
        text: String,
        /// Directory holding graph.db and chunks.db
        #[arg(long)]
        db: Option<PathBuf>,
        /// YAML file overriding the default retrieval configuration
        #[arg(long)]
        config: Option<PathBuf>,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("litgraph")
}

fn graph_db_path(db: Option<PathBuf>) -> PathBuf {
    match db {
        Some(path) if path.extension().is_some() => path,
        Some(dir) => dir.join("graph.db"),
        None => default_data_dir().join("graph.db"),
    }
}

fn normalize_paper_id(raw: &str) -> NodeId {
    if raw.starts_with("paper:") {
        NodeId::from(raw)
    } else {
        NodeId::from(format!("paper:{raw}"))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Stats { db, json } => {
            let store = SqliteGraphStore::open(graph_db_path(db))?;
            let stats = store.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("papers:         {}", stats.papers);
                println!("concepts:       {}", stats.concepts);
                println!("methods:        {}", stats.methods);
                println!("research areas: {}", stats.research_areas);
                println!("edges:          {}", stats.edges);
            }
        }
        Commands::Related {
            paper_id,
            db,
            hops,
            min_weight,
            cap,
            json,
        } => {
            let store = Arc::new(SqliteGraphStore::open(graph_db_path(db))?);
            let engine = GraphTraversalEngine::new(store, Duration::from_secs(10));
            let seeds: BTreeSet<NodeId> = [normalize_paper_id(&paper_id)].into_iter().collect();
            let discoveries = engine.discover(&seeds, hops, min_weight, cap).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&discoveries)?);
            } else if discoveries.is_empty() {
                println!("no related papers within {hops} hops");
            } else {
                for discovery in &discoveries {
                    println!(
                        "{}  \"{}\"  ({} hop{}, weight {})",
                        discovery.paper_id,
                        discovery.title,
                        discovery.path.len(),
                        if discovery.path.len() == 1 { "" } else { "s" },
                        discovery.path.cumulative_weight,
                    );
                    for hop in &discovery.path.hops {
                        println!("    {} --[{}]-->", hop.from, hop.kind);
                    }
                }
            }
        }
        #[cfg(feature = "embeddings")]
        Commands::Query {
            text,
            db,
            config,
            json,
        } => {
            use litgraph::embedding::FastEmbedEmbedder;
            use litgraph::retrieval::{RetrievalConfig, RetrievalOrchestrator};
            use litgraph::storage::{SqliteChunkIndex, DEFAULT_EMBEDDING_DIMENSIONS};

            let data_dir = db.unwrap_or_else(default_data_dir);
            let config = match config {
                Some(path) => serde_yaml::from_str::<RetrievalConfig>(&std::fs::read_to_string(
                    path,
                )?)?,
                None => RetrievalConfig::default(),
            };

            let embedder = Arc::new(FastEmbedEmbedder::default_model()?);
            let index = Arc::new(SqliteChunkIndex::open(
                data_dir.join("chunks.db"),
                DEFAULT_EMBEDDING_DIMENSIONS,
            )?);
            let graph = Arc::new(SqliteGraphStore::open(data_dir.join("graph.db"))?);

            let orchestrator = RetrievalOrchestrator::new(config, embedder, index, graph);
            let outcome = orchestrator.retrieve(&text).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.results)?);
            } else {
                if outcome.report.graph_degraded {
                    eprintln!("note: graph store unavailable, vector-only results");
                }
                for (rank, result) in outcome.results.iter().enumerate() {
                    let chunk = &result.chunk;
                    println!(
                        "{:2}. [{:.4}] {} ({:?})",
                        rank + 1,
                        chunk.fused_score,
                        chunk.paper_id,
                        chunk.source,
                    );
                    println!("    {}", chunk.text);
                    if !result.metadata.concepts.is_empty() {
                        println!("    concepts: {}", result.metadata.concepts.join(", "));
                    }
                    if !result.metadata.methods.is_empty() {
                        println!("    methods: {}", result.metadata.methods.join(", "));
                    }
                    if let Some(path) = &result.metadata.discovery_path {
                        let hops: Vec<String> = path
                            .hops
                            .iter()
                            .map(|h| format!("{} --[{}]-->", h.from, h.kind))
                            .collect();
                        println!("    discovered via: {}", hops.join(" "));
                    }
                }
            }
        }
    }
    Ok(())
}
