//! Binary entry point for hindsight.
//!
//! Runs the MCP server on stdio, or answers one-off queries from the shell.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use hindsight::mcp::McpServer;
use hindsight::models::{Category, SearchHit};
use hindsight::{
    ExportRequest, HindsightConfig, KnowledgeService, KnowledgeStore, QueryRequest, observability,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Hindsight - a searchable knowledge base of development learnings.
#[derive(Parser)]
#[command(name = "hindsight")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "HINDSIGHT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Database file, overriding the configured path.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdio.
    Serve,

    /// Create the database and schema if missing.
    Init,

    /// Search the knowledge base.
    Query {
        /// Search text; omit to list newest records.
        #[arg(default_value = "")]
        query: String,

        /// Category: lesson, error, pattern, or all.
        #[arg(short = 'k', long, default_value = "all", value_parser = parse_category)]
        category: Category,

        /// Filter by technology.
        #[arg(short, long)]
        technology: Option<String>,

        /// Filter lessons by tags (comma-separated).
        #[arg(long)]
        tags: Option<String>,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<i64>,

        /// Print raw JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Show knowledge base statistics.
    Stats,

    /// Export the knowledge base as JSON.
    Export {
        /// Category: lesson, error, pattern, or all.
        #[arg(short = 'k', long, default_value = "all", value_parser = parse_category)]
        category: Category,

        /// Filter lessons and errors by technology.
        #[arg(short, long)]
        technology: Option<String>,

        /// Include session history.
        #[arg(long)]
        include_sessions: bool,

        /// Output file path; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration.
    Config,
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    let config = match &cli.db {
        Some(path) => config.with_database_path(path),
        None => config,
    };

    if let Err(e) = observability::init(&config.logging, cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    config: HindsightConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Config => {
            cmd_config(&config);
            Ok(())
        },
        Commands::Init => cmd_init(&config),
        Commands::Serve => cmd_serve(open_service(&config)?).await,
        Commands::Query {
            query,
            category,
            technology,
            tags,
            limit,
            json,
        } => {
            let mut request = QueryRequest::new(query).with_tags(split_tags(tags.as_deref()));
            request.category = category;
            request.technology = technology;
            request.limit = limit;
            cmd_query(&open_service(&config)?, request, json).await
        },
        Commands::Stats => cmd_stats(&open_service(&config)?).await,
        Commands::Export {
            category,
            technology,
            include_sessions,
            output,
        } => {
            let request = ExportRequest {
                category,
                technology,
                include_sessions,
            };
            cmd_export(&open_service(&config)?, request, output.as_deref()).await
        },
    }
}

/// Loads configuration: explicit path first, then the default locations.
fn load_config(path: Option<&Path>) -> hindsight::Result<HindsightConfig> {
    let config = match path {
        Some(path) => HindsightConfig::load_from_file(path)?,
        None => HindsightConfig::load_default(),
    };
    Ok(config.with_env_overrides())
}

fn open_service(config: &HindsightConfig) -> hindsight::Result<KnowledgeService> {
    let store = KnowledgeStore::open(&config.database)?;
    Ok(KnowledgeService::new(store, config.search))
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse::<Category>().map_err(|e| e.to_string())
}

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Init command.
fn cmd_init(config: &HindsightConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = KnowledgeStore::open(&config.database)?;
    println!("Knowledge base ready at {}", store.path().display());
    Ok(())
}

/// Serve command.
async fn cmd_serve(service: KnowledgeService) -> Result<(), Box<dyn std::error::Error>> {
    McpServer::new(service).run_stdio().await?;
    Ok(())
}

/// Query command.
async fn cmd_query(
    service: &KnowledgeService,
    request: QueryRequest,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let hits = service.query(request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    if hits.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s):", hits.len());
    println!();
    for hit in &hits {
        println!(
            "[{}] #{} {} (relevance {:.3})",
            hit.kind(),
            hit.id(),
            headline(hit),
            hit.relevance()
        );
    }
    Ok(())
}

fn headline(hit: &SearchHit) -> &str {
    match hit {
        SearchHit::Lesson { lesson, .. } => &lesson.title,
        SearchHit::Error { error, .. } => &error.error_pattern,
        SearchHit::Pattern { pattern, .. } => &pattern.pattern_name,
    }
}

/// Stats command.
async fn cmd_stats(service: &KnowledgeService) -> Result<(), Box<dyn std::error::Error>> {
    let stats = service.get_statistics().await?;

    println!("Hindsight Statistics");
    println!("====================");
    println!();
    println!("Lessons:  {}", stats.total_lessons);
    println!("Errors:   {} ({} occurrences)", stats.total_errors, stats.total_error_occurrences);
    println!("Patterns: {}", stats.total_patterns);
    println!("Sessions: {}", stats.total_sessions);
    println!("Tags:     {}", stats.total_tags);

    if !stats.lessons_by_category.is_empty() {
        println!();
        println!("Lessons by category:");
        for (category, count) in &stats.lessons_by_category {
            println!("  {category}: {count}");
        }
    }
    if !stats.top_technologies.is_empty() {
        println!();
        println!("Top technologies:");
        for tally in &stats.top_technologies {
            println!("  {}: {}", tally.technology, tally.count);
        }
    }
    if !stats.recent_lessons.is_empty() {
        println!();
        println!("Recent lessons:");
        for lesson in &stats.recent_lessons {
            println!("  #{} {} ({})", lesson.id, lesson.title, lesson.category);
        }
    }
    Ok(())
}

/// Export command.
async fn cmd_export(
    service: &KnowledgeService,
    request: ExportRequest,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let document = service.export(request).await?;
    let json = serde_json::to_string_pretty(&document)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!("Exported to {}", path.display());
        },
        None => println!("{json}"),
    }
    Ok(())
}

/// Config command.
fn cmd_config(config: &HindsightConfig) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("Database:");
    println!("  Path: {}", config.database.path.display());
    println!("  Connect Timeout: {:?}", config.database.connect_timeout);
    println!("  Busy Timeout: {:?}", config.database.busy_timeout);
    println!("  Max Retries: {}", config.database.max_retries);
    println!("  Retry Delay: {:?}", config.database.retry_delay);
    println!();
    println!("Search:");
    println!("  Default Limit: {}", config.search.default_limit);
    println!("  Max Limit: {}", config.search.max_limit);
    println!();
    println!("Logging:");
    println!("  Level: {}", config.logging.level);
    println!(
        "  File: {}",
        config
            .logging
            .file
            .as_ref()
            .map_or_else(|| "(stderr only)".to_string(), |p| p.display().to_string())
    );
    println!("  Format: {:?}", config.logging.format);
}
