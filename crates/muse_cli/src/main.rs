use anyhow::{Context, Result};
use clap::Parser;
use muse_core::{DurableStore, MemoryKind, MuseConfig, TurnError};
use muse_memory::schedule::spawn_consolidation;
use muse_memory::{InMemoryDurableStore, MemoryQuery, MemoryStore, SqliteDurableStore};
use muse_reasoning::llm::create_generator;
use muse_reasoning::retry::{with_retry, RetryConfig};
use muse_reasoning::{MuseEngine, TurnOutcome, TurnRequest};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "muse.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file (defaults to ./muse.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite file mirroring the memory tiers; in-memory when omitted
    #[arg(short, long, env = "MUSE_DB")]
    db: Option<String>,

    /// Seed for every random stream, for reproducible sessions
    #[arg(long)]
    seed: Option<u64>,

    /// Text generator provider (mock, openai)
    #[arg(long)]
    provider: Option<String>,

    /// Platform tag attached to every stimulus
    #[arg(long, default_value = "terminal")]
    platform: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => MuseConfig::load(path)?,
        None => MuseConfig::load_or_default(DEFAULT_CONFIG_PATH),
    };
    if let Some(seed) = args.seed {
        config.engine.rng_seed = Some(seed);
    }
    if let Some(provider) = &args.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(db) = &args.db {
        config.memory.db_path = Some(db.clone());
    }

    let durable: Arc<dyn DurableStore> = match &config.memory.db_path {
        Some(path) => {
            info!("Opening durable memory at {}", path);
            Arc::new(
                SqliteDurableStore::new(path)
                    .await
                    .with_context(|| format!("Failed to open memory database {}", path))?,
            )
        }
        None => Arc::new(InMemoryDurableStore::new()),
    };
    let memory = Arc::new(MemoryStore::with_durable(config.memory.clone(), durable));
    match memory.rehydrate().await {
        Ok(n) => info!("Rehydrated {} memories", n),
        Err(e) => warn!("Rehydration failed, starting empty: {}", e),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = spawn_consolidation(
        memory.clone(),
        Duration::from_secs(config.memory.consolidation_interval_secs),
        shutdown_rx,
    );

    let generator = create_generator(&config.llm)?;
    let engine = MuseEngine::new(config, memory.clone(), generator);

    println!("Muse online. Type 'quit' to exit.");
    repl(&engine, &args.platform).await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        warn!("Consolidation scheduler ended abnormally: {}", e);
    }
    memory.flush().await;
    info!("Muse offline");
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

async fn repl(engine: &MuseEngine, platform: &str) -> Result<()> {
    let retry = RetryConfig::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().map(str::trim).unwrap_or_default();

        match command {
            "" => {}
            "quit" | "exit" => break,
            "status" if rest == "json" => {
                let snapshot = engine.snapshot().await;
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            }
            "status" => print_status(engine).await,
            "reset" => {
                engine.reset().await;
                println!("Personality reset.");
            }
            "consolidate" => match engine.memory().consolidate().await {
                Ok(report) => println!(
                    "Promoted {}, evicted {} (STM {}, LTM {})",
                    report.promoted, report.evicted, report.stm_len, report.ltm_len
                ),
                Err(e) => println!("[consolidation abandoned]: {}", e),
            },
            "patterns" => {
                let patterns = engine.memory().patterns().await;
                if patterns.is_empty() {
                    println!("No patterns yet.");
                }
                for p in patterns.iter().take(20) {
                    println!("{:>4}  {}", p.frequency, p.word);
                }
            }
            "memories" => {
                let mut query = MemoryQuery::kind(MemoryKind::Interaction);
                query.limit = 10;
                for m in engine.memory().query(&query).await {
                    println!(
                        "[{}] ({}, {:.2}) {}",
                        m.timestamp.format("%Y-%m-%d %H:%M"),
                        m.emotional_context,
                        m.importance,
                        m.content
                    );
                }
            }
            "forget" => match rest.parse::<i64>() {
                Ok(days) if days >= 0 => {
                    let removed = engine.memory().clear_old_memories(days).await;
                    println!("Forgot {} memories older than {} days.", removed, days);
                }
                _ => println!("Usage: forget <days>"),
            },
            _ => {
                let request = TurnRequest::new(trimmed).with_platform(platform);
                match run_turn(engine, &retry, request).await {
                    Ok(outcome) => println!("\nMuse: {}\n", outcome.response_text),
                    Err(e) => {
                        warn!("Turn failed: {}", e);
                        println!("\n[error]: {}\n", e);
                    }
                }
            }
        }
        prompt()?;
    }
    Ok(())
}

/// Run one turn, retrying only the generator call so the stimulus is
/// recorded once however many attempts it takes.
async fn run_turn(
    engine: &MuseEngine,
    retry: &RetryConfig,
    request: TurnRequest,
) -> Result<TurnOutcome, TurnError> {
    let pending = engine.begin_turn(request).await?;
    let raw = with_retry(retry, "generation", || pending.generate()).await?;
    Ok(pending.complete(raw).await)
}

async fn print_status(engine: &MuseEngine) {
    let snapshot = engine.snapshot().await;
    let state = &snapshot.state;
    println!("Emotion:   {}", state.emotional_state());
    if let Some(last) = &snapshot.last_response {
        println!("Intensity: {:.2} ({}ms)", last.intensity, last.duration_ms);
    }
    println!("Style:     {}", state.style);
    println!("Narrative: {}", snapshot.narrative_mode);
    if !snapshot.active_themes.is_empty() {
        println!("Themes:    {}", snapshot.active_themes.join(", "));
    }
    println!("Traits:    {}", state.traits.describe());
    println!(
        "Memory:    STM {}, LTM {}, patterns {}",
        snapshot.stm_len, snapshot.ltm_len, snapshot.pattern_count
    );
}
