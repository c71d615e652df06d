//! Boardroom - Main CLI Entry Point

use anyhow::Result;
use boardroom::cli::Args;
use boardroom::config::Config;
use boardroom::memory::{ContextOptions, MemoryManager, OllamaEmbedder, VectorMemory};
use boardroom::orchestrator::Orchestrator;
use boardroom::reasoning::{OllamaEngine, ReasoningEngine, RetryPolicy, TieredExecutor};
use boardroom::roles::RoleId;
use boardroom::types::ReplyPayload;
use boardroom::worker::{RoleWorker, WorkerConfig};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = Config::load()?;
    apply_overrides(&mut config, &args);

    let base_url = config.ollama.base_url();
    let primary: Arc<dyn ReasoningEngine> =
        Arc::new(OllamaEngine::new(&base_url, &config.models.primary)?);
    let fallback: Arc<dyn ReasoningEngine> =
        Arc::new(OllamaEngine::new(&base_url, &config.models.fallback)?);

    let embedder = Arc::new(OllamaEmbedder::new(&base_url, &config.models.embedding)?);

    let executor = Arc::new(TieredExecutor::with_policies(
        primary.clone(),
        fallback.clone(),
        RetryPolicy::new(
            config.retry.primary_attempts,
            config.retry.primary_base_delay_ms,
        ),
        RetryPolicy::new(
            config.retry.fallback_attempts,
            config.retry.fallback_base_delay_ms,
        ),
    ));

    let bus = boardroom::bus::MessageBus::new();

    let worker_config = WorkerConfig {
        collab_timeout: Duration::from_millis(config.timeouts.collab_ms),
        context: ContextOptions {
            vector_top_k: config.memory.vector_top_k,
            session_limit: config.memory.session_limit,
        },
    };

    println!("{}", "Assembling the leadership team...".dimmed());
    for role in RoleId::ALL {
        let vector = VectorMemory::connect(
            format!("{}-memory", role.as_str()),
            embedder.clone(),
            &config.memory.qdrant_url,
        )
        .await;
        let memory = Arc::new(MemoryManager::new(role, vector));

        Arc::new(RoleWorker::with_config(
            role,
            bus.clone(),
            memory,
            executor.clone(),
            worker_config,
        ))
        .spawn();
    }

    let timeout = Duration::from_millis(config.timeouts.orchestrate_ms);
    let orchestrator = Orchestrator::new(bus.clone(), primary);

    println!("{} {}", "Task:".bold(), args.task);
    println!("{} {}\n", "Session:".bold(), args.session);

    let results = orchestrator
        .orchestrate(&args.task, &args.session, timeout)
        .await;

    for role in RoleId::ALL {
        if let Some(reply) = results.get(&role) {
            print_reply(role, reply);
        }
    }

    Ok(())
}

/// CLI flags win over the config file
fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(host) = &args.host {
        config.ollama.host = host.clone();
    }
    if let Some(port) = args.port {
        config.ollama.port = port;
    }
    if let Some(model) = &args.model {
        config.models.primary = model.clone();
    }
    if let Some(model) = &args.fallback_model {
        config.models.fallback = model.clone();
    }
    if let Some(url) = &args.qdrant_url {
        config.memory.qdrant_url = url.clone();
    }
    if let Some(seconds) = args.timeout {
        config.timeouts.orchestrate_ms = seconds * 1000;
    }
}

fn print_reply(role: RoleId, reply: &ReplyPayload) {
    let heading = match role {
        RoleId::Ceo => role.display_name().blue().bold(),
        RoleId::Cto => role.display_name().green().bold(),
        RoleId::Cmo => role.display_name().magenta().bold(),
        RoleId::Cfo => role.display_name().yellow().bold(),
    };

    match reply {
        ReplyPayload::Success {
            output,
            mode,
            context_used,
            ..
        } => {
            println!(
                "{} {} {}",
                heading,
                format!("[{}]", mode).dimmed(),
                format!("({} context items)", context_used).dimmed()
            );
            println!("{}\n", output);
        }
        ReplyPayload::Error { error, .. } => {
            println!("{} {}", heading, "[error]".red());
            println!("{}\n", error.red());
        }
    }
}
