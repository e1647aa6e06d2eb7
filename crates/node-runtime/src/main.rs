//! # Pair-Chain Node Runtime
//!
//! Runs a swarm of rendezvous sessions in one process.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (`PC_CONFIG`, `PC_NODES`, `PC_LOBBY_CAPACITY`, `PC_LATENCY_MS`)
//! 3. Start the event printer
//! 4. Start every session; the first to claim the rendezvous identity coordinates
//! 5. Read commands from stdin until EOF or Ctrl+C
//!
//! ## Commands
//!
//! - `<index> <text>` - send `text` from node `index`
//! - `status` - print every node's snapshot as JSON
//! - `log <index>` - print node `index`'s message log

use std::sync::Arc;

use anyhow::{Context, Result};
use node_runtime::{RuntimeConfig, Swarm};
use shared_bus::{EventFilter, EventTopic, InMemoryEventBus, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Print status, pairing and chat events as they happen.
fn spawn_event_printer(bus: &InMemoryEventBus) -> tokio::task::JoinHandle<()> {
    let mut events = bus.event_stream(EventFilter::topics(vec![
        EventTopic::Status,
        EventTopic::Pairing,
        EventTopic::Chat,
    ]));
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                SessionEvent::StatusChanged { node, status } => {
                    info!(node = %node, "Status: {status}");
                }
                SessionEvent::RoleChanged {
                    node,
                    role,
                    partners,
                } => {
                    info!(node = %node, role = %role, partners = ?partners, "Role changed");
                }
                SessionEvent::LobbyChanged {
                    node,
                    members,
                    capacity,
                    sealed,
                } => {
                    info!(node = %node, members = ?members, capacity, sealed, "Lobby changed");
                }
                SessionEvent::MessageReceived { node, message } => {
                    println!("[{node}] {}: {}", message.peer_id, message.text);
                }
                SessionEvent::Log { .. } => {}
            }
        }
        if events.missed() > 0 {
            warn!(missed = events.missed(), "Event printer fell behind");
        }
    })
}

async fn run_command(swarm: &Swarm, line: &str) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    if line == "status" {
        for index in 0..swarm.len() {
            let snapshot = swarm.snapshot(index).await?;
            println!("{index}: {}", serde_json::to_string(&snapshot)?);
        }
        return Ok(());
    }
    if let Some(index) = line.strip_prefix("log ") {
        let index: usize = index.trim().parse().context("log needs a node index")?;
        for message in swarm.messages(index).await? {
            println!("{} {}: {}", message.timestamp, message.peer_id, message.text);
        }
        return Ok(());
    }

    let (index, text) = line
        .split_once(' ')
        .context("expected `<index> <text>`")?;
    let index: usize = index.parse().context("node index must be a number")?;
    let sent = swarm.submit(index, text).await?;
    info!(id = %sent.id, "Message submitted");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    info!("===========================================");
    info!("  Pair-Chain Node Runtime v{}", env!("CARGO_PKG_VERSION"));
    info!("  Rendezvous: {}", config.rendezvous.rendezvous_id);
    info!("  Nodes: {}  Lobby capacity: {}", config.nodes, config.rendezvous.lobby_capacity);
    info!("===========================================");

    let bus = Arc::new(InMemoryEventBus::new());
    let printer = spawn_event_printer(&bus);
    let swarm = Swarm::spawn(&config, bus).context("Failed to start swarm")?;
    for (index, id) in swarm.ids().iter().enumerate() {
        info!("Node {index}: {id}");
    }

    info!("Swarm is running. Type `<index> <text>` to chat, Ctrl+C to stop.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Err(e) = run_command(&swarm, &line).await {
                        warn!("{e:#}");
                    }
                }
                Ok(None) => {
                    info!("stdin closed");
                    tokio::signal::ctrl_c().await?;
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Graceful shutdown
    swarm.shutdown().await;
    printer.abort();
    Ok(())
}
