//! Parley service binary.
//!
//! Loads configuration, builds the engine (failing fast on a bad flow) and
//! runs the lifecycle sweep until Ctrl-C. With `PARLEY__RUNTIME__CONSOLE=true`
//! it also serves conversations from stdin, one `<subject> <text>` per line.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{error, info, warn};

use parley::adapters::{InMemoryConversationRepository, SystemClock};
use parley::application::{InboundMessage, ProcessMessageHandler};
use parley::config::AppConfig;
use parley::domain::foundation::SubjectId;
use parley::telemetry::init_tracing;
use parley::Parley;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.runtime);

    let parley = match Parley::build(
        &config,
        Arc::new(InMemoryConversationRepository::new()),
        Arc::new(SystemClock),
    ) {
        Ok(parley) => parley,
        Err(e) => {
            error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };
    info!(
        flow = %config.flow.path.display(),
        environment = ?config.runtime.environment,
        "Parley started"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = parley.sweeper;
    let sweep_task = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    if config.runtime.console {
        tokio::select! {
            _ = run_console(&parley.process_message) => info!("Console input closed"),
            _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
        }
    } else {
        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested");
    }

    shutdown_tx.send(true).ok();
    if let Err(e) = sweep_task.await {
        warn!(error = %e, "Sweep task ended abnormally");
    }
    info!("Parley stopped");
    Ok(())
}

async fn run_console(handler: &ProcessMessageHandler) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                return;
            }
        };
        let Some((subject, text)) = line.trim().split_once(char::is_whitespace) else {
            continue;
        };
        let subject = match SubjectId::new(subject) {
            Ok(subject) => subject,
            Err(e) => {
                warn!(error = %e, "Invalid subject");
                continue;
            }
        };

        match handler.handle(InboundMessage::new(subject, text)).await {
            Ok(reply) => {
                println!("[{}] {}", reply.state, reply.text);
                if !reply.quick_replies.is_empty() {
                    println!("  options: {}", reply.quick_replies.join(" | "));
                }
                if reply.closed {
                    println!("  (conversation closed)");
                }
            }
            Err(e) => warn!(error = %e, "Message rejected"),
        }
    }
}
