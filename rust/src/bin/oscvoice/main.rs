//! oscvoice entrypoint: recognizer feed, matching worker, OSC listener and sender in one runtime.
//!
//! # Architecture
//!
//! - Recognizer thread: reads transcript lines from stdin into a bounded queue
//! - Matching worker: scope filter, phrase matcher and action executor, in arrival order
//! - Listener task: inbound OSC updates the parameter cache and active context
//! - Timer tasks: delayed sends, drained within the shutdown grace period

mod command_list;

use std::env;
use std::io::{self, BufReader};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::UdpSocket;
use tokio::sync::watch;

use oscvoice::config::{apply_user_config, load_user_config, AppConfig};
use oscvoice::inbound::run_listener;
use oscvoice::pipeline::{run_matching_worker, spawn_line_recognizer, transcript_channel};
use oscvoice::registry::CommandRegistry;
use oscvoice::scheduler::DelayScheduler;
use oscvoice::sink::{OscUdpSink, OutboundSink, StdoutSink};
use oscvoice::{init_tracing, Engine};

const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let mut config = AppConfig::parse_from(&args);

    // Persisted preferences fill in whatever the command line left unset.
    let user_config = load_user_config();
    if let Ok(user) = &user_config {
        apply_user_config(user, &mut config, &args);
    }
    init_tracing(&config);
    if let Err(err) = &user_config {
        tracing::warn!(error = %err, "ignoring user config");
    }
    config.validate()?;

    let registry = CommandRegistry::load_from_path(&config.commands).with_context(|| {
        format!("failed to load commands from {}", config.commands.display())
    })?;
    if config.list_commands {
        let stdout = io::stdout();
        command_list::write_command_list(&registry.all(), &mut stdout.lock())?;
        return Ok(());
    }
    tracing::info!(
        commands = registry.len(),
        path = %config.commands.display(),
        "commands loaded"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("oscvoice-rt")
        .build()
        .context("failed to start async runtime")?;

    let sink: Arc<dyn OutboundSink> = if config.dry_run {
        Arc::new(StdoutSink::new())
    } else {
        let sender = OscUdpSink::connect(&config.host, config.port).with_context(|| {
            format!("failed to open OSC sender to {}:{}", config.host, config.port)
        })?;
        Arc::new(sender)
    };
    let engine = Arc::new(Engine::new(
        Arc::new(registry),
        DelayScheduler::new(sink, runtime.handle().clone()),
        config.chatbox_relay(),
    ));

    let result = runtime.block_on(run(&config, Arc::clone(&engine)));
    // The recognizer may still be blocked on stdin; do not wait for it.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

async fn run(config: &AppConfig, engine: Arc<Engine>) -> Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let listener = if config.no_listen {
        None
    } else {
        let socket = UdpSocket::bind((config.listen_host.as_str(), config.listen_port))
            .await
            .with_context(|| {
                format!(
                    "failed to bind OSC listener on {}:{}",
                    config.listen_host, config.listen_port
                )
            })?;
        Some(tokio::spawn(run_listener(socket, Arc::clone(&engine), stop_rx)))
    };

    let (feed, transcripts) = transcript_channel(config.transcript_queue);
    let _recognizer = spawn_line_recognizer(BufReader::new(io::stdin()), feed);
    let worker_engine = Arc::clone(&engine);
    let log_content = config.log_content;
    let mut worker = tokio::task::spawn_blocking(move || {
        run_matching_worker(&worker_engine, transcripts, log_content)
    });

    tokio::select! {
        handled = &mut worker => match handled {
            Ok(handled) => tracing::info!(handled, "recognizer input ended"),
            Err(err) => tracing::warn!(error = %err, "matching worker failed"),
        },
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => tracing::info!("interrupt received; shutting down"),
            Err(err) => tracing::warn!(error = %err, "cannot wait for interrupt; shutting down"),
        },
    }

    let _ = stop_tx.send(true);
    if let Some(listener) = listener {
        if let Err(err) = listener.await {
            tracing::warn!(error = %err, "listener task failed");
        }
    }
    let abandoned = engine.shutdown(config.shutdown_grace()).await;
    tracing::info!(abandoned, "oscvoice stopped");
    Ok(())
}
