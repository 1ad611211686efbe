mod cli;

use castforged::{
    config,
    host::{InMemoryTrackManager, SimulatedDevice},
    messages::{HostMessage, HostResponse, InboundMessage, LoadRequest, EXTERNAL_TEXT_TRACKS_KEY},
    retry::FetchClass,
    session::Session,
    telemetry::{HttpStatusSource, TelemetryPoller},
};
use castforged_common::{EventBus, EventPayload, ExternalTextTrack, SessionId};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "castforged=trace,castforged_common=debug".to_string()
        } else {
            "castforged=info,castforged_common=info".to_string()
        }
    });

    // Logs go to stderr so command output stays machine readable
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Negotiate { content_id, tracks } => {
            negotiate(&content_id, tracks.as_deref(), cli.config.as_deref())
        }
        Commands::Handle { file } => handle_file(&file, cli.config.as_deref()),
        Commands::RetrySchedule { class } => retry_schedule(class, cli.config.as_deref()),
        Commands::Poll { origin, ticks } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(poll(origin, ticks, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("castforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Session over the simulated device described by `[device]`. Telemetry is
/// left to the `poll` command.
fn cli_session(config_path: Option<&Path>) -> Result<Session> {
    let mut config = config::load_config_or_default(config_path)?;
    config.telemetry.enabled = false;

    Ok(Session::new(
        &config,
        Arc::new(SimulatedDevice::from_config(&config.device)),
        Arc::new(InMemoryTrackManager::new()),
    ))
}

fn negotiate(content_id: &str, tracks: Option<&Path>, config_path: Option<&Path>) -> Result<()> {
    let mut request = LoadRequest::for_content(content_id);

    if let Some(path) = tracks {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read tracks file: {:?}", path))?;
        let tracks: Vec<ExternalTextTrack> = serde_json::from_str(&content)
            .with_context(|| format!("Invalid tracks file: {:?}", path))?;

        if let Some(media) = request.media.as_mut() {
            media.custom_data = Some(serde_json::json!({ EXTERNAL_TEXT_TRACKS_KEY: tracks }));
        }
    }

    let mut session = cli_session(config_path)?;
    let response = session.handle(InboundMessage::Host(HostMessage::Load(request)));
    println!("{}", serde_json::to_string_pretty(&response)?);

    // A rejected load never reaches the player, so there is nothing to complete.
    if matches!(response, HostResponse::Message(_)) {
        let registered = session.on_load_complete();
        if registered > 0 {
            tracing::info!(registered, "External text tracks registered");
        }
    }

    Ok(())
}

fn handle_file(file: &Path, config_path: Option<&Path>) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read message file: {:?}", file))?;

    let mut session = cli_session(config_path)?;
    let response = session.handle_message(&content);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

fn retry_schedule(class: FetchClass, config_path: Option<&Path>) -> Result<()> {
    let session = cli_session(config_path)?;
    let policy = session.playback_config().policy(class);

    println!("Retry schedule ({})", class);
    println!("  Max attempts: {}", policy.max_attempts);
    println!("  Timeout: {} ms", policy.timeout_ms);
    if let Some(stall) = policy.stall_timeout_ms {
        println!("  Stall timeout: {} ms", stall);
    }
    for (attempt, low, high) in policy.schedule() {
        println!(
            "  [{:>2}] {} - {} ms",
            attempt,
            low.as_millis(),
            high.as_millis()
        );
    }

    Ok(())
}

async fn poll(origin: String, ticks: usize, config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let telemetry = &config.telemetry;

    let events = Arc::new(EventBus::default());
    let mut rx = events.subscribe();
    let mut poller = TelemetryPoller::new(
        Arc::new(HttpStatusSource::new(Duration::from_secs(
            telemetry.request_timeout_secs,
        ))),
        events,
        SessionId::new(),
        Duration::from_secs(telemetry.interval_secs),
    );

    poller.start(origin);

    let mut seen = 0;
    while seen < ticks {
        let event = rx.recv().await.context("Telemetry event stream closed")?;
        match event.payload {
            EventPayload::TranscodeStatus { status } => {
                println!("{}", serde_json::to_string(&status)?);
                seen += 1;
            }
            EventPayload::TelemetryFailed { error } => {
                eprintln!("poll failed: {}", error);
                seen += 1;
            }
            _ => {}
        }
    }

    poller.stop();
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!(
                "  Video codecs: {}",
                config.negotiation.video_codecs.len()
            );
            println!(
                "  Audio codecs: {}",
                config.negotiation.audio_codecs.len()
            );
            println!(
                "  Max audio channels: {}",
                config.negotiation.max_audio_channels
            );
            println!("  Telemetry enabled: {}", config.telemetry.enabled);
            println!("  Diagnostic probe: {}", config.diagnostics.probe_enabled);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!(
                "  Max audio channels: {}",
                config.negotiation.max_audio_channels
            );
        }
    }

    Ok(())
}
