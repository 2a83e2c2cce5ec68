use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use practice_recorder::{
    create_router, ApiClient, AppState, AudioBackendFactory, AudioSource, CaptureSession, Config,
    SessionEvent,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "practice-recorder", about = "Record and score spoken interview answers")]
struct Cli {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/practice-recorder")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the recording control API
    Serve,

    /// Record one answer and save it
    Record {
        /// Stop after this many seconds
        #[arg(short, long, default_value_t = 30)]
        seconds: u64,

        /// Output WAV path
        #[arg(short, long, default_value = "response.wav")]
        out: PathBuf,

        /// Replay a WAV file instead of using the microphone
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Record { seconds, out, input } => record(cfg, seconds, out, input).await,
    }
}

async fn serve(cfg: Config) -> Result<()> {
    let backend = AudioBackendFactory::create(AudioSource::Microphone, cfg.backend_config())?;
    let session = CaptureSession::new(cfg.session_config(), backend)?;

    let mut api = ApiClient::new(cfg.api.base_url.clone(), cfg.limits.max_size_bytes);
    if let Some(token) = &cfg.api.token {
        api = api.with_token(token.clone());
    }

    let app = create_router(AppState::new(session, Some(api)));
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn record(cfg: Config, seconds: u64, out: PathBuf, input: Option<PathBuf>) -> Result<()> {
    let source = match input {
        Some(path) => AudioSource::File(path),
        None => AudioSource::Microphone,
    };
    let backend = AudioBackendFactory::create(source, cfg.backend_config())?;
    let session = CaptureSession::new(cfg.session_config(), backend)?;

    let mut events = session.subscribe();
    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::WarningChanged(Some(warning))) => println!("⚠ {}", warning),
                Ok(SessionEvent::StateChanged(state)) => info!("Session {}", state),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("Missed {} session events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    session.start().await?;
    println!("Recording for {}s, press Ctrl-C to stop early", seconds);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    let result = session.stop().await;
    drop(session);
    let _ = reporter.await;

    match result? {
        Some(artifact) => {
            artifact.save(&out)?;
            println!("Saved {} bytes to {}", artifact.size_bytes(), out.display());
        }
        None => warn!("Recording was not active"),
    }

    Ok(())
}
