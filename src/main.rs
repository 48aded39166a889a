//! voicebot — voice-driven developer advisor gateway.
//!
//! Upload audio, get back a transcript, an expert-developer reply, and a
//! time-limited URL for the spoken response.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use voicebot::advisor::Advisor;
use voicebot::config::loader::load_config;
use voicebot::gateway::{self, AppState};
use voicebot::pipeline::VoicePipeline;
use voicebot::providers::openai_compat::OpenAICompatProvider;
use voicebot::services::blob::HttpBlobStore;
use voicebot::services::speech::HttpSpeechSynthesizer;
use voicebot::services::transcription::HttpTranscriptionApi;
use voicebot::store::turns::TurnStore;
use voicebot::transcribe::TranscriptionWaiter;

pub(crate) const VERSION: &str = "0.1.0";

#[derive(Parser)]
#[command(name = "voicebot", about = "voicebot - Voice developer advisor", version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the voice gateway.
    Serve {
        /// Gateway port (overrides the config file).
        #[arg(short, long)]
        port: Option<u16>,
        /// Path to the config file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Verbose logging.
        #[arg(short, long)]
        verbose: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            config,
            verbose,
        } => {
            init_tracing(verbose);
            serve(port, config.as_deref()).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(if verbose { "debug" } else { "info" })
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(port_override: Option<u16>, config_path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let mut config = load_config(config_path);
    if let Some(port) = port_override {
        config.server.port = port;
    }
    config.validate()?;

    // External service clients, constructed once and handed to the pipeline.
    let store = Arc::new(TurnStore::new(&config.storage.db_path)?);
    let blobs = Arc::new(HttpBlobStore::new(&config.storage));
    let transcription_api = Arc::new(HttpTranscriptionApi::new(&config.transcription));
    let waiter = TranscriptionWaiter::new(transcription_api, &config.transcription);
    let provider = Arc::new(OpenAICompatProvider::new(
        &config.llm.api_key,
        config.llm.api_base.as_deref(),
        &config.llm.model,
    ));
    let advisor = Advisor::new(provider);
    let synthesizer = Arc::new(HttpSpeechSynthesizer::new(&config.tts));

    let pipeline = Arc::new(VoicePipeline::new(
        blobs,
        waiter,
        advisor,
        synthesizer,
        store,
    ));

    let app = gateway::router(AppState { pipeline });
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("voicebot gateway listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
