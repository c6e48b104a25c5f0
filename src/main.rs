use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parlando::api::{ApiServer, ApiState};
use parlando::gateway::ServiceGateway;
use parlando::lifecycle::SessionLifecycle;
use parlando::profile::ProfileStore;
use parlando::session::SessionStore;
use parlando::Config;

/// Parlando - conversation practice server for language learners
#[derive(Parser)]
#[command(name = "parlando", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Config file path (defaults to ~/.config/parlando/config.toml)
    #[arg(long, env = "PARLANDO_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory holding the learner profile and session records
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test TTS output
    TestTts {
        /// Text to synthesize
        #[arg(default_value = "Hallo, wie geht es dir?")]
        text: String,

        /// Write the MP3 to this file instead of only reporting its size
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parlando=info",
        1 => "info,parlando=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestTts { text, output } => test_tts(&config, &text, output.as_deref()).await,
            Command::Setup => parlando::setup::run_setup(),
        };
    }

    tracing::info!(
        port = config.server.port,
        language = %config.tutor.language_name,
        data_dir = %config.storage.data_dir.display(),
        "starting parlando server"
    );

    let gateway = ServiceGateway::from_config(&config)?;
    let lifecycle = SessionLifecycle::new(&config, gateway.clone());

    let state = ApiState {
        lifecycle,
        profile_store: ProfileStore::new(config.storage.profile_path()),
        session_store: SessionStore::new(config.storage.sessions_dir()),
        gateway,
    };

    ApiServer::new(state, config.server.port).run().await?;

    Ok(())
}

/// Synthesize a sample sentence and report (or save) the result
async fn test_tts(config: &Config, text: &str, output: Option<&Path>) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let gateway = ServiceGateway::from_config(config)?;

    println!("Synthesizing speech...");
    let mp3 = gateway.synthesize(text).await?;
    println!("Got {} bytes of audio data", mp3.len());

    // MP3 frames start with a sync word, ID3-tagged files with "ID3"
    if mp3.len() > 3 {
        println!(
            "First 4 bytes: {:02x} {:02x} {:02x} {:02x}",
            mp3[0], mp3[1], mp3[2], mp3[3]
        );
    }

    if let Some(path) = output {
        std::fs::write(path, &mp3)?;
        println!("Wrote audio to {}", path.display());
    }

    Ok(())
}
