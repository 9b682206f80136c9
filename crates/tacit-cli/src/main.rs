//! Tacit CLI - suggestion agent for a watched mail page
//!
//! Usage:
//!   tacit init                                   Write default config
//!   tacit run                                    Watch the browser until Ctrl-C
//!   tacit predict --subject S --sender E         Ask the service once
//!   tacit capture --subject S --sender E -a A    Record one user action

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tacit_agent::{
    AgentEvent, CaptureForwarder, HttpServiceClient, PredictionClient, PredictionOutcome,
    SuggestionService, TacitAgent,
};
use tacit_browser::{BrowserConfig, BrowserSession, CdpOverlay, CdpPageInspector};
use tacit_core::{Context, Endpoints, TacitConfig, UserAction};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "tacit")]
#[command(author, version, about = "Suggests and learns mail actions from a live page")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory containing .tacit/config.toml
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init {
        /// Directory to initialize
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Attach to the browser and run the agent until Ctrl-C
    Run {
        /// Connect to an existing browser on this DevTools port
        #[arg(short, long)]
        port: Option<u16>,

        /// Page to open before watching
        #[arg(short, long)]
        url: Option<String>,

        /// Launch the browser headless
        #[arg(long)]
        headless: bool,

        /// Service base URL (overrides configured endpoints)
        #[arg(long)]
        service: Option<String>,
    },

    /// Request a single prediction
    Predict {
        /// Message subject
        #[arg(short, long)]
        subject: String,

        /// Sender address
        #[arg(short = 'e', long)]
        sender: String,

        /// Service base URL (overrides configured endpoints)
        #[arg(long)]
        service: Option<String>,
    },

    /// Record a single user action
    Capture {
        /// Message subject
        #[arg(short, long)]
        subject: String,

        /// Sender address
        #[arg(short = 'e', long)]
        sender: String,

        /// Action taken (delete, archive, report_spam)
        #[arg(short, long)]
        action: UserAction,

        /// Service base URL (overrides configured endpoints)
        #[arg(long)]
        service: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => cmd_init(path),
        Commands::Run {
            port,
            url,
            headless,
            service,
        } => cmd_run(&cli.root, port, url, headless, service).await,
        Commands::Predict {
            subject,
            sender,
            service,
        } => cmd_predict(&cli.root, Context::new(subject, sender), service).await,
        Commands::Capture {
            subject,
            sender,
            action,
            service,
        } => cmd_capture(&cli.root, Context::new(subject, sender), action, service).await,
    }
}

fn load_config(root: &Path, service: Option<String>) -> Result<TacitConfig> {
    let mut config = TacitConfig::load_or_default(root)
        .with_context(|| format!("Failed to load config from {:?}", root))?;
    if let Some(base) = service {
        config.endpoints = Endpoints::with_base(&base);
    }
    Ok(config)
}

fn service_client(config: &TacitConfig) -> Arc<dyn SuggestionService> {
    Arc::new(HttpServiceClient::new(config.endpoints.clone()))
}

fn cmd_init(path: PathBuf) -> Result<()> {
    info!("Initializing Tacit in {:?}", path);

    let config_path = path.join(".tacit/config.toml");
    if config_path.exists() {
        println!("Config already exists: {:?}", config_path);
        return Ok(());
    }

    TacitConfig::write_default(&path).context("Failed to write default config")?;

    println!("Initialized Tacit in {:?}", path);
    println!("Created:");
    println!("  .tacit/config.toml");
    Ok(())
}

async fn cmd_run(
    root: &Path,
    port: Option<u16>,
    url: Option<String>,
    headless: bool,
    service: Option<String>,
) -> Result<()> {
    let mut config = load_config(root, service)?;
    if port.is_some() {
        config.browser.debug_port = port;
    }
    if headless {
        config.browser.headless = true;
    }

    let session = match config.browser.debug_port {
        Some(port) => BrowserSession::connect(port)
            .await
            .context("Failed to connect to browser")?,
        None => BrowserSession::launch_with_config(BrowserConfig::from(&config.browser))
            .await
            .context("Failed to launch browser")?,
    };

    // A fresh browser has nothing to watch yet; an attached one keeps its page
    let target = url.or_else(|| {
        config
            .browser
            .debug_port
            .is_none()
            .then(|| config.browser.start_url.clone())
    });
    if let Some(target) = target {
        session.navigate(&target).await.context("Failed to open page")?;
    }

    match session.get_url().await {
        Ok(current) => info!("Watching {}", current),
        Err(e) => warn!("Could not read page URL: {}", e),
    }

    let session = Arc::new(session);
    let agent = TacitAgent::new(
        config.timing.clone(),
        Arc::new(CdpPageInspector::new(Arc::clone(&session), config.page.clone())),
        Arc::new(CdpOverlay::new(Arc::clone(&session))),
        service_client(&config),
    );

    let events = agent.events();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            let _ = events.send(AgentEvent::Shutdown);
        }
    });

    println!("Tacit is watching the page. Press Ctrl-C to stop.");
    agent.run().await;
    Ok(())
}

async fn cmd_predict(root: &Path, context: Context, service: Option<String>) -> Result<()> {
    let config = load_config(root, service)?;
    let client = PredictionClient::new(service_client(&config));

    match client.predict(&context).await {
        PredictionOutcome::Suggested(suggestion) => println!("{}", suggestion),
        PredictionOutcome::Suppressed(reason) => {
            info!("Prediction suppressed: {}", reason);
            println!("no suggestion");
        }
    }
    Ok(())
}

async fn cmd_capture(
    root: &Path,
    context: Context,
    action: UserAction,
    service: Option<String>,
) -> Result<()> {
    let config = load_config(root, service)?;
    let forwarder = CaptureForwarder::new(service_client(&config));

    if !forwarder.capture(&context, action).await {
        bail!("Capture of '{}' on {} was not recorded", action, context);
    }

    println!("Captured '{}' on {}", action, context);
    Ok(())
}
