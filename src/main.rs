use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;

use presence_chat::application::messaging::CommandDispatcher;
use presence_chat::domain::traits::{MessageStore, ParticipantStore};
use presence_chat::infrastructure::adapters::console::ConsoleAdapter;
use presence_chat::infrastructure::clock::SystemClock;
use presence_chat::infrastructure::config::{Config, StorageBackend};
use presence_chat::infrastructure::database::SqliteStore;
use presence_chat::infrastructure::storage::MemoryStore;
use presence_chat::{ChatRoom, StorageError};

#[derive(Parser)]
#[command(name = "presence-chat")]
#[command(about = "Chat room with heartbeat-based presence", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// SQLite database path (overrides config, implies the sqlite backend)
    #[arg(short, long)]
    database: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the room with a console request surface
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            if let Err(e) = run_room(cli.config, cli.database) {
                tracing::error!("Room stopped with error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("presence-chat v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn load_config(config_path: &str) -> Config {
    if std::path::Path::new(config_path).exists() {
        Config::load(config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::load_env()
        })
    } else {
        Config::load_env()
    }
}

type Stores = (Arc<dyn ParticipantStore>, Arc<dyn MessageStore>);

fn open_stores(config: &Config) -> Result<Stores, StorageError> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory storage");
            let store = Arc::new(MemoryStore::new());
            let participants: Arc<dyn ParticipantStore> = store.clone();
            let messages: Arc<dyn MessageStore> = store;
            Ok((participants, messages))
        }
        StorageBackend::Sqlite => {
            let store = Arc::new(SqliteStore::open(&config.storage.path)?);
            tracing::info!("Database initialized at {}", config.storage.path.display());
            let participants: Arc<dyn ParticipantStore> = store.clone();
            let messages: Arc<dyn MessageStore> = store;
            Ok((participants, messages))
        }
    }
}

fn run_room(config_path: String, database: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(&config_path);
    if let Some(path) = database {
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = path.into();
    }
    config.validate()?;

    tracing::info!(
        "Starting room (stale after {}s, sweep every {}s)",
        config.presence.stale_threshold_secs,
        config.presence.sweep_interval_secs
    );

    let (participants, messages) = open_stores(&config)?;
    let room = ChatRoom::from_config(&config, participants, messages, Arc::new(SystemClock));

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let handle = room.sweeper().spawn(config.sweep_interval());

        let dispatcher = CommandDispatcher::new(room);
        let console = ConsoleAdapter::new();

        tokio::select! {
            result = console.run_stdio(&dispatcher) => {
                if let Err(e) = result {
                    tracing::error!("Console failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
            }
        }

        if let Err(e) = handle.shutdown().await {
            tracing::error!("Sweeper task ended abnormally: {}", e);
        }
    });

    // stdin reads run on a blocking thread that may never return
    rt.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}

fn init_config() {
    match serde_yaml::to_string(&Config::default()) {
        Ok(yaml) => {
            println!("{}", yaml);
            println!("\nSave this to config.yaml and adjust as needed.");
        }
        Err(e) => tracing::error!("Failed to render default config: {}", e),
    }
}
