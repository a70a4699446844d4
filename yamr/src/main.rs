use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yamr::config::StoreConfig;
use yamr::{ChunkFile, Tree};

const USAGE: &str = "usage: yamr <get KEY | set KEY VALUE | keys | stats>";

/// A single CLI invocation.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Get(String),
    Set(String, String),
    Keys,
    Stats,
}

impl Command {
    fn parse(args: &[String]) -> Option<Self> {
        match args {
            [cmd, key] if cmd == "get" => Some(Self::Get(key.clone())),
            [cmd, key, value] if cmd == "set" => Some(Self::Set(key.clone(), value.clone())),
            [cmd] if cmd == "keys" => Some(Self::Keys),
            [cmd] if cmd == "stats" => Some(Self::Stats),
            _ => None,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yamr=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = Command::parse(&args) else {
        tracing::error!("unrecognized arguments: {args:?}");
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    // Load configuration from environment variables
    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(
        "Loaded configuration: database_path={}, max_size={}",
        config.database_path.display(),
        config.max_size
    );

    match run(&config, command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &StoreConfig, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let file = ChunkFile::open_or_create(&config.database_path)?;
    let mut tree = Tree::open(file, config.max_size)?;

    match command {
        Command::Get(key) => {
            let value = tree.get(key.as_bytes())?;
            println!("{}", String::from_utf8_lossy(&value));
        }
        Command::Set(key, value) => {
            tree.set(key, value)?;
            let root = tree.commit()?;
            tracing::info!("committed root at offset {root}");
        }
        Command::Keys => {
            for key in tree.keys() {
                println!("{}", String::from_utf8_lossy(&key?));
            }
        }
        Command::Stats => {
            println!("height: {}", tree.height()?);
            println!("entries: {}", tree.len());
            println!("max_size: {}", tree.max_size());
            match tree.root_offset() {
                Some(offset) => println!("root offset: {offset}"),
                None => println!("root offset: none"),
            }
        }
    }

    Ok(())
}
