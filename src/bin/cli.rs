//! mpcover CLI
//!
//! Command-line interface for querying a music server.

use std::path::PathBuf;
use std::process;
use std::thread;

use clap::{Parser, Subcommand};
use mpcover::protocol::Mapping;
use mpcover::{Client, Config, MpdError};
use tracing_subscriber::{fmt, EnvFilter};

/// mpcover CLI
#[derive(Parser, Debug)]
#[command(name = "mpcover")]
#[command(about = "Query status, album art and change events from an MPD server")]
#[command(version)]
struct Args {
    /// Server host
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value = "6600")]
    port: u16,

    /// Password sent after connecting
    #[arg(long)]
    password: Option<String>,

    /// Read timeout in milliseconds (0 blocks indefinitely)
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show player status
    Status,

    /// Show database statistics
    Stats,

    /// Show the current song
    Current,

    /// Download album art
    #[command(name = "albumart")]
    AlbumArt {
        /// Song or directory path, defaults to the current song
        path: Option<String>,

        /// File to write the artwork to
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the current song every time a subsystem changes
    Watch {
        /// Subsystems to listen on
        #[arg(default_values = ["player", "playlist"])]
        subsystems: Vec<String>,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,mpcover=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .maybe_password(args.password.clone())
        .read_timeout_ms(args.timeout_ms)
        .build();

    if let Err(e) = run(&config, args.command) {
        tracing::error!("{}", e);
        process::exit(exit_code(&e));
    }
}

fn run(config: &Config, command: Commands) -> mpcover::Result<()> {
    let mut client = Client::open(config)?;
    tracing::debug!("Server version {}", client.version());

    match command {
        Commands::Status => print_mapping(&client.status()?),
        Commands::Stats => print_mapping(&client.stats()?),
        Commands::Current => print_mapping(&client.current_song()?),
        Commands::AlbumArt { path, output } => match client.album_art(path.as_deref())? {
            Some(art) => {
                std::fs::write(&output, &art)?;
                println!("Wrote {} bytes to {}", art.len(), output.display());
            }
            None => println!("No album art"),
        },
        Commands::Watch { subsystems } => watch(config, &mut client, subsystems)?,
    }

    client.close();
    Ok(())
}

/// Idle on a second session and refresh from the first one on every change
fn watch(config: &Config, client: &mut Client, subsystems: Vec<String>) -> mpcover::Result<()> {
    let (tx, rx) = crossbeam::channel::unbounded();
    let mut watcher = Client::open(config)?;

    let handle = thread::spawn(move || {
        let names: Vec<&str> = subsystems.iter().map(String::as_str).collect();
        watcher.watch(&names, &tx)
    });

    for subsystem in rx.iter() {
        println!("== {} changed", subsystem);
        print_mapping(&client.current_song()?);
    }

    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(MpdError::Protocol("watch thread panicked".to_string())),
    }
}

fn print_mapping(mapping: &Mapping) {
    let mut keys: Vec<&String> = mapping.keys().collect();
    keys.sort();

    for key in keys {
        println!("{}: {}", key, mapping[key]);
    }
}

/// Distinct exit status per fatal cause
fn exit_code(error: &MpdError) -> i32 {
    match error {
        MpdError::Connect { .. } => 101,
        MpdError::Auth(_) => 201,
        MpdError::Config(_) => 2,
        _ => 1,
    }
}
