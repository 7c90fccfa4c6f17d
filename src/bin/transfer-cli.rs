use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use peer_transfer::client::{self, FetchOptions};
use peer_transfer::config::{load_password, ObservabilityConfig};
use peer_transfer::observability::logging;

#[derive(Parser)]
#[command(name = "transfer-cli")]
#[command(about = "Fetch items from a peer transfer server", long_about = None)]
struct Cli {
    /// File holding the shared password, if the peer requires one
    #[arg(short, long)]
    password_file: Option<PathBuf>,

    /// Overall deadline in seconds
    #[arg(short, long, default_value_t = 3600)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a file or directory into a local path
    Fetch {
        /// Peer address, e.g. 10.0.0.7:9123
        addr: SocketAddr,
        /// Cache name on the peer
        name: String,
        /// Where to write the item
        dest: PathBuf,
    },
    /// Check whether a peer has an item, without keeping it
    Peek { addr: SocketAddr, name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init_logging(&ObservabilityConfig {
        log_level: "warn".into(),
        ..ObservabilityConfig::default()
    });

    let opts = FetchOptions {
        password: cli.password_file.as_deref().map(load_password).transpose()?,
        timeout: Duration::from_secs(cli.timeout),
        ..FetchOptions::default()
    };

    match cli.command {
        Commands::Fetch { addr, name, dest } => {
            let bytes = client::fetch_to_path(addr, &name, &dest, &opts).await?;
            println!("{} -> {} ({} bytes)", name, dest.display(), bytes);
        }
        Commands::Peek { addr, name } => match client::fetch(addr, &name, &opts).await? {
            client::Fetched::File { name, bytes, mode } => {
                println!("file {} {} bytes mode {:o}", name, bytes.len(), mode);
            }
            client::Fetched::Directory { name, archive } => {
                println!("dir {} {} archive bytes", name, archive.len());
            }
        },
    }

    Ok(())
}
