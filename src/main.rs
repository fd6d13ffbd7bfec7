use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use url::Url;

use scan_relay::{logging, net, qr, server, Config};

#[derive(Parser)]
#[command(name = "scan-relay")]
#[command(about = "Use your phone as a camera for your desktop: scan a QR code, snap photos, receive them instantly", version)]
struct Cli {
    /// Config file (defaults to ./scan-relay.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        /// Interface to bind
        #[arg(long)]
        host: Option<IpAddr>,

        /// Directory uploaded photos are written to
        #[arg(short, long)]
        uploads: Option<PathBuf>,

        /// Directory with the desktop and mobile pages
        #[arg(long = "static", value_name = "DIR")]
        static_dir: Option<PathBuf>,

        /// Base url phones should use instead of the detected LAN address
        #[arg(long, value_name = "URL")]
        public_url: Option<Url>,

        /// Largest accepted upload in bytes
        #[arg(long, value_name = "BYTES")]
        max_upload_bytes: Option<usize>,
    },

    /// Print the mobile link for a session
    Link {
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    let command = cli.command.unwrap_or(Commands::Serve {
        port: None,
        host: None,
        uploads: None,
        static_dir: None,
        public_url: None,
        max_upload_bytes: None,
    });

    match command {
        Commands::Serve {
            port,
            host,
            uploads,
            static_dir,
            public_url,
            max_upload_bytes,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(dir) = uploads {
                config.uploads_dir = dir;
            }
            if static_dir.is_some() {
                config.static_dir = static_dir;
            }
            if public_url.is_some() {
                config.public_url = public_url;
            }
            if let Some(limit) = max_upload_bytes {
                config.max_upload_bytes = limit;
            }

            let _log_guard = logging::init(config.log_dir.as_deref());

            println!(
                "{}",
                format!("📷 Starting scan relay on port {}...", config.port)
                    .cyan()
                    .bold()
            );
            server::serve(config).await?;
        }

        Commands::Link { session } => {
            let base = config.mobile_base_url(&net::local_ip())?;
            let url = qr::mobile_url(&base, &session)?;
            println!("{}", url.as_str().bright_blue());
        }
    }

    Ok(())
}
