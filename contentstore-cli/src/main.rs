mod logging;
mod maintenance;
mod server;

use clap::{Parser, Subcommand};

use server::config::StorageBackend;
use server::ServeOverrides;

#[derive(Parser, Debug)]
#[command(name = "contentstore")]
#[command(version = "0.1.0")]
#[command(about = "JSON content store with localized reads and form intake", long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

fn parse_storage(value: &str) -> Result<StorageBackend, String> {
    StorageBackend::parse(value).ok_or_else(|| format!("unknown storage backend: {}", value))
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the content root and a starter config
    Init {
        /// Content root directory
        #[arg(short = 'd', long = "content-dir", default_value = "./data")]
        content_dir: String,

        /// Path of the config file to write
        #[arg(short = 'c', long = "config", default_value = "contentstore.toml")]
        config: String,
    },
    /// Print a resource as localized JSON
    List {
        /// Resource name (e.g. products)
        resource: String,

        /// Language to resolve localized fields for (default from config)
        #[arg(short = 'l', long = "lang")]
        lang: Option<String>,

        /// Content root directory (overrides the config)
        #[arg(short = 'd', long = "content-dir")]
        content_dir: Option<String>,

        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "contentstore.toml")]
        config: String,
    },
    /// Report content files the server would read as empty
    Validate {
        /// Content root directory
        #[arg(short = 'd', long = "content-dir", default_value = "./data")]
        content_dir: String,
    },
    Serve {
        /// Port to listen on
        #[arg(short = 'p', long = "port")]
        port: Option<u16>,

        /// Address to bind
        #[arg(short = 'H', long = "hostname")]
        hostname: Option<String>,

        /// Content root directory
        #[arg(short = 'd', long = "content-dir")]
        content_dir: Option<String>,

        /// Path to config file
        #[arg(short = 'c', long = "config", default_value = "contentstore.toml")]
        config: String,

        /// Storage backend: file, sled or memory
        #[arg(long = "storage", value_parser = parse_storage)]
        storage: Option<StorageBackend>,
    },
}

#[tokio::main]
async fn main() {
    logging::init("info");

    let cli = Args::parse();
    match cli.cmd {
        Command::Init {
            content_dir,
            config,
        } => maintenance::run_init(&content_dir, &config),
        Command::List {
            resource,
            lang,
            content_dir,
            config,
        } => maintenance::run_list(&resource, lang.as_deref(), content_dir, &config).await,
        Command::Validate { content_dir } => maintenance::run_validate(&content_dir),
        Command::Serve {
            port,
            hostname,
            content_dir,
            config,
            storage,
        } => {
            let overrides = ServeOverrides {
                port,
                hostname,
                content_dir,
                storage,
            };
            server::run_serve(&config, overrides).await
        }
    }
}
