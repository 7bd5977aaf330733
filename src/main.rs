use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use shashin::{
    Config,
    api::{MethodCall, MethodChannel, MethodReply},
    gallery::Gallery,
    index::FsMediaIndex,
    worker::GalleryWorker,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List albums
    Albums {
        /// Restrict to one medium type (image or video)
        #[arg(short, long)]
        medium_type: Option<String>,

        #[arg(long)]
        hide_if_empty: bool,
    },

    /// List one page of media in an album
    Media {
        album_id: String,

        #[arg(short, long)]
        medium_type: Option<String>,

        #[arg(long)]
        oldest_first: bool,

        #[arg(long)]
        skip: Option<u64>,

        #[arg(long)]
        take: Option<u64>,
    },

    /// Render a thumbnail to a file
    Thumbnail {
        medium_id: String,

        #[arg(short, long, default_value = "thumbnail.jpg")]
        output: PathBuf,

        #[arg(long)]
        width: Option<u32>,

        #[arg(long)]
        height: Option<u32>,

        #[arg(long)]
        high_quality: bool,
    },

    /// Invoke a raw method with JSON arguments
    Call {
        method: String,

        /// JSON object with the method arguments
        #[arg(short, long, default_value = "{}")]
        args: String,
    },

    /// Delete the export cache
    CleanCache,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = if cli.config.exists() {
        let config_content = std::fs::read_to_string(&cli.config)?;
        toml_edit::de::from_str::<Config>(&config_content)?
    } else {
        info!("Config file not found at {:?}, using defaults", cli.config);
        Config::default()
    };

    info!("Starting {}", config.app.name);
    info!("Library directory: {:?}", config.library.source_directory);
    info!("Cache directory: {:?}", config.gallery.cache_directory);

    let index = Arc::new(FsMediaIndex::new(config.library.source_directory.clone()));
    let gallery = Arc::new(Gallery::new(config.gallery.clone(), index));
    let channel = MethodChannel::new(gallery, GalleryWorker::start(32));

    let (call, output) = match cli.command {
        Commands::Albums {
            medium_type,
            hide_if_empty,
        } => (
            MethodCall {
                method: "listAlbums".to_string(),
                args: serde_json::json!({
                    "mediumType": medium_type,
                    "hideIfEmpty": hide_if_empty,
                }),
            },
            None,
        ),
        Commands::Media {
            album_id,
            medium_type,
            oldest_first,
            skip,
            take,
        } => (
            MethodCall {
                method: "listMedia".to_string(),
                args: serde_json::json!({
                    "albumId": album_id,
                    "mediumType": medium_type,
                    "newest": !oldest_first,
                    "skip": skip,
                    "take": take,
                }),
            },
            None,
        ),
        Commands::Thumbnail {
            medium_id,
            output,
            width,
            height,
            high_quality,
        } => (
            MethodCall {
                method: "getThumbnail".to_string(),
                args: serde_json::json!({
                    "mediumId": medium_id,
                    "width": width,
                    "height": height,
                    "highQuality": high_quality,
                }),
            },
            Some(output),
        ),
        Commands::Call { method, args } => (
            MethodCall {
                method,
                args: serde_json::from_str(&args)?,
            },
            None,
        ),
        Commands::CleanCache => (
            MethodCall {
                method: "cleanCache".to_string(),
                args: serde_json::Value::Null,
            },
            None,
        ),
    };

    match channel.handle(call).await {
        Ok(MethodReply::Json(value)) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Ok(MethodReply::Bytes(bytes)) => match output {
            Some(path) => {
                std::fs::write(&path, &bytes)?;
                info!("Wrote {} bytes to {:?}", bytes.len(), path);
            }
            None => {
                info!("Received {} bytes", bytes.len());
            }
        },
        Err(e) => {
            eprintln!("Error [{}]: {}", e.code, e.message);
            std::process::exit(1);
        }
    }

    Ok(())
}
