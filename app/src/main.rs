//! Command-line front end for the photo-sharing client.

use api_client::{ApiClient, PhotoId};
use auth::SessionManager;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sync::{PhotoApp, UploadDraft, BACKEND_UNREACHABLE};
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser)]
#[command(
    name = "photoapp",
    author,
    version,
    about = "Personal photo-sharing client"
)]
struct Cli {
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Override the backend base URL
    #[arg(long)]
    base_url: Option<String>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Store the auth token in ~/.photoapp/token.json instead of the system keyring
    #[arg(long)]
    use_file_store: bool,
    /// Keep the auth token in memory only for this run
    #[arg(long, conflicts_with = "use_file_store")]
    ephemeral: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the effective configuration to the config file
    InitConfig,
    #[command(flatten)]
    Client(ClientCommand),
}

/// Commands that talk to the backend.
#[derive(Subcommand)]
enum ClientCommand {
    /// Check that the backend is reachable
    Ping,
    /// Log in and remember the access token
    Login {
        username: String,
        #[arg(long, env = "PHOTOAPP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored access token
    Logout,
    /// Show whether the stored token is still accepted
    Status,
    /// List photos in the gallery
    List {
        /// Maximum number of photos to display
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Upload a photo with optional metadata
    Upload {
        /// Image file to upload
        file: Option<PathBuf>,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        caption: String,
        /// Date taken, as YYYY-MM-DD
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete a photo by id
    Delete {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let token_store = if cli.ephemeral {
        Some(config::TokenStoreKind::Memory)
    } else if cli.use_file_store {
        Some(config::TokenStoreKind::File)
    } else {
        None
    };
    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        base_url: cli.base_url.clone(),
        token_store,
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);

    std::fs::create_dir_all(&cfg.data_dir)?;
    let file_appender = rolling::daily(&cfg.data_dir, "photoapp.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(std::io::stderr.and(file_writer))
        .init();

    match cli.command {
        Commands::InitConfig => {
            let path = cfg.save_to(cli.config.clone())?;
            println!("Config written to {:?}", path);
        }
        Commands::Client(command) => run(&cfg, command).await?,
    }

    Ok(())
}

async fn run(cfg: &config::AppConfig, command: ClientCommand) -> Result<(), Box<dyn std::error::Error>> {
    let api = ApiClient::new(&cfg.base_url)?;
    let mut app = PhotoApp::new(api, SessionManager::new(cfg.build_token_store()));
    tracing::debug!(base_url = %cfg.base_url, store = ?cfg.token_store, "Client ready");

    match command {
        ClientCommand::Ping => {
            let message = app.check_backend().await;
            if message == BACKEND_UNREACHABLE {
                println!("{}", message);
            } else {
                println!("Backend says: {}", message);
            }
        }
        ClientCommand::Login { username, password } => match app.login(&username, &password).await {
            Ok(()) => {
                println!("Logged in as {}", username);
                println!("Photos: {}", app.gallery().len());
            }
            Err(e) => println!("{}", e),
        },
        ClientCommand::Logout => {
            app.logout();
            println!("Logged out");
        }
        ClientCommand::Status => {
            if app.restore_session().await {
                println!("Authenticated: yes");
                println!("Photos: {}", app.gallery().len());
            } else {
                println!("Authenticated: no");
            }
        }
        ClientCommand::List { limit } => {
            if !app.restore_session().await {
                println!("Not logged in");
                return Ok(());
            }
            let photos = app.gallery().photos();
            if photos.is_empty() {
                println!("No photos");
            }
            for photo in photos.iter().take(limit.unwrap_or(usize::MAX)) {
                println!(
                    "{}\t{}\t{}\t{}",
                    photo.id,
                    photo.title.as_deref().unwrap_or("-"),
                    photo
                        .date
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    photo.url
                );
            }
        }
        ClientCommand::Upload {
            file,
            title,
            caption,
            date,
        } => {
            let draft = UploadDraft {
                file,
                title,
                caption,
                date,
            };
            // a missing file is reported without touching the network
            if draft.file.is_some() {
                app.restore_session().await;
            }
            let result = app.upload(&draft).await;
            if let Some(status) = app.upload_status() {
                println!("{}", status);
            }
            if let Ok(image_url) = result {
                println!("{}", image_url);
                println!("Photos: {}", app.gallery().len());
            }
        }
        ClientCommand::Delete { id } => {
            if !app.restore_session().await {
                println!("Not logged in");
                return Ok(());
            }
            app.delete_photo(&PhotoId::new(id.clone())).await?;
            println!("Deleted {}", id);
            println!("Photos: {}", app.gallery().len());
        }
    }

    Ok(())
}
