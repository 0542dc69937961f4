mod client;
mod routing;

use clap::{Parser, Subcommand};
use shotclock_common::bridge::RequestOptions;
use shotclock_common::capture::CaptureView;
use shotclock_common::config::Config;
use std::path::PathBuf;
use std::process;

use client::{BridgeClient, ClientError};
use routing::Route;

#[derive(Parser)]
#[command(name = "shotclock", about = "Desktop time-tracking shell")]
struct Cli {
    /// Path to the config file shared with the control process.
    #[arg(long, env = "SHOTCLOCK_CONFIG", default_value = "shotclock.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Take a screenshot now.
    Capture,
    /// Show the newest captures.
    Gallery,
    /// Delete every stored capture.
    Purge,
    /// Store ERP credentials and open the dashboard.
    Login {
        server_url: String,
        api_key: String,
        api_secret: String,
    },
    /// Forget stored credentials.
    Logout,
    /// Show control-process liveness and the active view.
    Status,
    /// Forward an authenticated request to the ERP server.
    Api {
        endpoint: String,
        #[arg(long, default_value = "GET")]
        method: String,
    },
    /// Liveness check against the control process.
    Ping,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("shotclock: {e}");
            process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    let mut client = match BridgeClient::connect(&config.socket_path()).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("shotclock: {e}");
            process::exit(1);
        }
    };

    let result = match cli.command {
        None => startup(&mut client).await,
        Some(Command::Capture) => capture(&mut client).await,
        Some(Command::Gallery) => gallery(&mut client).await,
        Some(Command::Purge) => purge(&mut client).await,
        Some(Command::Login {
            server_url,
            api_key,
            api_secret,
        }) => login(&mut client, server_url, api_key, api_secret).await,
        Some(Command::Logout) => logout(&mut client).await,
        Some(Command::Status) => status(&mut client).await,
        Some(Command::Api { endpoint, method }) => api(&mut client, endpoint, method).await,
        Some(Command::Ping) => ping(&mut client).await,
    };

    if let Err(e) = result {
        eprintln!("shotclock: {e}");
        process::exit(1);
    }
}

/// Initial navigation: the routing guard decides where we land.
async fn startup(client: &mut BridgeClient) -> Result<(), ClientError> {
    let creds = client.get_credentials().await?;
    match routing::decide(creds.as_ref()) {
        Route::Settings => {
            println!("view: settings");
            println!("no ERP credentials stored; run 'shotclock login <server-url> <api-key> <api-secret>'");
            Ok(())
        }
        Route::Dashboard => {
            println!("view: dashboard");
            gallery(client).await
        }
    }
}

async fn capture(client: &mut BridgeClient) -> Result<(), ClientError> {
    match client.capture().await? {
        Some(view) => {
            println!("captured {}", view.name);
            println!("  stored at {}", view.storage_path);
            println!(
                "  thumbnail {}, full image {}",
                approx_size(&view.thumbnail),
                approx_size(&view.full_data)
            );
            Ok(())
        }
        None => {
            eprintln!("no capture taken: no display available");
            process::exit(1);
        }
    }
}

async fn gallery(client: &mut BridgeClient) -> Result<(), ClientError> {
    let views = client.list_recent().await?;
    if views.is_empty() {
        println!("no captures stored");
        return Ok(());
    }
    for view in &views {
        print_view(view);
    }
    Ok(())
}

async fn purge(client: &mut BridgeClient) -> Result<(), ClientError> {
    if client.purge().await? {
        println!("all captures deleted");
        Ok(())
    } else {
        eprintln!("purge incomplete: some captures could not be deleted; retry");
        process::exit(1);
    }
}

async fn login(
    client: &mut BridgeClient,
    server_url: String,
    api_key: String,
    api_secret: String,
) -> Result<(), ClientError> {
    client
        .save_credentials(server_url, api_key, api_secret)
        .await?;
    let creds = client.get_credentials().await?;
    match routing::decide(creds.as_ref()) {
        Route::Dashboard => println!("credentials saved; view: dashboard"),
        Route::Settings => println!("credentials saved but incomplete; view: settings"),
    }
    Ok(())
}

async fn logout(client: &mut BridgeClient) -> Result<(), ClientError> {
    client.clear_credentials().await?;
    println!("credentials cleared; view: settings");
    Ok(())
}

async fn status(client: &mut BridgeClient) -> Result<(), ClientError> {
    client.ping().await?;
    let creds = client.get_credentials().await?;
    println!("control process: up");
    match &creds {
        Some(c) => println!("credentials: stored for {}", c.server_url),
        None => println!("credentials: none"),
    }
    match routing::decide(creds.as_ref()) {
        Route::Dashboard => println!("view: dashboard"),
        Route::Settings => println!("view: settings"),
    }
    Ok(())
}

async fn api(
    client: &mut BridgeClient,
    endpoint: String,
    method: String,
) -> Result<(), ClientError> {
    let options = RequestOptions {
        method,
        ..RequestOptions::default()
    };
    let body = client.fetch_api(endpoint, options).await?;
    println!("{}", serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string()));
    Ok(())
}

async fn ping(client: &mut BridgeClient) -> Result<(), ClientError> {
    client.ping().await?;
    println!("pong");
    Ok(())
}

fn print_view(view: &CaptureView) {
    println!(
        "{}  ({}, thumbnail {})",
        view.name,
        approx_size(&view.full_data),
        approx_size(&view.thumbnail)
    );
    println!("  {}", view.storage_path);
}

/// Decoded size of a base64 data URI, human readable.
fn approx_size(data_uri: &str) -> String {
    let payload = data_uri.rsplit(',').next().unwrap_or("").len();
    let bytes = payload * 3 / 4;
    if bytes >= 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}
