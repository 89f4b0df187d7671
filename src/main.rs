use std::env;
use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use padview::constants::{CHANGES_BUFFER, DEFAULT_LISTEN_ADDR};
use padview::gamepad::reader;
use padview::hub::{self, broadcast};
use padview::server::{self, AppState};

#[derive(Parser)]
#[command(name = "padview", about = "Stream live gamepad input to the browser")]
struct Args {
    /// Address to serve the frontend and WebSocket endpoint on
    #[arg(long, default_value = DEFAULT_LISTEN_ADDR)]
    listen: String,
    /// Directory containing the static frontend assets
    #[arg(long, default_value = "frontend")]
    frontend: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let log_level = match env::var("LOG_LEVEL") {
        Ok(value) => value,
        Err(_) => "info".to_string(),
    };
    env::set_var("RUST_LOG", log_level);
    env_logger::init();
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    log::info!("Starting padview v{}", VERSION);

    let args = Args::parse();

    // Joystick polling runs on its own thread; everything downstream
    // hangs off its change channel.
    let token = CancellationToken::new();
    let (changes_tx, changes_rx) = mpsc::channel(CHANGES_BUFFER);
    let (reader_handle, reader_thread) = reader::spawn(changes_tx, token.clone())?;

    let (hub_handle, hub_backend) = hub::new();
    tokio::spawn(hub_backend.run());

    let (broadcaster_handle, broadcaster_backend) = broadcast::new(hub_handle.clone(), changes_rx);
    tokio::spawn(broadcaster_backend.run());

    let state = AppState {
        hub: hub_handle,
        broadcaster: broadcaster_handle,
        reader: reader_handle,
    };
    let router = server::router(state, args.frontend);
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    log::info!("Serving on http://{}", args.listen);
    let http_server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            log::error!("HTTP server error: {e}");
        }
    });

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    token.cancel();

    // Device handles must not outlive the polling thread; wait for it
    // to close them before declaring the device subsystem stopped.
    let reader_result = tokio::task::spawn_blocking(move || reader_thread.join()).await?;
    if reader_result.is_err() {
        log::error!("Joystick reader thread panicked");
    }

    http_server.abort();
    log::info!("padview stopped");

    Ok(())
}
