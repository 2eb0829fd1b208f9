//! Lumo Binder - Obtain listening sockets from a privileged bind broker and serve on them.

use std::env;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::process::ExitCode;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lumo_binder::config::Settings;
use lumo_binder::{BinderClient, BinderError};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");
const DEFAULT_CONFIG_PATH: &str = "/etc/lumo/binder.toml";

fn main() -> ExitCode {
    // Parse command line arguments (simple std::env approach)
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let settings = match load_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging based on configuration
    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting {} v{}", NAME, VERSION);
    info!("Broker socket: {}", settings.broker.socket_path.display());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Binder failed");
            ExitCode::FAILURE
        }
    }
}

/// Async main function.
async fn async_main(settings: Settings) -> Result<(), BinderError> {
    let client = BinderClient::from_config(&settings.broker)?;
    debug!(id = %client.id(), "Client created");

    if settings.serve.listeners.is_empty() {
        warn!("No listeners configured, nothing to do");
        return Ok(());
    }

    for address in &settings.serve.listeners {
        let listener = client.bind_listener(address).await?;
        let fd = listener.as_raw_fd();

        // Already bound and listening; only needs to join the runtime.
        listener.set_nonblocking(true).map_err(BinderError::Runtime)?;
        let listener = TcpListener::from_std(listener).map_err(BinderError::Runtime)?;

        info!(address = %address, fd, "Listening");
        tokio::spawn(serve(listener, router(&settings.serve.message, fd), fd));
    }

    shutdown_signal().await;
    info!("Shutdown signal received, stopping");
    Ok(())
}

/// Routes served on every broker-provided listener.
///
/// `/` answers with the configured message and the listener's descriptor;
/// every other path gets the router's default 404.
fn router(message: &str, fd: RawFd) -> Router {
    let body = format!("{} ({})\n", message, fd);
    Router::new().route(
        "/",
        get(move || {
            let body = body.clone();
            async move { body }
        }),
    )
}

/// Serve HTTP on a broker-provided listener until the process exits.
async fn serve(listener: TcpListener, app: Router, fd: RawFd) {
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        warn!(fd, error = %e, "Listener stopped");
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Request listening sockets from a privileged bind broker and serve on them.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: {}]
    -s, --socket <PATH>    Broker socket path (overrides the config file)
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME, DEFAULT_CONFIG_PATH
    );
}

/// Get the value of a `--name <value>`, `-n <value>` or `--name=value` argument.
fn get_flag(args: &[String], long: &str, short: &str) -> Option<String> {
    let prefix = format!("{}=", long);
    for (i, arg) in args.iter().enumerate() {
        if (arg == long || arg == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(value) = arg.strip_prefix(&prefix) {
            return Some(value.to_string());
        }
    }
    None
}

/// Load settings from the config file and apply command line overrides.
///
/// A missing default config file is not an error; an explicit one is.
fn load_settings(args: &[String]) -> Result<Settings, BinderError> {
    let mut settings = match get_flag(args, "--config", "-c") {
        Some(path) => Settings::load(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => Settings::load(DEFAULT_CONFIG_PATH)?,
        None => Settings::default(),
    };

    if let Some(socket) = get_flag(args, "--socket", "-s") {
        settings.broker.socket_path = socket.into();
    }

    settings.validate()?;
    Ok(settings)
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            // Default to pretty format
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(())
}
