// # extdnsd - external-dns webhook daemon for OpenWrt
//
// Thin integration layer: reads configuration from environment variables,
// initializes tracing, builds the OpenWrt provider and serves the webhook
// HTTP API until SIGTERM/SIGINT.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Webhook server
// - `EXTDNS_LISTEN_PORT`: webhook listen port (default 8888)
// - `EXTDNS_HEALTH_PATH`: health endpoint path (default /ping)
// - `EXTDNS_SHUTDOWN_TIMEOUT_SECS`: drain period on shutdown (default 5)
// - `EXTDNS_LOG_LEVEL`: trace|debug|info|warn|error (default info)
//
// ### OpenWrt router
// - `EXTDNS_OPENWRT_HOSTNAME`: router hostname (required)
// - `EXTDNS_OPENWRT_PORT`: LuCI RPC port (default 443)
// - `EXTDNS_OPENWRT_SSL`: use https toward the router (default true)
// - `EXTDNS_OPENWRT_RPC_ID`: JSON-RPC envelope id (default 1)
// - `EXTDNS_OPENWRT_TIMEOUT_SECS`: connect/keep-alive timeout (default 15)
// - `EXTDNS_OPENWRT_INSECURE_SKIP_VERIFY`: skip TLS verification (default false)
// - `EXTDNS_OPENWRT_USERNAME`: LuCI login username
// - `EXTDNS_OPENWRT_PASSWORD`: LuCI login password
//
// ## Example
//
// ```bash
// export EXTDNS_OPENWRT_HOSTNAME=192.168.1.1
// export EXTDNS_OPENWRT_USERNAME=root
// export EXTDNS_OPENWRT_PASSWORD=secret
// export EXTDNS_OPENWRT_INSECURE_SKIP_VERIFY=true
//
// extdnsd
// ```

mod webhook;

use anyhow::{Context, Result};
use extdns_provider_openwrt::{LuciConfig, OpenWrtProvider};
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    listen_port: u16,
    health_path: String,
    shutdown_timeout_secs: u64,
    log_level: String,
    openwrt: LuciConfig,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let defaults = LuciConfig::default();

        Ok(Self {
            listen_port: env_parse("EXTDNS_LISTEN_PORT", 8888)?,
            health_path: env_var("EXTDNS_HEALTH_PATH").unwrap_or_else(|| "/ping".to_string()),
            shutdown_timeout_secs: env_parse("EXTDNS_SHUTDOWN_TIMEOUT_SECS", 5)?,
            log_level: env_var("EXTDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            openwrt: LuciConfig {
                hostname: env_var("EXTDNS_OPENWRT_HOSTNAME").unwrap_or_default(),
                port: env_parse("EXTDNS_OPENWRT_PORT", defaults.port)?,
                ssl: env_parse("EXTDNS_OPENWRT_SSL", defaults.ssl)?,
                rpc_id: env_parse("EXTDNS_OPENWRT_RPC_ID", defaults.rpc_id)?,
                timeout_secs: env_parse("EXTDNS_OPENWRT_TIMEOUT_SECS", defaults.timeout_secs)?,
                insecure_skip_verify: env_parse(
                    "EXTDNS_OPENWRT_INSECURE_SKIP_VERIFY",
                    defaults.insecure_skip_verify,
                )?,
                username: env_var("EXTDNS_OPENWRT_USERNAME").unwrap_or_default(),
                password: env_var("EXTDNS_OPENWRT_PASSWORD").unwrap_or_default(),
            },
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.openwrt
            .validate()
            .context("invalid OpenWrt settings (EXTDNS_OPENWRT_*)")?;

        if !self.health_path.starts_with('/') {
            anyhow::bail!(
                "EXTDNS_HEALTH_PATH must start with '/'. Got: {}",
                self.health_path
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "EXTDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        Ok(())
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Read an environment variable, treating empty values as unset
fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Parse an environment variable, falling back to a default when unset
fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match env_var(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{name} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e:#}");
        return DaemonExitCode::ConfigError.into();
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    info!("starting extdnsd");
    info!(router = %config.openwrt.hostname, "configuration loaded");

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {e}");
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_server(config).await {
            error!("daemon error: {e:#}");
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Serve the webhook API until a termination signal arrives
async fn run_server(config: Config) -> Result<()> {
    let provider = OpenWrtProvider::new(config.openwrt.clone())?;
    let app = webhook::router(Arc::new(provider), &config.health_path);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "starting http server");

    let (drained_tx, drained_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("received shutdown signal: {signal}"),
            Err(e) => error!("shutdown signal error: {e}"),
        }
        let _ = drained_tx.send(());
    });

    // Bound the drain period so lingering connections cannot hang shutdown
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    tokio::select! {
        result = server => result?,
        _ = async {
            let _ = drained_rx.await;
            tokio::time::sleep(shutdown_timeout).await;
        } => warn!("graceful shutdown timed out"),
    }

    info!("http server stopped");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGTERM handler: {e}"))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to setup SIGINT handler: {e}"))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to wait for CTRL-C: {e}"))?;
    Ok("SIGINT")
}
