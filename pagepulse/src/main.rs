//! pagepulse - anonymous page engagement telemetry relay
//!
//! This tool provides commands for:
//! - Serving the ingest endpoint and relaying events to the collector
//! - Checking the effective configuration
//! - Classifying a user agent the way the ingest endpoint would
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/pagepulse/config.toml (~/.config/pagepulse/config.toml)
//! - Logs: $XDG_STATE_HOME/pagepulse/ (~/.local/state/pagepulse/)

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pagepulse_core::config::RelayMode;
use pagepulse_core::server::{self, AppState};
use pagepulse_core::{browser_name, classify_device, is_bot, Config, RelayClient};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(name = "pagepulse")]
#[command(about = "Anonymous page engagement telemetry relay")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the ingest endpoint
    Serve {
        /// Address to bind (default: from config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show the effective configuration
    Status,

    /// Classify a user agent string
    Classify {
        /// User agent to classify
        user_agent: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Serve { bind } => {
            let config = Config::load().context("failed to load configuration")?;
            cmd_serve(config, bind).await
        }
        Command::Status => {
            let config = Config::load().context("failed to load configuration")?;
            cmd_status(&config)
        }
        Command::Classify { user_agent } => cmd_classify(&user_agent),
    }
}

async fn cmd_serve(config: Config, bind: Option<String>) -> Result<()> {
    let _log_guard = pagepulse_core::logging::init(&config.logging, true)
        .context("failed to initialize logging")?;

    let relay = RelayClient::new(&config.relay).context("failed to create relay client")?;
    tracing::info!(
        url = relay.url(),
        mode = ?config.relay.mode,
        environment = %config.tracking.environment,
        "pagepulse starting up"
    );

    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;

    let state = AppState::from_config(&config, Arc::new(relay));
    server::serve(listener, state)
        .await
        .context("ingest endpoint failed")?;
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    println!("pagepulse Configuration");
    println!("=======================");
    println!();
    println!("Config File:     {}", Config::config_path().display());
    println!("Log File:        {}", Config::log_path().display());
    println!();

    let tracking = &config.tracking;
    println!("Environment:     {}", tracking.environment);
    println!("Tracking:        {}", tracking.enabled);
    println!("Identity:        {}", on_off(tracking.assigns_identity()));
    println!("Bind:            {}", config.server.bind);
    println!();

    let relay = &config.relay;
    println!("Relay URL:       {}", relay.url);
    println!("Timeout:         {}s", relay.timeout_secs);
    println!("Organization:    {}", relay.organization);
    println!(
        "API Key:         {}",
        if relay.api_key.is_some() {
            "<set>"
        } else {
            "<not set>"
        }
    );
    println!(
        "Mode:            {}",
        match relay.mode {
            RelayMode::Await => "await",
            RelayMode::Detached => "detached",
        }
    );
    println!();

    println!("Campaign Param:  {}", config.identity.campaign_param);
    println!("Cookie Max Age:  {} days", config.identity.max_age_days);
    println!(
        "Auth Cookies:    {}",
        config.auth.session_cookie_prefixes.join(", ")
    );
    println!("Client Endpoint: {}", config.client.rest_url);
    println!("Throttle:        {}ms", config.client.throttle_window_ms);

    println!();
    match config.validate() {
        Ok(()) => println!("Status: Ready to relay"),
        Err(e) => println!("Status: Invalid configuration ({})", e),
    }

    Ok(())
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn cmd_classify(user_agent: &str) -> Result<()> {
    println!("Device:   {}", classify_device(user_agent));
    println!("Browser:  {}", browser_name(user_agent));
    println!("Bot:      {}", if is_bot(user_agent) { "yes" } else { "no" });
    Ok(())
}
