use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

mod config;
mod fritz;

use fritz::{ProfileController, ProfileFormState, ReqwestTransport, TimeWindow};

/// FRITZ!Box profile switcher
///
/// Inspects and changes the internet-access time window of the access
/// profiles a FRITZ!Box router applies to the devices in a household.
#[derive(Parser, Debug)]
#[command(name = "fritz-profiles")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Hostname or URL of the FRITZ!Box
    #[arg(long, global = true)]
    host: Option<String>,

    /// Login user name
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Login password
    #[arg(
        short,
        long,
        global = true,
        env = "FRITZBOX_PASSWORD",
        hide_env_values = true
    )]
    password: Option<String>,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the profiles known to the device
    List,
    /// Show the current state of a profile
    Get {
        /// Profile name as shown in the admin console
        profile: String,
    },
    /// Switch a profile's internet time window
    Set {
        /// Profile name as shown in the admin console
        profile: String,

        /// New time window
        window: TimeWindow,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let file = config::load(args.config.as_deref())?;
    let settings =
        config::Settings::resolve(file, args.host.clone(), args.user.clone(), args.password.clone(), args.timeout)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let transport = Arc::new(ReqwestTransport::new(settings.timeout)?);
        let mut controller = ProfileController::connect(
            transport,
            settings.url.clone(),
            &settings.user,
            &settings.password,
        )
        .await
        .with_context(|| format!("Failed to connect to the FRITZ!Box at {}", settings.url))?;

        match args.command {
            Commands::List => {
                let profiles = controller.list_profiles().await?;
                print_profiles(&profiles, args.json)
            }
            Commands::Get { profile } => {
                let state = controller.get_state(&profile).await?;
                print_state(&state, args.json)
            }
            Commands::Set { profile, window } => {
                controller.set_state(&profile, window).await?;
                println!("✓ Profile {profile:?} switched to {window}");
                Ok(())
            }
        }
    })
}

/// Initialize logging
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn print_profiles(profiles: &BTreeMap<String, String>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(profiles)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No profiles found");
        return Ok(());
    }

    for (name, id) in profiles {
        println!("{id:>4}  {name}");
    }

    Ok(())
}

fn print_state(state: &ProfileFormState, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }

    println!("Time window:   {}", state.time_window);
    println!(
        "Parental lock: {}",
        if state.parental == Some(true) { "on" } else { "off" }
    );
    println!(
        "Guest blocked: {}",
        if state.disallow_guest == Some(true) { "on" } else { "off" }
    );
    if let Some(filter) = state.filter_type {
        println!("Filter type:   {filter}list");
    }

    Ok(())
}
