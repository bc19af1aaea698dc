use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iptv_viewer::{
    app::IptvApp,
    config::Config,
    models::{Channel, StreamState, UNKNOWN_CHANNEL_NAME},
    playback::{ExternalPlayer, UnsupportedEngineFactory},
    sources::m3u::is_valid_stream_url,
};

#[derive(Parser)]
#[command(name = "iptv-viewer")]
#[command(version)]
#[command(about = "Browse IPTV playlists and play their channels")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Extra playlist URL or file to load (repeatable)
    #[arg(short, long = "playlist", value_name = "URL")]
    playlists: Vec<String>,

    /// Skip the default playlists from the configuration
    #[arg(long)]
    no_defaults: bool,

    /// Disable the playlist cache
    #[arg(long)]
    no_cache: bool,

    /// Player command (overrides config file)
    #[arg(long, value_name = "COMMAND")]
    player: Option<String>,

    /// Maximum playback retries (overrides config file)
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List channels, filtered and sorted by name
    List {
        /// Case-insensitive search over name, category and country
        #[arg(short, long, default_value = "")]
        query: String,

        /// Only show these categories (repeatable)
        #[arg(short = 'g', long = "category", value_name = "CATEGORY")]
        categories: Vec<String>,
    },
    /// Show categories with their channel counts
    Categories,
    /// Play a channel by list number, name, or stream URL
    Play {
        channel: String,

        /// Search applied before resolving a list number
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Check whether a stream URL answers a HEAD request
    Check { url: String },
    /// Remove expired entries from the playlist cache
    CacheCleanup,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("iptv_viewer={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting IPTV viewer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(player) = cli.player {
        config.player.command = player;
    }
    if let Some(max_retries) = cli.max_retries {
        config.player.max_retries = max_retries;
    }
    if cli.no_defaults {
        config.default_playlists.clear();
    }

    let app = IptvApp::from_config(config).await?;

    match &cli.command {
        Command::Check { url } => {
            let reachable = app.check_stream(url).await;
            println!("{}: {}", url, if reachable { "reachable" } else { "unreachable" });
            return Ok(());
        }
        Command::CacheCleanup => {
            if !app.cache().is_enabled() {
                println!("Playlist cache is disabled");
                return Ok(());
            }
            let removed = app.cache().cleanup().await;
            println!("Removed {removed} expired cache entries");
            return Ok(());
        }
        _ => {}
    }

    app.init().await;
    for playlist in &cli.playlists {
        if let Err(e) = app.add_playlist(playlist).await {
            warn!("Skipping playlist {}: {}", playlist, e);
        }
    }

    match cli.command {
        Command::List { query, categories } => {
            let channels = if categories.is_empty() {
                app.visible_channels(&query).await
            } else {
                let catalog = app.catalog().read().await;
                catalog
                    .filtered_channels(&query, &categories)
                    .into_iter()
                    .cloned()
                    .collect()
            };
            print_channels(&channels);
        }
        Command::Categories => {
            let catalog = app.catalog().read().await;
            for category in catalog.categories() {
                println!("{:<30} {:>6}", category, catalog.category_channel_count(&category));
            }
        }
        Command::Play { channel, query } => {
            let channel = resolve_channel(&app, &channel, &query).await?;
            play(&app, channel).await?;
        }
        Command::Check { .. } | Command::CacheCleanup => {}
    }

    println!("{}", app.status().message());
    println!("{}", app.status().metrics().summary());
    Ok(())
}

fn print_channels(channels: &[Channel]) {
    for (index, channel) in channels.iter().enumerate() {
        println!(
            "{:>5}  {:<40} {:<20} {:<4} {}",
            index + 1,
            channel.name,
            channel.category_or_general(),
            channel.country.as_deref().unwrap_or("-"),
            channel.url
        );
    }
}

/// Pick a channel by 1-based list number, exact or partial name, or raw URL
async fn resolve_channel(app: &IptvApp, selector: &str, query: &str) -> Result<Channel> {
    let channels = app.visible_channels(query).await;

    if let Ok(number) = selector.parse::<usize>()
        && let Some(channel) = number.checked_sub(1).and_then(|i| channels.get(i))
    {
        return Ok(channel.clone());
    }

    let wanted = selector.to_lowercase();
    if let Some(channel) = channels
        .iter()
        .find(|c| c.name.to_lowercase() == wanted)
        .or_else(|| channels.iter().find(|c| c.name.to_lowercase().contains(&wanted)))
    {
        return Ok(channel.clone());
    }

    if is_valid_stream_url(selector) {
        return Ok(Channel {
            name: UNKNOWN_CHANNEL_NAME.to_string(),
            url: selector.to_string(),
            logo: None,
            category: None,
            country: None,
            language: None,
            id: None,
        });
    }

    bail!("No channel matches '{selector}'")
}

/// Drive one playback session until it ends, fails for good, or Ctrl-C
async fn play(app: &IptvApp, channel: Channel) -> Result<()> {
    let surface = ExternalPlayer::from_config(&app.config().player);
    let (mut controller, mut events) =
        app.playback_controller(Arc::new(UnsupportedEngineFactory), Box::new(surface));

    println!("Playing {} ({})", channel.name, channel.url);
    controller.select_channel(channel);

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    if controller.run_until_settled(&mut events, interrupted).await == StreamState::Error {
        bail!("{}", app.status().message());
    }

    Ok(())
}
