//! snipreplay: inspect and replay precomputed trajectory folders.
//!
//! - `inspect` -- list every episode folder with its sampling interval, shape,
//!   and how it would split for a given snip length
//! - `replay`  -- walk a full sampled run and summarise each episode

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use snipreplay::episode::loader::{points_per_snip, read_trajectory, DATA_FILE, METADATA_FILE};
use snipreplay::episode::source::list_episode_folders;
use snipreplay::episode::EpisodeMetadata;
use snipreplay::observe::OrderParameter;
use snipreplay::{ObservationAssembler, ReplayConfig, SnipCursor};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// Replay precomputed simulation trajectories as snips.
#[derive(Parser)]
#[command(name = "snipreplay", version, about)]
struct Cli {
    /// Path to a JSON replay configuration (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the episode folders under a root directory.
    Inspect {
        /// Root directory holding one folder per episode.
        #[arg(long)]
        folder: PathBuf,

        /// Snip length to check every episode against.
        #[arg(long)]
        sniplen: Option<f64>,
    },

    /// Replay a sampled set of episodes until the data is exhausted.
    Replay {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// Walk raw snips instead of history-stacked observations.
        #[arg(long)]
        snips: bool,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Args)]
struct ConfigOverrides {
    #[arg(long)]
    folder: Option<PathBuf>,
    #[arg(long)]
    nepisodes: Option<usize>,
    #[arg(long)]
    sniplen: Option<f64>,
    #[arg(long)]
    history_len: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
}

impl ConfigOverrides {
    fn apply(self, config: &mut ReplayConfig) {
        if let Some(folder) = self.folder {
            config.folder = folder;
        }
        if let Some(n) = self.nepisodes {
            config.nepisodes = n;
        }
        if let Some(s) = self.sniplen {
            config.sniplen = s;
        }
        if let Some(h) = self.history_len {
            config.history_len = h;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ReplayConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ReplayConfig::default(),
    };

    match cli.command {
        Commands::Inspect { folder, sniplen } => cmd_inspect(&folder, sniplen),
        Commands::Replay { overrides, snips } => {
            overrides.apply(&mut config);
            if snips {
                cmd_replay_snips(&config)
            } else {
                cmd_replay(&config)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_inspect(root: &Path, sniplen: Option<f64>) -> Result<()> {
    let folders = list_episode_folders(root)
        .with_context(|| format!("Failed to list episodes in {}", root.display()))?;

    println!("Training folder: {}", root.display());
    println!("  Episodes: {}", folders.len());
    println!();

    for folder in &folders {
        let name = folder.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        match inspect_episode(folder, sniplen) {
            Ok(line) => println!("  {name}: {line}"),
            Err(e) => println!("  {name}: ERROR {e:#}"),
        }
    }
    Ok(())
}

fn inspect_episode(folder: &Path, sniplen: Option<f64>) -> Result<String> {
    let meta = EpisodeMetadata::from_file(&folder.join(METADATA_FILE))?;
    let data = read_trajectory(&folder.join(DATA_FILE))?;
    let (channels, width) = data.dim();

    let mut line = format!("dt_save={} channels={channels} samples={width}", meta.dt_save);
    if let Some(sniplen) = sniplen {
        let pps = points_per_snip(sniplen, meta.dt_save, folder)?;
        line.push_str(&format!(
            " points_per_snip={pps} snips={} dropped={}",
            width / pps,
            width % pps
        ));
    }
    Ok(line)
}

fn cmd_replay(config: &ReplayConfig) -> Result<()> {
    tracing::info!(
        folder = %config.folder.display(),
        nepisodes = config.nepisodes,
        sniplen = config.sniplen,
        history_len = config.history_len,
        "Replaying observations"
    );

    let mut assembler = ObservationAssembler::from_config(config, OrderParameter)?;
    tracing::debug!(
        history_len = assembler.history_len(),
        episodes_queued = assembler.cursor().episodes_remaining(),
        "Assembler ready"
    );

    let mut episode = 0usize;
    let mut count = 0usize;
    let mut reward_sum = 0.0;
    loop {
        let obs = assembler.get_observation_and_reward()?;
        count += 1;
        reward_sum += obs.reward;
        if obs.episode_done {
            println!(
                "  episode {episode}: {count} observations, mean reward {:.4}",
                reward_sum / count as f64
            );
            episode += 1;
            count = 0;
            reward_sum = 0.0;
        }
        if obs.all_done {
            break;
        }
    }

    tracing::info!(episodes = episode, "Replay finished");
    Ok(())
}

fn cmd_replay_snips(config: &ReplayConfig) -> Result<()> {
    tracing::info!(folder = %config.folder.display(), "Replaying raw snips");

    let mut cursor = SnipCursor::from_config(config)?;
    tracing::debug!(episodes_queued = cursor.episodes_remaining(), "Cursor ready");
    let mut total = 0usize;
    let mut in_episode = 0usize;
    loop {
        let folder = cursor.current_folder().map(Path::to_path_buf);
        let data = cursor.get_data_snip()?;
        total += 1;
        in_episode += 1;
        if data.episode_done {
            let name = folder.as_deref().map(Path::display);
            match name {
                Some(name) => println!("  {name}: {in_episode} snips of shape {:?}", data.snip.dim()),
                None => println!("  {in_episode} snips"),
            }
            in_episode = 0;
        }
        if data.all_done {
            break;
        }
    }

    tracing::info!(snips = total, episodes = cursor.episodes_started(), "Replay finished");
    Ok(())
}
