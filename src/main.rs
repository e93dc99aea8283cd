use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use flappy_neat::game::GameConfig;
use flappy_neat::modes::{HumanMode, TrainConfig, TrainMode, VisualizeMode};
use flappy_neat::neat::NeatConfig;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

#[derive(Parser)]
#[command(name = "flappy_neat")]
#[command(version, about = "Flappy Bird in the terminal, playable by hand or evolved with NEAT")]
struct Cli {
    /// Game mode
    #[arg(long, default_value = "human")]
    mode: Mode,

    /// NEAT settings file (YAML); built-in defaults are used when it is missing
    #[arg(long, default_value = "config/neat.yaml")]
    config: PathBuf,

    /// Generations to evolve (train mode)
    #[arg(long, default_value = "50")]
    generations: u32,

    /// Where the best genome is saved (train mode)
    #[arg(long, default_value = "models/winner.json")]
    save_path: PathBuf,

    /// Saved genome to replay (visualize mode)
    #[arg(long, default_value = "models/winner.json")]
    model: PathBuf,

    /// Draw the training simulation in the terminal
    #[arg(long)]
    render: bool,

    /// Seed for reproducible training runs
    #[arg(long)]
    seed: Option<u64>,

    /// Cap on frames per generation (train mode)
    #[arg(long)]
    max_frames: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Play with keyboard controls
    Human,
    /// Evolve controllers with NEAT
    Train,
    /// Watch a saved controller play
    Visualize,
}

fn load_neat_config(path: &Path) -> Result<NeatConfig> {
    if path.exists() {
        NeatConfig::from_file(path)
            .with_context(|| format!("Failed to load NEAT config from {:?}", path))
    } else {
        log::warn!("{:?} not found, using default NEAT settings", path);
        Ok(NeatConfig::default())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Terminal front-ends only log warnings so the TUI stays intact
    let default_filter = if cli.mode == Mode::Train && !cli.render {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let game_config = GameConfig::default();

    match cli.mode {
        Mode::Human => {
            let mut human_mode = HumanMode::new(game_config);
            human_mode.run().await?;
        }
        Mode::Train => {
            let mut config = TrainConfig::new(cli.generations, cli.save_path);
            config.render = cli.render;
            config.seed = cli.seed;
            config.max_frames = cli.max_frames;
            config.game_config = game_config;
            config.neat_config = load_neat_config(&cli.config)?;

            let mut train_mode = TrainMode::new(config)?;

            let quit = train_mode.quit_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    quit.store(true, Ordering::Relaxed);
                }
            });

            train_mode.run()?;
        }
        Mode::Visualize => {
            let mut visualize_mode = VisualizeMode::new(&cli.model, game_config)?;
            visualize_mode.run().await?;
        }
    }

    Ok(())
}
