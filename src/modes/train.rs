//! Training mode for NEAT controllers
//!
//! Evolves a population of flappy-bird controllers, prints progress per
//! generation and saves the best genome when the run ends. With rendering
//! enabled the shared simulation is drawn at the game's frame rate.
//!
//! # Example
//!
//! ```rust,ignore
//! use flappy_neat::modes::{TrainConfig, TrainMode};
//! use std::path::PathBuf;
//!
//! let config = TrainConfig::new(50, PathBuf::from("models/winner.json"));
//! let mut train_mode = TrainMode::new(config)?;
//! train_mode.run()?;
//! ```

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::evolve::{
    save_genome, validate_controller, FitnessHarness, FrameSink, FrameView, ModelMetadata,
    TrainingProgress,
};
use crate::game::{GameConfig, GameEngine};
use crate::input::{InputHandler, KeyAction};
use crate::metrics::TrainingStats;
use crate::neat::{Genome, LogReporter, NeatConfig, Population};
use crate::render::{Overlay, Renderer, Scene};

use super::pacer::FramePacer;

const CONTROLS: &[(&str, &str)] = &[("Q/Esc", "stop and save")];

/// Configuration for training mode
#[derive(Debug, Clone)]
pub struct TrainConfig {
    /// Number of generations to evolve
    pub generations: u32,

    /// Path to save the best genome
    pub save_path: PathBuf,

    /// Draw every frame in the terminal
    pub render: bool,

    /// Seed for both the population and the pipe gaps
    pub seed: Option<u64>,

    /// Cap on the length of a single generation, in frames
    pub max_frames: Option<u64>,

    /// Rolling window of the progress statistics, in generations
    pub stats_window: usize,

    pub game_config: GameConfig,

    pub neat_config: NeatConfig,
}

impl TrainConfig {
    /// Create a training configuration with default game and NEAT settings
    pub fn new(generations: u32, save_path: PathBuf) -> Self {
        Self {
            generations,
            save_path,
            render: false,
            seed: None,
            max_frames: None,
            stats_window: 10,
            game_config: GameConfig::default(),
            neat_config: NeatConfig::default(),
        }
    }
}

/// Training mode for NEAT controllers
pub struct TrainMode {
    population: Population,
    harness: FitnessHarness,
    stats: TrainingStats,
    progress: TrainingProgress,
    config: TrainConfig,
    quit: Arc<AtomicBool>,
}

impl TrainMode {
    pub fn new(config: TrainConfig) -> Result<Self> {
        config
            .game_config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid game config: {}", e))?;
        validate_controller(&config.neat_config.genome)
            .map_err(|e| anyhow::anyhow!("Invalid NEAT config: {}", e))?;

        let mut population = Population::new(config.neat_config.clone(), config.seed)
            .context("Failed to create population")?;
        population.add_reporter(Box::new(LogReporter::new(true)));

        let engine = match config.seed {
            Some(seed) => GameEngine::with_seed(config.game_config.clone(), seed),
            None => GameEngine::new(config.game_config.clone()),
        };

        Ok(Self {
            population,
            harness: FitnessHarness::new(engine, config.max_frames),
            stats: TrainingStats::new(config.stats_window),
            progress: TrainingProgress::default(),
            config,
            quit: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Setting the returned flag stops training after the current frame
    pub fn quit_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.quit)
    }

    /// Run the training loop and save the best genome found
    pub fn run(&mut self) -> Result<Genome> {
        self.print_header();

        let mut sink = TrainSink::new(Arc::clone(&self.quit));
        if self.config.render {
            sink.attach_terminal(&self.config.game_config)?;
        }

        let result = self.evolve(&mut sink);
        sink.detach_terminal()?;
        let best = result?;

        self.save_model(&best)?;
        self.print_summary(&best);

        Ok(best)
    }

    fn evolve(&mut self, sink: &mut dyn FrameSink) -> Result<Genome> {
        let harness = &mut self.harness;
        let stats = &mut self.stats;
        let progress = &mut self.progress;
        let generations = self.config.generations;
        let quiet = self.config.render;

        self.population.run(
            |genomes: &mut [Genome], config: &NeatConfig| {
                let report = harness.evaluate(genomes, config, *progress, &mut *sink)?;
                *progress = report.progress;
                stats.record_generation(&report);

                if !quiet {
                    println!(
                        "[Generation {}/{}] {}",
                        report.progress.generation,
                        generations,
                        stats.format_summary()
                    );
                }
                if report.flow.is_break() {
                    log::info!("Training stopped by user");
                }

                Ok(report.flow)
            },
            Some(generations),
        )
    }

    fn save_model(&self, best: &Genome) -> Result<()> {
        let metadata = ModelMetadata::new(
            self.config.neat_config.genome.clone(),
            self.progress.generation,
            best.fitness,
            self.progress.best_score,
        );

        save_genome(best, &metadata, &self.config.save_path).with_context(|| {
            format!("Failed to save best genome to {:?}", self.config.save_path)
        })
    }

    fn print_header(&self) {
        let neat = &self.config.neat_config;
        println!("{}", "=".repeat(70));
        println!("NEAT Training - Flappy Bird");
        println!("{}", "=".repeat(70));
        println!("Generations: {}", self.config.generations);
        println!("Population: {}", neat.neat.pop_size);
        println!("Fitness threshold: {}", neat.neat.fitness_threshold);
        println!(
            "Network: {} inputs, {} outputs, {:?} activation",
            neat.genome.num_inputs, neat.genome.num_outputs, neat.genome.activation_default
        );
        println!(
            "Compatibility threshold: {}",
            neat.species_set.compatibility_threshold
        );
        match self.config.max_frames {
            Some(max) => println!("Frame cap: {} per generation", max),
            None => println!("Frame cap: none"),
        }
        if let Some(seed) = self.config.seed {
            println!("Seed: {}", seed);
        }
        println!("Save path: {:?}", self.config.save_path);
        println!("{}", "=".repeat(70));
        println!();
    }

    fn print_summary(&self, best: &Genome) {
        println!("\nTraining complete!");
        println!("Best genome saved to: {:?}", self.config.save_path);
        println!("\nFinal Statistics:");
        println!("{}", self.stats.format_summary());
        println!(
            "Best genome: {} (fitness {:.2}, {:?} nodes/connections)",
            best.key,
            best.fitness_or_min(),
            best.size()
        );
        println!("Species: {}", self.population.species().len());
    }
}

/// Frame observer of a training run: honours the quit flag and, when a
/// terminal is attached, draws each frame and reads the keyboard
struct TrainSink {
    quit: Arc<AtomicBool>,
    view: Option<TerminalView>,
}

struct TerminalView {
    terminal: Terminal<CrosstermBackend<Stderr>>,
    renderer: Renderer,
    input_handler: InputHandler,
    pacer: FramePacer,
}

impl TrainSink {
    fn new(quit: Arc<AtomicBool>) -> Self {
        Self { quit, view: None }
    }

    fn attach_terminal(&mut self, config: &GameConfig) -> Result<()> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        self.view = Some(TerminalView {
            terminal,
            renderer: Renderer::new(config),
            input_handler: InputHandler::new(),
            pacer: FramePacer::new(config.frames_per_second),
        });
        Ok(())
    }

    fn detach_terminal(&mut self) -> Result<()> {
        if let Some(mut view) = self.view.take() {
            disable_raw_mode().context("Failed to disable raw mode")?;
            execute!(view.terminal.backend_mut(), LeaveAlternateScreen)
                .context("Failed to leave alternate screen")?;
            view.terminal.show_cursor().context("Failed to show cursor")?;
        }
        Ok(())
    }
}

impl TerminalView {
    /// Drain pending key presses; true when the user asked to stop
    fn poll_quit(&self) -> Result<bool> {
        while event::poll(Duration::ZERO).context("Failed to poll terminal events")? {
            if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if matches!(
                    self.input_handler.handle_key_event(key),
                    KeyAction::Quit | KeyAction::Exit
                ) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn draw(&mut self, view: &FrameView<'_>) -> Result<()> {
        let alive = view.contestants.iter().filter(|c| c.alive).count();
        let hud = [
            ("Score", view.score.to_string()),
            ("Alive", format!("{}/{}", alive, view.population)),
            ("Gen", view.generation.to_string()),
            ("Frame", view.frame.to_string()),
        ];

        let renderer = &self.renderer;
        self.terminal
            .draw(|frame| {
                renderer.render(frame, &Scene::from_frame(view), &hud, Overlay::None, CONTROLS)
            })
            .context("Failed to draw frame")?;
        Ok(())
    }
}

impl FrameSink for TrainSink {
    fn on_frame(&mut self, view: &FrameView<'_>) -> Result<ControlFlow<()>> {
        if self.quit.load(Ordering::Relaxed) {
            return Ok(ControlFlow::Break(()));
        }

        if let Some(terminal) = self.view.as_mut() {
            if terminal.poll_quit()? {
                self.quit.store(true, Ordering::Relaxed);
                return Ok(ControlFlow::Break(()));
            }
            terminal.draw(view)?;
            terminal.pacer.wait();
        }

        Ok(ControlFlow::Continue(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_config(save_path: PathBuf, generations: u32) -> TrainConfig {
        let mut config = TrainConfig::new(generations, save_path);
        config.seed = Some(7);
        config.max_frames = Some(200);
        config.neat_config.neat.pop_size = 10;
        config
    }

    #[test]
    fn test_train_config_creation() {
        let config = TrainConfig::new(50, PathBuf::from("winner.json"));
        assert_eq!(config.generations, 50);
        assert_eq!(config.save_path, PathBuf::from("winner.json"));
        assert!(!config.render);
        assert!(config.max_frames.is_none());
    }

    #[test]
    fn test_invalid_game_config_rejected() {
        let mut config = TrainConfig::new(1, PathBuf::from("winner.json"));
        config.game_config.frames_per_second = 0;
        assert!(TrainMode::new(config).is_err());
    }

    #[test]
    fn test_input_count_must_match_observation() {
        let mut config = TrainConfig::new(1, PathBuf::from("winner.json"));
        config.neat_config.genome.num_inputs = 2;
        assert!(config.neat_config.validate().is_ok());

        let err = TrainMode::new(config).err().unwrap();
        assert!(err.to_string().contains("inputs"), "{err}");
    }

    #[test]
    fn test_short_run_saves_best_genome() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("models").join("winner.json");

        let mut train_mode = TrainMode::new(small_config(save_path.clone(), 2)).unwrap();
        let best = train_mode.run().unwrap();

        assert!(best.fitness.is_some());
        assert!(save_path.exists());
        assert!(save_path.with_extension("meta.json").exists());
        assert_eq!(train_mode.stats.total_generations(), 2);
        assert_eq!(train_mode.progress.generation, 2);
    }

    #[test]
    fn test_quit_flag_stops_after_first_generation() {
        let temp_dir = TempDir::new().unwrap();
        let save_path = temp_dir.path().join("winner.json");

        let mut train_mode = TrainMode::new(small_config(save_path.clone(), 5)).unwrap();
        train_mode.quit_handle().store(true, Ordering::Relaxed);
        train_mode.run().unwrap();

        assert_eq!(train_mode.stats.total_generations(), 1);
        // Stopping still saves the best genome so far
        assert!(save_path.exists());
    }
}
