//! Visualization mode for watching a trained controller
//!
//! Loads a saved genome and flies it as a single bird through the same world
//! the training harness uses. A crashed bird is replaced by a fresh attempt.
//!
//! # Controls
//!
//! - Space: Pause/unpause
//! - R: Reset attempt
//! - 1-4: Speed control (1=slow, 2=normal, 3=fast, 4=very fast)
//! - Q/Esc: Quit
//!
//! # Example
//!
//! ```rust,ignore
//! use flappy_neat::modes::VisualizeMode;
//! use flappy_neat::game::GameConfig;
//! use std::path::Path;
//!
//! let mut visualize_mode = VisualizeMode::new(Path::new("models/winner.json"), GameConfig::default())?;
//! visualize_mode.run().await?;
//! ```

use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{Stderr, stderr},
    path::Path,
    time::Duration,
};
use tokio::time::{Interval, interval};

use crate::evolve::{load_genome, GenerationRun, ModelMetadata};
use crate::game::{GameConfig, GameEngine};
use crate::input::{InputHandler, KeyAction};
use crate::neat::Genome;
use crate::render::{Overlay, Renderer, Scene};

const CONTROLS: &[(&str, &str)] = &[
    ("Space", "pause"),
    ("R", "reset"),
    ("1-4", "speed"),
    ("Q/Esc", "quit"),
];

/// Visualization speed settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualizationSpeed {
    /// Half the game's frame rate
    Slow,
    /// The game's frame rate
    Normal,
    /// Twice the frame rate
    Fast,
    /// Eight frames per normal tick
    VeryFast,
}

impl VisualizationSpeed {
    fn from_key(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Slow),
            2 => Some(Self::Normal),
            3 => Some(Self::Fast),
            4 => Some(Self::VeryFast),
            _ => None,
        }
    }

    /// Tick interval for a game running at `frame` per frame
    fn tick_interval(&self, frame: Duration) -> Duration {
        match self {
            Self::Slow => frame * 2,
            Self::Normal | Self::VeryFast => frame,
            Self::Fast => frame / 2,
        }
    }

    /// Frames simulated per tick
    fn frames_per_tick(&self) -> u32 {
        match self {
            Self::VeryFast => 8,
            _ => 1,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "Slow",
            Self::Normal => "Normal",
            Self::Fast => "Fast",
            Self::VeryFast => "Very Fast",
        }
    }
}

/// Visualization mode for watching trained controllers
pub struct VisualizeMode {
    genome: Genome,
    metadata: ModelMetadata,
    engine: GameEngine,
    run: GenerationRun,
    renderer: Renderer,
    input_handler: InputHandler,
    frame_duration: Duration,

    /// Whether to quit the visualization
    should_quit: bool,

    /// Whether playback is paused
    paused: bool,

    /// Current playback speed
    speed: VisualizationSpeed,

    /// Attempts completed
    attempts: u32,

    /// Best score over all attempts
    best_score: u32,
}

impl VisualizeMode {
    /// Load a saved genome and prepare the first attempt
    pub fn new(model_path: &Path, config: GameConfig) -> Result<Self> {
        let (genome, metadata) = load_genome(model_path)
            .with_context(|| format!("Failed to load model from {:?}", model_path))?;

        println!("{}", "=".repeat(60));
        println!("Loaded Genome Information");
        println!("{}", "=".repeat(60));
        println!("Model path: {:?}", model_path);
        println!("Genome: {} {:?}", genome.key, genome.size());
        println!("Generations trained: {}", metadata.generations);
        match metadata.fitness {
            Some(fitness) => println!("Fitness: {:.2}", fitness),
            None => println!("Fitness: --"),
        }
        println!("Best training score: {}", metadata.best_score);
        println!("Version: {}", metadata.version);
        println!("{}", "=".repeat(60));
        println!();

        Ok(Self::with_engine(genome, metadata, GameEngine::new(config)))
    }

    fn with_engine(genome: Genome, metadata: ModelMetadata, mut engine: GameEngine) -> Self {
        let run = GenerationRun::new(
            &mut engine,
            std::slice::from_ref(&genome),
            &metadata.genome_config,
        );
        let renderer = Renderer::new(engine.config());
        let frame_duration = Duration::from_millis(engine.config().frame_millis());

        Self {
            genome,
            metadata,
            engine,
            run,
            renderer,
            input_handler: InputHandler::new(),
            frame_duration,
            should_quit: false,
            paused: false,
            speed: VisualizationSpeed::Normal,
            attempts: 0,
            best_score: 0,
        }
    }

    /// Run the visualization loop
    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        let result = self.run_visualization_loop(&mut terminal).await;

        // Cleanup terminal
        self.cleanup_terminal(&mut terminal)?;

        result
    }

    async fn run_visualization_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();
        let mut tick_timer = interval(self.speed.tick_interval(self.frame_duration));

        loop {
            tokio::select! {
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        self.handle_event(event, &mut tick_timer);
                    }
                }

                _ = tick_timer.tick() => {
                    if !self.paused {
                        for _ in 0..self.speed.frames_per_tick() {
                            self.step_agent();
                        }
                    }
                    terminal.draw(|frame| self.render_frame(frame))
                        .context("Failed to draw frame")?;
                }

                _ = tokio::signal::ctrl_c() => {
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Advance one frame, starting a new attempt if the bird has crashed
    fn step_agent(&mut self) {
        if self.run.is_over() {
            self.reset_attempt();
        }

        self.run.step(&mut self.engine);

        if self.run.is_over() {
            self.attempts += 1;
            self.best_score = self.best_score.max(self.run.score());
            log::debug!(
                "Attempt {} ended after {} frames with score {}",
                self.attempts,
                self.run.frames(),
                self.run.score()
            );
        }
    }

    fn reset_attempt(&mut self) {
        self.run = GenerationRun::new(
            &mut self.engine,
            std::slice::from_ref(&self.genome),
            &self.metadata.genome_config,
        );
    }

    fn handle_event(&mut self, event: Event, tick_timer: &mut Interval) {
        if let Event::Key(key) = event {
            // Only process key press events
            if key.kind != KeyEventKind::Press {
                return;
            }

            match self.input_handler.handle_key_event(key) {
                KeyAction::Quit | KeyAction::Exit => {
                    self.should_quit = true;
                }
                KeyAction::Flap => {
                    self.paused = !self.paused;
                }
                KeyAction::Restart => {
                    if !self.run.is_over() {
                        self.attempts += 1;
                    }
                    self.reset_attempt();
                }
                KeyAction::Speed(n) => {
                    if let Some(speed) = VisualizationSpeed::from_key(n) {
                        self.change_speed(speed, tick_timer);
                    }
                }
                _ => {}
            }
        }
    }

    fn change_speed(&mut self, new_speed: VisualizationSpeed, tick_timer: &mut Interval) {
        self.speed = new_speed;
        *tick_timer = interval(self.speed.tick_interval(self.frame_duration));
    }

    fn render_frame(&self, frame: &mut ratatui::Frame) {
        let view = self.run.view(self.attempts + 1, 1);
        let hud = [
            ("Score", self.run.score().to_string()),
            ("Best", self.best_score.to_string()),
            ("Attempt", (self.attempts + 1).to_string()),
            ("Speed", self.speed.as_str().to_string()),
        ];
        let overlay = if self.paused {
            Overlay::Paused
        } else {
            Overlay::None
        };

        self.renderer
            .render(frame, &Scene::from_frame(&view), &hud, overlay, CONTROLS);
    }

    fn cleanup_terminal(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        disable_raw_mode().context("Failed to disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)
            .context("Failed to leave alternate screen")?;
        terminal.show_cursor().context("Failed to show cursor")?;
        Ok(())
    }
}
