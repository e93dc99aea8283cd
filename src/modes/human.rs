use anyhow::{Context, Result};
use crossterm::{
    event::{Event, EventStream, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{Stderr, stderr};
use std::time::Duration;
use tokio::time::interval;

use crate::game::{GameConfig, GameEngine, Phase, Session, Transition};
use crate::input::InputHandler;
use crate::metrics::{format_duration, GameMetrics};
use crate::render::{Overlay, Renderer, Scene};

const CONTROLS: &[(&str, &str)] = &[
    ("Space/↑/W", "flap"),
    ("Enter", "select"),
    ("R", "restart"),
    ("Esc", "quit"),
];

pub struct HumanMode {
    session: Session,
    metrics: GameMetrics,
    renderer: Renderer,
    input_handler: InputHandler,
    frame_interval: Duration,
    should_quit: bool,
}

impl HumanMode {
    pub fn new(config: GameConfig) -> Self {
        let renderer = Renderer::new(&config);
        let frame_interval = Duration::from_millis(config.frame_millis());

        Self {
            session: Session::new(GameEngine::new(config)),
            metrics: GameMetrics::new(),
            renderer,
            input_handler: InputHandler::new(),
            frame_interval,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stderr = stderr();
        execute!(stderr, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stderr);
        let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;
        terminal.hide_cursor().context("Failed to hide cursor")?;
        terminal.clear().context("Failed to clear terminal")?;

        // Run game loop with cleanup
        let result = self.run_game_loop(&mut terminal).await;

        // Cleanup terminal
        self.cleanup_terminal(&mut terminal)?;

        log::info!(
            "Session over: {} attempts, high score {}, {} flown",
            self.metrics.attempts,
            self.metrics.high_score,
            format_duration(self.metrics.total_time())
        );

        result
    }

    async fn run_game_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stderr>>,
    ) -> Result<()> {
        let mut event_stream = EventStream::new();

        // One tick per frame; the terminal is drawn after each update
        let mut frame_timer = interval(self.frame_interval);

        loop {
            tokio::select! {
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        self.handle_event(event);
                    }
                }

                _ = frame_timer.tick() => {
                    self.update_game();
                    terminal.draw(|frame| {
                        let state = self.session.state();
                        self.renderer.render(
                            frame,
                            &Scene::from_state(state),
                            &self.hud(),
                            self.overlay(),
                            CONTROLS,
                        );
                    }).context("Failed to draw frame")?;
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

    fn handle_event(&mut self, event: Event) {
        if let Event::Key(key) = event {
            // Only process key press events, not release
            if key.kind != KeyEventKind::Press {
                return;
            }

            let Some(input) = self.input_handler.handle_key_event(key).session_input() else {
                return;
            };

            let was_playing = self.session.phase() == Phase::Playing;
            if self.session.handle_input(input) == Transition::Exit {
                self.should_quit = true;
            } else if !was_playing && self.session.phase() == Phase::Playing {
                self.metrics.on_game_start();
            }
        }
    }

    fn update_game(&mut self) {
        if let Some(result) = self.session.tick() {
            if result.terminated {
                let state = self.session.state();
                log::debug!(
                    "Crashed into {:?} with score {}",
                    state.collision,
                    state.score
                );
                self.metrics.on_game_over(state.score, state.frames);
            }
        }
        self.metrics.update();
    }

    fn hud(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Score", self.session.state().score.to_string()),
            ("High", self.metrics.high_score.to_string()),
            ("Time", self.metrics.format_time()),
        ]
    }

    fn overlay(&self) -> Overlay {
        let score = self.session.state().score;
        match self.session.phase() {
            Phase::Playing => Overlay::None,
            Phase::GameOver { .. } => Overlay::GameOver { score },
            Phase::Menu { selected } => Overlay::Menu { selected, score },
        }
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
