//! Playing / GameOver / Menu state machine for the human-playable game
//!
//! The session is driven by exactly one outer loop: the front-end feeds it inputs
//! as they arrive and calls [`Session::tick`] once per frame. No phase blocks.

use super::{
    action::Action,
    engine::{GameEngine, StepResult},
    state::GameState,
};

/// Entries of the game-over menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Restart,
    Exit,
}

impl MenuChoice {
    fn toggled(self) -> Self {
        match self {
            MenuChoice::Restart => MenuChoice::Exit,
            MenuChoice::Exit => MenuChoice::Restart,
        }
    }
}

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The bird is flying
    Playing,
    /// The attempt is over; the final frame is held for a moment
    GameOver { frames_left: u32 },
    /// Waiting for the player to restart or exit
    Menu { selected: MenuChoice },
}

/// Inputs the session understands, independent of the input device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// Flap while playing
    Flap,
    /// Move the menu cursor up (flaps while playing)
    Up,
    /// Move the menu cursor down
    Down,
    /// Activate the highlighted menu entry
    Confirm,
    /// Restart shortcut
    Restart,
    /// Exit shortcut (menu only)
    Exit,
    /// External quit signal, honoured in every phase
    Quit,
}

/// What the front-end should do after an input or tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    Exit,
}

pub struct Session {
    engine: GameEngine,
    state: GameState,
    phase: Phase,
    pending_jump: bool,
}

impl Session {
    pub fn new(mut engine: GameEngine) -> Self {
        let state = engine.reset();
        Self {
            engine,
            state,
            phase: Phase::Playing,
            pending_jump: false,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Apply an input event
    pub fn handle_input(&mut self, input: SessionInput) -> Transition {
        if input == SessionInput::Quit {
            return Transition::Exit;
        }

        match self.phase {
            Phase::Playing => {
                if matches!(input, SessionInput::Flap | SessionInput::Up) {
                    self.pending_jump = true;
                }
                Transition::Stay
            }
            Phase::GameOver { .. } => match input {
                SessionInput::Restart => {
                    self.restart();
                    Transition::Stay
                }
                SessionInput::Confirm | SessionInput::Exit => {
                    self.open_menu();
                    Transition::Stay
                }
                _ => Transition::Stay,
            },
            Phase::Menu { selected } => match input {
                SessionInput::Up | SessionInput::Down => {
                    self.phase = Phase::Menu {
                        selected: selected.toggled(),
                    };
                    Transition::Stay
                }
                SessionInput::Confirm => self.choose(selected),
                SessionInput::Restart => self.choose(MenuChoice::Restart),
                SessionInput::Exit => self.choose(MenuChoice::Exit),
                _ => Transition::Stay,
            },
        }
    }

    /// Advance one frame. Returns the step result while playing.
    pub fn tick(&mut self) -> Option<StepResult> {
        match self.phase {
            Phase::Playing => {
                let action = Action::from(std::mem::take(&mut self.pending_jump));
                let result = self.engine.step(&mut self.state, action);

                if result.terminated {
                    self.phase = Phase::GameOver {
                        frames_left: self.engine.config().game_over_hold_frames,
                    };
                }

                Some(result)
            }
            Phase::GameOver { frames_left } => {
                if frames_left <= 1 {
                    self.open_menu();
                } else {
                    self.phase = Phase::GameOver {
                        frames_left: frames_left - 1,
                    };
                }
                None
            }
            Phase::Menu { .. } => None,
        }
    }

    /// Start a fresh attempt; nothing carries over
    pub fn restart(&mut self) {
        self.state = self.engine.reset();
        self.phase = Phase::Playing;
        self.pending_jump = false;
    }

    fn open_menu(&mut self) {
        self.phase = Phase::Menu {
            selected: MenuChoice::Restart,
        };
    }

    fn choose(&mut self, choice: MenuChoice) -> Transition {
        match choice {
            MenuChoice::Restart => {
                self.restart();
                Transition::Stay
            }
            MenuChoice::Exit => Transition::Exit,
        }
    }
}
