/// What the bird does on a given frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Flap before this frame's physics step
    Jump,
    /// Let gravity do its work
    #[default]
    Idle,
}

impl Action {
    /// Interpret a controller output: jump when it exceeds `threshold`
    pub fn from_output(output: f64, threshold: f64) -> Self {
        if output > threshold {
            Action::Jump
        } else {
            Action::Idle
        }
    }
}

impl From<bool> for Action {
    fn from(jump: bool) -> Self {
        if jump {
            Action::Jump
        } else {
            Action::Idle
        }
    }
}
