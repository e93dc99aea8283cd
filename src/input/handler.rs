use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::game::SessionInput;

/// Actions that can be triggered by keyboard input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Space: flap (pause in visualize mode)
    Flap,
    /// Up arrow or W
    Up,
    /// Down arrow or S
    Down,
    /// Enter
    Confirm,
    Restart,
    /// Q: leave the current screen
    Exit,
    /// Esc or Ctrl+C: quit from anywhere
    Quit,
    /// Number keys 1-4 select a playback speed
    Speed(u8),
    None,
}

impl KeyAction {
    /// The session input this key stands for, if any
    pub fn session_input(self) -> Option<SessionInput> {
        match self {
            KeyAction::Flap => Some(SessionInput::Flap),
            KeyAction::Up => Some(SessionInput::Up),
            KeyAction::Down => Some(SessionInput::Down),
            KeyAction::Confirm => Some(SessionInput::Confirm),
            KeyAction::Restart => Some(SessionInput::Restart),
            KeyAction::Exit => Some(SessionInput::Exit),
            KeyAction::Quit => Some(SessionInput::Quit),
            KeyAction::Speed(_) | KeyAction::None => None,
        }
    }
}

/// Handles keyboard input and converts it to key actions
#[derive(Debug, Default)]
pub struct InputHandler;

impl InputHandler {
    pub fn new() -> Self {
        Self
    }

    /// Convert a key event to a key action
    pub fn handle_key_event(&self, key: KeyEvent) -> KeyAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => KeyAction::Quit,
                _ => KeyAction::None,
            };
        }

        match key.code {
            KeyCode::Char(' ') => KeyAction::Flap,
            KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => KeyAction::Up,
            KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => KeyAction::Down,
            KeyCode::Enter => KeyAction::Confirm,
            KeyCode::Char('r') | KeyCode::Char('R') => KeyAction::Restart,
            KeyCode::Char('q') | KeyCode::Char('Q') => KeyAction::Exit,
            KeyCode::Esc => KeyAction::Quit,
            KeyCode::Char(c @ '1'..='4') => KeyAction::Speed(c as u8 - b'0'),
            _ => KeyAction::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyAction {
        InputHandler::new().handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_space_flaps() {
        assert_eq!(press(KeyCode::Char(' ')), KeyAction::Flap);
    }

    #[test]
    fn test_up_keys() {
        assert_eq!(press(KeyCode::Up), KeyAction::Up);
        assert_eq!(press(KeyCode::Char('w')), KeyAction::Up);
        assert_eq!(press(KeyCode::Char('W')), KeyAction::Up);
    }

    #[test]
    fn test_down_keys() {
        assert_eq!(press(KeyCode::Down), KeyAction::Down);
        assert_eq!(press(KeyCode::Char('s')), KeyAction::Down);
    }

    #[test]
    fn test_menu_keys() {
        assert_eq!(press(KeyCode::Enter), KeyAction::Confirm);
        assert_eq!(press(KeyCode::Char('r')), KeyAction::Restart);
        assert_eq!(press(KeyCode::Char('R')), KeyAction::Restart);
        assert_eq!(press(KeyCode::Char('q')), KeyAction::Exit);
    }

    #[test]
    fn test_escape_quits() {
        assert_eq!(press(KeyCode::Esc), KeyAction::Quit);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let handler = InputHandler::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handler.handle_key_event(key), KeyAction::Quit);
    }

    #[test]
    fn test_ctrl_other_ignored() {
        let handler = InputHandler::new();
        let key = KeyEvent::new(KeyCode::Char('w'), KeyModifiers::CONTROL);
        assert_eq!(handler.handle_key_event(key), KeyAction::None);
    }

    #[test]
    fn test_speed_keys() {
        assert_eq!(press(KeyCode::Char('1')), KeyAction::Speed(1));
        assert_eq!(press(KeyCode::Char('4')), KeyAction::Speed(4));
        assert_eq!(press(KeyCode::Char('5')), KeyAction::None);
    }

    #[test]
    fn test_unmapped_key() {
        assert_eq!(press(KeyCode::Char('x')), KeyAction::None);
        assert_eq!(press(KeyCode::Tab), KeyAction::None);
    }

    #[test]
    fn test_session_input_mapping() {
        assert_eq!(KeyAction::Flap.session_input(), Some(SessionInput::Flap));
        assert_eq!(KeyAction::Exit.session_input(), Some(SessionInput::Exit));
        assert_eq!(KeyAction::Quit.session_input(), Some(SessionInput::Quit));
        assert_eq!(KeyAction::Speed(2).session_input(), None);
        assert_eq!(KeyAction::None.session_input(), None);
    }
}
