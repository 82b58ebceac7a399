//! Keyboard decoding and line discipline.

use super::set_shown;
use crate::state::SchedulerState;
use pc_keyboard::{layouts, DecodedKey, HandleControl, KeyCode, KeyState, Keyboard, ScancodeSet1};
use triptych_hal::{FrameBuffer, Platform, TAB_WIDTH};

/// What a key press means to the terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A printable character, tab or newline.
    Char(u8),
    /// Erase the last character.
    Backspace,
    /// Ctrl+L.
    ClearScreen,
    /// Alt+F1..F3.
    SwitchTerminal(usize),
}

/// Scancode decoder that also tracks the Alt keys.
pub struct KeyboardDecoder {
    keyboard: Keyboard<layouts::Us104Key, ScancodeSet1>,
    alt: bool,
}

impl KeyboardDecoder {
    /// Decoder with no keys held.
    pub const fn new() -> Self {
        Self {
            keyboard: Keyboard::new(
                ScancodeSet1::new(),
                layouts::Us104Key,
                HandleControl::MapLettersToUnicode,
            ),
            alt: false,
        }
    }

    /// Feeds one scancode byte; returns an input once a key press completes.
    pub fn decode(&mut self, scancode: u8) -> Option<Input> {
        let event = self.keyboard.add_byte(scancode).ok().flatten()?;

        if matches!(event.code, KeyCode::LAlt | KeyCode::RAltGr) {
            self.alt = event.state == KeyState::Down;
        }
        if self.alt && event.state == KeyState::Down {
            let terminal = match event.code {
                KeyCode::F1 => Some(0),
                KeyCode::F2 => Some(1),
                KeyCode::F3 => Some(2),
                _ => None,
            };
            if let Some(terminal) = terminal {
                return Some(Input::SwitchTerminal(terminal));
            }
        }

        match self.keyboard.process_keyevent(event)? {
            DecodedKey::Unicode('\u{8}') => Some(Input::Backspace),
            DecodedKey::Unicode('\u{c}') => Some(Input::ClearScreen),
            DecodedKey::Unicode('\n' | '\r') => Some(Input::Char(b'\n')),
            DecodedKey::Unicode(c) if c == '\t' || (c.is_ascii() && !c.is_ascii_control()) => {
                Some(Input::Char(c as u8))
            }
            _ => None,
        }
    }
}

impl Default for KeyboardDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies keyboard input to the shown terminal, echoing on the display.
pub fn handle_input(state: &mut SchedulerState, hw: &mut impl Platform, input: Input) {
    if let Input::SwitchTerminal(terminal) = input {
        set_shown(state, hw, terminal);
        return;
    }

    let session = state.terminals.shown_session_mut();
    match input {
        Input::SwitchTerminal(_) => {}
        Input::ClearScreen => {
            session.line.clear();
            session.cursor = Default::default();
            hw.clear(FrameBuffer::Primary);
            hw.place_cursor(session.cursor);
        }
        Input::Backspace => {
            if let Some(erased) = session.line.pop() {
                let cells = if erased == b'\t' { TAB_WIDTH } else { 1 };
                hw.erase(FrameBuffer::Primary, &mut session.cursor, cells);
                hw.place_cursor(session.cursor);
            }
        }
        Input::Char(byte) => {
            if session.line.push(byte) {
                hw.write_bytes(FrameBuffer::Primary, &mut session.cursor, &[byte]);
                hw.place_cursor(session.cursor);
            }
        }
    }
}
