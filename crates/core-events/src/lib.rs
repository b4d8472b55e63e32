//! Portable event types shared between input decoding, the keymap, and the
//! dispatcher. The viewer runs a synchronous, single-threaded event loop (one
//! blocking read per turn), so this crate carries no async runtime types —
//! just the data.

use std::fmt;

/// Top-level event consumed by the main loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Command(CommandEvent),
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum CommandEvent {
    Quit,
}

/// Normalized input events, decoded from the terminal backend.
#[derive(Debug, Clone)]
pub enum InputEvent {
    /// A key press (or terminal auto-repeat) with its logical token.
    KeyPress(KeyEventExt),
    /// Terminal resize (columns, rows).
    Resize(u16, u16),
    /// Synthetic interrupt (Ctrl-C), surfaced distinctly so it can force a
    /// clean shutdown even mid-dialog.
    CtrlC,
    /// Start of a bracketed paste sequence.
    PasteStart,
    /// The pasted text (delivered as a single chunk by the terminal).
    PasteChunk(String),
    /// End of a bracketed paste sequence.
    PasteEnd,
    /// Mouse event (position + kind + modifiers).
    Mouse(MouseEvent),
    FocusGained,
    FocusLost,
}

/// Rich keypress metadata: logical key identity plus the auto-repeat flag
/// reported by the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEventExt {
    pub token: KeyToken,
    pub repeat: bool,
}

impl KeyEventExt {
    pub fn new(token: KeyToken) -> Self {
        Self {
            token,
            repeat: false,
        }
    }

    pub fn with_repeat(token: KeyToken, repeat: bool) -> Self {
        Self { token, repeat }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ModMask: u16 { const CTRL=1; const ALT=2; const SHIFT=4; const META=8; const SUPER=16; }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Esc,
    Backspace,
    Tab,
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
}

/// Canonical logical key tokens. `KeyToken::Chord` wraps a base token plus
/// modifier mask so consumers can faithfully reconstruct combinations such
/// as `<C-f>` without relying on ad hoc shortcuts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
    Chord { base: Box<KeyToken>, mods: ModMask },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MouseEvent {
    pub kind: MouseEventKind,
    pub column: u16,
    pub row: u16,
    pub mods: ModMask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEventKind {
    Down(MouseButton),
    Up(MouseButton),
    Drag(MouseButton),
    ScrollUp,
    ScrollDown,
    Moved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Char(c) => write!(f, "{c}"),
            KeyToken::Named(n) => write!(f, "{n:?}"),
            KeyToken::Chord { base, mods } => write!(f, "{mods:?}-{base}"),
        }
    }
}

/// Helper result type for crates that want a single error type at their
/// boundary without defining their own `anyhow` re-export.
pub type EventResult<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_ext_new_defaults_no_repeat() {
        let evt = KeyEventExt::new(KeyToken::Char('a'));
        assert!(!evt.repeat);
    }

    #[test]
    fn key_token_chord_round_trip() {
        let mods = ModMask::CTRL | ModMask::ALT;
        let base = KeyToken::Named(NamedKey::Down);
        let chord = KeyToken::Chord {
            base: Box::new(base.clone()),
            mods,
        };
        match &chord {
            KeyToken::Chord {
                base: boxed_base,
                mods: observed_mods,
            } => {
                assert_eq!(**boxed_base, base);
                assert_eq!(*observed_mods, mods);
            }
            other => panic!("expected chord token, got {other:?}"),
        }
    }

    #[test]
    fn key_token_display_for_char_and_chord() {
        assert_eq!(KeyToken::Char('x').to_string(), "x");
        let chord = KeyToken::Chord {
            base: Box::new(KeyToken::Char('f')),
            mods: ModMask::CTRL,
        };
        assert!(chord.to_string().contains('f'));
    }
}
