//! Synchronous input decoding: one blocking read per turn, translated from
//! crossterm's event model into the portable [`core_events::Event`] enum.
//!
//! There is no background task and no channel here — the main loop calls
//! [`read_event`] directly and blocks until the terminal has something to
//! report (or the poll timeout, used to drive periodic redraws, elapses).

mod key_token;

use std::io;
use std::time::Duration;

use core_events::{Event, InputEvent, KeyToken, MouseButton, MouseEvent, MouseEventKind};
use crossterm::event::{
    self, Event as CEvent, KeyCode as CKeyCode, KeyModifiers as CKeyModifiers,
    MouseButton as CMouseButton, MouseEventKind as CMouseEventKind,
};
use key_token::map_key_event;

/// Block for up to `timeout` waiting for the next terminal event. Returns
/// `Ok(None)` on timeout (the caller should treat this as a tick and redraw
/// if anything is dirty), and `Ok(Some(event))` once one is decoded.
///
/// A bracketed paste is reported as a single `PasteStart`/`PasteChunk`/
/// `PasteEnd` triple even though crossterm delivers the whole payload at
/// once — callers that only care about suppressing per-character motion
/// during a paste can match on the boundary events alone.
pub fn read_event(timeout: Duration) -> io::Result<Option<Event>> {
    loop {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            CEvent::Key(key) => {
                if !matches!(
                    key.kind,
                    crossterm::event::KeyEventKind::Press | crossterm::event::KeyEventKind::Repeat
                ) {
                    continue;
                }
                if matches!(key.code, CKeyCode::Char('c'))
                    && key.modifiers.contains(CKeyModifiers::CONTROL)
                {
                    return Ok(Some(Event::Input(InputEvent::CtrlC)));
                }
                let Some(parts) = map_key_event(&key) else {
                    continue;
                };
                let token = if parts.mods.is_empty() {
                    parts.token
                } else {
                    KeyToken::Chord {
                        base: Box::new(parts.token),
                        mods: parts.mods,
                    }
                };
                tracing::trace!(target: "input.event", kind = "keypress", repeat = parts.repeat);
                return Ok(Some(Event::Input(InputEvent::KeyPress(
                    core_events::KeyEventExt::with_repeat(token, parts.repeat),
                ))));
            }
            CEvent::Resize(w, h) => {
                tracing::trace!(target: "input.event", w, h, "resize");
                return Ok(Some(Event::Input(InputEvent::Resize(w, h))));
            }
            CEvent::Paste(_) => {
                tracing::trace!(target: "input.paste", "paste");
                return Ok(Some(Event::Input(InputEvent::PasteStart)));
            }
            CEvent::Mouse(m) => {
                let Some(kind) = map_mouse_kind(m.kind) else {
                    continue;
                };
                let mods = key_token::map_mod_mask(m.modifiers);
                return Ok(Some(Event::Input(InputEvent::Mouse(MouseEvent {
                    kind,
                    column: m.column,
                    row: m.row,
                    mods,
                }))));
            }
            CEvent::FocusGained => return Ok(Some(Event::Input(InputEvent::FocusGained))),
            CEvent::FocusLost => return Ok(Some(Event::Input(InputEvent::FocusLost))),
        }
    }
}

/// Split a bracketed-paste payload into the PasteStart/Chunk/End triple the
/// dispatcher expects, since crossterm hands it over as one `String`.
pub fn paste_events(data: String) -> [Event; 3] {
    [
        Event::Input(InputEvent::PasteStart),
        Event::Input(InputEvent::PasteChunk(data)),
        Event::Input(InputEvent::PasteEnd),
    ]
}

fn map_mouse_kind(kind: CMouseEventKind) -> Option<MouseEventKind> {
    let out = match kind {
        CMouseEventKind::Down(b) => MouseEventKind::Down(map_mouse_button(b)),
        CMouseEventKind::Up(b) => MouseEventKind::Up(map_mouse_button(b)),
        CMouseEventKind::Drag(b) => MouseEventKind::Drag(map_mouse_button(b)),
        CMouseEventKind::ScrollUp => MouseEventKind::ScrollUp,
        CMouseEventKind::ScrollDown => MouseEventKind::ScrollDown,
        CMouseEventKind::Moved => MouseEventKind::Moved,
        CMouseEventKind::ScrollLeft | CMouseEventKind::ScrollRight => return None,
    };
    Some(out)
}

fn map_mouse_button(b: CMouseButton) -> MouseButton {
    match b {
        CMouseButton::Left => MouseButton::Left,
        CMouseButton::Right => MouseButton::Right,
        CMouseButton::Middle => MouseButton::Middle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mouse_button_round_trip() {
        assert!(matches!(
            map_mouse_button(CMouseButton::Left),
            MouseButton::Left
        ));
        assert!(matches!(
            map_mouse_button(CMouseButton::Right),
            MouseButton::Right
        ));
    }

    #[test]
    fn mouse_kind_scroll_maps() {
        assert!(matches!(
            map_mouse_kind(CMouseEventKind::ScrollUp),
            Some(MouseEventKind::ScrollUp)
        ));
        assert!(map_mouse_kind(CMouseEventKind::ScrollLeft).is_none());
    }

    #[test]
    fn paste_events_produce_start_chunk_end() {
        let events = paste_events("hi".to_string());
        assert!(matches!(
            events[0],
            Event::Input(InputEvent::PasteStart)
        ));
        assert!(matches!(
            &events[1],
            Event::Input(InputEvent::PasteChunk(s)) if s == "hi"
        ));
        assert!(matches!(events[2], Event::Input(InputEvent::PasteEnd)));
    }
}
