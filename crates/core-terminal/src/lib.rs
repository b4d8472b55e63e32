//! Terminal backend abstraction and crossterm implementation: alternate
//! screen, raw mode, cursor visibility, bracketed paste, and mouse
//! reporting, all scoped to an RAII guard so a panic or early return always
//! restores the terminal.

use anyhow::Result;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{
    DisableBracketedPaste, EnableBracketedPaste, EnterAlternateScreen, LeaveAlternateScreen,
    SetTitle, disable_raw_mode, enable_raw_mode,
};
use crossterm::execute;

/// Backend operations the rest of the runtime depends on. Kept as a trait
/// (rather than calling crossterm directly everywhere) so tests can swap in
/// a no-op implementation.
pub trait TerminalBackend {
    fn enter(&mut self, mouse_capture: bool) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
}

pub struct CrosstermBackend {
    entered: bool,
    mouse_capture: bool,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self {
            entered: false,
            mouse_capture: false,
        }
    }

    /// Enter the guarded terminal state and return an RAII handle that
    /// restores it on drop. `mouse_capture` toggles `EnableMouseCapture` —
    /// off by default so plain text selection in the user's terminal still
    /// works until the chooser/viewer asks for it.
    pub fn enter_guard(&mut self, mouse_capture: bool) -> Result<TerminalGuard<'_>> {
        self.enter(mouse_capture)?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self, mouse_capture: bool) -> Result<()> {
        enable_raw_mode()?;
        execute!(std::io::stdout(), EnterAlternateScreen, Hide, EnableBracketedPaste)?;
        if mouse_capture {
            execute!(std::io::stdout(), EnableMouseCapture)?;
        }
        self.mouse_capture = mouse_capture;
        self.entered = true;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if !self.entered {
            return Ok(());
        }
        if self.mouse_capture {
            let _ = execute!(std::io::stdout(), DisableMouseCapture);
        }
        execute!(
            std::io::stdout(),
            DisableBracketedPaste,
            Show,
            LeaveAlternateScreen
        )?;
        disable_raw_mode()?;
        self.entered = false;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(std::io::stdout(), SetTitle(title))?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

/// RAII guard returned by [`CrosstermBackend::enter_guard`]. Leaving scope
/// (including via an early return or panic unwind) restores the terminal.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
            self.active = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_starts_not_entered() {
        let backend = CrosstermBackend::new();
        assert!(!backend.entered);
        assert!(!backend.mouse_capture);
    }
}
