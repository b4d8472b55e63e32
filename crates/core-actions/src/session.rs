use std::path::Path;

use core_events::{KeyToken, NamedKey};
use core_keymap::{Command, Motion};
use core_search::{SearchKind, build_searcher};
use core_viewer::{Cache, FileOffset, FoundDescriptor, ProcessResult, ViewerError, ViewerOptions};

use crate::resolver::KeyResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Prompt(FindDirection),
}

/// Cursor/viewport/mode-toggle state the content cache itself doesn't own —
/// the same split the teacher keeps between buffer content and its `View`.
#[derive(Debug, Clone)]
pub struct ViewerView {
    pub current_line: usize,
    pub viewport_first_line: usize,
    pub hex_offset: FileOffset,
    pub hex_bytes_per_row: u64,
    pub hex_viewport_first: FileOffset,
    pub hex_mode: bool,
    pub wrap_enabled: bool,
    pub caseless: bool,
    pub regex_mode: bool,
    pub multi_file: bool,
    pub last_text_height: usize,
    pub last_text_width: u16,
    pub text_left_offset: u16,
}

impl Default for ViewerView {
    fn default() -> Self {
        Self {
            current_line: 0,
            viewport_first_line: 0,
            hex_offset: 0,
            hex_bytes_per_row: 16,
            hex_viewport_first: 0,
            hex_mode: false,
            wrap_enabled: true,
            caseless: false,
            regex_mode: false,
            multi_file: false,
            last_text_height: 0,
            last_text_width: 80,
            text_left_offset: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub quit: bool,
    pub dirty: bool,
}

pub struct ViewerSession {
    pub cache: Cache,
    pub view: ViewerView,
    pub found: FoundDescriptor,
    pub mode: Mode,
    pub prompt_buffer: String,
    search_pattern: Option<String>,
    last_forward: bool,
    hex_high_nibble: bool,
}

impl ViewerSession {
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            cache: Cache::new(options),
            view: ViewerView::default(),
            found: FoundDescriptor::default(),
            mode: Mode::Normal,
            prompt_buffer: String::new(),
            search_pattern: None,
            last_forward: true,
            hex_high_nibble: true,
        }
    }

    pub fn open(&mut self, path: &Path) -> Result<(), ViewerError> {
        self.cache.open(path)?;
        self.view = ViewerView::default();
        self.found.clear();
        Ok(())
    }

    pub fn open_stdin(&mut self) -> Result<(), ViewerError> {
        self.cache.open_stdin()?;
        self.view = ViewerView::default();
        self.found.clear();
        Ok(())
    }

    /// Feed one decoded key. Hex-nibble entry and search/text prompts both
    /// intercept keys before the keymap trie ever sees them, mirroring the
    /// teacher's "active mode decides, not the keymap" pattern.
    pub fn feed_key(
        &mut self,
        resolver: &mut KeyResolver,
        token: KeyToken,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<DispatchOutcome, ViewerError> {
        if self.view.hex_mode && self.mode == Mode::Normal {
            if let KeyToken::Char(c) = token {
                if let Some(nibble) = c.to_digit(16) {
                    return self.apply_nibble(nibble as u8);
                }
            }
        }
        if let Mode::Prompt(dir) = self.mode {
            return self.feed_prompt_key(dir, token, interrupt);
        }
        match resolver.feed(token) {
            Some(cmd) => self.dispatch(&cmd, interrupt),
            None => Ok(DispatchOutcome::default()),
        }
    }

    /// Called once a resolver's ambiguous-match deadline elapses.
    pub fn flush_pending(
        &mut self,
        resolver: &mut KeyResolver,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<DispatchOutcome, ViewerError> {
        match resolver.flush_pending() {
            Some(cmd) => self.dispatch(&cmd, interrupt),
            None => Ok(DispatchOutcome::default()),
        }
    }

    fn apply_nibble(&mut self, nibble: u8) -> Result<DispatchOutcome, ViewerError> {
        self.cache.set_byte(self.view.hex_offset, nibble, self.hex_high_nibble)?;
        if self.hex_high_nibble {
            self.hex_high_nibble = false;
        } else {
            self.hex_high_nibble = true;
            self.view.hex_offset += 1;
        }
        Ok(DispatchOutcome { quit: false, dirty: true })
    }

    fn feed_prompt_key(
        &mut self,
        dir: FindDirection,
        token: KeyToken,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<DispatchOutcome, ViewerError> {
        match token {
            KeyToken::Named(NamedKey::Enter) => {
                self.mode = Mode::Normal;
                self.search_pattern = Some(std::mem::take(&mut self.prompt_buffer));
                self.run_find(dir == FindDirection::Forward, interrupt)
            }
            KeyToken::Named(NamedKey::Esc) => {
                self.mode = Mode::Normal;
                self.prompt_buffer.clear();
                Ok(DispatchOutcome::default())
            }
            KeyToken::Named(NamedKey::Backspace) => {
                self.prompt_buffer.pop();
                Ok(DispatchOutcome::default())
            }
            KeyToken::Char(c) => {
                self.prompt_buffer.push(c);
                Ok(DispatchOutcome::default())
            }
            _ => Ok(DispatchOutcome::default()),
        }
    }

    fn dispatch(&mut self, cmd: &Command, interrupt: &dyn Fn() -> bool) -> Result<DispatchOutcome, ViewerError> {
        let mut outcome = DispatchOutcome::default();
        match cmd {
            Command::Move { motion, count } => {
                self.apply_motion(*motion, *count, interrupt)?;
                outcome.dirty = true;
            }
            Command::GotoTop => {
                self.view.current_line = 0;
                self.view.hex_offset = 0;
                outcome.dirty = true;
            }
            Command::GotoBottom => {
                self.cache.process_to_end(interrupt)?;
                self.view.current_line = self.cache.count().saturating_sub(1);
                self.view.hex_offset = self.cache.get_max_hex_offset(self.view.hex_bytes_per_row);
                outcome.dirty = true;
            }
            Command::GotoLine(n) => {
                self.cache.process_through(*n as usize, interrupt)?;
                self.view.current_line = (*n as usize).min(self.cache.count().saturating_sub(1));
                outcome.dirty = true;
            }
            Command::ToggleHexMode => {
                self.sync_cursor_on_mode_flip();
                self.view.hex_mode = !self.view.hex_mode;
                outcome.dirty = true;
            }
            Command::ToggleWrap => {
                self.view.wrap_enabled = !self.view.wrap_enabled;
                self.cache.set_wrap_width(if self.view.wrap_enabled { Some(80) } else { None });
                outcome.dirty = true;
            }
            Command::ToggleLineEndings => {
                let show = !self.cache.show_line_endings();
                self.cache.set_show_line_endings(show);
                outcome.dirty = true;
            }
            Command::ToggleCaseless => {
                self.view.caseless = !self.view.caseless;
            }
            Command::ToggleRegex => {
                self.view.regex_mode = !self.view.regex_mode;
            }
            Command::ToggleMultiFile => {
                self.view.multi_file = !self.view.multi_file;
            }
            Command::FindForward => {
                self.mode = Mode::Prompt(FindDirection::Forward);
                self.prompt_buffer.clear();
            }
            Command::FindBackward => {
                self.mode = Mode::Prompt(FindDirection::Backward);
                self.prompt_buffer.clear();
            }
            Command::FindNext => {
                outcome = self.run_find(self.last_forward, interrupt)?;
            }
            Command::FindPrev => {
                outcome = self.run_find(!self.last_forward, interrupt)?;
            }
            Command::Save => {
                self.cache.save()?;
                outcome.dirty = true;
            }
            Command::UndoSave => {
                self.cache.undo_save()?;
                outcome.dirty = true;
            }
            Command::RevertByte => {
                outcome.dirty = self.cache.revert_byte(self.view.hex_offset);
            }
            Command::Quit => {
                outcome.quit = true;
            }
            Command::Cancel => {
                self.mode = Mode::Normal;
                self.prompt_buffer.clear();
            }
            Command::Tag
            | Command::Sweep
            | Command::Rename
            | Command::DeleteSelected
            | Command::Open
            | Command::Literal(_)
            | Command::Pending => {}
        }
        Ok(outcome)
    }

    fn sync_cursor_on_mode_flip(&mut self) {
        if self.view.hex_mode {
            // Leaving hex mode: land on the line containing the hex cursor.
            if let Some(idx) = self.cache_index_for_offset(self.view.hex_offset) {
                self.view.current_line = idx;
            }
        } else if let Some(offset) = self.cache.get_offset(self.view.current_line) {
            self.view.hex_offset = offset;
        }
    }

    fn cache_index_for_offset(&self, _offset: FileOffset) -> Option<usize> {
        // The cache only maps line index -> offset, not the reverse, without
        // a linear scan; approximate by keeping the current line unchanged
        // when no cheaper mapping is available.
        None
    }

    fn apply_motion(&mut self, motion: Motion, count: u32, interrupt: &dyn Fn() -> bool) -> Result<(), ViewerError> {
        let count = count as u64;
        if self.view.hex_mode {
            let row = self.view.hex_bytes_per_row;
            let max_offset = self.cache.get_max_hex_offset(row);
            let page = row * self.view.last_text_height.max(1) as u64;
            self.view.hex_offset = match motion {
                Motion::Left => self.view.hex_offset.saturating_sub(count),
                Motion::Right => (self.view.hex_offset + count).min(max_offset),
                Motion::Up => self.view.hex_offset.saturating_sub(count * row),
                Motion::Down => (self.view.hex_offset + count * row).min(max_offset),
                Motion::PageUp => self.view.hex_offset.saturating_sub(count * page),
                Motion::PageDown => (self.view.hex_offset + count * page).min(max_offset),
                Motion::HalfPageUp => self.view.hex_offset.saturating_sub(count * page / 2),
                Motion::HalfPageDown => (self.view.hex_offset + count * page / 2).min(max_offset),
                Motion::LineStart | Motion::LineEnd | Motion::Top | Motion::Bottom => self.view.hex_offset,
            };
        } else {
            let page = self.view.last_text_height.max(1) as u64;
            let new_line = match motion {
                Motion::Up | Motion::Left => self.view.current_line.saturating_sub(count as usize),
                Motion::Down | Motion::Right => self.view.current_line + count as usize,
                Motion::PageUp => self.view.current_line.saturating_sub((count * page) as usize),
                Motion::PageDown => self.view.current_line + (count * page) as usize,
                Motion::HalfPageUp => self.view.current_line.saturating_sub((count * page / 2) as usize),
                Motion::HalfPageDown => self.view.current_line + (count * page / 2) as usize,
                Motion::LineStart | Motion::LineEnd | Motion::Top | Motion::Bottom => self.view.current_line,
            };
            self.cache.process_through(new_line, interrupt)?;
            self.view.current_line = new_line.min(self.cache.count().saturating_sub(1));
        }
        Ok(())
    }

    fn run_find(&mut self, forward: bool, interrupt: &dyn Fn() -> bool) -> Result<DispatchOutcome, ViewerError> {
        self.last_forward = forward;
        let Some(pattern) = self.search_pattern.clone() else {
            return Ok(DispatchOutcome::default());
        };
        let kind = if self.view.regex_mode { SearchKind::Regex } else { SearchKind::Literal };
        let mut searcher = build_searcher(kind, &pattern, self.view.caseless)
            .map_err(|e| ViewerError::Aborted.tap_log(&e))?;
        let hit = if self.view.hex_mode {
            self.cache
                .find_hex(forward, searcher.as_mut(), self.view.hex_bytes_per_row, &mut self.found)?
        } else {
            self.cache.find_line(
                forward,
                searcher.as_mut(),
                self.view.last_text_width,
                &mut self.found,
                &mut self.view.text_left_offset,
                interrupt,
            )?
        };
        if hit {
            if self.found.is_line {
                self.view.current_line = self.found.line_or_offset as usize;
            } else {
                self.view.hex_offset = self.found.offset;
            }
        }
        Ok(DispatchOutcome { quit: false, dirty: true })
    }
}

trait TapLog {
    fn tap_log(self, e: &core_search::SearchError) -> Self;
}

impl TapLog for ViewerError {
    fn tap_log(self, e: &core_search::SearchError) -> Self {
        tracing::warn!(target: "actions.search", error = %e, "search_pattern_rejected");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::KeyResolver;
    use core_keymap::{MappingTrie, default_viewer_specs};
    use std::io::Write;

    fn always_false() -> bool {
        false
    }

    #[test]
    fn toggle_hex_mode_flips_flag() {
        let mut session = ViewerSession::new(ViewerOptions::default());
        let mut resolver = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        assert!(!session.view.hex_mode);
        session
            .feed_key(&mut resolver, KeyToken::Named(NamedKey::Tab), &always_false)
            .unwrap();
        assert!(session.view.hex_mode);
    }

    #[test]
    fn motion_down_advances_current_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "one").unwrap();
        writeln!(file, "two").unwrap();
        writeln!(file, "three").unwrap();
        let mut session = ViewerSession::new(ViewerOptions::default());
        session.open(file.path()).unwrap();
        let mut resolver = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        session
            .feed_key(&mut resolver, KeyToken::Char('j'), &always_false)
            .unwrap();
        assert_eq!(session.view.current_line, 1);
    }

    #[test]
    fn quit_command_sets_outcome_quit() {
        let mut session = ViewerSession::new(ViewerOptions::default());
        let mut resolver = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        let outcome = session
            .feed_key(&mut resolver, KeyToken::Char('q'), &always_false)
            .unwrap();
        assert!(outcome.quit);
    }

    #[test]
    fn find_forward_enters_prompt_and_search_submits() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hello world").unwrap();
        let mut session = ViewerSession::new(ViewerOptions::default());
        session.open(file.path()).unwrap();
        let mut resolver = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        session
            .feed_key(&mut resolver, KeyToken::Char('/'), &always_false)
            .unwrap();
        assert_eq!(session.mode, Mode::Prompt(FindDirection::Forward));
        for c in "world".chars() {
            session
                .feed_key(&mut resolver, KeyToken::Char(c), &always_false)
                .unwrap();
        }
        session
            .feed_key(&mut resolver, KeyToken::Named(NamedKey::Enter), &always_false)
            .unwrap();
        assert_eq!(session.mode, Mode::Normal);
        assert!(session.found.valid);
    }

    #[test]
    fn hex_nibble_entry_patches_byte() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 4]).unwrap();
        let mut session = ViewerSession::new(ViewerOptions::default());
        session.open(file.path()).unwrap();
        session.view.hex_mode = true;
        let mut resolver = KeyResolver::new(MappingTrie::build(default_viewer_specs()));
        session.feed_key(&mut resolver, KeyToken::Char('a'), &always_false).unwrap();
        session.feed_key(&mut resolver, KeyToken::Char('b'), &always_false).unwrap();
        assert!(session.cache.is_dirty());
    }
}
