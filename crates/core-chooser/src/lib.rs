//! Directory listing, tagging and the housekeeping commands (sweep / rename
//! / delete) that hand a selection off to the viewer. This is a reduced
//! surface: the original tool's chooser also owns column layout, popup
//! dialogs and inline confirmation prompts, none of which are reimplemented
//! here (out of scope per the Non-goals on chooser internals) — only enough
//! to list a directory, move a selection cursor, tag entries, and compute
//! what a sweep/delete/rename should act on.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChooserError {
    #[error("directory not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn classify_io(path: &Path, e: std::io::Error) -> ChooserError {
    match e.kind() {
        std::io::ErrorKind::NotFound => ChooserError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            ChooserError::PermissionDenied(path.display().to_string())
        }
        _ => ChooserError::Io(e),
    }
}

#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub size: u64,
}

/// How [`MarkedList::mark`] should affect a single index — mirrors the
/// original tool's `int tag` convention (-1 unmark, 0 toggle, 1 mark) but as
/// a named enum instead of a magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Unmark,
    Toggle,
    Mark,
}

/// Set of tagged indices, with a "reverse" bit so `MarkAll` doesn't have to
/// materialize every index: reverse flips the sense of membership, so
/// `AnyMarked`/`IsMarked` both account for it.
#[derive(Debug, Clone, Default)]
pub struct MarkedList {
    set: std::collections::HashSet<usize>,
    reverse: bool,
}

impl MarkedList {
    pub fn clear(&mut self) {
        self.set.clear();
        self.reverse = false;
    }

    pub fn mark_all(&mut self) {
        self.set.clear();
        self.reverse = true;
    }

    pub fn reverse(&mut self) {
        self.reverse = !self.reverse;
    }

    pub fn mark(&mut self, index: usize, tag: Tag) {
        let mut tag = match tag {
            Tag::Mark => true,
            Tag::Unmark => false,
            Tag::Toggle => !self.is_marked(index),
        };
        if self.reverse {
            tag = !tag;
        }
        if tag {
            self.set.insert(index);
        } else {
            self.set.remove(&index);
        }
    }

    pub fn is_marked(&self, index: usize) -> bool {
        let marked = self.set.contains(&index);
        marked ^ self.reverse
    }

    pub fn any_marked(&self) -> bool {
        !self.set.is_empty() || self.reverse
    }

    pub fn all_marked(&self, count: usize) -> bool {
        if self.reverse {
            self.set.is_empty()
        } else {
            self.set.len() >= count
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChooserOutcome {
    Continue,
    ViewOne,
    ViewTagged,
    ExitApp,
}

pub struct Chooser {
    dir: PathBuf,
    entries: Vec<DirEntryInfo>,
    index: usize,
    top: usize,
    tagged: MarkedList,
}

impl Chooser {
    pub fn new() -> Self {
        Self {
            dir: PathBuf::new(),
            entries: Vec::new(),
            index: 0,
            top: 0,
            tagged: MarkedList::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[DirEntryInfo] {
        &self.entries
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn top(&self) -> usize {
        self.top
    }

    /// Read the directory listing: subdirectories first, then files, both
    /// alphabetized case-insensitively.
    pub fn navigate(&mut self, dir: &Path) -> Result<(), ChooserError> {
        let read = fs::read_dir(dir).map_err(|e| classify_io(dir, e))?;
        let mut entries = Vec::new();
        for item in read {
            let item = item.map_err(|e| classify_io(dir, e))?;
            let meta = item.metadata().map_err(|e| classify_io(dir, e))?;
            entries.push(DirEntryInfo {
                name: item.file_name().to_string_lossy().into_owned(),
                is_dir: meta.is_dir(),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| {
            b.is_dir
                .cmp(&a.is_dir)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        self.dir = dir.to_path_buf();
        self.entries = entries;
        self.index = 0;
        self.top = 0;
        self.tagged.clear();
        Ok(())
    }

    pub fn move_down(&mut self, count: u32) {
        if self.entries.is_empty() {
            return;
        }
        self.index = (self.index + count as usize).min(self.entries.len() - 1);
    }

    pub fn move_up(&mut self, count: u32) {
        self.index = self.index.saturating_sub(count as usize);
    }

    pub fn tag_current(&mut self) {
        if !self.entries.is_empty() {
            self.tagged.mark(self.index, Tag::Toggle);
        }
    }

    pub fn selected_file(&self) -> Option<PathBuf> {
        self.entries.get(self.index).map(|e| self.dir.join(&e.name))
    }

    pub fn tagged_files(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(i, _)| self.tagged.is_marked(*i))
            .map(|(_, e)| self.dir.join(&e.name))
            .collect()
    }

    /// Targets for a sweep/delete operation: the tagged set if non-empty,
    /// otherwise the current selection provided it isn't a directory.
    pub fn sweep_targets(&self) -> Vec<PathBuf> {
        if self.tagged.any_marked() {
            return self.tagged_files();
        }
        match self.entries.get(self.index) {
            Some(e) if !e.is_dir => vec![self.dir.join(&e.name)],
            _ => Vec::new(),
        }
    }

    /// Delete the sweep targets from disk, refreshing the listing
    /// afterwards. Directories are never included in the target set.
    pub fn delete_selected(&mut self) -> Result<usize, ChooserError> {
        let targets = self.sweep_targets();
        let count = targets.len();
        for path in &targets {
            fs::remove_file(path).map_err(|e| classify_io(path, e))?;
        }
        if count > 0 {
            let dir = self.dir.clone();
            self.navigate(&dir)?;
        }
        Ok(count)
    }

    /// Rename the current selection in place, refreshing the listing.
    pub fn rename_selected(&mut self, new_name: &str) -> Result<(), ChooserError> {
        let Some(old) = self.selected_file() else {
            return Ok(());
        };
        let new_path = self.dir.join(new_name);
        fs::rename(&old, &new_path).map_err(|e| classify_io(&old, e))?;
        let dir = self.dir.clone();
        self.navigate(&dir)
    }

    pub fn apply_command(&mut self, cmd: &core_keymap::Command) -> ChooserOutcome {
        use core_keymap::{Command, Motion};
        match cmd {
            Command::Move { motion, count } => {
                match motion {
                    Motion::Down => self.move_down(*count),
                    Motion::Up => self.move_up(*count),
                    _ => {}
                }
                ChooserOutcome::Continue
            }
            Command::GotoTop => {
                self.index = 0;
                ChooserOutcome::Continue
            }
            Command::GotoBottom => {
                self.index = self.entries.len().saturating_sub(1);
                ChooserOutcome::Continue
            }
            Command::GotoLine(n) => {
                self.index = (*n as usize).min(self.entries.len().saturating_sub(1));
                ChooserOutcome::Continue
            }
            Command::Tag => {
                self.tag_current();
                ChooserOutcome::Continue
            }
            Command::Open => {
                if self.entries.get(self.index).is_some_and(|e| e.is_dir) {
                    if let Some(path) = self.selected_file() {
                        let _ = self.navigate(&path);
                    }
                    ChooserOutcome::Continue
                } else {
                    ChooserOutcome::ViewOne
                }
            }
            Command::Sweep => {
                if self.tagged.any_marked() {
                    ChooserOutcome::ViewTagged
                } else {
                    ChooserOutcome::ViewOne
                }
            }
            Command::DeleteSelected => {
                let _ = self.delete_selected();
                ChooserOutcome::Continue
            }
            Command::Quit => ChooserOutcome::ExitApp,
            _ => ChooserOutcome::Continue,
        }
    }
}

impl Default for Chooser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_list_toggle_and_reverse() {
        let mut m = MarkedList::default();
        assert!(!m.is_marked(3));
        m.mark(3, Tag::Toggle);
        assert!(m.is_marked(3));
        m.mark(3, Tag::Toggle);
        assert!(!m.is_marked(3));
        m.mark_all();
        assert!(m.is_marked(0));
        assert!(m.is_marked(999));
        m.mark(5, Tag::Unmark);
        assert!(!m.is_marked(5));
        assert!(m.any_marked());
    }

    #[test]
    fn navigate_lists_dirs_before_files_alphabetically() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("zzz_dir")).unwrap();
        std::fs::write(tmp.path().join("b.txt"), "").unwrap();
        std::fs::write(tmp.path().join("a.txt"), "").unwrap();
        let mut chooser = Chooser::new();
        chooser.navigate(tmp.path()).unwrap();
        assert_eq!(chooser.entries()[0].name, "zzz_dir");
        assert!(chooser.entries()[0].is_dir);
        assert_eq!(chooser.entries()[1].name, "a.txt");
        assert_eq!(chooser.entries()[2].name, "b.txt");
    }

    #[test]
    fn sweep_targets_prefers_tagged_over_selection() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "").unwrap();
        std::fs::write(tmp.path().join("b.txt"), "").unwrap();
        let mut chooser = Chooser::new();
        chooser.navigate(tmp.path()).unwrap();
        assert_eq!(chooser.sweep_targets().len(), 1);
        chooser.tag_current();
        chooser.move_down(1);
        chooser.tag_current();
        assert_eq!(chooser.sweep_targets().len(), 2);
    }

    #[test]
    fn delete_selected_removes_file_and_refreshes() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.txt"), "").unwrap();
        let mut chooser = Chooser::new();
        chooser.navigate(tmp.path()).unwrap();
        let removed = chooser.delete_selected().unwrap();
        assert_eq!(removed, 1);
        assert!(chooser.entries().is_empty());
    }
}
