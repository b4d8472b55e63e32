//! Content cache: the façade tying encoding detection, line reflow, the
//! sliding window, the hex-patch store and search together into the one
//! object a viewer owns per open file (or pipe, or in-memory help text).

use std::io;
use std::path::{Path, PathBuf};

use core_encoding::{CodePageId, Decoder, Detector, EncodingDescriptor, decoder_for};
use core_patch::{ByteColor, PatchStore, RandomAccessWrite};
use core_search::{Match, Searcher};
use core_text::{Advance, ControlRenderMode, LineMap, ReflowOptions, decode_line_text, trim_line_ending};
use core_window::{DataSource, FileSource, PipeSource, SlidingWindow, TextSource};
use thiserror::Error;

pub type FileOffset = u64;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("operation aborted")]
    Aborted,
    #[error("error saving changes: {0}")]
    SaveFailure(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ViewerOptions {
    pub wrap_width: Option<u16>,
    pub max_line_length: u32,
    pub tab_width: u16,
    pub expand_tabs: bool,
    pub control_mode: ControlRenderMode,
    pub help_mode_secondary_indent: bool,
    pub multibyte_enabled: bool,
    pub show_line_endings: bool,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            wrap_width: Some(80),
            max_line_length: 2048,
            tab_width: 8,
            expand_tabs: true,
            control_mode: ControlRenderMode::Caret,
            help_mode_secondary_indent: false,
            multibyte_enabled: true,
            show_line_endings: false,
        }
    }
}

impl ViewerOptions {
    fn reflow_options(&self, hex_mode: bool) -> ReflowOptions {
        ReflowOptions {
            wrap_width: self.wrap_width,
            max_line_length: self.max_line_length,
            tab_width: self.tab_width,
            expand_tabs: self.expand_tabs,
            binary_mode: hex_mode,
            control_mode: self.control_mode,
            help_mode_secondary_indent: self.help_mode_secondary_indent,
        }
    }
}

/// A located find result: either a line-relative position or an absolute
/// file offset, with a validity bit (mirrors `FoundLine`/`FoundOffset`).
#[derive(Debug, Clone, Copy, Default)]
pub struct FoundDescriptor {
    pub valid: bool,
    pub is_line: bool,
    pub line_or_offset: u64,
    pub offset: FileOffset,
    pub len: u32,
}

impl FoundDescriptor {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessResult {
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanStyle {
    Margin,
    Divider,
    Text,
    Control,
    Found,
    EditedByte,
    SavedByte,
    OffsetHighlight,
}

#[derive(Debug, Clone)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, Default)]
pub struct FormattedRow {
    pub spans: Vec<Span>,
}

impl FormattedRow {
    fn push(&mut self, text: impl Into<String>, style: SpanStyle) {
        self.spans.push(Span { text: text.into(), style });
    }
}

const DETECT_PREFIX: usize = 4096;
const HEX_GROUP_GAP_EVERY: usize = 8;

pub struct Cache {
    options: ViewerOptions,
    source: Option<Box<dyn DataSource>>,
    write_path: Option<PathBuf>,
    size: FileOffset,
    is_pipe: bool,
    window: SlidingWindow,
    encoding: EncodingDescriptor,
    map: LineMap,
    patches: PatchStore,
    completed: bool,
    eof: bool,
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(ViewerOptions::default())
    }
}

impl Cache {
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            options,
            source: None,
            write_path: None,
            size: 0,
            is_pipe: false,
            window: SlidingWindow::new(core_window::DEFAULT_SLOP, core_window::DEFAULT_MAIN, 0),
            encoding: default_encoding(),
            map: LineMap::new(),
            patches: PatchStore::new(),
            completed: false,
            eof: false,
        }
    }

    pub fn has_content(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_pipe(&self) -> bool {
        self.is_pipe
    }

    pub fn path(&self) -> Option<&Path> {
        self.write_path.as_deref()
    }

    /// Friendly name ("Unicode (UTF-8)", "Binary File") when `raw` is
    /// false; the bare code-page number ("65001", "437") when `raw` is
    /// true, the way `encodings.cpp::GetCodePageName`'s synthesized
    /// `"CP %u"` fallback reduces to once the descriptive name is
    /// stripped away.
    pub fn encoding_name(&self, raw: bool) -> String {
        if raw {
            self.encoding.codepage.to_string()
        } else {
            self.encoding.name.clone()
        }
    }

    pub fn is_binary_file(&self) -> bool {
        self.encoding.is_binary
    }

    pub fn file_size(&self) -> FileOffset {
        self.size
    }

    pub fn count(&self) -> usize {
        self.map.count()
    }

    pub fn processed(&self) -> FileOffset {
        self.map.processed_offset()
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    pub fn get_offset(&self, index: usize) -> Option<FileOffset> {
        self.map.get_offset(index)
    }

    pub fn get_length(&self, index: usize) -> Option<u32> {
        self.map.get_length(index)
    }

    pub fn get_max_hex_offset(&self, hex_width: u64) -> FileOffset {
        if self.size == 0 {
            0
        } else {
            (self.size - 1) & !(hex_width - 1)
        }
    }

    fn decoder(&self, hex_mode: bool) -> Box<dyn Decoder> {
        decoder_for(self.encoding.codepage, hex_mode)
    }

    pub fn open(&mut self, path: &Path) -> Result<(), ViewerError> {
        let file = std::fs::File::open(path).map_err(|e| classify_io(path, e))?;
        let size = file.metadata()?.len();
        let mut prefix = vec![0u8; size.min(DETECT_PREFIX as u64) as usize];
        {
            use std::io::Read;
            let mut f = std::fs::File::open(path)?;
            f.read_exact(&mut prefix)?;
        }
        self.encoding = Detector::new().detect(&prefix, self.options.multibyte_enabled);
        self.size = size;
        self.is_pipe = false;
        self.write_path = Some(path.to_path_buf());
        self.window = SlidingWindow::new(core_window::DEFAULT_SLOP, core_window::DEFAULT_MAIN, size);
        self.source = Some(Box::new(FileSource::open(path).map_err(|e| classify_io(path, e))?));
        let _ = file;
        self.map = LineMap::new();
        self.map.set_stream_len(size);
        self.patches = PatchStore::new();
        self.completed = false;
        self.eof = false;
        Ok(())
    }

    pub fn open_stdin(&mut self) -> Result<(), ViewerError> {
        let stdin = std::io::stdin();
        let pipe = PipeSource::drain(stdin.lock())?;
        let size = pipe.len();
        self.size = size;
        self.is_pipe = true;
        self.write_path = None;
        self.window = SlidingWindow::new(core_window::PIPE_SLOP, core_window::DEFAULT_MAIN, size);
        let mut buf = vec![0u8; size.min(DETECT_PREFIX as u64) as usize];
        let mut probe = pipe;
        probe.read_at(0, &mut buf)?;
        self.encoding = Detector::new().detect(&buf, self.options.multibyte_enabled);
        self.source = Some(Box::new(probe));
        self.map = LineMap::new();
        self.map.set_stream_len(size);
        self.patches = PatchStore::new();
        self.completed = false;
        self.eof = false;
        Ok(())
    }

    pub fn set_text_content(&mut self, text: &str) {
        let size = text.len() as u64;
        self.size = size;
        self.is_pipe = false;
        self.write_path = None;
        self.window = SlidingWindow::new(core_window::DEFAULT_SLOP, core_window::DEFAULT_MAIN, size);
        self.encoding = Detector::new().detect(text.as_bytes(), true);
        self.source = Some(Box::new(TextSource::new(text.to_string())));
        self.map = LineMap::new();
        self.map.set_stream_len(size);
        self.patches = PatchStore::new();
        self.completed = false;
        self.eof = false;
    }

    pub fn close(&mut self) {
        self.source = None;
        self.write_path = None;
        self.size = 0;
        self.map = LineMap::new();
        self.patches = PatchStore::new();
        self.completed = false;
        self.eof = false;
    }

    pub fn set_encoding(&mut self, codepage: CodePageId) {
        self.encoding.codepage = codepage;
        self.invalidate_map();
    }

    pub fn set_wrap_width(&mut self, width: Option<u16>) {
        self.options.wrap_width = width;
        self.invalidate_map();
    }

    pub fn set_show_line_endings(&mut self, show: bool) {
        self.options.show_line_endings = show;
    }

    pub fn show_line_endings(&self) -> bool {
        self.options.show_line_endings
    }

    fn invalidate_map(&mut self) {
        self.map = LineMap::new();
        self.map.set_stream_len(self.size);
        self.completed = false;
    }

    /// Drive the line map forward until `Count() > line_index` or the
    /// stream ends. Polls `interrupt` between chunks; when it fires, the
    /// line map keeps whatever it had already indexed and `Aborted` is
    /// returned without touching patch state.
    pub fn process_through(
        &mut self,
        line_index: usize,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<ProcessResult, ViewerError> {
        let decoder = self.decoder(false);
        let opts = self.options.reflow_options(false);
        loop {
            if self.map.count() > line_index || self.completed {
                return Ok(ProcessResult::Completed);
            }
            if interrupt() {
                return Ok(ProcessResult::Aborted);
            }
            let request = self.map.processed_offset();
            let Some(source) = self.source.as_deref_mut() else {
                return Err(ViewerError::NotFound("no content open".into()));
            };
            self.window.ensure(source, request)?;
            let slice_start = self.window.data_offset();
            let Some(bytes) = self
                .window
                .slice(slice_start, self.window.data_length())
                .map(|s| s.to_vec())
            else {
                self.completed = true;
                self.eof = true;
                return Ok(ProcessResult::Completed);
            };
            match self.map.advance(&bytes, slice_start, decoder.as_ref(), &opts) {
                Advance::Appended => continue,
                Advance::NeedMoreData => {
                    if self.map.processed_offset() >= self.size {
                        self.completed = true;
                        self.eof = true;
                        return Ok(ProcessResult::Completed);
                    }
                    // Need a bigger window; force-load further ahead.
                    self.window.ensure(
                        self.source.as_deref_mut().expect("content open"),
                        request + self.window.slop() as u64,
                    )?;
                }
                Advance::NeedResync(offset) => {
                    self.window.ensure(self.source.as_deref_mut().expect("content open"), offset)?;
                }
                Advance::EndOfStream => {
                    self.completed = true;
                    self.eof = true;
                    return Ok(ProcessResult::Completed);
                }
            }
        }
    }

    pub fn process_to_end(&mut self, interrupt: &dyn Fn() -> bool) -> Result<ProcessResult, ViewerError> {
        self.process_through(usize::MAX - 1, interrupt)
    }

    fn ensure_window(&mut self, offset: FileOffset, length: usize) -> Result<(), ViewerError> {
        if self.window.covers(offset, length) {
            return Ok(());
        }
        let source = self.source.as_deref_mut().ok_or_else(|| ViewerError::NotFound("no content open".into()))?;
        self.window.ensure(source, offset)?;
        Ok(())
    }

    /// Render one logical line for the text/line view.
    pub fn format_line_data(
        &mut self,
        line: usize,
        left_offset: u16,
        max_width: u16,
        found: Option<&FoundDescriptor>,
    ) -> Result<FormattedRow, ViewerError> {
        let offset = self.map.get_offset(line).ok_or(ViewerError::Aborted)?;
        let len = self.map.get_length(line).ok_or(ViewerError::Aborted)? as usize;
        self.ensure_window(offset, len)?;
        let raw = self
            .window
            .slice(offset, len)
            .ok_or(ViewerError::Aborted)?
            .to_vec();
        let raw = trim_line_ending(&raw, self.options.show_line_endings);
        let decoder = self.decoder(false);
        let text = decode_line_text(raw, decoder.as_ref());

        let mut row = FormattedRow::default();
        let line_number = self.map.get_line_number(line).unwrap_or(0);
        row.push(format!("{line_number:>5} "), SpanStyle::Margin);
        row.push(":", SpanStyle::Divider);

        let mut col: u16 = 0;
        let mut rendered = String::new();
        for (i, ch) in text.chars().enumerate() {
            let (glyph, style, width) = render_char(ch, &self.options);
            let is_found = found.is_some_and(|f| f.valid && f.is_line && (i as u64) >= f.offset && (i as u64) < f.offset + f.len as u64);
            if col >= left_offset && col < left_offset + max_width {
                if is_found {
                    if !rendered.is_empty() {
                        row.push(rendered.clone(), SpanStyle::Text);
                        rendered.clear();
                    }
                    row.push(glyph.clone(), SpanStyle::Found);
                } else {
                    rendered.push_str(&glyph);
                    if style == SpanStyle::Control {
                        row.push(rendered.clone(), SpanStyle::Control);
                        rendered.clear();
                    }
                }
            }
            col = col.saturating_add(width);
        }
        if !rendered.is_empty() {
            row.push(rendered, SpanStyle::Text);
        }
        Ok(row)
    }

    /// Render one hex row: offset column, grouped hex bytes, character
    /// column, with patch-journal override coloring.
    pub fn format_hex_data(
        &mut self,
        offset: FileOffset,
        hex_bytes: usize,
        hex_grouping: u32,
        found: Option<&FoundDescriptor>,
    ) -> Result<FormattedRow, ViewerError> {
        self.ensure_window(offset, hex_bytes)?;
        let raw = self
            .window
            .slice(offset, hex_bytes)
            .ok_or(ViewerError::Aborted)?
            .to_vec();

        let mut row = FormattedRow::default();
        let offset_style = if offset % 1024 == 0 {
            SpanStyle::OffsetHighlight
        } else {
            SpanStyle::Margin
        };
        row.push(format!("{offset:08x}"), offset_style);
        if let Some(idx) = self.map.offset_to_index(offset) {
            if let Some(n) = self.map.get_line_number(idx) {
                row.push(format!(" L{n:<5}"), SpanStyle::Margin);
            }
        }
        row.push(":", SpanStyle::Divider);

        let group = 1usize << hex_grouping;
        for (i, &byte) in raw.iter().enumerate() {
            if i > 0 && i % group == 0 {
                row.push(" ", SpanStyle::Divider);
            }
            if i > 0 && i % HEX_GROUP_GAP_EVERY == 0 {
                row.push(" ", SpanStyle::Divider);
            }
            let byte_offset = offset + i as u64;
            let is_found = found.is_some_and(|f| f.valid && !f.is_line && byte_offset >= f.offset && byte_offset < f.offset + f.len as u64);
            let style = match (is_found, self.patches.is_byte_dirty(byte_offset)) {
                (true, _) => SpanStyle::Found,
                (false, Some((_, ByteColor::Edited))) => SpanStyle::EditedByte,
                (false, Some((_, ByteColor::Saved))) => SpanStyle::SavedByte,
                (false, None) => SpanStyle::Text,
            };
            let shown = self.patches.is_byte_dirty(byte_offset).map(|(v, _)| v).unwrap_or(byte);
            row.push(format!("{shown:02x} "), style);
        }

        row.push(":", SpanStyle::Divider);
        for (i, &byte) in raw.iter().enumerate() {
            let byte_offset = offset + i as u64;
            let shown = self.patches.is_byte_dirty(byte_offset).map(|(v, _)| v).unwrap_or(byte);
            let ch = if (0x20..0x7F).contains(&shown) {
                shown as char
            } else {
                '.'
            };
            row.push(ch.to_string(), SpanStyle::Text);
        }
        Ok(row)
    }

    pub fn set_byte(&mut self, offset: FileOffset, nibble: u8, high_nibble: bool) -> Result<(), ViewerError> {
        self.ensure_window(offset & !(core_patch::BLOCK_SIZE - 1), core_patch::BLOCK_SIZE as usize)?;
        let window = &self.window;
        let block_offset = offset & !(core_patch::BLOCK_SIZE - 1);
        let byte_in_block = (offset - block_offset) as usize;
        let disk = window
            .slice(block_offset, core_patch::BLOCK_SIZE as usize)
            .map(|b| b[byte_in_block])
            .unwrap_or(0);
        self.patches.set_byte(offset, nibble, high_nibble, || disk);
        Ok(())
    }

    pub fn revert_byte(&mut self, offset: FileOffset) -> bool {
        self.patches.revert_byte(offset)
    }

    pub fn is_dirty(&self) -> bool {
        self.patches.is_dirty()
    }

    pub fn save(&mut self) -> Result<(), ViewerError> {
        let path = self
            .write_path
            .clone()
            .ok_or_else(|| ViewerError::SaveFailure("no writable file".into()))?;
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| ViewerError::SaveFailure(e.to_string()))?;
        self.patches
            .save(&mut file as &mut dyn RandomAccessWrite)
            .map_err(|e| ViewerError::SaveFailure(e.to_string()))?;
        self.invalidate_map();
        Ok(())
    }

    pub fn undo_save(&mut self) -> Result<(), ViewerError> {
        let path = self
            .write_path
            .clone()
            .ok_or_else(|| ViewerError::SaveFailure("no writable file".into()))?;
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| ViewerError::SaveFailure(e.to_string()))?;
        self.patches
            .undo_save(&mut file as &mut dyn RandomAccessWrite)
            .map_err(|e| ViewerError::SaveFailure(e.to_string()))?;
        self.invalidate_map();
        Ok(())
    }

    /// Line-mode find, starting from `found` (cleared for "find from top").
    ///
    /// Searches the decoded source text, not the rendered row, so a match's
    /// ⟨offset, len⟩ bounds the needle in source characters rather than in
    /// display cells. A needle that straddles a wrap/max-length break is
    /// still found once by extending the probed bytes past the logical
    /// line's own end (mirroring [`Self::find_hex`]'s `needle_delta`
    /// extension) but never past a real newline. On a hit, `left_offset` is
    /// updated to the horizontal scroll that keeps the match on screen.
    pub fn find_line(
        &mut self,
        next: bool,
        searcher: &mut dyn Searcher,
        max_width: u16,
        found: &mut FoundDescriptor,
        left_offset: &mut u16,
        interrupt: &dyn Fn() -> bool,
    ) -> Result<bool, ViewerError> {
        let mut start_line = if found.valid && found.is_line {
            found.line_or_offset as usize
        } else {
            0
        };
        loop {
            if next {
                start_line += 1;
            } else if start_line == 0 {
                found.clear();
                return Ok(false);
            } else {
                start_line -= 1;
            }
            if self.process_through(start_line, interrupt)? == ProcessResult::Aborted {
                return Err(ViewerError::Aborted);
            }
            if start_line >= self.map.count() {
                found.clear();
                return Ok(false);
            }
            let offset = self.map.get_offset(start_line).ok_or(ViewerError::Aborted)?;
            let len = self.map.get_length(start_line).ok_or(ViewerError::Aborted)? as usize;
            self.ensure_window(offset, len)?;
            let raw = self.window.slice(offset, len).ok_or(ViewerError::Aborted)?.to_vec();
            let own_line_chars = {
                let trimmed = trim_line_ending(&raw, self.options.show_line_endings);
                decode_line_text(trimmed, self.decoder(false).as_ref()).chars().count()
            };

            let had_newline = raw.last() == Some(&b'\n');
            let mut probe = raw.clone();
            if !had_newline {
                let extend = searcher.needle_delta().saturating_sub(1);
                if extend > 0 {
                    self.ensure_window(offset, len + extend)?;
                    if let Some(full) = self.window.slice(offset, len + extend) {
                        let extra = &full[len..];
                        let cut = extra
                            .iter()
                            .position(|&b| b == b'\n')
                            .map(|p| p + 1)
                            .unwrap_or(extra.len());
                        probe = full[..len + cut].to_vec();
                    }
                }
            }
            let trimmed = trim_line_ending(&probe, self.options.show_line_endings);
            let decoder = self.decoder(false);
            let text = decode_line_text(trimmed, decoder.as_ref());

            if let Some(Match { start, length }) = searcher.find_in_line(&text) {
                if start >= own_line_chars {
                    continue;
                }
                found.valid = true;
                found.is_line = true;
                found.line_or_offset = start_line as u64;
                found.offset = start as u64;
                found.len = length as u32;
                *left_offset = centered_left_offset(&text, start, length, max_width, &self.options);
                return Ok(true);
            }
        }
    }

    /// Hex-mode find: walk row by row, extending the probed range by the
    /// searcher's needle delta (minus one byte) so a needle split across a
    /// row boundary is still found.
    pub fn find_hex(
        &mut self,
        next: bool,
        searcher: &mut dyn Searcher,
        hex_width: u64,
        found: &mut FoundDescriptor,
    ) -> Result<bool, ViewerError> {
        let mut offset = if found.valid && !found.is_line {
            found.offset
        } else if next {
            0
        } else {
            self.get_max_hex_offset(hex_width)
        };
        let max_offset = self.get_max_hex_offset(hex_width);
        loop {
            if next {
                offset += hex_width;
                if offset > max_offset {
                    found.clear();
                    return Ok(false);
                }
            } else {
                if offset == 0 {
                    found.clear();
                    return Ok(false);
                }
                offset -= hex_width;
            }
            let extend = searcher.needle_delta().saturating_sub(1);
            let probe_len = (hex_width as usize + extend).min((self.size - offset) as usize);
            self.ensure_window(offset, probe_len)?;
            let Some(bytes) = self.window.slice(offset, probe_len) else {
                continue;
            };
            let text: String = bytes.iter().map(|&b| b as char).collect();
            if let Some(Match { start, length }) = searcher.find_in_line(&text) {
                found.valid = true;
                found.is_line = false;
                found.offset = offset + start as u64;
                found.len = length as u32;
                return Ok(true);
            }
        }
    }
}

/// Horizontal scroll offset that keeps a match visible within a
/// `max_width`-wide window: the largest `left_offset` in
/// `[0, line_cells - max_width]` such that both the match's start and end
/// columns fit in `[left_offset, left_offset + max_width)`, or the match's
/// start column itself if the needle is wider than the window.
fn centered_left_offset(text: &str, start: usize, length: usize, max_width: u16, opts: &ViewerOptions) -> u16 {
    if max_width == 0 {
        return 0;
    }
    let mut columns = Vec::with_capacity(text.chars().count() + 1);
    let mut col: u16 = 0;
    columns.push(col);
    for ch in text.chars() {
        let (_, _, width) = render_char(ch, opts);
        col = col.saturating_add(width);
        columns.push(col);
    }
    let line_cells = col;
    let start_col = columns.get(start).copied().unwrap_or(line_cells);
    let end_col = columns.get(start + length).copied().unwrap_or(line_cells);
    let upper = line_cells.saturating_sub(max_width);
    if end_col.saturating_sub(start_col) > max_width {
        return start_col.min(upper);
    }
    let min_left = end_col.saturating_sub(max_width);
    start_col.min(upper).max(min_left)
}

/// Render one decoded codepoint into its on-screen glyph, the span style to
/// paint it with, and its display width. Caret/tab glyphs are plain ASCII,
/// so their width is just their character count, not [`core_text::egc_width`]
/// (which assumes a single grapheme cluster and would misjudge multi-char
/// ASCII substitutions as narrow).
fn render_char(ch: char, opts: &ViewerOptions) -> (String, SpanStyle, u16) {
    let cp = ch as u32;
    if cp == b'\t' as u32 {
        let glyph = " ".repeat(opts.tab_width as usize);
        let width = glyph.chars().count() as u16;
        return (glyph, SpanStyle::Text, width);
    }
    if cp < 0x20 || cp == 0x7F {
        let glyph = match opts.control_mode {
            ControlRenderMode::Caret => format!("^{}", (((cp + 0x40) & 0x7F) as u8) as char),
            ControlRenderMode::Period => ".".to_string(),
            ControlRenderMode::Space => " ".to_string(),
            ControlRenderMode::Oem437 => oem437_glyph(cp as u8),
        };
        let width = glyph.chars().count() as u16;
        return (glyph, SpanStyle::Control, width);
    }
    let width = core_text::egc_width(&ch.to_string());
    (ch.to_string(), SpanStyle::Text, width)
}

fn oem437_glyph(b: u8) -> String {
    const TABLE: [char; 32] = [
        ' ', '\u{263a}', '\u{263b}', '\u{2666}', '\u{2665}', '\u{2664}', '\u{2663}', '\u{2022}',
        '\u{25db}', '\u{25cb}', '\u{25d9}', '\u{2642}', '\u{2640}', '\u{266a}', '\u{266b}', '\u{263c}',
        '\u{25ba}', '\u{25c4}', '\u{2195}', '\u{203c}', '\u{00b6}', '\u{00a7}', '\u{25ac}', '\u{21a8}',
        '\u{2191}', '\u{2193}', '\u{2192}', '\u{2190}', '\u{221f}', '\u{2194}', '\u{25b2}', '\u{25bc}',
    ];
    TABLE[(b as usize).min(31)].to_string()
}

fn classify_io(path: &Path, e: io::Error) -> ViewerError {
    match e.kind() {
        io::ErrorKind::NotFound => ViewerError::NotFound(path.display().to_string()),
        io::ErrorKind::PermissionDenied => ViewerError::PermissionDenied(path.display().to_string()),
        _ => ViewerError::Io(e),
    }
}

fn default_encoding() -> EncodingDescriptor {
    Detector::new().detect(&[], true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn always_false() -> bool {
        false
    }

    #[test]
    fn open_text_file_and_process() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "hello world").unwrap();
        writeln!(file, "second line").unwrap();
        let mut cache = Cache::new(ViewerOptions {
            wrap_width: None,
            ..ViewerOptions::default()
        });
        cache.open(file.path()).unwrap();
        let result = cache.process_to_end(&always_false).unwrap();
        assert_eq!(result, ProcessResult::Completed);
        assert_eq!(cache.count(), 2);
        assert_eq!(cache.get_length(0), Some(12));
    }

    #[test]
    fn text_content_roundtrip_for_help_viewer() {
        let mut cache = Cache::new(ViewerOptions::default());
        cache.set_text_content("line one\nline two\n");
        cache.process_to_end(&always_false).unwrap();
        assert_eq!(cache.count(), 2);
    }

    #[test]
    fn hex_patch_via_cache_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 16]).unwrap();
        let mut cache = Cache::new(ViewerOptions::default());
        cache.open(file.path()).unwrap();
        cache.set_byte(5, 0xA, true).unwrap();
        cache.set_byte(5, 0xB, false).unwrap();
        assert!(cache.is_dirty());
        cache.save().unwrap();
        assert!(!cache.is_dirty());
    }
}
