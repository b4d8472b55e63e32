//! Line iterator / reflow engine.
//!
//! A small state machine that turns a stream of decoded codepoints into
//! logical-line break positions with byte length, display width, and the
//! hanging indent to carry into the next logical line. It is fed
//! incrementally: each [`Reflow::step`] call receives whatever bytes are
//! currently available starting at `slice_start`, and returns either
//! [`StepOutcome::Exhausted`] (call again once more bytes are resident) or
//! a completed [`LineBreak`].
//!
//! The resync case is modelled as an explicit outcome rather than an
//! implicit yield: smart-wrap break candidates are recorded as absolute
//! file offsets, so if the caller's window has scrolled past the bytes
//! needed to finish a deferred whitespace skip, `step` returns
//! `WrapResyncSkip` carrying the offset the caller must reload before
//! calling `step` again.

use core_encoding::Decoder;

pub type FileOffset = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRenderMode {
    /// `^X` style, two display cells.
    Caret,
    /// OEM-437 pictograph glyph, one display cell.
    Oem437,
    /// A single period substitute, one display cell.
    Period,
    /// A blank space, one display cell.
    Space,
}

impl ControlRenderMode {
    pub fn width(self) -> u16 {
        match self {
            ControlRenderMode::Caret => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReflowOptions {
    /// `None` disables word-wrap entirely (only `BreakMax`/`BreakNewline` apply).
    pub wrap_width: Option<u16>,
    pub max_line_length: u32,
    pub tab_width: u16,
    pub expand_tabs: bool,
    /// True when the source is binary-classified or hex-forced: disables
    /// smart-wrap whitespace tracking and treats every codepoint as a
    /// literal byte-wide cell (other than tab/control handling).
    pub binary_mode: bool,
    pub control_mode: ControlRenderMode,
    pub help_mode_secondary_indent: bool,
}

impl Default for ReflowOptions {
    fn default() -> Self {
        Self {
            wrap_width: None,
            max_line_length: 4096,
            tab_width: 8,
            expand_tabs: true,
            binary_mode: false,
            control_mode: ControlRenderMode::Caret,
            help_mode_secondary_indent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Newline,
    Max,
    Wrap,
    WrapSkip,
    WrapResyncSkip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineBreak {
    pub kind: BreakKind,
    /// Byte length of the emitted logical line. Zero for `WrapResyncSkip`,
    /// which emits nothing and only carries a resume instruction.
    pub byte_len: u32,
    /// Display width of the line's content (terminator and any skipped
    /// trailing whitespace excluded).
    pub width: u16,
    /// Leading indent (in cells) to apply to the next logical line.
    pub next_leading_indent: u16,
    /// Set only for `WrapResyncSkip`: the absolute file offset the caller
    /// must make resident before calling `step` again.
    pub resync_to: Option<FileOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Consumed everything currently available; no full line yet.
    Exhausted,
    Break(LineBreak),
}

#[derive(Debug, Clone, Copy)]
enum Leading {
    Accumulating(u16),
    Done(u16),
}

#[derive(Debug, Clone, Copy)]
struct PendingBreak {
    cut_offset: FileOffset,
    width_at_cut: u16,
}

#[derive(Debug, Clone, Copy)]
struct SkipState {
    kind: BreakKind,
    byte_len: u32,
    width: u16,
}

/// Stateful line iterator driven in a loop by [`crate::linemap::LineMap`].
pub struct Reflow {
    line_start: FileOffset,
    cursor: FileOffset,
    width: u16,
    leading: Leading,
    pending_break: Option<PendingBreak>,
    in_whitespace_run: bool,
    skip: Option<SkipState>,
    help_indent: Option<u16>,
    at_stream_start: bool,
    bom_suppressed: bool,
}

impl Reflow {
    pub fn new(start_offset: FileOffset) -> Self {
        Self {
            line_start: start_offset,
            cursor: start_offset,
            width: 0,
            leading: Leading::Accumulating(0),
            pending_break: None,
            in_whitespace_run: false,
            skip: None,
            help_indent: None,
            at_stream_start: start_offset == 0,
            bom_suppressed: false,
        }
    }

    pub fn line_start(&self) -> FileOffset {
        self.line_start
    }

    fn start_new_line(&mut self, at: FileOffset, next_leading_indent: u16) {
        self.line_start = at;
        self.cursor = at;
        self.width = 0;
        self.leading = Leading::Accumulating(next_leading_indent);
        self.pending_break = None;
        self.in_whitespace_run = false;
        self.help_indent = None;
        self.at_stream_start = false;
    }

    fn hanging_indent(&self, opts: &ReflowOptions) -> u16 {
        let base = match self.leading {
            Leading::Accumulating(n) | Leading::Done(n) => n,
        };
        let extra = self.help_indent.unwrap_or(0).max(base);
        extra.min((opts.max_line_length / 2) as u16)
    }

    /// Feed the currently-resident bytes starting at `slice_start` (must be
    /// `<= self.cursor`, i.e. the slice may start earlier than the current
    /// scan position but never later than what has already been consumed).
    pub fn step(
        &mut self,
        bytes: &[u8],
        slice_start: FileOffset,
        decoder: &dyn Decoder,
        opts: &ReflowOptions,
    ) -> StepOutcome {
        if let Some(skip) = self.skip {
            return self.continue_skip(skip, bytes, slice_start, decoder);
        }

        loop {
            if self.cursor < slice_start {
                // Shouldn't happen in the primary forward-ingest path; only
                // reachable if a caller re-sliced a window that dropped
                // bytes we still need. Ask for them back explicitly.
                return StepOutcome::Break(LineBreak {
                    kind: BreakKind::WrapResyncSkip,
                    byte_len: 0,
                    width: 0,
                    next_leading_indent: 0,
                    resync_to: Some(self.cursor),
                });
            }
            let local = (self.cursor - slice_start) as usize;
            if local >= bytes.len() {
                return StepOutcome::Exhausted;
            }

            let step = decoder.decode(&bytes[local..]);
            let consumed = step.consumed as u64;

            // BOM suppression: zero-width, zero-visible-effect at the very
            // start of the stream; elsewhere a BOM decodes to U+FFFD by the
            // decoder itself and is rendered like any other codepoint.
            if self.at_stream_start && !self.bom_suppressed && step.codepoint == 0xFEFF {
                self.bom_suppressed = true;
                self.cursor += consumed;
                continue;
            }

            if step.codepoint == 0x0A {
                // LF: terminates the line. A preceding CR (already counted
                // in `width`/bytes as a control char otherwise) is folded
                // into the terminator by checking the immediately prior
                // decoded byte via a one-byte lookback when possible.
                let had_cr = local > 0 && bytes[local - 1] == b'\r';
                let byte_len = (self.cursor - self.line_start + consumed) as u32;
                let width = if had_cr {
                    self.width.saturating_sub(opts.control_mode.width())
                } else {
                    self.width
                };
                self.cursor += consumed;
                let start_at = self.cursor;
                self.start_new_line(start_at, 0);
                return StepOutcome::Break(LineBreak {
                    kind: BreakKind::Newline,
                    byte_len,
                    width,
                    next_leading_indent: 0,
                    resync_to: None,
                });
            }

            let char_width = self.codepoint_width(step.codepoint, opts);

            let prospective_bytes = (self.cursor - self.line_start + consumed) as u32;
            if prospective_bytes > opts.max_line_length && self.cursor > self.line_start {
                let byte_len = (self.cursor - self.line_start) as u32;
                let next_indent = self.hanging_indent(opts);
                let width = self.width;
                let at = self.cursor;
                self.start_new_line(at, next_indent);
                return StepOutcome::Break(LineBreak {
                    kind: BreakKind::Max,
                    byte_len,
                    width,
                    next_leading_indent: next_indent,
                    resync_to: None,
                });
            }

            if let Some(w) = opts.wrap_width {
                if !opts.binary_mode && self.width + char_width > w && self.cursor > self.line_start
                {
                    if let Some(pending) = self.pending_break {
                        if pending.cut_offset < slice_start {
                            return StepOutcome::Break(LineBreak {
                                kind: BreakKind::WrapResyncSkip,
                                byte_len: 0,
                                width: 0,
                                next_leading_indent: 0,
                                resync_to: Some(pending.cut_offset),
                            });
                        }
                        let byte_len = (pending.cut_offset - self.line_start) as u32;
                        let next_indent = self.hanging_indent(opts);
                        let skip = SkipState {
                            kind: BreakKind::WrapSkip,
                            byte_len,
                            width: pending.width_at_cut,
                        };
                        self.cursor = pending.cut_offset;
                        return self.continue_skip(skip, bytes, slice_start, decoder);
                    }
                    // No smart-wrap candidate recorded: hard cut here.
                    let byte_len = (self.cursor - self.line_start) as u32;
                    let next_indent = self.hanging_indent(opts);
                    let width = self.width;
                    let at = self.cursor;
                    self.start_new_line(at, next_indent);
                    return StepOutcome::Break(LineBreak {
                        kind: BreakKind::Wrap,
                        byte_len,
                        width,
                        next_leading_indent: next_indent,
                        resync_to: None,
                    });
                }
            }

            // Accumulate: update leading-indent tracking, help-mode indent
            // detection, and the smart-wrap candidate before advancing.
            let is_ws = step.codepoint == b' ' as u32 || step.codepoint == b'\t' as u32;
            match self.leading {
                Leading::Accumulating(n) if is_ws && !opts.binary_mode => {
                    let add = if step.codepoint == b'\t' as u32 {
                        opts.tab_width - (n % opts.tab_width.max(1))
                    } else {
                        1
                    };
                    self.leading = Leading::Accumulating(n + add);
                }
                Leading::Accumulating(n) => {
                    self.leading = Leading::Done(n);
                }
                Leading::Done(_) => {}
            }

            if opts.help_mode_secondary_indent
                && !opts.binary_mode
                && self.help_indent.is_none()
                && matches!(self.leading, Leading::Done(_))
                && (self.cursor - self.line_start) < 24
                && step.codepoint == b' ' as u32
                && local + 1 < bytes.len()
                && bytes[local + 1] == b' '
            {
                self.help_indent = Some(self.width);
            }

            // The break candidate is the start of the most recent whitespace
            // run, and stays live through the word that follows it: only a
            // later whitespace run supersedes it, a non-whitespace codepoint
            // never clears it.
            if !opts.binary_mode {
                if is_ws {
                    if !self.in_whitespace_run {
                        self.pending_break = Some(PendingBreak {
                            cut_offset: self.cursor,
                            width_at_cut: self.width,
                        });
                        self.in_whitespace_run = true;
                    }
                } else {
                    self.in_whitespace_run = false;
                }
            }

            self.width += char_width;
            self.cursor += consumed;
        }
    }

    fn continue_skip(
        &mut self,
        skip: SkipState,
        bytes: &[u8],
        slice_start: FileOffset,
        decoder: &dyn Decoder,
    ) -> StepOutcome {
        loop {
            if self.cursor < slice_start {
                self.skip = Some(skip);
                return StepOutcome::Break(LineBreak {
                    kind: BreakKind::WrapResyncSkip,
                    byte_len: 0,
                    width: 0,
                    next_leading_indent: 0,
                    resync_to: Some(self.cursor),
                });
            }
            let local = (self.cursor - slice_start) as usize;
            if local >= bytes.len() {
                self.skip = Some(skip);
                return StepOutcome::Exhausted;
            }
            let step = decoder.decode(&bytes[local..]);
            let is_ws = step.codepoint == b' ' as u32 || step.codepoint == b'\t' as u32;
            if !is_ws {
                self.skip = None;
                let next_indent = 0; // recomputed by caller via leading state of new line
                let at = self.cursor;
                self.start_new_line(at, next_indent);
                return StepOutcome::Break(LineBreak {
                    kind: skip.kind,
                    byte_len: skip.byte_len,
                    width: skip.width,
                    next_leading_indent: next_indent,
                    resync_to: None,
                });
            }
            self.cursor += step.consumed as u64;
        }
    }

    fn codepoint_width(&self, codepoint: u32, opts: &ReflowOptions) -> u16 {
        if codepoint == b'\t' as u32 {
            return if opts.expand_tabs {
                opts.tab_width - ((self.width) % opts.tab_width.max(1))
            } else {
                opts.control_mode.width()
            };
        }
        if codepoint < 0x20 || codepoint == 0x7F {
            return opts.control_mode.width();
        }
        if opts.binary_mode {
            return 1;
        }
        let ch = core_encoding::decoder::codepoint_to_char(codepoint);
        let mut buf = [0u8; 4];
        crate::width::egc_width(ch.encode_utf8(&mut buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_encoding::decoder_for;

    fn opts_wrap(width: u16, max_len: u32) -> ReflowOptions {
        ReflowOptions {
            wrap_width: Some(width),
            max_line_length: max_len,
            tab_width: 8,
            expand_tabs: true,
            binary_mode: false,
            control_mode: ControlRenderMode::Caret,
            help_mode_secondary_indent: false,
        }
    }

    fn run_all(data: &[u8], opts: &ReflowOptions) -> Vec<LineBreak> {
        let decoder = decoder_for(core_encoding::CP_UTF8, false);
        let mut r = Reflow::new(0);
        let mut out = Vec::new();
        loop {
            match r.step(data, 0, decoder.as_ref(), opts) {
                StepOutcome::Exhausted => break,
                StepOutcome::Break(lb) => out.push(lb),
            }
        }
        out
    }

    #[test]
    fn pure_ascii_wrap() {
        // "aaaa bbbb cccc dddd\n", wrap=9, max_line_length=1024
        let data = b"aaaa bbbb cccc dddd\n";
        let opts = opts_wrap(9, 1024);
        let breaks = run_all(data, &opts);
        let mut offset = 0u64;
        let mut starts = vec![0u64];
        for b in &breaks {
            offset += b.byte_len as u64;
            if matches!(b.kind, BreakKind::Newline | BreakKind::Wrap | BreakKind::WrapSkip) {
                starts.push(offset);
            }
        }
        starts.pop(); // last entry is past-end, not a line start
        assert_eq!(starts, vec![0, 5, 10, 15]);
        assert_eq!(breaks[0].width, 4);
    }

    #[test]
    fn crlf_handling() {
        let data = b"hi\r\nok\n";
        let opts = opts_wrap(1024, 1024);
        let breaks = run_all(data, &opts);
        assert_eq!(breaks.len(), 2);
        assert_eq!(breaks[0].byte_len, 4);
        assert_eq!(breaks[1].byte_len, 3);
    }

    #[test]
    fn hard_wrap_without_whitespace_candidate() {
        // wrap=5, source "xxxab\nyy" -> first line breaks at offset 5 (wrap), no
        // smart-wrap candidate exists (no whitespace), so it's a hard Wrap.
        let data = b"xxxab\nyy";
        let opts = opts_wrap(5, 1024);
        let breaks = run_all(data, &opts);
        assert_eq!(breaks[0].kind, BreakKind::Wrap);
        assert_eq!(breaks[0].byte_len, 5);
    }

    #[test]
    fn max_line_length_hard_cuts_without_newline() {
        let data = b"0123456789";
        let opts = opts_wrap(1024, 4);
        let breaks = run_all(data, &opts);
        assert_eq!(breaks[0].kind, BreakKind::Max);
        assert_eq!(breaks[0].byte_len, 4);
    }

    #[test]
    fn smart_wrap_skips_trailing_whitespace() {
        // "hello world" with wrap width 7: candidate recorded at the space
        // after "hello"; wrapping skips that single space.
        let data = b"hello world\n";
        let opts = opts_wrap(7, 1024);
        let breaks = run_all(data, &opts);
        assert_eq!(breaks[0].kind, BreakKind::WrapSkip);
        assert_eq!(breaks[0].byte_len, 5); // "hello"
        assert_eq!(breaks[1].kind, BreakKind::Newline);
        assert_eq!(breaks[1].byte_len, 6); // "world\n"
    }
}
