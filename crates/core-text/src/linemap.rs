//! Line map: the parallel index arrays built incrementally by driving a
//! [`Reflow`] forward over newly-available bytes. Owns no file I/O itself —
//! callers (the content cache) supply bytes via [`LineMap::advance`] and
//! this module only tracks offsets, per-line formatting info, and friendly
//! (physical) line numbers.

use crate::reflow::{BreakKind, FileOffset, Reflow, ReflowOptions, StepOutcome};
use core_encoding::Decoder;

/// Per-line formatting carried forward only for continuation lines produced
/// by a wrap (never meaningful after a true newline, where it is zero).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineFormatting {
    pub leading_indent: u16,
}

/// Outcome of feeding more bytes into the line map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// At least one line was appended; caller may ask for more or stop.
    Appended,
    /// No more lines can be produced from the bytes given; more data (or
    /// end of stream) is needed.
    NeedMoreData,
    /// The underlying reflow engine needs bytes from an earlier offset
    /// than what was supplied (see `Reflow`'s resync outcome). The caller
    /// must reload its window to include `FileOffset` and call again.
    NeedResync(FileOffset),
    /// Reached the end of the stream; no further lines exist.
    EndOfStream,
}

/// Parallel arrays indexed by logical line index, plus the scalar watermark
/// of how much of the stream has been folded into the map so far.
#[derive(Default)]
pub struct LineMap {
    offsets: Vec<FileOffset>,
    byte_lengths: Vec<u32>,
    formatting: Vec<LineFormatting>,
    line_numbers: Vec<u32>,
    processed_offset: FileOffset,
    physical_line: u32,
    reflow: Option<Reflow>,
    stream_len: Option<FileOffset>,
}

impl LineMap {
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            byte_lengths: Vec::new(),
            formatting: vec![LineFormatting::default()],
            line_numbers: vec![1],
            processed_offset: 0,
            physical_line: 1,
            reflow: None,
            stream_len: None,
        }
    }

    /// Total length of the underlying stream, once known (unknown for an
    /// in-progress pipe capture).
    pub fn set_stream_len(&mut self, len: FileOffset) {
        self.stream_len = Some(len);
    }

    pub fn processed_offset(&self) -> FileOffset {
        self.processed_offset
    }

    pub fn count(&self) -> usize {
        self.offsets.len().saturating_sub(if self.byte_lengths.len() < self.offsets.len() {
            1
        } else {
            0
        })
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Feed the resident window `[slice_start, slice_start + bytes.len())`
    /// into the reflow engine, appending as many complete logical lines as
    /// it can produce.
    pub fn advance(
        &mut self,
        bytes: &[u8],
        slice_start: FileOffset,
        decoder: &dyn Decoder,
        opts: &ReflowOptions,
    ) -> Advance {
        if self
            .stream_len
            .is_some_and(|len| self.processed_offset >= len)
        {
            return Advance::EndOfStream;
        }

        let r = self
            .reflow
            .get_or_insert_with(|| Reflow::new(self.processed_offset));

        let mut appended = false;
        loop {
            match r.step(bytes, slice_start, decoder, opts) {
                StepOutcome::Exhausted => {
                    if let Some(len) = self.stream_len {
                        if slice_start + bytes.len() as u64 >= len && r.line_start() < len {
                            // Final partial line with no trailing newline.
                            let byte_len = (len - r.line_start()) as u32;
                            if byte_len > 0 {
                                self.push_line(r.line_start(), byte_len, 0, BreakKind::Newline);
                                self.processed_offset = len;
                                appended = true;
                            }
                            self.reflow = None;
                            return Advance::Appended;
                        }
                    }
                    return if appended {
                        Advance::Appended
                    } else {
                        Advance::NeedMoreData
                    };
                }
                StepOutcome::Break(lb) => {
                    if lb.kind == BreakKind::WrapResyncSkip {
                        return Advance::NeedResync(lb.resync_to.unwrap_or(self.processed_offset));
                    }
                    let line_start = self.processed_offset;
                    self.push_line(line_start, lb.byte_len, lb.next_leading_indent, lb.kind);
                    self.processed_offset += lb.byte_len as u64;
                    appended = true;
                }
            }
        }
    }

    fn push_line(&mut self, offset: FileOffset, byte_len: u32, next_indent: u16, kind: BreakKind) {
        // `offsets`/`line_numbers`/`formatting` are pre-seeded with line 0's
        // start; byte_lengths trails by one entry until this call fills it.
        let idx = self.byte_lengths.len();
        self.byte_lengths.push(byte_len);
        self.offsets[idx] = offset;
        if kind == BreakKind::Newline {
            self.physical_line += 1;
        }
        self.offsets.push(offset + byte_len as u64);
        self.formatting[idx] = LineFormatting {
            leading_indent: if idx == 0 { 0 } else { self.formatting[idx].leading_indent },
        };
        self.formatting.push(LineFormatting {
            leading_indent: next_indent,
        });
        self.line_numbers[idx] = if kind == BreakKind::Newline {
            self.physical_line - 1
        } else {
            self.physical_line
        };
        self.line_numbers.push(self.physical_line);
    }

    pub fn get_offset(&self, index: usize) -> Option<FileOffset> {
        self.offsets.get(index).copied()
    }

    pub fn get_length(&self, index: usize) -> Option<u32> {
        self.byte_lengths.get(index).copied()
    }

    pub fn get_formatting_info(&self, index: usize) -> Option<LineFormatting> {
        self.formatting.get(index).copied()
    }

    pub fn get_line_number(&self, index: usize) -> Option<u32> {
        self.line_numbers.get(index).copied()
    }

    /// Binary search for the line index covering `offset`.
    pub fn offset_to_index(&self, offset: FileOffset) -> Option<usize> {
        if self.byte_lengths.is_empty() {
            return None;
        }
        match self.offsets[..self.byte_lengths.len()].binary_search(&offset) {
            Ok(i) => Some(i),
            Err(0) => None,
            Err(i) => Some(i - 1),
        }
    }

    /// Binary search the friendly (1-based physical) line number to an
    /// index. Falls back to `n - 1` when line numbers are monotonic and the
    /// direct arithmetic mapping holds (no wrapped continuations yet seen).
    pub fn friendly_line_number_to_index(&self, n: u32) -> Option<usize> {
        if self.line_numbers.is_empty() {
            return None;
        }
        let slice = &self.line_numbers[..self.byte_lengths.len()];
        match slice.binary_search(&n) {
            Ok(i) => Some(i),
            Err(i) if i < slice.len() => Some(i),
            Err(_) => slice.len().checked_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_encoding::decoder_for;

    fn opts() -> ReflowOptions {
        ReflowOptions {
            wrap_width: Some(9),
            max_line_length: 1024,
            ..ReflowOptions::default()
        }
    }

    #[test]
    fn builds_monotonic_tiling_index() {
        let data = b"aaaa bbbb cccc dddd\n";
        let decoder = decoder_for(core_encoding::CP_UTF8, false);
        let mut map = LineMap::new();
        map.set_stream_len(data.len() as u64);
        loop {
            match map.advance(data, 0, decoder.as_ref(), &opts()) {
                Advance::Appended => continue,
                Advance::NeedMoreData | Advance::EndOfStream => break,
                Advance::NeedResync(_) => panic!("unexpected resync"),
            }
        }
        assert!(map.count() >= 2);
        for i in 0..map.count() {
            let start = map.get_offset(i).unwrap();
            let len = map.get_length(i).unwrap();
            assert_eq!(map.get_offset(i + 1).unwrap(), start + len as u64);
        }
        assert_eq!(map.processed_offset(), data.len() as u64);
    }

    #[test]
    fn offset_to_index_finds_containing_line() {
        let data = b"hi\r\nok\n";
        let decoder = decoder_for(core_encoding::CP_UTF8, false);
        let mut map = LineMap::new();
        map.set_stream_len(data.len() as u64);
        while matches!(
            map.advance(data, 0, decoder.as_ref(), &ReflowOptions::default()),
            Advance::Appended
        ) {}
        assert_eq!(map.offset_to_index(0), Some(0));
        assert_eq!(map.offset_to_index(4), Some(1));
    }
}
