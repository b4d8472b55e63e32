//! Text-side content subsystem: encoding-aware line reflow, the line map
//! index, and grapheme display width.

pub mod linemap;
pub mod reflow;
pub mod width;

pub use linemap::{Advance, LineFormatting, LineMap};
pub use reflow::{BreakKind, ControlRenderMode, FileOffset, LineBreak, Reflow, ReflowOptions, StepOutcome};
pub use width::egc_width;

use core_encoding::Decoder;

/// Strip a trailing CR, LF, or CRLF from a line's raw byte length, matching
/// the view's default of not showing line-ending characters. `show_endings`
/// keeps them in place for the "show line endings" display mode.
pub fn trim_line_ending(bytes: &[u8], show_endings: bool) -> &[u8] {
    if show_endings {
        return bytes;
    }
    if let Some(&last) = bytes.last() {
        if last == b'\n' {
            let without_lf = &bytes[..bytes.len() - 1];
            return match without_lf.last() {
                Some(b'\r') => &without_lf[..without_lf.len() - 1],
                _ => without_lf,
            };
        }
    }
    bytes
}

/// Decode a line's raw bytes into a `String` using the decoder for its
/// active code page, replacing invalid sequences with U+FFFD as decoders
/// already do per-step.
pub fn decode_line_text(bytes: &[u8], decoder: &dyn Decoder) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let step = decoder.decode(&bytes[pos..]);
        out.push(core_encoding::decoder::codepoint_to_char(step.codepoint));
        pos += step.consumed.max(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trim_line_ending_strips_crlf() {
        assert_eq!(trim_line_ending(b"hello\r\n", false), b"hello");
        assert_eq!(trim_line_ending(b"hello\n", false), b"hello");
        assert_eq!(trim_line_ending(b"hello", false), b"hello");
        assert_eq!(trim_line_ending(b"hello\r\n", true), b"hello\r\n");
    }

    #[test]
    fn decode_line_text_utf8() {
        let decoder = core_encoding::decoder_for(core_encoding::CP_UTF8, false);
        assert_eq!(decode_line_text(b"hi", decoder.as_ref()), "hi");
    }
}
