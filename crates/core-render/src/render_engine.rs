//! Full-frame composition and emission.
//!
//! One call to [`compose_frame`] per input turn converts the viewer's
//! already-formatted rows (line text or hex rows, as `core_viewer::Span`
//! sequences) plus the footer status line into a [`Frame`]; [`RenderEngine`]
//! then writes the whole thing through a [`Writer`] in one contiguous pass —
//! row-major, top to bottom, so terminal wrap never leaves stray columns
//! behind from a previous, longer frame.

use core_viewer::{FormattedRow, SpanStyle};
use unicode_segmentation::UnicodeSegmentation;

use crate::writer::Writer;
use crate::{CellFlags, Frame};

fn highlighted(style: &SpanStyle) -> bool {
    matches!(style, SpanStyle::Found | SpanStyle::EditedByte | SpanStyle::SavedByte)
}

/// Lay content rows and the status line into a frame sized `width x height`.
/// The last row is reserved for status; content rows beyond `height - 1` are
/// dropped (the caller is expected to have already windowed `rows` to fit).
pub fn compose_frame(rows: &[FormattedRow], status: &str, width: u16, height: u16) -> Frame {
    let mut frame = Frame::new(width, height);
    let content_height = height.saturating_sub(1);

    for (y, row) in rows.iter().take(content_height as usize).enumerate() {
        let mut x: u16 = 0;
        for span in &row.spans {
            if x >= width {
                break;
            }
            let flags = if highlighted(&span.style) {
                CellFlags::REVERSE
            } else {
                CellFlags::empty()
            };
            for g in span.text.graphemes(true) {
                if x >= width {
                    break;
                }
                let w = core_text::egc_width(g);
                frame.set_cluster(x, y as u16, g, w, flags);
                x = x.saturating_add(w.max(1));
            }
        }
    }

    let status_y = height.saturating_sub(1);
    let mut x: u16 = 0;
    for g in status.graphemes(true) {
        if x >= width {
            break;
        }
        let w = core_text::egc_width(g);
        frame.set_cluster(x, status_y, g, w, CellFlags::REVERSE);
        x = x.saturating_add(w.max(1));
    }
    for x in x..width {
        frame.set_cluster(x, status_y, " ", 1, CellFlags::REVERSE);
    }

    frame
}

#[derive(Default)]
pub struct RenderEngine {
    frames_rendered: u64,
}

impl RenderEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Emit a full frame: move to each row, clear it, print leader clusters
    /// in runs so reverse-video toggles only where the flag actually changes.
    pub fn render(&mut self, writer: &mut Writer, frame: &Frame) {
        for y in 0..frame.height {
            writer.move_to(0, y);
            writer.clear_line(0, y);
            let mut reverse = false;
            let mut run = String::new();
            for (cluster, _w, flags, _x) in frame.row_leaders(y) {
                let want_reverse = flags.contains(CellFlags::REVERSE);
                if want_reverse != reverse {
                    if !run.is_empty() {
                        writer.print(std::mem::take(&mut run));
                    }
                    writer.set_reverse(want_reverse);
                    reverse = want_reverse;
                }
                run.push_str(cluster);
            }
            if !run.is_empty() {
                writer.print(run);
            }
            if reverse {
                writer.set_reverse(false);
            }
        }
        self.frames_rendered += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_viewer::Span;

    fn row(text: &str, style: SpanStyle) -> FormattedRow {
        FormattedRow {
            spans: vec![Span { text: text.to_string(), style }],
        }
    }

    #[test]
    fn composes_content_rows_and_status_footer() {
        let rows = vec![row("hello", SpanStyle::Text), row("world", SpanStyle::Text)];
        let frame = compose_frame(&rows, "status", 10, 3);
        assert_eq!(frame.line_clusters(0).join(""), "hello");
        assert_eq!(frame.line_clusters(1).join(""), "world");
        assert!(frame.line_clusters(2).join("").starts_with("status"));
    }

    #[test]
    fn found_span_gets_reverse_flag() {
        let rows = vec![row("hit", SpanStyle::Found)];
        let frame = compose_frame(&rows, "", 10, 2);
        let (_, _, flags, _) = frame.row_leaders(0).next().unwrap();
        assert!(flags.contains(CellFlags::REVERSE));
    }

    #[test]
    fn status_row_is_padded_to_full_width() {
        let frame = compose_frame(&[], "hi", 6, 1);
        assert_eq!(frame.line_clusters(0).len(), 6);
    }

    #[test]
    fn render_emits_one_frame_counter_tick() {
        let mut engine = RenderEngine::new();
        let frame = compose_frame(&[row("x", SpanStyle::Text)], "status", 5, 2);
        let mut writer = Writer::new();
        engine.render(&mut writer, &frame);
        assert_eq!(engine.frames_rendered(), 1);
    }
}
