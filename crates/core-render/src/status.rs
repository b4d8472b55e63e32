//! Status line composition.
//!
//! Format: `<name>[*] Ln X/N[, Col Y] [HEX] [offset 0xOOOO] search:<pattern>`.
//! Built the same segmented way the teacher's status line is: an ordered
//! `Vec<StatusSegment>` assembled by `compose_status`, then flattened by
//! `format_status` — kept as two stages so a future overlay (encoding name,
//! multi-file index) can inject a segment without touching the string glue.

use std::borrow::Cow;
use std::path::Path;

pub struct StatusContext<'a> {
    pub file_name: Option<&'a Path>,
    pub dirty: bool,
    pub line_1: usize,
    pub line_count: usize,
    pub hex_mode: bool,
    pub hex_offset: u64,
    pub caseless: bool,
    pub regex_mode: bool,
    pub prompt: Option<&'a str>,
    pub not_found: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSegment<'a> {
    FileName(Cow<'a, str>),
    LinePosition { line_1: usize, line_count: usize },
    HexPosition { offset: u64 },
    Flags { caseless: bool, regex_mode: bool },
    Prompt(&'a str),
    NotFound,
}

pub fn compose_status<'a>(ctx: &'a StatusContext<'a>) -> Vec<StatusSegment<'a>> {
    let file_segment: Cow<'_, str> = match ctx.file_name {
        Some(p) => {
            let name = p.file_name().and_then(|s| s.to_str()).unwrap_or("<file>");
            if ctx.dirty { format!("{name}*").into() } else { name.into() }
        }
        None => "<stdin>".into(),
    };

    let mut out = Vec::with_capacity(6);
    out.push(StatusSegment::FileName(file_segment));
    if ctx.hex_mode {
        out.push(StatusSegment::HexPosition { offset: ctx.hex_offset });
    } else {
        out.push(StatusSegment::LinePosition {
            line_1: ctx.line_1,
            line_count: ctx.line_count,
        });
    }
    if ctx.caseless || ctx.regex_mode {
        out.push(StatusSegment::Flags {
            caseless: ctx.caseless,
            regex_mode: ctx.regex_mode,
        });
    }
    if let Some(p) = ctx.prompt {
        out.push(StatusSegment::Prompt(p));
    } else if ctx.not_found {
        out.push(StatusSegment::NotFound);
    }
    out
}

pub fn format_status(segments: &[StatusSegment<'_>]) -> String {
    use std::fmt::Write as _;
    let mut s = String::with_capacity(48);
    for seg in segments {
        if !s.is_empty() {
            s.push(' ');
        }
        match seg {
            StatusSegment::FileName(name) => s.push_str(name),
            StatusSegment::LinePosition { line_1, line_count } => {
                let _ = write!(s, "Ln {line_1}/{line_count}");
            }
            StatusSegment::HexPosition { offset } => {
                let _ = write!(s, "[HEX] offset {offset:#010x}");
            }
            StatusSegment::Flags { caseless, regex_mode } => {
                let mut flags = String::new();
                if *caseless {
                    flags.push('c');
                }
                if *regex_mode {
                    flags.push('r');
                }
                let _ = write!(s, "[{flags}]");
            }
            StatusSegment::Prompt(p) => {
                let _ = write!(s, "/{p}");
            }
            StatusSegment::NotFound => s.push_str("(not found)"),
        }
    }
    s
}

pub fn build_status(ctx: &StatusContext) -> String {
    format_status(&compose_status(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line_mode_status() {
        let ctx = StatusContext {
            file_name: Some(Path::new("notes.txt")),
            dirty: false,
            line_1: 3,
            line_count: 50,
            hex_mode: false,
            hex_offset: 0,
            caseless: false,
            regex_mode: false,
            prompt: None,
            not_found: false,
        };
        assert_eq!(build_status(&ctx), "notes.txt Ln 3/50");
    }

    #[test]
    fn dirty_hex_mode_status() {
        let ctx = StatusContext {
            file_name: Some(Path::new("bin.dat")),
            dirty: true,
            line_1: 0,
            line_count: 0,
            hex_mode: true,
            hex_offset: 0x20,
            caseless: true,
            regex_mode: false,
            prompt: None,
            not_found: false,
        };
        assert_eq!(build_status(&ctx), "bin.dat* [HEX] offset 0x00000020 [c]");
    }

    #[test]
    fn stdin_with_active_prompt() {
        let ctx = StatusContext {
            file_name: None,
            dirty: false,
            line_1: 1,
            line_count: 1,
            hex_mode: false,
            hex_offset: 0,
            caseless: false,
            regex_mode: false,
            prompt: Some("needle"),
            not_found: false,
        };
        assert_eq!(build_status(&ctx), "<stdin> Ln 1/1 /needle");
    }

    #[test]
    fn not_found_after_failed_search() {
        let ctx = StatusContext {
            file_name: Some(Path::new("a.txt")),
            dirty: false,
            line_1: 1,
            line_count: 1,
            hex_mode: false,
            hex_offset: 0,
            caseless: false,
            regex_mode: false,
            prompt: None,
            not_found: true,
        };
        assert_eq!(build_status(&ctx), "a.txt Ln 1/1 (not found)");
    }
}
