//! Top-level application orchestrator: wires the chooser, the viewer
//! dispatcher, the renderer and the terminal backend together into the
//! synchronous event loop described by the CLI entrypoint. One blocking
//! `read_event` per turn; a full frame redrawn after every turn that
//! changed anything.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use core_actions::{KeyResolver, ViewerSession};
use core_chooser::{Chooser, ChooserOutcome};
use core_events::{Event, InputEvent};
use core_input::read_event;
use core_keymap::{MappingTrie, default_chooser_specs, default_viewer_specs};
use core_render::render_engine::{RenderEngine, compose_frame};
use core_render::status::{StatusContext, build_status};
use core_render::writer::Writer;
use core_terminal::CrosstermBackend;
use core_viewer::ViewerOptions;

const POLL_TIMEOUT: Duration = Duration::from_millis(250);

pub struct App {
    options: ViewerOptions,
    terminal: CrosstermBackend,
    render: RenderEngine,
}

impl App {
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            options,
            terminal: CrosstermBackend::new(),
            render: RenderEngine::new(),
        }
    }

    /// Piped stdin: no chooser, view the one stream and exit when the
    /// viewer quits.
    pub fn run_piped(&mut self) -> Result<()> {
        let _guard = self.terminal.enter_guard(false)?;
        let mut session = ViewerSession::new(self.options);
        session.open_stdin().context("reading piped input")?;
        self.run_viewer(&mut session)
    }

    /// Explicit file arguments given on the command line: view each in turn,
    /// with no chooser to fall back to.
    pub fn run_files(&mut self, files: &[PathBuf]) -> Result<()> {
        let _guard = self.terminal.enter_guard(false)?;
        for path in files {
            let mut session = ViewerSession::new(self.options);
            session
                .open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            self.run_viewer(&mut session)?;
        }
        Ok(())
    }

    /// A directory argument: run the chooser, handing selections (or tagged
    /// sets) off to the viewer and returning to the listing afterward.
    pub fn run_directory(&mut self, dir: &Path) -> Result<()> {
        let _guard = self.terminal.enter_guard(false)?;
        let mut chooser = Chooser::new();
        chooser.navigate(dir)?;
        let trie = MappingTrie::build(default_chooser_specs());
        let mut resolver = KeyResolver::new(trie);

        loop {
            self.render_chooser(&chooser)?;
            let Some(event) = read_event(POLL_TIMEOUT)? else {
                continue;
            };
            match event {
                Event::Input(InputEvent::KeyPress(key)) => {
                    let Some(cmd) = resolver.feed(key.token) else {
                        continue;
                    };
                    match chooser.apply_command(&cmd) {
                        ChooserOutcome::Continue => {}
                        ChooserOutcome::ExitApp => return Ok(()),
                        ChooserOutcome::ViewOne => {
                            if let Some(path) = chooser.selected_file() {
                                let mut session = ViewerSession::new(self.options);
                                session.open(&path)?;
                                self.run_viewer(&mut session)?;
                            }
                        }
                        ChooserOutcome::ViewTagged => {
                            for path in chooser.tagged_files() {
                                let mut session = ViewerSession::new(self.options);
                                session.open(&path)?;
                                self.run_viewer(&mut session)?;
                            }
                        }
                    }
                }
                Event::Input(InputEvent::CtrlC) => return Ok(()),
                _ => {}
            }
        }
    }

    fn run_viewer(&mut self, session: &mut ViewerSession) -> Result<()> {
        let trie = MappingTrie::build(default_viewer_specs());
        let mut resolver = KeyResolver::new(trie);

        loop {
            self.render_viewer(session)?;

            let timeout = match resolver.deadline() {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => POLL_TIMEOUT,
            };
            let Some(event) = read_event(timeout)? else {
                if resolver.deadline().is_some() {
                    let outcome = session.flush_pending(&mut resolver, &|| false)?;
                    if outcome.quit {
                        return Ok(());
                    }
                }
                continue;
            };
            match event {
                Event::Input(InputEvent::KeyPress(key)) => {
                    let outcome = session.feed_key(&mut resolver, key.token, &|| false)?;
                    if outcome.quit {
                        return Ok(());
                    }
                }
                Event::Input(InputEvent::CtrlC) => return Ok(()),
                Event::Input(InputEvent::Resize(_, _)) => {}
                _ => {}
            }
        }
    }

    fn render_viewer(&mut self, session: &mut ViewerSession) -> Result<()> {
        let (width, height) = crossterm::terminal::size()?;
        let content_height = height.saturating_sub(1);
        session.view.last_text_height = content_height as usize;
        session.view.last_text_width = width;

        let rows = if session.view.hex_mode {
            self.layout_hex_rows(session, width, content_height)?
        } else {
            self.layout_line_rows(session, width, content_height)?
        };

        let status = build_status(&StatusContext {
            file_name: session.cache.path(),
            dirty: session.cache.is_dirty(),
            line_1: session.view.current_line + 1,
            line_count: session.cache.count().max(1),
            hex_mode: session.view.hex_mode,
            hex_offset: session.view.hex_offset,
            caseless: session.view.caseless,
            regex_mode: session.view.regex_mode,
            prompt: None,
            not_found: false,
        });

        let frame = compose_frame(&rows, &status, width, height);
        let mut writer = Writer::new();
        self.render.render(&mut writer, &frame);
        writer.flush()?;
        Ok(())
    }

    fn layout_line_rows(
        &mut self,
        session: &mut ViewerSession,
        width: u16,
        content_height: u16,
    ) -> Result<Vec<core_viewer::FormattedRow>> {
        session
            .cache
            .process_through(session.view.current_line, &|| false)?;

        if session.view.current_line < session.view.viewport_first_line {
            session.view.viewport_first_line = session.view.current_line;
        } else if session.view.current_line >= session.view.viewport_first_line + content_height as usize {
            session.view.viewport_first_line = session.view.current_line + 1 - content_height as usize;
        }

        let mut rows = Vec::with_capacity(content_height as usize);
        for i in 0..content_height as usize {
            let line = session.view.viewport_first_line + i;
            if line >= session.cache.count() {
                break;
            }
            rows.push(session.cache.format_line_data(
                line,
                session.view.text_left_offset,
                width,
                Some(&session.found),
            )?);
        }
        Ok(rows)
    }

    fn layout_hex_rows(
        &mut self,
        session: &mut ViewerSession,
        width: u16,
        content_height: u16,
    ) -> Result<Vec<core_viewer::FormattedRow>> {
        let row_width = session.view.hex_bytes_per_row;
        if session.view.hex_offset < session.view.hex_viewport_first {
            session.view.hex_viewport_first = session.view.hex_offset;
        } else if session.view.hex_offset
            >= session.view.hex_viewport_first + row_width * content_height as u64
        {
            session.view.hex_viewport_first =
                session.view.hex_offset - row_width * (content_height as u64 - 1);
        }

        let hex_bytes = (width as usize).max(1);
        let mut rows = Vec::with_capacity(content_height as usize);
        let max_offset = session.cache.get_max_hex_offset(row_width);
        for i in 0..content_height as u64 {
            let offset = session.view.hex_viewport_first + i * row_width;
            if offset > max_offset {
                break;
            }
            rows.push(session.cache.format_hex_data(
                offset,
                (row_width as usize).min(hex_bytes),
                3,
                Some(&session.found),
            )?);
        }
        Ok(rows)
    }

    fn render_chooser(&mut self, chooser: &Chooser) -> Result<()> {
        let (width, height) = crossterm::terminal::size()?;
        let content_height = height.saturating_sub(1) as usize;
        let mut rows = Vec::with_capacity(content_height);
        for (i, entry) in chooser.entries().iter().enumerate().skip(chooser.top()).take(content_height) {
            let marker = if i == chooser.index() { "> " } else { "  " };
            let suffix = if entry.is_dir { "/" } else { "" };
            let text = format!("{marker}{}{suffix}", entry.name);
            rows.push(core_viewer::FormattedRow {
                spans: vec![core_viewer::Span {
                    text,
                    style: core_viewer::SpanStyle::Text,
                }],
            });
        }
        let status = format!("{} ({} entries)", chooser.dir().display(), chooser.entries().len());
        let frame = compose_frame(&rows, &status, width, height);
        let mut writer = Writer::new();
        self.render.render(&mut writer, &frame);
        writer.flush()?;
        Ok(())
    }
}
