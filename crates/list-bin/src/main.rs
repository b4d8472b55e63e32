//! `list` entrypoint: a terminal file browser and viewer.
//!
//! Mirrors the original CLI's dispatch: piped stdin goes straight to the
//! viewer, a directory argument opens the chooser, bare file arguments are
//! viewed in order with no chooser to fall back to, and a chooser session
//! with no arguments starts in the current directory.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Once;

use anyhow::Result;
use clap::Parser;
use core_config::Args;
use core_model::App;
use core_text::ControlRenderMode;
use core_viewer::ViewerOptions;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("list.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "list.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .try_init()
    {
        Ok(_) => Some(guard),
        Err(_err) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn viewer_options(args: &Args) -> ViewerOptions {
    let mut options = ViewerOptions::default();
    if let Some(width) = args.max_line_length {
        options.max_line_length = width;
    }
    options.wrap_width = if args.wrap_enabled(true) { Some(80) } else { None };
    options.multibyte_enabled = args.multibyte_enabled(true);
    options.control_mode = ControlRenderMode::Caret;
    options
}

/// Split `path` into files to view directly vs. a single directory to
/// browse, the way the original entrypoint scans its argument list before
/// deciding whether to launch the chooser.
fn classify_target(path: &Path) -> Result<Target> {
    let meta = std::fs::metadata(path)?;
    if meta.is_dir() {
        Ok(Target::Directory(path.to_path_buf()))
    } else {
        Ok(Target::Files(vec![path.to_path_buf()]))
    }
}

enum Target {
    Directory(PathBuf),
    Files(Vec<PathBuf>),
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();

    info!(target: "runtime", "startup");

    let options = viewer_options(&args);
    let mut app = App::new(options);

    if std::io::stdin().is_terminal() {
        match &args.path {
            Some(path) => match classify_target(path)? {
                Target::Directory(dir) => {
                    info!(target: "runtime.startup", dir = %dir.display(), "opening_chooser");
                    app.run_directory(&dir)
                }
                Target::Files(files) => {
                    info!(target: "runtime.startup", file = %files[0].display(), "opening_viewer");
                    app.run_files(&files)
                }
            },
            None => {
                let cwd = std::env::current_dir()?;
                info!(target: "runtime.startup", dir = %cwd.display(), "opening_chooser_cwd");
                app.run_directory(&cwd)
            }
        }
    } else {
        info!(target: "runtime.startup", "piped_stdin");
        app.run_piped()
    }
}
