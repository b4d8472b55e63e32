//! Configuration loading: CLI options, the `list.toml` config file, and the
//! handful of environment variables the viewer honors (`NO_COLOR`, `EDITOR`,
//! locale).

use std::{env, fs, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use tracing::info;

/// Command-line options for the `list` binary.
#[derive(Debug, Parser, Clone)]
#[command(name = "list", about = "Terminal file browser and viewer")]
pub struct Args {
    /// File or directory to open. A directory opens the chooser; a file
    /// opens the viewer directly.
    pub path: Option<PathBuf>,

    /// Force a specific code page by name or number instead of autodetecting.
    #[arg(long = "emulate")]
    pub emulate: Option<String>,

    /// Read content from this file instead of `path` (used when `path` names
    /// a virtual/help buffer).
    #[arg(long = "input-file")]
    pub input_file: Option<PathBuf>,

    /// Start scrolled to this 1-based line number.
    #[arg(long = "line")]
    pub line: Option<u32>,

    /// Start scrolled to this byte offset (hex view).
    #[arg(long = "offset")]
    pub offset: Option<u64>,

    /// Override the hard line-length cutoff.
    #[arg(long = "max-line-length")]
    pub max_line_length: Option<u32>,

    /// Force multibyte (DBCS) code page detection on.
    #[arg(long = "multibyte", conflicts_with = "no_multibyte")]
    pub multibyte: bool,

    /// Force multibyte (DBCS) code page detection off.
    #[arg(long = "no-multibyte")]
    pub no_multibyte: bool,

    /// Force word-wrap on.
    #[arg(long = "wrapping", conflicts_with = "no_wrapping")]
    pub wrapping: bool,

    /// Force word-wrap off.
    #[arg(long = "no-wrapping")]
    pub no_wrapping: bool,
}

impl Args {
    pub fn multibyte_enabled(&self, default: bool) -> bool {
        if self.no_multibyte {
            false
        } else if self.multibyte {
            true
        } else {
            default
        }
    }

    pub fn wrap_enabled(&self, default: bool) -> bool {
        if self.no_wrapping {
            false
        } else if self.wrapping {
            true
        } else {
            default
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PaletteConfig {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub margin: Option<String>,
    #[serde(default)]
    pub found: Option<String>,
    #[serde(default)]
    pub edited_byte: Option<String>,
    #[serde(default)]
    pub saved_byte: Option<String>,
    #[serde(default)]
    pub control: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UiConfig {
    #[serde(default = "UiConfig::default_scrollbar")]
    pub scrollbar: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            scrollbar: Self::default_scrollbar(),
        }
    }
}

impl UiConfig {
    const fn default_scrollbar() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub palette: PaletteConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>,
    pub file: ConfigFile,
    /// Whether color output is suppressed, combining `NO_COLOR` with the
    /// config file (an explicit env var always wins).
    pub color_enabled: bool,
}

/// Best-effort config path following XDG / platform conventions: a
/// `list.toml` in the working directory first, then the user config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("list.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("list").join("list.toml");
    }
    PathBuf::from("list.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let mut config = if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => Config {
                raw: Some(content),
                file,
                color_enabled: true,
            },
            Err(e) => {
                info!(target: "config", error = %e, path = %path.display(), "list_toml_parse_failed_using_defaults");
                Config::default_with_color()
            }
        }
    } else {
        Config::default_with_color()
    };
    config.color_enabled = !no_color();
    Ok(config)
}

impl Config {
    fn default_with_color() -> Self {
        Self {
            raw: None,
            file: ConfigFile::default(),
            color_enabled: true,
        }
    }
}

/// `NO_COLOR`: any non-empty value (per the convention at no-color.org)
/// disables color, regardless of content.
pub fn no_color() -> bool {
    env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty())
}

/// The external editor command, if any, for whatever "open in $EDITOR"
/// affordance the chooser exposes.
pub fn editor_command() -> Option<String> {
    env::var("EDITOR").ok().filter(|s| !s.is_empty())
}

/// The active locale, read in the conventional POSIX precedence order, used
/// to decide whether to trust multibyte-aware collation/width decisions.
pub fn locale() -> Option<String> {
    for key in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Ok(v) = env::var(key) {
            if !v.is_empty() {
                return Some(v);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert!(cfg.file.ui.scrollbar);
        assert!(cfg.file.palette.text.is_none());
    }

    #[test]
    fn parses_palette_and_ui() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "[palette]\nfound = \"yellow\"\n[ui]\nscrollbar = false\n",
        )
        .unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.palette.found.as_deref(), Some("yellow"));
        assert!(!cfg.file.ui.scrollbar);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "not valid toml [[[").unwrap();
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert!(cfg.file.ui.scrollbar);
    }

    #[test]
    fn args_multibyte_precedence() {
        let args = Args::parse_from(["list", "--no-multibyte"]);
        assert!(!args.multibyte_enabled(true));
        let args = Args::parse_from(["list", "--multibyte"]);
        assert!(args.multibyte_enabled(false));
        let args = Args::parse_from(["list"]);
        assert!(args.multibyte_enabled(true));
    }

    #[test]
    fn args_wrap_precedence() {
        let args = Args::parse_from(["list", "--no-wrapping"]);
        assert!(!args.wrap_enabled(true));
        let args = Args::parse_from(["list"]);
        assert!(args.wrap_enabled(true));
    }
}
