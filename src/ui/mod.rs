use colored::*;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Debug,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Debug => "debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: true,
        }
    }
}

struct RunLog {
    path: PathBuf,
    file: File,
}

static RENDERER: LazyLock<RwLock<Renderer>> = LazyLock::new(|| RwLock::new(Renderer::default()));
static RUN_LOG: Mutex<Option<RunLog>> = Mutex::new(None);

// Global debug state
static DEBUG_MODE: AtomicBool = AtomicBool::new(false);

pub fn set_debug_mode(enabled: bool) {
    DEBUG_MODE.store(enabled, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_MODE.load(Ordering::Relaxed)
}

pub fn init(format: OutputFormat, color: bool) {
    if let Ok(mut r) = RENDERER.write() {
        r.format = format;
        r.color = color;
    }
    if !color || format == OutputFormat::Json {
        colored::control::set_override(false);
    }
}

/// Start mirroring every event into `path`.
///
/// The log receives all levels, including debug events that are hidden
/// from the terminal.
pub fn open_run_log(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    if let Ok(mut log) = RUN_LOG.lock() {
        *log = Some(RunLog {
            path: path.to_path_buf(),
            file,
        });
    }
    Ok(())
}

/// Path of the active run log, if one is open.
pub fn run_log_path() -> Option<PathBuf> {
    RUN_LOG
        .lock()
        .ok()
        .and_then(|log| log.as_ref().map(|l| l.path.clone()))
}

pub const SEPARATOR_HEAVY: &str = "━";
pub const SEPARATOR_LIGHT: &str = "─";

#[derive(Serialize)]
struct Event<'a> {
    level: &'a str,
    code: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

fn colorize(level: Level, s: &str, enable: bool) -> String {
    if !enable {
        return s.to_string();
    }
    match level {
        Level::Info => s.normal().to_string(),
        Level::Success => s.green().bold().to_string(),
        Level::Warn => s.yellow().bold().to_string(),
        Level::Error => s.red().bold().to_string(),
        Level::Debug => s.cyan().to_string(),
    }
}

pub(crate) fn strip_ansi(input: &str) -> String {
    // Remove common ANSI escape sequences like \x1b[0m, \x1b[1;32m, and similar
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // Skip until the final byte of the CSI sequence
            for b in chars.by_ref() {
                if ('@'..='~').contains(&b) {
                    break;
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}

fn append_to_run_log(level: Level, code: &str, message: &str) {
    let Ok(mut guard) = RUN_LOG.lock() else {
        return;
    };
    if let Some(log) = guard.as_mut() {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let _ = writeln!(
            log.file,
            "{} [{}] {}: {}",
            stamp,
            level.as_str(),
            code,
            strip_ansi(message)
        );
    }
}

pub fn emit(level: Level, code: &str, message: &str, data: Option<serde_json::Value>) {
    append_to_run_log(level, code, message);

    if level == Level::Debug && !is_debug_enabled() {
        return;
    }

    let r = match RENDERER.read() {
        Ok(r) => r.clone(),
        Err(_) => Renderer::default(),
    };
    let mut out: Box<dyn Write> = match level {
        Level::Error | Level::Warn => Box::new(io::stderr()),
        _ => Box::new(io::stdout()),
    };
    match r.format {
        OutputFormat::Text => {
            let line = colorize(level, message, r.color);
            let _ = writeln!(out, "{}", line);
        }
        OutputFormat::Json => {
            // Ensure message contains no ANSI control sequences in JSON mode
            let clean_msg = strip_ansi(message);
            let ev = Event {
                level: level.as_str(),
                code,
                message: &clean_msg,
                data,
            };
            if let Ok(s) = serde_json::to_string(&ev) {
                let _ = writeln!(out, "{}", s);
            }
        }
    }
}

pub fn get_output_format() -> OutputFormat {
    RENDERER
        .read()
        .map(|r| r.format)
        .unwrap_or(OutputFormat::Text)
}

pub fn separator(light: bool) {
    let r = match RENDERER.read() {
        Ok(r) => r.clone(),
        Err(_) => Renderer::default(),
    };
    // In JSON mode, do not print separators to avoid breaking jq parsing
    if matches!(r.format, OutputFormat::Json) {
        return;
    }
    let glyph = if light {
        SEPARATOR_LIGHT
    } else {
        SEPARATOR_HEAVY
    };
    let line = glyph.repeat(72);
    let _ = writeln!(
        io::stdout(),
        "{}",
        if r.color {
            line.bright_black().to_string()
        } else {
            line
        }
    );
}

/// Print a stage heading between separators.
pub fn heading(title: &str) {
    separator(false);
    emit(Level::Info, "stage.heading", &title.bold().to_string(), None);
    separator(true);
}

pub mod prelude {
    pub use super::{Level, OutputFormat, emit, get_output_format, heading};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_ansi("\x1b[1;32mdone\x1b[0m"), "done");
        assert_eq!(strip_ansi("plain text"), "plain text");
        assert_eq!(strip_ansi("ключ \x1b[33mwarn\x1b[0m"), "ключ warn");
    }

    #[test]
    #[serial]
    fn run_log_receives_debug_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        open_run_log(&path).unwrap();
        set_debug_mode(false);

        emit(Level::Debug, "test.debug", "hidden from terminal", None);
        emit(Level::Warn, "test.warn", "\x1b[33mcolored\x1b[0m", None);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[debug] test.debug: hidden from terminal"));
        assert!(content.contains("[warn] test.warn: colored"));
        assert_eq!(run_log_path().as_deref(), Some(path.as_path()));

        if let Ok(mut log) = RUN_LOG.lock() {
            *log = None;
        }
    }

    #[test]
    #[serial]
    fn output_format_round_trips_through_renderer() {
        init(OutputFormat::Json, false);
        assert_eq!(get_output_format(), OutputFormat::Json);
        init(OutputFormat::Text, true);
        assert_eq!(get_output_format(), OutputFormat::Text);
    }
}
