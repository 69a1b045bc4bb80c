use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

use crate::config::{env_string, parse_bool};

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_JSON_LOG_FILE: &str = "ui-message-stream.logs.jsonl";
const DEFAULT_FILTER: &str = "info";

/// Where log records go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOutput {
    /// No subscriber is installed.
    Disabled,
    /// Compact lines on stderr. Stdout stays free for streamed frames.
    Console,
    /// JSON lines appended to a file.
    JsonFile(PathBuf),
}

/// Resolved logging settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservabilitySettings {
    pub output: LogOutput,
    /// Filter directive, e.g. `info` or `ui_message_stream=debug`.
    pub filter: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            output: LogOutput::Console,
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl ObservabilitySettings {
    /// Reads the settings from the process environment.
    ///
    /// - `UI_STREAM_OBSERVABILITY_ENABLED` / `UI_STREAM_OBSERVABILITY`: on/off flag, default on.
    /// - `UI_STREAM_JSON_LOG_PATH`: JSON lines file; console output when unset or blank.
    /// - `UI_STREAM_LOG_LEVEL`, then `RUST_LOG`: filter directive, default `info`.
    pub fn from_env() -> Self {
        Self::resolve(env_string)
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = ["UI_STREAM_OBSERVABILITY_ENABLED", "UI_STREAM_OBSERVABILITY"]
            .into_iter()
            .find_map(&lookup)
            .is_none_or(|value| parse_bool(&value).unwrap_or(true));

        let output = if !enabled {
            LogOutput::Disabled
        } else {
            match lookup("UI_STREAM_JSON_LOG_PATH") {
                Some(path) if !path.trim().is_empty() => LogOutput::JsonFile(PathBuf::from(path.trim())),
                _ => LogOutput::Console,
            }
        };

        let filter = ["UI_STREAM_LOG_LEVEL", "RUST_LOG"]
            .into_iter()
            .filter_map(&lookup)
            .find(|directive| EnvFilter::try_new(directive).is_ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());

        Self { output, filter }
    }
}

/// Installs the process-wide tracing subscriber from [`ObservabilitySettings::from_env`].
///
/// Only the first call in a process has an effect.
pub fn init_observability() {
    init_observability_with(ObservabilitySettings::from_env());
}

/// Installs the process-wide tracing subscriber from explicit settings.
///
/// Only the first call in a process has an effect, whichever entry point it uses.
pub fn init_observability_with(settings: ObservabilitySettings) {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_new(&settings.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        match settings.output {
            LogOutput::Disabled => {}
            LogOutput::Console => {
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_target(false)
                            .with_writer(std::io::stderr),
                    )
                    .try_init();
            }
            LogOutput::JsonFile(path) => {
                let (dir, file_name) = split_log_path(&path);
                let _ = std::fs::create_dir_all(&dir);
                let _ = tracing_subscriber::registry()
                    .with(filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_target(true)
                            .with_writer(tracing_appender::rolling::never(dir, file_name)),
                    )
                    .try_init();
            }
        }
    });
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(DEFAULT_JSON_LOG_FILE)
        .to_string();
    (dir, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> ObservabilitySettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        ObservabilitySettings::resolve(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_console_at_info() {
        assert_eq!(resolve(&[]), ObservabilitySettings::default());
    }

    #[test]
    fn flag_and_json_path_select_output() {
        assert_eq!(resolve(&[("UI_STREAM_OBSERVABILITY", "off")]).output, LogOutput::Disabled);
        assert_eq!(
            resolve(&[("UI_STREAM_OBSERVABILITY_ENABLED", "maybe")]).output,
            LogOutput::Console
        );
        assert_eq!(
            resolve(&[("UI_STREAM_JSON_LOG_PATH", " logs/ui.jsonl ")]).output,
            LogOutput::JsonFile(PathBuf::from("logs/ui.jsonl"))
        );
        assert_eq!(resolve(&[("UI_STREAM_JSON_LOG_PATH", "  ")]).output, LogOutput::Console);
    }

    #[test]
    fn level_override_wins_over_rust_log() {
        let settings = resolve(&[
            ("UI_STREAM_LOG_LEVEL", "ui_message_stream=debug"),
            ("RUST_LOG", "warn"),
        ]);
        assert_eq!(settings.filter, "ui_message_stream=debug");
        assert_eq!(resolve(&[("RUST_LOG", "warn")]).filter, "warn");
    }

    #[test]
    fn log_path_splits_into_dir_and_file() {
        assert_eq!(
            split_log_path(Path::new("ui.jsonl")),
            (PathBuf::from("."), "ui.jsonl".to_string())
        );
        assert_eq!(
            split_log_path(Path::new("/var/log/ui.jsonl")),
            (PathBuf::from("/var/log"), "ui.jsonl".to_string())
        );
    }
}
