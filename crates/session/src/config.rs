use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "appsettings.json";
pub const CONFIG_PATH_ENV: &str = "LINEAGE_CONFIG";

const DEFAULT_INSTRUCTION_FILE: &str = "AGENTS.md";
const DEFAULT_INTERRUPT_MESSAGE: &str = "This session has been paused by the operator. \
Do not retry file operations; stop and wait for the user to resume the session.";

/// Server settings. Every field is optional in `appsettings.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineageConfig {
    /// Instruction document names, highest priority first.
    pub instruction_file_names: Vec<String>,
    pub new_session_cooldown_seconds: f64,
    pub read_char_limit: usize,
    pub interrupt_message: String,
    pub tray_reconnect_seconds: f64,
    /// Overrides the default registry socket path.
    pub tray_socket: Option<PathBuf>,
    pub disable_tray: bool,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            instruction_file_names: vec![DEFAULT_INSTRUCTION_FILE.to_string()],
            new_session_cooldown_seconds: 5.0,
            read_char_limit: 50_000,
            interrupt_message: DEFAULT_INTERRUPT_MESSAGE.to_string(),
            tray_reconnect_seconds: 10.0,
            tray_socket: None,
            disable_tray: false,
        }
    }
}

impl LineageConfig {
    /// Settings from `LINEAGE_CONFIG` or `appsettings.json` next to the executable, then the
    /// environment overrides.
    pub fn load() -> Self {
        let config = match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        config.with_overrides(|key| env::var(key).ok())
    }

    /// Missing file means defaults; a corrupt file means defaults plus a warning.
    pub fn load_from(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                log::warn!("Failed to read {}: {err}; using defaults", path.display());
                return Self::default();
            }
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(config) => config.normalized(),
            Err(err) => {
                log::warn!("Ignoring malformed {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Apply `LINEAGE_*` overrides read through `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = get("LINEAGE_READ_CHAR_LIMIT") {
            match value.parse::<usize>() {
                Ok(limit) => self.read_char_limit = limit,
                Err(_) => log::warn!("Ignoring LINEAGE_READ_CHAR_LIMIT={value}"),
            }
        }
        if let Some(value) = get("LINEAGE_NEW_SESSION_COOLDOWN_SECS") {
            match value.parse::<f64>() {
                Ok(secs) => self.new_session_cooldown_seconds = secs,
                Err(_) => log::warn!("Ignoring LINEAGE_NEW_SESSION_COOLDOWN_SECS={value}"),
            }
        }
        if let Some(value) = get("LINEAGE_TRAY_SOCKET") {
            self.tray_socket = Some(PathBuf::from(value));
        }
        if let Some(value) = get("LINEAGE_DISABLE_TRAY") {
            self.disable_tray = matches!(
                value.to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        self.normalized()
    }

    fn normalized(mut self) -> Self {
        self.instruction_file_names.retain(|name| !name.trim().is_empty());
        if self.instruction_file_names.is_empty() {
            self.instruction_file_names = vec![DEFAULT_INSTRUCTION_FILE.to_string()];
        }
        self.read_char_limit = self.read_char_limit.max(1);
        if !self.new_session_cooldown_seconds.is_finite() || self.new_session_cooldown_seconds < 0.0
        {
            self.new_session_cooldown_seconds = 0.0;
        }
        if !self.tray_reconnect_seconds.is_finite() || self.tray_reconnect_seconds < 0.0 {
            self.tray_reconnect_seconds = 0.0;
        }
        self
    }

    pub fn new_session_cooldown(&self) -> Duration {
        seconds(self.new_session_cooldown_seconds)
    }

    pub fn tray_reconnect_interval(&self) -> Duration {
        seconds(self.tray_reconnect_seconds)
    }
}

/// Negative or NaN is zero; anything too large for a `Duration` saturates.
fn seconds(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

fn config_path() -> Option<PathBuf> {
    if let Some(raw) = env::var_os(CONFIG_PATH_ENV) {
        if !raw.is_empty() {
            return Some(PathBuf::from(raw));
        }
    }
    let exe = env::current_exe().ok()?;
    Some(exe.parent()?.join(CONFIG_FILE_NAME))
}
