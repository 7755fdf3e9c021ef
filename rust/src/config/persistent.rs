//! Persistent user config (`<config dir>/oscvoice/config.toml`).
//!
//! Loaded on startup and merged underneath the CLI: flags given on the command
//! line always take precedence over persisted values. The editor owns writing
//! this file; the dispatcher only reads it.

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{AppConfig, LogLevel};
use crate::chatbox::ChatboxMode;

const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "OSCVOICE_CONFIG_DIR";
const APP_DIR: &str = "oscvoice";

/// Persisted preferences. Unknown keys are ignored for forward compatibility.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub listen_host: Option<String>,
    pub listen_port: Option<u16>,
    pub no_listen: Option<bool>,
    pub commands: Option<PathBuf>,
    pub chatbox_mode: Option<ChatboxMode>,
    pub chatbox_trigger: Option<String>,
    pub transcript_queue: Option<usize>,
    pub shutdown_grace_ms: Option<u64>,
    pub log_level: Option<LogLevel>,
    pub log_content: Option<bool>,
}

#[derive(Debug)]
pub enum UserConfigError {
    Io { path: PathBuf, message: String },
    Parse { path: PathBuf, message: String },
}

impl fmt::Display for UserConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "invalid config {}: {message}", path.display())
            }
        }
    }
}

impl std::error::Error for UserConfigError {}

fn resolve_config_dir(env_override: Option<&str>) -> Option<PathBuf> {
    if let Some(dir) = env_override.map(str::trim).filter(|dir| !dir.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

/// Resolve the full config file path, honoring `OSCVOICE_CONFIG_DIR`.
pub fn config_file_path() -> Option<PathBuf> {
    let env_override = env::var(CONFIG_DIR_ENV).ok();
    resolve_config_dir(env_override.as_deref()).map(|dir| dir.join(CONFIG_FILE))
}

/// Load the user config; a missing file (or unresolvable config dir) is the default config.
pub fn load_user_config() -> Result<UserConfig, UserConfigError> {
    match config_file_path() {
        Some(path) => load_user_config_from(&path),
        None => Ok(UserConfig::default()),
    }
}

fn load_user_config_from(path: &Path) -> Result<UserConfig, UserConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(UserConfig::default()),
        Err(err) => {
            return Err(UserConfigError::Io {
                path: path.to_path_buf(),
                message: err.to_string(),
            })
        }
    };
    parse_user_config(&contents).map_err(|err| UserConfigError::Parse {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

pub fn parse_user_config(contents: &str) -> Result<UserConfig, toml::de::Error> {
    toml::from_str(contents)
}

fn cli_flag_present(args: &[String], long_name: &str) -> bool {
    let exact = format!("--{long_name}");
    let with_value = format!("{exact}=");
    args.iter()
        .any(|arg| arg == &exact || arg.starts_with(&with_value))
}

fn apply_if_absent<T>(args: &[String], flag: &str, value: Option<T>, target: &mut T) {
    if cli_flag_present(args, flag) {
        return;
    }
    if let Some(value) = value {
        *target = value;
    }
}

/// Merge persisted values into `config` for every flag not present in `args`.
pub fn apply_user_config(user: &UserConfig, config: &mut AppConfig, args: &[String]) {
    let user = user.clone();
    apply_if_absent(args, "host", user.host, &mut config.host);
    apply_if_absent(args, "port", user.port, &mut config.port);
    apply_if_absent(args, "listen-host", user.listen_host, &mut config.listen_host);
    apply_if_absent(args, "listen-port", user.listen_port, &mut config.listen_port);
    apply_if_absent(args, "no-listen", user.no_listen, &mut config.no_listen);
    apply_if_absent(args, "commands", user.commands, &mut config.commands);
    apply_if_absent(args, "chatbox-mode", user.chatbox_mode, &mut config.chatbox_mode);
    apply_if_absent(
        args,
        "chatbox-trigger",
        user.chatbox_trigger,
        &mut config.chatbox_trigger,
    );
    apply_if_absent(
        args,
        "transcript-queue",
        user.transcript_queue,
        &mut config.transcript_queue,
    );
    apply_if_absent(
        args,
        "shutdown-grace-ms",
        user.shutdown_grace_ms,
        &mut config.shutdown_grace_ms,
    );
    apply_if_absent(args, "log-level", user.log_level, &mut config.log_level);
    apply_if_absent(args, "log-content", user.log_content, &mut config.log_content);
}
