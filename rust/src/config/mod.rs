//! CLI flag schema and the persisted user config merged underneath it.

mod persistent;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::chatbox::{ChatboxMode, ChatboxRelay, DEFAULT_CHATBOX_TRIGGER};
use crate::pipeline::DEFAULT_TRANSCRIPT_QUEUE;

pub use persistent::{
    apply_user_config, config_file_path, load_user_config, parse_user_config, UserConfig,
    UserConfigError,
};

pub const DEFAULT_SEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_SEND_PORT: u16 = 9000;
pub const DEFAULT_LISTEN_PORT: u16 = 9001;
pub const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 3000;
pub const DEFAULT_COMMANDS_FILE: &str = "commands.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "oscvoice",
    about = "Voice-triggered OSC commands for live avatar control",
    author,
    version
)]
pub struct AppConfig {
    /// Host the OSC messages are sent to
    #[arg(long, default_value = DEFAULT_SEND_HOST)]
    pub host: String,

    /// Port the OSC messages are sent to
    #[arg(long, default_value_t = DEFAULT_SEND_PORT)]
    pub port: u16,

    /// Host the inbound OSC listener binds to
    #[arg(long = "listen-host", default_value = DEFAULT_SEND_HOST)]
    pub listen_host: String,

    /// Port the inbound OSC listener binds to
    #[arg(long = "listen-port", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,

    /// Do not listen for parameter updates or avatar changes
    #[arg(long = "no-listen", default_value_t = false)]
    pub no_listen: bool,

    /// Command mapping file
    #[arg(long, default_value = DEFAULT_COMMANDS_FILE)]
    pub commands: PathBuf,

    /// Speech-to-chatbox relay mode
    #[arg(long = "chatbox-mode", value_enum, default_value_t = ChatboxMode::Off)]
    pub chatbox_mode: ChatboxMode,

    /// Phrase that arms the chatbox relay in trigger mode
    #[arg(long = "chatbox-trigger", default_value = DEFAULT_CHATBOX_TRIGGER)]
    pub chatbox_trigger: String,

    /// Transcripts buffered between recognizer and matcher before new ones are dropped
    #[arg(long = "transcript-queue", default_value_t = DEFAULT_TRANSCRIPT_QUEUE)]
    pub transcript_queue: usize,

    /// How long delayed sends may still fire after shutdown starts (ms)
    #[arg(long = "shutdown-grace-ms", default_value_t = DEFAULT_SHUTDOWN_GRACE_MS)]
    pub shutdown_grace_ms: u64,

    /// Print the loaded commands and exit
    #[arg(long = "list-commands", default_value_t = false)]
    pub list_commands: bool,

    /// Print sends to stdout instead of transmitting them
    #[arg(long = "dry-run", default_value_t = false)]
    pub dry_run: bool,

    /// Minimum level for log output
    #[arg(long = "log-level", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Write JSON trace lines to this file instead of stderr
    #[arg(long = "trace-log", env = "OSCVOICE_TRACE_LOG")]
    pub trace_log: Option<PathBuf>,

    /// Include transcript text in logs
    #[arg(long = "log-content", default_value_t = false)]
    pub log_content: bool,

    /// Disable all logging
    #[arg(long = "no-logs", default_value_t = false)]
    pub no_logs: bool,
}

impl AppConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn chatbox_relay(&self) -> ChatboxRelay {
        ChatboxRelay::new(self.chatbox_mode, &self.chatbox_trigger)
    }

    /// Reject values clap can parse but the runtime cannot use.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            anyhow::bail!("--host must not be empty");
        }
        if self.port == 0 {
            anyhow::bail!("--port must be non-zero");
        }
        if self.transcript_queue == 0 {
            anyhow::bail!("--transcript-queue must be at least 1");
        }
        if self.chatbox_mode == ChatboxMode::Trigger && self.chatbox_trigger.trim().is_empty() {
            anyhow::bail!("--chatbox-trigger must not be empty in trigger mode");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_local_avatar_app() {
        let config = AppConfig::parse_from(["oscvoice"]);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.listen_port, 9001);
        assert_eq!(config.chatbox_mode, ChatboxMode::Off);
        assert_eq!(config.commands, PathBuf::from("commands.json"));
        assert_eq!(config.shutdown_grace(), Duration::from_secs(3));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn flags_override_defaults() {
        let config = AppConfig::parse_from([
            "oscvoice",
            "--host",
            "10.0.0.2",
            "--port=9100",
            "--chatbox-mode",
            "trigger",
            "--chatbox-trigger",
            "say",
            "--log-level",
            "debug",
        ]);
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 9100);
        assert_eq!(config.chatbox_relay().mode(), ChatboxMode::Trigger);
        assert_eq!(config.log_level.as_tracing_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let mut config = AppConfig::parse_from(["oscvoice"]);
        config.transcript_queue = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::parse_from(["oscvoice", "--chatbox-mode", "trigger"]);
        config.chatbox_trigger = "  ".to_string();
        assert!(config.validate().is_err());

        let config = AppConfig::parse_from(["oscvoice", "--port", "0"]);
        assert!(config.validate().is_err());
    }
}
