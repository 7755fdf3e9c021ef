//! Voice command model: trigger phrase, scope, and the ordered actions it fires.

mod file;

use std::fmt;
use std::time::Duration;

pub use file::{load_commands, parse_commands, CommandFileError, UNKNOWN_PHRASE};

/// Scope sentinel that makes a command visible regardless of the loaded context.
pub const GLOBAL_SCOPE: &str = "global";

/// Fixed OSC address for chatbox text input.
pub const CHATBOX_INPUT_ADDRESS: &str = "/chatbox/input";

/// Lower-case and trim raw phrase text so stored triggers and transcripts compare directly.
#[must_use = "normalized phrases are required for deterministic matching"]
pub fn normalize_phrase(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Visibility rule for a command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    Global,
    Context(String),
}

impl Scope {
    /// Parse a stored scope label; blank and `global` both mean [`Scope::Global`].
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(GLOBAL_SCOPE) {
            Self::Global
        } else {
            Self::Context(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Global => GLOBAL_SCOPE,
            Self::Context(id) => id,
        }
    }

    /// True when a command with this scope should be matchable under `current_context`.
    pub fn is_visible_in(&self, current_context: Option<&str>) -> bool {
        match self {
            Self::Global => true,
            Self::Context(id) => current_context == Some(id.as_str()),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured chatbox payload: `(text, immediate_send, play_notification)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatboxPayload {
    pub text: String,
    pub immediate_send: bool,
    pub play_notification: bool,
}

impl ChatboxPayload {
    /// Payload shape used for voice-triggered messages: send now, no notification sound.
    pub fn immediate(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            immediate_send: true,
            play_notification: false,
        }
    }
}

/// Value carried by an outbound send or an inbound parameter update.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Chatbox(ChatboxPayload),
}

impl ActionValue {
    /// Truthiness used by toggles: non-zero numbers and `true` are on.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(value) => *value != 0,
            Self::Float(value) => *value != 0.0,
            Self::Bool(value) => *value,
            Self::Chatbox(payload) => !payload.text.is_empty(),
        }
    }
}

impl fmt::Display for ActionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Chatbox(payload) => write!(
                f,
                "({:?}, {}, {})",
                payload.text, payload.immediate_send, payload.play_notification
            ),
        }
    }
}

impl From<i32> for ActionValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for ActionValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ActionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Write a fixed value; `None` is the unset sentinel and the action is skipped.
    ParameterSet { value: Option<ActionValue> },
    /// Invert the last observed value of `path`.
    ParameterToggle,
    /// Send `path` as chatbox text.
    ChatboxMessage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub path: String,
    pub kind: ActionKind,
    delay_secs: f64,
}

impl Action {
    pub fn set(path: impl Into<String>, value: impl Into<ActionValue>) -> Self {
        Self::with_kind(
            path,
            ActionKind::ParameterSet {
                value: Some(value.into()),
            },
        )
    }

    pub fn unset(path: impl Into<String>) -> Self {
        Self::with_kind(path, ActionKind::ParameterSet { value: None })
    }

    pub fn toggle(path: impl Into<String>) -> Self {
        Self::with_kind(path, ActionKind::ParameterToggle)
    }

    pub fn chatbox(text: impl Into<String>) -> Self {
        Self::with_kind(text, ActionKind::ChatboxMessage)
    }

    fn with_kind(path: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            path: path.into(),
            kind,
            delay_secs: 0.0,
        }
    }

    /// Set the delay in seconds. Negative and non-finite values clamp to zero,
    /// and anything past [`MAX_DELAY_SECS`] is capped.
    #[must_use]
    pub fn with_delay(mut self, delay_secs: f64) -> Self {
        self.delay_secs = clamp_delay_secs(delay_secs);
        self
    }

    pub fn delay_secs(&self) -> f64 {
        self.delay_secs
    }

    pub fn delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.delay_secs).unwrap_or(Duration::ZERO)
    }
}

/// Longest delay an action may carry, one day.
pub const MAX_DELAY_SECS: f64 = 86_400.0;

pub(crate) fn clamp_delay_secs(delay_secs: f64) -> f64 {
    if delay_secs.is_finite() && delay_secs > 0.0 {
        delay_secs.min(MAX_DELAY_SECS)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub phrase: String,
    pub actions: Vec<Action>,
    pub enabled: bool,
    pub scope: Scope,
    pub in_sentence: bool,
}

impl Command {
    /// Enabled, global, exact-mode command; the phrase is normalized.
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: normalize_phrase(phrase),
            actions: Vec::new(),
            enabled: true,
            scope: Scope::Global,
            in_sentence: false,
        }
    }

    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    #[must_use]
    pub fn scoped(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn in_sentence(mut self, in_sentence: bool) -> Self {
        self.in_sentence = in_sentence;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
