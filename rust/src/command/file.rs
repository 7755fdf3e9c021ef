//! `commands.json` loading so editor-authored mappings become typed commands.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::{clamp_delay_secs, normalize_phrase, Action, ActionKind, ActionValue, Command, Scope};

/// Placeholder phrase for mappings saved without one; no recognizer emits it.
pub const UNKNOWN_PHRASE: &str = "+unknown+";

const CHATBOX_ACTION_TYPE: &str = "chatbox";

/// Errors encountered while reading a command mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFileError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for CommandFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "IO error: {msg}"),
            Self::Parse(msg) => write!(f, "JSON parse error: {msg}"),
        }
    }
}

impl std::error::Error for CommandFileError {}

#[derive(Debug, Deserialize)]
struct RawCommandFile {
    #[serde(default)]
    mappings: Vec<RawMapping>,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    #[serde(default)]
    phrase: Option<String>,
    #[serde(default)]
    actions: Vec<RawAction>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    in_sentence: bool,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RawAction {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    path: String,
    #[serde(default)]
    value: Option<Value>,
    #[serde(default)]
    toggle: bool,
    #[serde(default)]
    delay: Option<f64>,
}

impl RawAction {
    fn into_action(self) -> Action {
        let is_chatbox = self
            .kind
            .as_deref()
            .is_some_and(|kind| kind.trim().eq_ignore_ascii_case(CHATBOX_ACTION_TYPE));
        let kind = if is_chatbox {
            ActionKind::ChatboxMessage
        } else if self.toggle {
            ActionKind::ParameterToggle
        } else {
            ActionKind::ParameterSet {
                value: self.value.as_ref().and_then(parse_scalar),
            }
        };
        Action {
            path: self.path,
            kind,
            delay_secs: clamp_delay_secs(self.delay.unwrap_or(0.0)),
        }
    }
}

/// Coerce a stored JSON value into a protocol scalar. Anything else is unset.
fn parse_scalar(value: &Value) -> Option<ActionValue> {
    match value {
        Value::Bool(flag) => Some(ActionValue::Bool(*flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64().and_then(|n| i32::try_from(n).ok()) {
                Some(ActionValue::Int(int))
            } else {
                number
                    .as_f64()
                    .map(|float| float as f32)
                    .filter(|float| float.is_finite())
                    .map(ActionValue::Float)
            }
        }
        Value::String(text) => parse_scalar_text(text),
        _ => None,
    }
}

fn parse_scalar_text(text: &str) -> Option<ActionValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i32>() {
        return Some(ActionValue::Int(int));
    }
    if let Ok(float) = trimmed.parse::<f32>() {
        // "nan" and "inf" parse as floats but are not sendable values.
        return float.is_finite().then_some(ActionValue::Float(float));
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => Some(ActionValue::Bool(true)),
        "false" => Some(ActionValue::Bool(false)),
        _ => None,
    }
}

/// Parse mapping file contents, preserving file order.
pub fn parse_commands(raw: &str) -> Result<Vec<Command>, CommandFileError> {
    let parsed: RawCommandFile =
        serde_json::from_str(raw).map_err(|err| CommandFileError::Parse(err.to_string()))?;
    let commands = parsed
        .mappings
        .into_iter()
        .map(|mapping| {
            let phrase = normalize_phrase(mapping.phrase.as_deref().unwrap_or(UNKNOWN_PHRASE));
            if phrase.is_empty() {
                tracing::warn!("command mapping has an empty phrase; it will never match");
            }
            Command {
                phrase,
                actions: mapping
                    .actions
                    .into_iter()
                    .map(RawAction::into_action)
                    .collect(),
                enabled: mapping.enabled,
                scope: mapping
                    .scope
                    .as_deref()
                    .map(Scope::parse)
                    .unwrap_or_default(),
                in_sentence: mapping.in_sentence,
            }
        })
        .collect();
    Ok(commands)
}

/// Read and parse a mapping file. A missing file yields an empty command set.
pub fn load_commands(path: &Path) -> Result<Vec<Command>, CommandFileError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "command file not found; starting with no commands");
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path)
        .map_err(|err| CommandFileError::Io(format!("{}: {err}", path.display())))?;
    let commands = parse_commands(&contents)?;
    tracing::info!(
        path = %path.display(),
        count = commands.len(),
        "loaded voice commands"
    );
    Ok(commands)
}
