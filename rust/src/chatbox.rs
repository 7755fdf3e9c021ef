//! Speech-to-chatbox relay: forward recognized speech as chatbox text.

use clap::ValueEnum;
use serde::Deserialize;

use crate::command::normalize_phrase;

/// Phrase that arms the relay in [`ChatboxMode::Trigger`] when none is configured.
pub const DEFAULT_CHATBOX_TRIGGER: &str = "send message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChatboxMode {
    /// Never relay speech
    #[default]
    Off,
    /// Relay the words spoken after the trigger phrase
    Trigger,
    /// Relay every transcript that fired no command
    On,
}

impl std::fmt::Display for ChatboxMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ChatboxMode::Off => "off",
            ChatboxMode::Trigger => "trigger",
            ChatboxMode::On => "on",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatboxRelay {
    mode: ChatboxMode,
    trigger_words: Vec<String>,
}

impl ChatboxRelay {
    pub fn new(mode: ChatboxMode, trigger: &str) -> Self {
        let trigger_words = normalize_phrase(trigger)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        Self {
            mode,
            trigger_words,
        }
    }

    pub fn disabled() -> Self {
        Self::new(ChatboxMode::Off, "")
    }

    pub fn mode(&self) -> ChatboxMode {
        self.mode
    }

    /// Text to send to the chatbox for a final transcript, if any.
    ///
    /// `fired_any` is whether the same transcript already matched a command.
    /// The trigger phrase compares case-insensitively; relayed words keep their case.
    pub fn relay_text(&self, transcript: &str, fired_any: bool) -> Option<String> {
        match self.mode {
            ChatboxMode::Off => None,
            ChatboxMode::On => {
                let text = transcript.trim();
                (!fired_any && !text.is_empty()).then(|| text.to_string())
            }
            ChatboxMode::Trigger => self.strip_trigger(transcript),
        }
    }

    fn strip_trigger(&self, transcript: &str) -> Option<String> {
        if self.trigger_words.is_empty() {
            return None;
        }
        let words: Vec<&str> = transcript.split_whitespace().collect();
        if words.len() <= self.trigger_words.len() {
            return None;
        }
        let armed = self
            .trigger_words
            .iter()
            .zip(&words)
            .all(|(expected, spoken)| *expected == spoken.to_lowercase());
        armed.then(|| words[self.trigger_words.len()..].join(" "))
    }
}

impl Default for ChatboxRelay {
    fn default() -> Self {
        Self::disabled()
    }
}
