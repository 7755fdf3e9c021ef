//! Action execution: turn a matched command's actions into scheduled sends.

use std::fmt;

use crate::command::{
    Action, ActionKind, ActionValue, ChatboxPayload, Command, CHATBOX_INPUT_ADDRESS,
};
use crate::scheduler::{DelayScheduler, ScheduledSend};
use crate::state::ParameterCache;

/// Why an action produced no send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyPath,
    UnsetValue,
    EmptyMessage,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::EmptyPath => "empty path",
            Self::UnsetValue => "unset value",
            Self::EmptyMessage => "empty chatbox message",
        };
        f.write_str(label)
    }
}

/// Resolve one action against the cache. Toggles read the cached value once.
pub fn resolve_action(
    action: &Action,
    cache: &ParameterCache,
) -> Result<ScheduledSend, SkipReason> {
    let delay = action.delay();
    match &action.kind {
        ActionKind::ChatboxMessage => {
            if action.path.is_empty() {
                return Err(SkipReason::EmptyMessage);
            }
            Ok(ScheduledSend::new(
                CHATBOX_INPUT_ADDRESS,
                ActionValue::Chatbox(ChatboxPayload::immediate(action.path.as_str())),
                delay,
            ))
        }
        ActionKind::ParameterToggle => {
            if action.path.is_empty() {
                return Err(SkipReason::EmptyPath);
            }
            let next = !cache.current_flag(&action.path);
            Ok(ScheduledSend::new(
                action.path.as_str(),
                ActionValue::Bool(next),
                delay,
            ))
        }
        ActionKind::ParameterSet { value } => {
            if action.path.is_empty() {
                return Err(SkipReason::EmptyPath);
            }
            let value = value.clone().ok_or(SkipReason::UnsetValue)?;
            Ok(ScheduledSend::new(action.path.as_str(), value, delay))
        }
    }
}

/// Schedule every action of `command` in order and return what was scheduled.
///
/// Never blocks: zero-delay sends go straight to the sink, delayed ones become
/// timer tasks owned by the scheduler.
pub fn dispatch(
    command: &Command,
    cache: &ParameterCache,
    scheduler: &DelayScheduler,
) -> Vec<ScheduledSend> {
    let mut scheduled = Vec::with_capacity(command.actions.len());
    for (index, action) in command.actions.iter().enumerate() {
        match resolve_action(action, cache) {
            Ok(send) => {
                tracing::info!(
                    phrase = %command.phrase,
                    address = %send.address,
                    value = %send.value,
                    delay_secs = action.delay_secs(),
                    "executing action"
                );
                scheduler.schedule(send.clone());
                scheduled.push(send);
            }
            Err(reason) => {
                tracing::debug!(
                    phrase = %command.phrase,
                    action = index,
                    %reason,
                    "skipping action"
                );
            }
        }
    }
    scheduled
}
