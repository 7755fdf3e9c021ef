//! Command matching and action dispatch over the shared registry, context and cache.

use std::sync::Arc;
use std::time::Duration;

use crate::chatbox::ChatboxRelay;
use crate::command::{normalize_phrase, ActionValue, ChatboxPayload, CHATBOX_INPUT_ADDRESS};
use crate::executor;
use crate::inbound::InboundEvent;
use crate::matcher::matches;
use crate::registry::CommandRegistry;
use crate::scheduler::{DelayScheduler, ScheduledSend};
use crate::scope::visible;
use crate::state::{ActiveContext, ParameterCache};

/// Outcome of one matching pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// Phrases of the commands that fired, in registration order.
    pub matched: Vec<String>,
    pub sends: Vec<ScheduledSend>,
    pub relayed: Option<String>,
}

impl DispatchReport {
    pub fn fired_any(&self) -> bool {
        !self.matched.is_empty()
    }
}

pub struct Engine {
    registry: Arc<CommandRegistry>,
    context: ActiveContext,
    cache: ParameterCache,
    scheduler: DelayScheduler,
    relay: ChatboxRelay,
}

impl Engine {
    pub fn new(
        registry: Arc<CommandRegistry>,
        scheduler: DelayScheduler,
        relay: ChatboxRelay,
    ) -> Self {
        Self {
            registry,
            context: ActiveContext::new(),
            cache: ParameterCache::new(),
            scheduler,
            relay,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn context(&self) -> &ActiveContext {
        &self.context
    }

    pub fn cache(&self) -> &ParameterCache {
        &self.cache
    }

    pub fn scheduler(&self) -> &DelayScheduler {
        &self.scheduler
    }

    /// Run one final transcript through scope, matching and dispatch.
    ///
    /// The registry snapshot and the context are each read once, so a context
    /// change racing with this call affects the next transcript, not this one.
    pub fn handle_transcript(&self, raw: &str) -> DispatchReport {
        let transcript = normalize_phrase(raw);
        let mut report = DispatchReport::default();
        if transcript.is_empty() {
            return report;
        }

        let commands = self.registry.all();
        let context = self.context.get();
        for command in visible(&commands, context.as_deref()) {
            if !command.enabled {
                continue;
            }
            if !matches(&transcript, &command.phrase, command.in_sentence) {
                continue;
            }
            tracing::info!(
                phrase = %command.phrase,
                scope = %command.scope,
                actions = command.actions.len(),
                "command matched"
            );
            report
                .sends
                .extend(executor::dispatch(command, &self.cache, &self.scheduler));
            report.matched.push(command.phrase.clone());
        }

        if let Some(text) = self.relay.relay_text(raw, report.fired_any()) {
            let send = ScheduledSend::immediate(
                CHATBOX_INPUT_ADDRESS,
                ActionValue::Chatbox(ChatboxPayload::immediate(text.as_str())),
            );
            tracing::info!(
                mode = %self.relay.mode(),
                chars = text.chars().count(),
                "relaying speech to chatbox"
            );
            self.scheduler.schedule(send.clone());
            report.sends.push(send);
            report.relayed = Some(text);
        }
        report
    }

    /// Apply one listener event to the shared state.
    ///
    /// A context change clears the parameter cache: values cached for the
    /// previous avatar say nothing about the new one.
    pub fn apply_inbound(&self, event: InboundEvent) {
        match event {
            InboundEvent::Parameter { path, value } => {
                tracing::trace!(%path, %value, "parameter update");
                self.cache.update(path, value);
            }
            InboundEvent::ContextChanged(id) => {
                if self.context.set(Some(&id)) {
                    self.cache.clear();
                    tracing::info!(context = %id, "active context changed");
                }
            }
        }
    }

    /// Stop the scheduler; returns how many delayed sends were abandoned.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        self.scheduler.shutdown(grace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbox::ChatboxMode;
    use crate::command::{Action, Command, Scope};
    use crate::sink::RecordingSink;
    use tokio::runtime::Handle;

    fn engine_with(commands: Vec<Command>, relay: ChatboxRelay) -> (Arc<RecordingSink>, Engine) {
        let sink = Arc::new(RecordingSink::new());
        let scheduler = DelayScheduler::new(sink.clone(), Handle::current());
        let engine = Engine::new(Arc::new(CommandRegistry::new(commands)), scheduler, relay);
        (sink, engine)
    }

    fn sent(address: &str, value: impl Into<ActionValue>) -> (String, ActionValue) {
        (address.to_string(), value.into())
    }

    #[tokio::test(start_paused = true)]
    async fn exact_phrase_fires_its_action() {
        let (sink, engine) = engine_with(
            vec![Command::new("lights on").with_action(Action::set("/p/light", 1))],
            ChatboxRelay::disabled(),
        );
        let report = engine.handle_transcript("Lights On");
        assert_eq!(report.matched, vec!["lights on"]);
        assert_eq!(sink.sent(), vec![sent("/p/light", 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn alternation_matches_any_listed_phrase() {
        let (sink, engine) = engine_with(
            vec![Command::new("hi/hello").with_action(Action::set("/p/wave", true))],
            ChatboxRelay::disabled(),
        );
        assert!(engine.handle_transcript("hello").fired_any());
        assert!(!engine.handle_transcript("hi there").fired_any());
        assert_eq!(sink.sent(), vec![sent("/p/wave", true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn in_sentence_command_fires_inside_longer_speech() {
        let (sink, engine) = engine_with(
            vec![Command::new("lights on")
                .in_sentence(true)
                .with_action(Action::set("/p/light", 1))],
            ChatboxRelay::disabled(),
        );
        assert!(engine
            .handle_transcript("please turn the lights on now")
            .fired_any());
        assert!(!engine.handle_transcript("please turn the lights off").fired_any());
        assert_eq!(sink.sent(), vec![sent("/p/light", 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn scoped_command_fires_only_for_its_context() {
        let (sink, engine) = engine_with(
            vec![Command::new("dance")
                .scoped(Scope::Context("ctx1".to_string()))
                .with_action(Action::set("/p/dance", 1))],
            ChatboxRelay::disabled(),
        );
        assert!(!engine.handle_transcript("dance").fired_any());

        engine.apply_inbound(InboundEvent::ContextChanged("ctx2".to_string()));
        assert!(!engine.handle_transcript("dance").fired_any());

        engine.apply_inbound(InboundEvent::ContextChanged("ctx1".to_string()));
        assert!(engine.handle_transcript("dance").fired_any());
        assert_eq!(sink.sent(), vec![sent("/p/dance", 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_action_arrives_after_its_delay() {
        let (sink, engine) = engine_with(
            vec![Command::new("wave")
                .with_action(Action::set("/p/wave", true))
                .with_action(Action::set("/p/wave", false).with_delay(2.5))],
            ChatboxRelay::disabled(),
        );
        let report = engine.handle_transcript("wave");
        assert_eq!(report.sends.len(), 2);
        assert_eq!(sink.sent(), vec![sent("/p/wave", true)]);

        tokio::time::sleep(Duration::from_millis(2499)).await;
        assert_eq!(sink.sent().len(), 1);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            sink.sent(),
            vec![sent("/p/wave", true), sent("/p/wave", false)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_commands_never_send() {
        let (sink, engine) = engine_with(
            vec![Command::new("lights on")
                .enabled(false)
                .with_action(Action::set("/p/light", 1))],
            ChatboxRelay::disabled(),
        );
        assert!(!engine.handle_transcript("lights on").fired_any());
        assert!(sink.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn every_matching_command_fires_in_registration_order() {
        let (sink, engine) = engine_with(
            vec![
                Command::new("go").with_action(Action::set("/p/first", 1)),
                Command::new("other").with_action(Action::set("/p/never", 1)),
                Command::new("go").with_action(Action::set("/p/second", 2)),
            ],
            ChatboxRelay::disabled(),
        );
        let report = engine.handle_transcript("go");
        assert_eq!(report.matched, vec!["go", "go"]);
        assert_eq!(sink.sent(), vec![sent("/p/first", 1), sent("/p/second", 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn toggle_follows_cache_updates_from_listener() {
        let (sink, engine) = engine_with(
            vec![Command::new("mute").with_action(Action::toggle("/p/mute"))],
            ChatboxRelay::disabled(),
        );
        engine.handle_transcript("mute");
        engine.apply_inbound(InboundEvent::Parameter {
            path: "/p/mute".to_string(),
            value: ActionValue::Bool(true),
        });
        engine.handle_transcript("mute");
        assert_eq!(sink.sent(), vec![sent("/p/mute", true), sent("/p/mute", false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn context_change_clears_cached_parameters() {
        let (_sink, engine) = engine_with(Vec::new(), ChatboxRelay::disabled());
        engine.apply_inbound(InboundEvent::Parameter {
            path: "/p/mute".to_string(),
            value: ActionValue::Bool(true),
        });
        engine.apply_inbound(InboundEvent::ContextChanged("avtr_1".to_string()));
        assert!(engine.cache().is_empty());

        engine.apply_inbound(InboundEvent::Parameter {
            path: "/p/mute".to_string(),
            value: ActionValue::Bool(true),
        });
        engine.apply_inbound(InboundEvent::ContextChanged("avtr_1".to_string()));
        assert_eq!(engine.cache().len(), 1, "same context keeps the cache");
    }

    #[tokio::test(start_paused = true)]
    async fn registry_replace_applies_to_next_transcript() {
        let (sink, engine) = engine_with(
            vec![Command::new("old").with_action(Action::set("/p/old", 1))],
            ChatboxRelay::disabled(),
        );
        engine
            .registry()
            .replace(vec![Command::new("new").with_action(Action::set("/p/new", 1))]);
        assert!(!engine.handle_transcript("old").fired_any());
        assert!(engine.handle_transcript("new").fired_any());
        assert_eq!(sink.sent(), vec![sent("/p/new", 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn relay_sends_unmatched_speech_when_always_on() {
        let (sink, engine) = engine_with(
            vec![Command::new("lights on").with_action(Action::set("/p/light", 1))],
            ChatboxRelay::new(ChatboxMode::On, ""),
        );
        let report = engine.handle_transcript("Good morning");
        assert_eq!(report.relayed.as_deref(), Some("Good morning"));
        assert_eq!(
            sink.sent(),
            vec![sent(
                CHATBOX_INPUT_ADDRESS,
                ActionValue::Chatbox(ChatboxPayload::immediate("Good morning"))
            )]
        );

        let report = engine.handle_transcript("lights on");
        assert_eq!(report.relayed, None);
        assert_eq!(sink.sent().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_transcript_is_ignored() {
        let (sink, engine) = engine_with(
            vec![Command::new("").with_action(Action::set("/p/x", 1))],
            ChatboxRelay::new(ChatboxMode::On, ""),
        );
        assert_eq!(engine.handle_transcript("   "), DispatchReport::default());
        assert!(sink.sent().is_empty());
    }
}
