//! Recognizer-to-matcher handoff: a bounded channel and one matching worker.

use std::io::BufRead;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::engine::Engine;

/// Line prefix the line recognizer uses to mark a partial transcript.
pub const PARTIAL_PREFIX: char = '~';

pub const DEFAULT_TRANSCRIPT_QUEUE: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Final(String),
    Partial(String),
}

impl TranscriptEvent {
    /// Parse one recognizer line; blank lines carry nothing.
    pub fn parse_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if let Some(partial) = trimmed.strip_prefix(PARTIAL_PREFIX) {
            let partial = partial.trim();
            return (!partial.is_empty()).then(|| Self::Partial(partial.to_string()));
        }
        (!trimmed.is_empty()).then(|| Self::Final(trimmed.to_string()))
    }
}

/// Producer half handed to the recognizer. Never blocks.
#[derive(Debug, Clone)]
pub struct TranscriptFeed {
    tx: Sender<TranscriptEvent>,
}

impl TranscriptFeed {
    /// Queue an event for the matcher; false when it was dropped.
    pub fn submit(&self, event: TranscriptEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("transcript queue full; dropping transcript");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!("matching worker gone; dropping transcript");
                false
            }
        }
    }
}

pub fn transcript_channel(capacity: usize) -> (TranscriptFeed, Receiver<TranscriptEvent>) {
    let (tx, rx) = bounded(capacity.max(1));
    (TranscriptFeed { tx }, rx)
}

/// Read transcripts line by line on a dedicated thread until EOF.
pub fn spawn_line_recognizer<R>(reader: R, feed: TranscriptFeed) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    tracing::warn!(error = %err, "recognizer input failed");
                    break;
                }
            };
            if let Some(event) = TranscriptEvent::parse_line(&line) {
                feed.submit(event);
            }
        }
        tracing::debug!("line recognizer exiting");
    })
}

/// Process transcripts in arrival order until every feed is dropped.
///
/// Returns the number of final transcripts handled.
pub fn run_matching_worker(
    engine: &Engine,
    rx: Receiver<TranscriptEvent>,
    log_content: bool,
) -> usize {
    let mut handled = 0;
    for event in rx {
        match event {
            TranscriptEvent::Partial(text) => {
                if log_content {
                    tracing::debug!(transcript = %text, "partial transcript");
                }
            }
            TranscriptEvent::Final(text) => {
                if log_content {
                    tracing::info!(transcript = %text, "final transcript");
                } else {
                    tracing::info!(chars = text.chars().count(), "final transcript");
                }
                let report = engine.handle_transcript(&text);
                if !report.fired_any() && report.relayed.is_none() {
                    tracing::debug!("no command matched");
                }
                handled += 1;
            }
        }
    }
    tracing::debug!(handled, "matching worker exiting");
    handled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chatbox::ChatboxRelay;
    use crate::command::{Action, ActionValue, Command};
    use crate::registry::CommandRegistry;
    use crate::scheduler::DelayScheduler;
    use crate::sink::RecordingSink;
    use std::io::Cursor;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    #[test]
    fn parse_line_splits_partial_and_final() {
        assert_eq!(
            TranscriptEvent::parse_line("  lights on \n"),
            Some(TranscriptEvent::Final("lights on".to_string()))
        );
        assert_eq!(
            TranscriptEvent::parse_line("~ lights"),
            Some(TranscriptEvent::Partial("lights".to_string()))
        );
        assert_eq!(TranscriptEvent::parse_line("   "), None);
        assert_eq!(TranscriptEvent::parse_line("~"), None);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let (feed, rx) = transcript_channel(1);
        assert!(feed.submit(TranscriptEvent::Final("one".into())));
        assert!(!feed.submit(TranscriptEvent::Final("two".into())));
        assert_eq!(rx.try_recv(), Ok(TranscriptEvent::Final("one".into())));
    }

    #[test]
    fn submit_reports_missing_worker() {
        let (feed, rx) = transcript_channel(4);
        drop(rx);
        assert!(!feed.submit(TranscriptEvent::Final("lost".into())));
    }

    #[test]
    fn line_recognizer_forwards_lines_in_order() {
        let (feed, rx) = transcript_channel(8);
        let input = Cursor::new("first\n\n~part\nsecond\n");
        spawn_line_recognizer(input, feed)
            .join()
            .expect("recognizer thread");
        let events: Vec<TranscriptEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                TranscriptEvent::Final("first".into()),
                TranscriptEvent::Partial("part".into()),
                TranscriptEvent::Final("second".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn worker_matches_finals_and_ignores_partials() {
        let sink = Arc::new(RecordingSink::new());
        let engine = Engine::new(
            Arc::new(CommandRegistry::new(vec![
                Command::new("lights on").with_action(Action::set("/p/light", 1))
            ])),
            DelayScheduler::new(sink.clone(), Handle::current()),
            ChatboxRelay::disabled(),
        );
        let (feed, rx) = transcript_channel(8);
        feed.submit(TranscriptEvent::Partial("lights on".into()));
        feed.submit(TranscriptEvent::Final("Lights on".into()));
        feed.submit(TranscriptEvent::Final("lights off".into()));
        drop(feed);

        assert_eq!(run_matching_worker(&engine, rx, false), 2);
        assert_eq!(
            sink.sent(),
            vec![("/p/light".to_string(), ActionValue::Int(1))]
        );
    }
}
