//! Shared state written by the inbound listener and read during dispatch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::command::ActionValue;
use crate::lock::{read_or_recover, write_or_recover};

/// Which context (e.g. loaded avatar id) commands are scoped against.
#[derive(Debug, Default)]
pub struct ActiveContext {
    current: RwLock<Option<Arc<str>>>,
}

impl ActiveContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current context id, read as one value.
    pub fn get(&self) -> Option<Arc<str>> {
        read_or_recover(&self.current, "active context read").clone()
    }

    /// Replace the context; returns true when the value actually changed.
    pub fn set(&self, context_id: Option<&str>) -> bool {
        let next: Option<Arc<str>> = context_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(Arc::from);
        let mut current = write_or_recover(&self.current, "active context write");
        if *current == next {
            return false;
        }
        *current = next;
        true
    }
}

/// Last-known value for each protocol path.
#[derive(Debug, Default)]
pub struct ParameterCache {
    values: RwLock<HashMap<String, ActionValue>>,
}

impl ParameterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<ActionValue> {
        read_or_recover(&self.values, "parameter cache read")
            .get(path)
            .cloned()
    }

    /// Toggle input for `path`; absent entries read as `false`.
    pub fn current_flag(&self, path: &str) -> bool {
        read_or_recover(&self.values, "parameter cache read")
            .get(path)
            .is_some_and(ActionValue::is_truthy)
    }

    pub fn update(&self, path: impl Into<String>, value: ActionValue) {
        write_or_recover(&self.values, "parameter cache write").insert(path.into(), value);
    }

    pub fn clear(&self) {
        write_or_recover(&self.values, "parameter cache clear").clear();
    }

    pub fn len(&self) -> usize {
        read_or_recover(&self.values, "parameter cache read").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn context_set_reports_changes_and_ignores_blank_ids() {
        let context = ActiveContext::new();
        assert_eq!(context.get(), None);
        assert!(context.set(Some("avtr_1")));
        assert!(!context.set(Some(" avtr_1 ")));
        assert_eq!(context.get().as_deref(), Some("avtr_1"));
        assert!(context.set(Some("   ")));
        assert_eq!(context.get(), None);
    }

    #[test]
    fn cache_defaults_missing_flags_to_false() {
        let cache = ParameterCache::new();
        assert!(!cache.current_flag("/p/mute"));
        cache.update("/p/mute", ActionValue::Bool(true));
        assert!(cache.current_flag("/p/mute"));
        cache.update("/p/mute", ActionValue::Int(0));
        assert!(!cache.current_flag("/p/mute"));
        assert_eq!(cache.get("/p/mute"), Some(ActionValue::Int(0)));
    }

    #[test]
    fn cache_clear_drops_every_entry() {
        let cache = ParameterCache::new();
        cache.update("/a", ActionValue::Float(0.3));
        cache.update("/b", ActionValue::Bool(true));
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_writers_never_produce_torn_context_reads() {
        let context = Arc::new(ActiveContext::new());
        let writers: Vec<_> = ["avtr_left", "avtr_right"]
            .into_iter()
            .map(|id| {
                let context = Arc::clone(&context);
                thread::spawn(move || {
                    for _ in 0..500 {
                        context.set(Some(id));
                    }
                })
            })
            .collect();
        for _ in 0..500 {
            if let Some(id) = context.get() {
                assert!(id.as_ref() == "avtr_left" || id.as_ref() == "avtr_right");
            }
        }
        for writer in writers {
            writer.join().expect("writer thread");
        }
    }
}
