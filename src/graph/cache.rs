//! Per-node value cache
//!
//! Every DAG node stores its payload in a [`ValueCache`]: the current value,
//! an optional backup, and a three-state flag. The cached value is
//! authoritative exactly when the state is [`TouchState::Stable`]. A touch
//! saves the current value into the backup slot (once) and marks the cache
//! stale; a keep commits the current value and discards the backup; a
//! restore reinstates the backup.
//!
//! The touch is deliberately idempotent: a second touch before the cache is
//! resolved must not overwrite the already-saved backup, or a chain of
//! speculative mutations would lose the last known-good value.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Cache state flag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchState {
    /// The current value is authoritative; no backup is held
    Stable,
    /// The current value is speculative; the backup holds the last
    /// known-good value
    Touched,
    /// A rollback has been requested but the backup has not yet been
    /// swapped back in
    PendingRestore,
}

/// A current value, an optional backup, and the state flag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValueCache {
    current: Value,
    backup: Option<Value>,
    state: TouchState,
}

impl ValueCache {
    /// Create a stable cache holding `value`
    pub fn new(value: Value) -> Self {
        Self {
            current: value,
            backup: None,
            state: TouchState::Stable,
        }
    }

    /// The current value
    ///
    /// While touched this is speculative and possibly stale; callers that
    /// need an authoritative value must recompute first.
    pub fn current(&self) -> &Value {
        &self.current
    }

    /// Mutable access to the current value
    pub fn current_mut(&mut self) -> &mut Value {
        &mut self.current
    }

    /// Replace the current value, leaving the state flag untouched
    pub fn set_current(&mut self, value: Value) {
        self.current = value;
    }

    /// The backup value, present only while touched
    pub fn backup(&self) -> Option<&Value> {
        self.backup.as_ref()
    }

    /// Current state flag
    pub fn state(&self) -> TouchState {
        self.state
    }

    /// Whether the cache holds speculative state
    pub fn is_touched(&self) -> bool {
        self.state != TouchState::Stable
    }

    /// Mark the cache touched, saving the backup on the first call
    ///
    /// Returns `true` if the cache was stable before (i.e. this call
    /// actually touched it), `false` on a repeated touch.
    pub fn touch(&mut self) -> bool {
        if self.state == TouchState::Stable {
            self.backup = Some(self.current.clone());
            self.state = TouchState::Touched;
            true
        } else {
            false
        }
    }

    /// Commit the current value, discarding the backup
    pub fn keep(&mut self) {
        self.backup = None;
        self.state = TouchState::Stable;
    }

    /// Request a rollback without swapping yet
    ///
    /// Only meaningful on a touched cache; a stable cache stays stable.
    pub fn mark_restore(&mut self) {
        if self.state == TouchState::Touched {
            self.state = TouchState::PendingRestore;
        }
    }

    /// Complete a requested rollback by reinstating the backup
    pub fn resolve_restore(&mut self) {
        if self.state == TouchState::PendingRestore {
            if let Some(backup) = self.backup.take() {
                self.current = backup;
            }
            self.state = TouchState::Stable;
        }
    }

    /// Discard the current value and reinstate the backup
    ///
    /// No-op on a stable cache.
    pub fn restore(&mut self) {
        self.mark_restore();
        self.resolve_restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cache_is_stable() {
        let cache = ValueCache::new(Value::Real(1.0));
        assert_eq!(cache.state(), TouchState::Stable);
        assert!(!cache.is_touched());
        assert!(cache.backup().is_none());
    }

    #[test]
    fn test_touch_saves_backup_once() {
        let mut cache = ValueCache::new(Value::Real(1.0));
        assert!(cache.touch());
        cache.set_current(Value::Real(2.0));

        // second touch must not clobber the saved backup
        assert!(!cache.touch());
        assert_eq!(cache.backup(), Some(&Value::Real(1.0)));
    }

    #[test]
    fn test_restore_reinstates_backup() {
        let mut cache = ValueCache::new(Value::Real(1.0));
        cache.touch();
        cache.set_current(Value::Real(99.0));
        cache.restore();
        assert_eq!(cache.current(), &Value::Real(1.0));
        assert_eq!(cache.state(), TouchState::Stable);
        assert!(cache.backup().is_none());
    }

    #[test]
    fn test_keep_discards_backup() {
        let mut cache = ValueCache::new(Value::Real(1.0));
        cache.touch();
        cache.set_current(Value::Real(2.0));
        cache.keep();
        assert_eq!(cache.current(), &Value::Real(2.0));
        assert_eq!(cache.state(), TouchState::Stable);
        assert!(cache.backup().is_none());
    }

    #[test]
    fn test_double_touch_then_restore_equals_single_touch() {
        let mut once = ValueCache::new(Value::Real(5.0));
        once.touch();
        once.set_current(Value::Real(6.0));
        once.restore();

        let mut twice = ValueCache::new(Value::Real(5.0));
        twice.touch();
        twice.touch();
        twice.set_current(Value::Real(6.0));
        twice.restore();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_two_phase_restore() {
        let mut cache = ValueCache::new(Value::Real(1.0));
        cache.touch();
        cache.set_current(Value::Real(2.0));
        cache.mark_restore();
        assert_eq!(cache.state(), TouchState::PendingRestore);
        assert!(cache.is_touched());
        // current still speculative until resolved
        assert_eq!(cache.current(), &Value::Real(2.0));
        cache.resolve_restore();
        assert_eq!(cache.current(), &Value::Real(1.0));
        assert_eq!(cache.state(), TouchState::Stable);
    }

    #[test]
    fn test_restore_on_stable_cache_is_noop() {
        let mut cache = ValueCache::new(Value::Real(4.0));
        cache.restore();
        assert_eq!(cache.current(), &Value::Real(4.0));
        assert_eq!(cache.state(), TouchState::Stable);
    }
}
