//! Read-through cached view of a user's open timers.
//!
//! Consumers see one abstraction regardless of how freshness is achieved:
//! the view refetches from its [`TimerSource`] when the cache is older than
//! `max_age`, and any local mutation should call [`TimerView::invalidate`]
//! so the next read goes back to the source.

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::db::Database;
use crate::models::Timer;

/// Anything that can produce the current open-timer list for a user.
pub trait TimerSource {
    fn open_timers(&self, user_email: &str) -> Result<Vec<Timer>>;
}

impl TimerSource for Database {
    fn open_timers(&self, user_email: &str) -> Result<Vec<Timer>> {
        self.list_open_timers(user_email)
    }
}

impl<T: TimerSource + ?Sized> TimerSource for &T {
    fn open_timers(&self, user_email: &str) -> Result<Vec<Timer>> {
        (**self).open_timers(user_email)
    }
}

pub struct TimerView<S> {
    source: S,
    user_email: String,
    max_age: Duration,
    cache: Vec<Timer>,
    fetched_at: Option<Instant>,
}

impl<S: TimerSource> TimerView<S> {
    pub fn new(source: S, user_email: impl Into<String>, max_age: Duration) -> Self {
        TimerView {
            source,
            user_email: user_email.into(),
            max_age,
            cache: Vec::new(),
            fetched_at: None,
        }
    }

    /// The current open timers, refetched when the cache is stale.
    pub fn timers(&mut self) -> Result<&[Timer]> {
        let stale = self
            .fetched_at
            .map_or(true, |at| at.elapsed() >= self.max_age);
        if stale {
            self.cache = self.source.open_timers(&self.user_email)?;
            self.fetched_at = Some(Instant::now());
        }
        Ok(&self.cache)
    }

    /// Forces the next read to hit the source. Call after every local
    /// mutation (start/pause/resume/stop).
    pub fn invalidate(&mut self) {
        self.fetched_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl TimerSource for CountingSource {
        fn open_timers(&self, user_email: &str) -> Result<Vec<Timer>> {
            self.calls.set(self.calls.get() + 1);
            let now = Utc::now();
            Ok(vec![Timer {
                id: self.calls.get() as i64,
                user_email: user_email.to_string(),
                project: "NOC".to_string(),
                ticket_id: "INC-1".to_string(),
                task_detail: "triage".to_string(),
                categories: Default::default(),
                start_time: now,
                is_running: true,
                is_paused: false,
                pause_start_time: None,
                total_pause_duration_seconds: 0,
                created_at: now,
            }])
        }
    }

    #[test]
    fn test_fresh_cache_is_not_refetched() {
        let source = CountingSource { calls: Cell::new(0) };
        let mut view = TimerView::new(&source, "u@example.com", Duration::from_secs(60));
        view.timers().unwrap();
        view.timers().unwrap();
        view.timers().unwrap();
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let source = CountingSource { calls: Cell::new(0) };
        let mut view = TimerView::new(&source, "u@example.com", Duration::from_secs(60));
        view.timers().unwrap();
        view.invalidate();
        let timers = view.timers().unwrap();
        assert_eq!(source.calls.get(), 2);
        assert_eq!(timers[0].id, 2);
    }

    #[test]
    fn test_zero_max_age_always_refetches() {
        let source = CountingSource { calls: Cell::new(0) };
        let mut view = TimerView::new(&source, "u@example.com", Duration::ZERO);
        view.timers().unwrap();
        view.timers().unwrap();
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_database_is_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        db.create_timer("u@example.com", "NOC", "INC-1", "triage", &Default::default())
            .unwrap();
        let mut view = TimerView::new(&db, "u@example.com", Duration::from_secs(5));
        assert_eq!(view.timers().unwrap().len(), 1);
    }
}
