// src/notify/budget.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::VecDeque;

/// Rolling-window alert budget to keep the channel from being flooded.
/// - At most `max_alerts` sends inside any `window`.
/// - Checking does NOT mutate state; `record_alert` after a successful send.
#[derive(Debug, Clone)]
pub struct AlertBudget {
    window: ChronoDuration,
    max_alerts: usize,
    sent: VecDeque<DateTime<Utc>>,
}

impl AlertBudget {
    pub fn new(max_alerts: usize, window: ChronoDuration) -> Self {
        Self {
            window,
            max_alerts,
            sent: VecDeque::new(),
        }
    }

    /// `max_alerts` per rolling hour.
    pub fn per_hour(max_alerts: usize) -> Self {
        Self::new(max_alerts, ChronoDuration::hours(1))
    }

    /// Sends still allowed at `now`.
    pub fn remaining(&self, now: DateTime<Utc>) -> usize {
        let used = self
            .sent
            .iter()
            .filter(|ts| now.signed_duration_since(**ts) < self.window)
            .count();
        self.max_alerts.saturating_sub(used)
    }

    pub fn record_alert(&mut self, now: DateTime<Utc>) {
        while let Some(front) = self.sent.front() {
            if now.signed_duration_since(*front) >= self.window {
                self.sent.pop_front();
            } else {
                break;
            }
        }
        self.sent.push_back(now);
    }
}
