//! Session join window
//!
//! A session can be joined from `lead` minutes before its scheduled start
//! until its scheduled end, both bounds inclusive. Before the window opens a
//! countdown is shown; once it has closed nothing is shown.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use wellspring_config::{SessionSettings, DEFAULT_JOIN_LEAD_MINUTES, DEFAULT_SESSION_MINUTES};
use wellspring_util::{minutes_remaining, parse_timestamp, Countdown, Result, WellspringError};

/// Where "now" falls on a session's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinPhase {
    /// Window not yet open, countdown running
    Upcoming,
    /// Inside the join window
    Open,
    /// Window closed
    Concluded,
}

/// Join state of one session at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinWindowState {
    pub can_join: bool,

    /// Formatted countdown, only while the window has not opened
    pub time_until_join: Option<String>,

    /// Minutes until the window opens, only while it has not opened
    pub minutes_until_join: Option<i64>,

    /// Same value as `can_join`; consumers read either
    pub is_in_session_window: bool,

    pub phase: JoinPhase,
}

impl JoinWindowState {
    fn upcoming(remaining: Duration) -> Self {
        Self {
            can_join: false,
            time_until_join: Some(Countdown::from_duration(remaining).to_string()),
            minutes_until_join: Some(minutes_remaining(remaining)),
            is_in_session_window: false,
            phase: JoinPhase::Upcoming,
        }
    }

    fn open() -> Self {
        Self {
            can_join: true,
            time_until_join: None,
            minutes_until_join: None,
            is_in_session_window: true,
            phase: JoinPhase::Open,
        }
    }

    fn concluded() -> Self {
        Self {
            can_join: false,
            time_until_join: None,
            minutes_until_join: None,
            is_in_session_window: false,
            phase: JoinPhase::Concluded,
        }
    }
}

/// Lead time and default duration used to compute join windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinWindowPolicy {
    pub lead_minutes: i64,
    pub default_duration_minutes: i64,
}

impl Default for JoinWindowPolicy {
    fn default() -> Self {
        Self {
            lead_minutes: DEFAULT_JOIN_LEAD_MINUTES,
            default_duration_minutes: DEFAULT_SESSION_MINUTES,
        }
    }
}

impl From<SessionSettings> for JoinWindowPolicy {
    fn from(settings: SessionSettings) -> Self {
        Self {
            lead_minutes: settings.join_lead_minutes,
            default_duration_minutes: settings.default_duration_minutes,
        }
    }
}

impl JoinWindowPolicy {
    /// Evaluate the join window at `now`. Pure.
    pub fn evaluate(
        &self,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i64,
        now: DateTime<Utc>,
    ) -> JoinWindowState {
        // Bounds past chrono's range saturate: the window is already open,
        // or never closes.
        let window_open = self.opens_at(scheduled_at).unwrap_or(if self.lead_minutes > 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        });
        let window_close =
            closes_at(scheduled_at, duration_minutes).unwrap_or(if duration_minutes > 0 {
                DateTime::<Utc>::MAX_UTC
            } else {
                DateTime::<Utc>::MIN_UTC
            });

        if now < window_open {
            JoinWindowState::upcoming(window_open - now)
        } else if now <= window_close {
            JoinWindowState::open()
        } else {
            JoinWindowState::concluded()
        }
    }

    /// Evaluate from an ISO-8601 start time and an optional duration
    pub fn evaluate_iso(
        &self,
        scheduled_at: &str,
        duration_minutes: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<JoinWindowState> {
        let scheduled_at = parse_timestamp(scheduled_at)?;
        let duration = duration_minutes.unwrap_or(self.default_duration_minutes);

        if self.opens_at(scheduled_at).is_none() {
            return Err(WellspringError::malformed(format!(
                "join lead of {} minutes is out of range",
                self.lead_minutes
            )));
        }
        if closes_at(scheduled_at, duration).is_none() {
            return Err(WellspringError::malformed(format!(
                "session duration of {} minutes is out of range",
                duration
            )));
        }

        Ok(self.evaluate(scheduled_at, duration, now))
    }

    fn opens_at(&self, scheduled_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_minutes(self.lead_minutes)
            .and_then(|lead| scheduled_at.checked_sub_signed(lead))
    }
}

fn closes_at(scheduled_at: DateTime<Utc>, duration_minutes: i64) -> Option<DateTime<Utc>> {
    Duration::try_minutes(duration_minutes)
        .and_then(|duration| scheduled_at.checked_add_signed(duration))
}

/// Evaluate with the default 15 minute lead
pub fn evaluate(
    scheduled_at: DateTime<Utc>,
    duration_minutes: i64,
    now: DateTime<Utc>,
) -> JoinWindowState {
    JoinWindowPolicy::default().evaluate(scheduled_at, duration_minutes, now)
}

/// Evaluate from ISO-8601 input with the default policy
pub fn evaluate_iso(
    scheduled_at: &str,
    duration_minutes: Option<i64>,
    now: DateTime<Utc>,
) -> Result<JoinWindowState> {
    JoinWindowPolicy::default().evaluate_iso(scheduled_at, duration_minutes, now)
}

/// Re-evaluates a session's join window once per second.
///
/// The latest state is published on a watch channel. The ticker stops once
/// the window has concluded, and is aborted when the watch is dropped.
pub struct JoinWindowWatch {
    rx: watch::Receiver<JoinWindowState>,
    task: JoinHandle<()>,
}

impl JoinWindowWatch {
    /// Start watching. Must be called from within a tokio runtime.
    pub fn spawn(
        policy: JoinWindowPolicy,
        scheduled_at: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Self {
        let initial = policy.evaluate(scheduled_at, duration_minutes, wellspring_util::now());
        let (tx, rx) = watch::channel(initial);

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let state = policy.evaluate(scheduled_at, duration_minutes, wellspring_util::now());
                let concluded = state.phase == JoinPhase::Concluded;

                tx.send_if_modified(|current| {
                    if *current == state {
                        return false;
                    }
                    *current = state;
                    true
                });

                if concluded {
                    debug!(scheduled_at = %scheduled_at, "Join window concluded, ticker stopping");
                    break;
                }
            }
        });

        Self { rx, task }
    }

    pub fn current(&self) -> JoinWindowState {
        self.rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<JoinWindowState> {
        self.rx.clone()
    }
}

impl Drop for JoinWindowWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
