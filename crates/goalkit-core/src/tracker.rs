//! Milestone-completion history and the execution statistics derived from it.
//!
//! The history is an append-only YAML sequence at `.goalkit/history.yaml`.
//! Appends rewrite the whole file atomically while holding the file's
//! [`WriteLease`], so a concurrent reader sees either the old or the new
//! sequence. Recording the same milestone twice creates two entries; callers
//! that want dedup must check [`ExecutionTracker::history`] first.

use crate::config::Config;
use crate::error::{GoalkitError, Result};
use crate::io::{atomic_write, read_optional, WriteLease};
use crate::paths;
use crate::project::ProjectSnapshot;
use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Length of the activity timeline, today inclusive.
pub const TIMELINE_DAYS: i64 = 30;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
/// Upper bound on `window_days` (one hundred years).
pub const MAX_WINDOW_DAYS: i64 = 36_500;

// ---------------------------------------------------------------------------
// MilestoneRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneRecord {
    pub milestone_id: String,
    pub goal_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl MilestoneRecord {
    pub fn completed_on(&self) -> NaiveDate {
        self.completed_at.date_naive()
    }
}

/// Parse a history document. Blank input is an empty history.
pub fn parse_history(data: &str) -> std::result::Result<Vec<MilestoneRecord>, serde_yaml::Error> {
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(data)
}

pub fn serialize_history(records: &[MilestoneRecord]) -> Result<String> {
    Ok(serde_yaml::to_string(records)?)
}

// ---------------------------------------------------------------------------
// ExecutionTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ExecutionTracker {
    path: PathBuf,
    lock_timeout: Duration,
}

impl ExecutionTracker {
    pub fn new(root: &Path) -> Self {
        Self {
            path: paths::history_path(root),
            lock_timeout: Duration::from_millis(Config::default().tracking.lock_timeout_ms),
        }
    }

    pub fn from_config(root: &Path, config: &Config) -> Self {
        Self::new(root).with_lock_timeout(Duration::from_millis(config.tracking.lock_timeout_ms))
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record in append order. A missing or empty file is an empty
    /// history; anything unparsable is [`GoalkitError::CorruptHistory`].
    pub fn load(&self) -> Result<Vec<MilestoneRecord>> {
        let data = match read_optional(&self.path) {
            Ok(Some(data)) => data,
            Ok(None) => return Ok(Vec::new()),
            Err(GoalkitError::FileAccess { source, .. })
                if source.kind() == std::io::ErrorKind::InvalidData =>
            {
                return Err(self.corrupt(source.to_string()));
            }
            Err(e) => return Err(e),
        };
        let records = parse_history(&data).map_err(|e| self.corrupt(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), records = records.len(), "loaded milestone history");
        Ok(records)
    }

    fn corrupt(&self, reason: String) -> GoalkitError {
        GoalkitError::CorruptHistory {
            path: self.path.clone(),
            reason,
        }
    }

    /// Append one completion. `completed_at` defaults to now.
    pub fn record_milestone(
        &self,
        goal_id: &str,
        milestone_id: &str,
        completed_at: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> Result<MilestoneRecord> {
        if goal_id.trim().is_empty() {
            return Err(GoalkitError::InvalidArgument(
                "goal id must not be empty".to_string(),
            ));
        }
        if milestone_id.trim().is_empty() {
            return Err(GoalkitError::InvalidArgument(
                "milestone id must not be empty".to_string(),
            ));
        }
        let record = MilestoneRecord {
            milestone_id: milestone_id.to_string(),
            goal_id: goal_id.to_string(),
            completed_at: completed_at.unwrap_or_else(Utc::now),
            notes: notes.filter(|n| !n.trim().is_empty()),
        };

        let _lease = WriteLease::acquire(&self.path, self.lock_timeout)?;
        let mut records = self.load()?;
        records.push(record.clone());
        let data = serialize_history(&records)?;
        atomic_write(&self.path, data.as_bytes())?;
        tracing::debug!(
            goal = %record.goal_id,
            milestone = %record.milestone_id,
            total = records.len(),
            "recorded milestone"
        );
        Ok(record)
    }

    /// Records in append order, optionally limited to one goal.
    pub fn history(&self, goal_id: Option<&str>) -> Result<Vec<MilestoneRecord>> {
        let mut records = self.load()?;
        if let Some(goal) = goal_id {
            records.retain(|r| r.goal_id == goal);
        }
        Ok(records)
    }

    pub fn stats(&self, window_days: i64) -> Result<ExecutionStats> {
        self.stats_at(window_days, None, Utc::now())
    }

    /// Stats as of `now`. `outstanding` is the number of declared milestones
    /// not yet completed; it enables the completion estimate.
    pub fn stats_at(
        &self,
        window_days: i64,
        outstanding: Option<usize>,
        now: DateTime<Utc>,
    ) -> Result<ExecutionStats> {
        validate_window(window_days)?;
        let records = self.load()?;
        compute_stats(&records, window_days, outstanding, now)
    }
}

fn validate_window(window_days: i64) -> Result<()> {
    if !(1..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(GoalkitError::InvalidWindow(window_days));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub total: usize,
    pub in_window: usize,
    /// Completions per day over the window.
    pub velocity: f64,
    /// Recency-weighted activity, `0.0..=100.0`.
    pub momentum: f64,
    /// Completions per calendar day for the last [`TIMELINE_DAYS`] days.
    pub timeline: BTreeMap<NaiveDate, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub as_of: NaiveDate,
    pub window_days: i64,
    pub total: usize,
    pub in_window: usize,
    pub velocity: f64,
    pub momentum: f64,
    pub timeline: BTreeMap<NaiveDate, usize>,
    pub outstanding: Option<usize>,
    pub estimated_completion: Option<NaiveDate>,
    pub per_goal: BTreeMap<String, Activity>,
}

/// Pure statistics over `records` as of `now`.
///
/// A record is inside the window when its UTC date lies in
/// `[today - (window - 1), today]`.
pub fn compute_stats(
    records: &[MilestoneRecord],
    window_days: i64,
    outstanding: Option<usize>,
    now: DateTime<Utc>,
) -> Result<ExecutionStats> {
    validate_window(window_days)?;
    let today = now.date_naive();

    let overall = activity(records.iter(), window_days, today);

    let mut by_goal: BTreeMap<&str, Vec<&MilestoneRecord>> = BTreeMap::new();
    for r in records {
        by_goal.entry(r.goal_id.as_str()).or_default().push(r);
    }
    let per_goal = by_goal
        .into_iter()
        .map(|(goal, rs)| (goal.to_string(), activity(rs.into_iter(), window_days, today)))
        .collect();

    let estimated_completion = match outstanding {
        Some(n) if overall.velocity > 0.0 => {
            let days = (n as f64 / overall.velocity).ceil() as u64;
            today.checked_add_days(Days::new(days))
        }
        _ => None,
    };

    Ok(ExecutionStats {
        as_of: today,
        window_days,
        total: overall.total,
        in_window: overall.in_window,
        velocity: overall.velocity,
        momentum: overall.momentum,
        timeline: overall.timeline,
        outstanding,
        estimated_completion,
        per_goal,
    })
}

fn days_before(today: NaiveDate, days: i64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days.max(0) as u64))
        .unwrap_or(NaiveDate::MIN)
}

fn activity<'a>(
    records: impl Iterator<Item = &'a MilestoneRecord>,
    window_days: i64,
    today: NaiveDate,
) -> Activity {
    let window_start = days_before(today, window_days - 1);
    let timeline_start = days_before(today, TIMELINE_DAYS - 1);

    let mut timeline: BTreeMap<NaiveDate, usize> = timeline_start
        .iter_days()
        .take_while(|d| *d <= today)
        .map(|d| (d, 0))
        .collect();

    let mut total = 0;
    let mut in_window = 0;
    let mut oldest: Option<NaiveDate> = None;
    let mut weight_sum = 0.0;
    let window = window_days as f64;

    for r in records {
        total += 1;
        let day = r.completed_on();
        if let Some(count) = timeline.get_mut(&day) {
            *count += 1;
        }
        if day < window_start || day > today {
            continue;
        }
        in_window += 1;
        oldest = Some(oldest.map_or(day, |o| o.min(day)));
        let age = (today - day).num_days() as f64;
        weight_sum += (window - age) / window;
    }

    let velocity = match oldest {
        Some(oldest) => {
            let span = (today - oldest).num_days() + 1;
            in_window as f64 / span.min(window_days) as f64
        }
        None => 0.0,
    };

    // One completion on every day of the window scores exactly 100.
    let max_sum = (window + 1.0) / 2.0;
    let momentum = (100.0 * weight_sum / max_sum).min(100.0);

    Activity {
        total,
        in_window,
        velocity,
        momentum,
        timeline,
    }
}

// ---------------------------------------------------------------------------
// Outstanding milestones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingMilestone {
    pub goal_id: String,
    pub milestone_id: String,
    pub title: String,
}

/// Milestones declared in goal documents that have no completion record for
/// the same goal, in declaration order.
pub fn outstanding_milestones(
    snapshot: &ProjectSnapshot,
    records: &[MilestoneRecord],
) -> Vec<OutstandingMilestone> {
    let done: HashSet<(&str, &str)> = records
        .iter()
        .map(|r| (r.goal_id.as_str(), r.milestone_id.as_str()))
        .collect();
    snapshot
        .goals
        .iter()
        .flat_map(|g| {
            g.milestones.iter().map(move |m| (g.identifier.as_str(), m))
        })
        .filter(|(goal, m)| !done.contains(&(*goal, m.id.as_str())))
        .map(|(goal, m)| OutstandingMilestone {
            goal_id: goal.to_string(),
            milestone_id: m.id.clone(),
            title: m.title.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
