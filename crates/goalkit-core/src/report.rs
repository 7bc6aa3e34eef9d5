use crate::error::Result;
use crate::health::{AnalysisResult, HealthBreakdown};
use crate::tracker::{ExecutionStats, MilestoneRecord, OutstandingMilestone};
use crate::types::{PhaseHint, ProjectPhase};
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// Output modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

impl OutputMode {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Json(serde_json::Value),
    Text(String),
}

// ---------------------------------------------------------------------------
// Analysis report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GoalSummary {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub phase_hint: PhaseHint,
    pub completion: Option<u32>,
    pub criteria_checked: usize,
    pub criteria_total: usize,
    /// `checked / total`, 0 when the goal has no criteria.
    pub criteria_ratio: f64,
    pub has_metrics: bool,
    pub milestones: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneCounts {
    pub declared: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub project: String,
    pub phase: ProjectPhase,
    pub health_score: u32,
    pub average_completion: f64,
    pub goals: Vec<GoalSummary>,
    pub milestones: MilestoneCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<HealthBreakdown>,
}

impl AnalysisReport {
    /// `completed` is the number of history records; `verbose` adds the
    /// health breakdown.
    pub fn new(result: &AnalysisResult, completed: usize, verbose: bool) -> Self {
        let goals = result
            .snapshot
            .goals
            .iter()
            .map(|g| GoalSummary {
                id: g.identifier.clone(),
                title: g.title.clone(),
                phase_hint: g.phase_hint,
                completion: g.completion_percent,
                criteria_checked: g.success_criteria_checked,
                criteria_total: g.success_criteria_total,
                criteria_ratio: if g.success_criteria_total == 0 {
                    0.0
                } else {
                    g.success_criteria_checked as f64 / g.success_criteria_total as f64
                },
                has_metrics: g.has_metrics_section,
                milestones: g.milestones.len(),
            })
            .collect();
        Self {
            project: result.snapshot.name.clone(),
            phase: result.phase,
            health_score: result.health_score,
            average_completion: result.average_completion,
            goals,
            milestones: MilestoneCounts {
                declared: result.milestone_count,
                completed,
            },
            breakdown: verbose.then_some(result.breakdown),
        }
    }

    pub fn render(&self, mode: OutputMode) -> Result<Rendered> {
        match mode {
            OutputMode::Json => Ok(Rendered::Json(serde_json::to_value(self)?)),
            OutputMode::Text => Ok(Rendered::Text(self.to_text())),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Project: {}   Phase: {}   Health: {}/100",
            self.project, self.phase, self.health_score
        );
        let _ = writeln!(
            out,
            "Average completion: {:.1}%   Milestones: {} declared, {} completed",
            self.average_completion, self.milestones.declared, self.milestones.completed
        );
        out.push('\n');

        if self.goals.is_empty() {
            out.push_str("No goals found.\n");
        } else {
            let rows = self
                .goals
                .iter()
                .map(|g| {
                    vec![
                        g.id.clone(),
                        g.phase_hint.to_string(),
                        g.completion
                            .map(|c| format!("{c}%"))
                            .unwrap_or_else(|| "-".to_string()),
                        format!("{}/{}", g.criteria_checked, g.criteria_total),
                        if g.has_metrics { "yes" } else { "no" }.to_string(),
                        g.milestones.to_string(),
                    ]
                })
                .collect();
            out.push_str(&format_table(
                &["GOAL", "PHASE", "COMPLETION", "CRITERIA", "METRICS", "MILESTONES"],
                rows,
            ));
        }

        if let Some(b) = &self.breakdown {
            out.push('\n');
            out.push_str("HEALTH BREAKDOWN\n");
            let _ = writeln!(out, "  {:<18} {:.2} x 0.4", "completion", b.avg_completion);
            let _ = writeln!(out, "  {:<18} {:.2} x 0.3", "metrics defined", b.metrics_defined);
            let _ = writeln!(out, "  {:<18} {:.2} x 0.2", "success criteria", b.success_criteria);
            let _ = writeln!(out, "  {:<18} {:.2} x 0.1", "phase progress", b.phase_progress);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Execution report
// ---------------------------------------------------------------------------

/// One history record in machine-readable output. The persisted history keeps
/// its camelCase keys; report JSON is snake_case throughout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub goal_id: String,
    pub milestone_id: String,
    pub completed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&MilestoneRecord> for HistoryEntry {
    fn from(r: &MilestoneRecord) -> Self {
        Self {
            goal_id: r.goal_id.clone(),
            milestone_id: r.milestone_id.clone(),
            completed_at: r.completed_at,
            notes: r.notes.clone(),
        }
    }
}

fn history_entries<S: Serializer>(
    records: &[MilestoneRecord],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_seq(records.iter().map(HistoryEntry::from))
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(serialize_with = "history_entries")]
    pub history: Vec<MilestoneRecord>,
    /// Omitted when only completed milestones were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outstanding: Option<Vec<OutstandingMilestone>>,
    pub stats: ExecutionStats,
}

impl ExecutionReport {
    pub fn render(&self, mode: OutputMode) -> Result<Rendered> {
        match mode {
            OutputMode::Json => Ok(Rendered::Json(serde_json::to_value(self)?)),
            OutputMode::Text => Ok(Rendered::Text(self.to_text())),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let s = &self.stats;

        match &self.goal {
            Some(goal) => {
                let _ = writeln!(out, "HISTORY ({goal})");
            }
            None => out.push_str("HISTORY\n"),
        }
        if self.history.is_empty() {
            out.push_str("  No milestones completed yet.\n");
        } else {
            let rows = self
                .history
                .iter()
                .map(|r| {
                    vec![
                        r.completed_at.format("%Y-%m-%d %H:%M").to_string(),
                        r.goal_id.clone(),
                        r.milestone_id.clone(),
                        r.notes.clone().unwrap_or_default(),
                    ]
                })
                .collect();
            out.push_str(&format_table(
                &["COMPLETED", "GOAL", "MILESTONE", "NOTES"],
                rows,
            ));
        }

        if let Some(outstanding) = &self.outstanding {
            out.push('\n');
            out.push_str("OUTSTANDING\n");
            if outstanding.is_empty() {
                out.push_str("  Nothing outstanding.\n");
            } else {
                let rows = outstanding
                    .iter()
                    .map(|o| vec![o.goal_id.clone(), o.milestone_id.clone(), o.title.clone()])
                    .collect();
                out.push_str(&format_table(&["GOAL", "MILESTONE", "TITLE"], rows));
            }
        }

        out.push('\n');
        let _ = writeln!(
            out,
            "STATS (window {}d, as of {})",
            s.window_days, s.as_of
        );
        let _ = writeln!(
            out,
            "  Velocity: {:.2}/day   Momentum: {:.1}/100   Completed: {} in window, {} total",
            s.velocity, s.momentum, s.in_window, s.total
        );
        match (s.estimated_completion, s.outstanding) {
            (Some(date), Some(n)) => {
                let _ = writeln!(out, "  Estimated completion: {date} ({n} outstanding)");
            }
            (None, Some(n)) if n > 0 => {
                let _ = writeln!(
                    out,
                    "  Estimated completion: unknown ({n} outstanding, no recent velocity)"
                );
            }
            _ => {}
        }

        let active: Vec<_> = s.timeline.iter().filter(|(_, n)| **n > 0).collect();
        out.push('\n');
        let _ = writeln!(
            out,
            "TIMELINE (last {} days, {} active)",
            s.timeline.len(),
            active.len()
        );
        for (day, n) in active {
            let _ = writeln!(out, "  {day}  {n:>3}  {}", "#".repeat((*n).min(40)));
        }

        if self.goal.is_none() && !s.per_goal.is_empty() {
            out.push('\n');
            let rows = s
                .per_goal
                .iter()
                .map(|(goal, a)| {
                    vec![
                        goal.clone(),
                        a.total.to_string(),
                        a.in_window.to_string(),
                        format!("{:.2}", a.velocity),
                        format!("{:.1}", a.momentum),
                    ]
                })
                .collect();
            out.push_str(&format_table(
                &["GOAL", "TOTAL", "IN WINDOW", "VELOCITY", "MOMENTUM"],
                rows,
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Table formatting
// ---------------------------------------------------------------------------

/// Left-aligned, two-space separated table with a dashed rule under the
/// header.
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    let _ = writeln!(out, "{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    let _ = writeln!(out, "{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
