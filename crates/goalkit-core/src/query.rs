//! Entry points for the CLI layer: one call per query, returning data ready
//! to print in either output mode.

use crate::config::Config;
use crate::error::Result;
use crate::health::AnalysisResult;
use crate::project::load_project;
use crate::report::{AnalysisReport, ExecutionReport, OutputMode, Rendered};
use crate::tracker::{compute_stats, outstanding_milestones, ExecutionTracker};
use chrono::{DateTime, Utc};
use std::path::Path;

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisQuery {
    pub verbose: bool,
    pub mode: OutputMode,
}

pub fn analysis_report(root: &Path, verbose: bool) -> Result<AnalysisReport> {
    let snapshot = load_project(root)?;
    let config = Config::load(root)?;
    let records = ExecutionTracker::from_config(root, &config).load()?;
    let outstanding = outstanding_milestones(&snapshot, &records).len();

    let result = AnalysisResult::from_snapshot(snapshot, &config);
    let completed = result.milestone_count.saturating_sub(outstanding);
    Ok(AnalysisReport::new(&result, completed, verbose))
}

pub fn run_analysis(root: &Path, query: &AnalysisQuery) -> Result<Rendered> {
    analysis_report(root, query.verbose)?.render(query.mode)
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ExecutionQuery {
    pub goal: Option<String>,
    pub completed_only: bool,
    /// Falls back to `tracking.window_days` from the project config.
    pub window_days: Option<i64>,
    pub mode: OutputMode,
}

pub fn execution_report(root: &Path, query: &ExecutionQuery) -> Result<ExecutionReport> {
    execution_report_at(root, query, Utc::now())
}

pub fn execution_report_at(
    root: &Path,
    query: &ExecutionQuery,
    now: DateTime<Utc>,
) -> Result<ExecutionReport> {
    let snapshot = load_project(root)?;
    let config = Config::load(root)?;
    let window = query.window_days.unwrap_or(config.tracking.window_days);
    let tracker = ExecutionTracker::from_config(root, &config);
    let history = tracker.history(query.goal.as_deref())?;

    let mut outstanding = outstanding_milestones(&snapshot, &history);
    if let Some(goal) = &query.goal {
        outstanding.retain(|o| &o.goal_id == goal);
    }
    let stats = compute_stats(&history, window, Some(outstanding.len()), now)?;

    Ok(ExecutionReport {
        goal: query.goal.clone(),
        history,
        outstanding: (!query.completed_only).then_some(outstanding),
        stats,
    })
}

pub fn run_execution(root: &Path, query: &ExecutionQuery) -> Result<Rendered> {
    execution_report(root, query)?.render(query.mode)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GoalkitError;
    use crate::paths;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        for (id, body) in [
            (
                "beta",
                "# Goal: Beta\ncompletion: 50%\n### Milestone 1: Alpha\n### Milestone 2: Beta\n",
            ),
            ("docs", "# Docs\n## Vision\n### Milestone 1: Outline\n"),
        ] {
            let doc = paths::goal_document(dir.path(), id);
            std::fs::create_dir_all(doc.parent().unwrap()).unwrap();
            std::fs::write(doc, body).unwrap();
        }
        dir
    }

    #[test]
    fn analysis_counts_completed_declared_milestones() {
        let dir = project();
        let tracker = ExecutionTracker::new(dir.path());
        tracker.record_milestone("beta", "milestone-1", None, None).unwrap();
        tracker.record_milestone("beta", "milestone-1", None, None).unwrap();
        tracker.record_milestone("beta", "unplanned", None, None).unwrap();

        let report = analysis_report(dir.path(), false).unwrap();
        assert_eq!(report.milestones.declared, 3);
        assert_eq!(report.milestones.completed, 1);
        assert_eq!(report.goals.len(), 2);
    }

    #[test]
    fn analysis_surfaces_corrupt_history() {
        let dir = project();
        std::fs::write(paths::history_path(dir.path()), "not: [valid").unwrap();
        let err = analysis_report(dir.path(), false).unwrap_err();
        assert!(matches!(err, GoalkitError::CorruptHistory { .. }));
    }

    #[test]
    fn analysis_missing_root_fails() {
        let dir = TempDir::new().unwrap();
        let err = run_analysis(&dir.path().join("gone"), &AnalysisQuery::default()).unwrap_err();
        assert!(matches!(err, GoalkitError::ProjectNotFound(_)));
    }

    #[test]
    fn execution_report_with_estimate() {
        let dir = project();
        let tracker = ExecutionTracker::new(dir.path());
        tracker
            .record_milestone("beta", "milestone-1", Some(now() - Duration::days(1)), None)
            .unwrap();
        tracker
            .record_milestone("docs", "milestone-1", Some(now()), None)
            .unwrap();

        let report = execution_report_at(dir.path(), &ExecutionQuery::default(), now()).unwrap();
        assert_eq!(report.history.len(), 2);
        let outstanding = report.outstanding.as_ref().unwrap();
        assert_eq!(outstanding.len(), 1);
        assert_eq!(outstanding[0].milestone_id, "milestone-2");
        assert_eq!(report.stats.velocity, 1.0);
        assert_eq!(
            report.stats.estimated_completion,
            Some(now().date_naive() + Duration::days(1))
        );
    }

    #[test]
    fn execution_goal_filter_and_completed_only() {
        let dir = project();
        let tracker = ExecutionTracker::new(dir.path());
        tracker
            .record_milestone("docs", "milestone-1", Some(now()), None)
            .unwrap();
        tracker
            .record_milestone("beta", "milestone-2", Some(now()), None)
            .unwrap();

        let query = ExecutionQuery {
            goal: Some("beta".to_string()),
            completed_only: true,
            window_days: Some(7),
            ..Default::default()
        };
        let report = execution_report_at(dir.path(), &query, now()).unwrap();
        assert_eq!(report.history.len(), 1);
        assert_eq!(report.history[0].goal_id, "beta");
        assert!(report.outstanding.is_none());
        assert_eq!(report.stats.window_days, 7);
        assert_eq!(report.stats.outstanding, Some(1));
        assert_eq!(report.stats.per_goal.len(), 1);
    }

    #[test]
    fn execution_window_defaults_to_config() {
        let dir = project();
        std::fs::write(
            paths::config_path(dir.path()),
            "tracking:\n  window_days: 14\n",
        )
        .unwrap();
        let report = execution_report_at(dir.path(), &ExecutionQuery::default(), now()).unwrap();
        assert_eq!(report.stats.window_days, 14);
    }

    #[test]
    fn execution_rejects_bad_window() {
        let dir = project();
        let query = ExecutionQuery {
            window_days: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            execution_report(dir.path(), &query),
            Err(GoalkitError::InvalidWindow(0))
        ));
    }
}
