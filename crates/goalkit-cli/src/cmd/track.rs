use crate::output::{print_json, print_rendered};
use anyhow::Context;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use goalkit_core::{
    config::Config,
    project::load_project,
    query::{run_execution, ExecutionQuery},
    report::{HistoryEntry, OutputMode},
    tracker::ExecutionTracker,
};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum TrackSubcommand {
    /// Record a milestone completion (recording twice creates two entries)
    Record {
        /// Goal identifier (its directory name under .goalkit/goals)
        goal: String,
        /// Milestone identifier, e.g. milestone-1
        milestone: String,
        /// Completion time as RFC 3339 or YYYY-MM-DD (default: now)
        #[arg(long, value_name = "WHEN")]
        at: Option<String>,
        /// Free-form notes stored with the record
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show milestone history, outstanding milestones, and execution stats
    Show {
        /// Only show one goal
        #[arg(long)]
        goal: Option<String>,
        /// Hide outstanding milestones
        #[arg(long)]
        completed_only: bool,
        /// Velocity/momentum window in days (default: tracking.window_days)
        #[arg(long, value_name = "DAYS", allow_negative_numbers = true)]
        window: Option<i64>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: TrackSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        TrackSubcommand::Record {
            goal,
            milestone,
            at,
            notes,
        } => record(root, &goal, &milestone, at.as_deref(), notes, json),
        TrackSubcommand::Show {
            goal,
            completed_only,
            window,
        } => show(root, goal, completed_only, window, json),
    }
}

// ---------------------------------------------------------------------------
// record
// ---------------------------------------------------------------------------

fn record(
    root: &Path,
    goal: &str,
    milestone: &str,
    at: Option<&str>,
    notes: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let completed_at = at.map(parse_when).transpose()?;

    let snapshot = load_project(root)
        .with_context(|| format!("failed to load project at {}", root.display()))?;
    match snapshot.goal(goal) {
        None => tracing::warn!("goal '{goal}' not found under .goalkit/goals; recording anyway"),
        Some(g) if !g.milestones.is_empty() && !g.milestones.iter().any(|m| m.id == milestone) => {
            tracing::warn!("milestone '{milestone}' is not declared in goal '{goal}'");
        }
        Some(_) => {}
    }

    let config = Config::load(root).context("failed to load config")?;
    let tracker = ExecutionTracker::from_config(root, &config);
    let rec = tracker
        .record_milestone(goal, milestone, completed_at, notes)
        .context("failed to record milestone")?;

    if json {
        print_json(&HistoryEntry::from(&rec))?;
    } else {
        println!(
            "Recorded '{}' for goal '{}' at {}",
            rec.milestone_id,
            rec.goal_id,
            rec.completed_at.to_rfc3339()
        );
    }
    Ok(())
}

fn parse_when(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid --at '{raw}': expected RFC 3339 or YYYY-MM-DD"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("invalid --at '{raw}'"))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(
    root: &Path,
    goal: Option<String>,
    completed_only: bool,
    window: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let query = ExecutionQuery {
        goal,
        completed_only,
        window_days: window,
        mode: OutputMode::from_json_flag(json),
    };
    let rendered = run_execution(root, &query)
        .with_context(|| format!("failed to load execution history for {}", root.display()))?;
    print_rendered(&rendered)
}
