use crate::config::Config;
use crate::error::Result;
use crate::project::{load_project, ProjectSnapshot};
use crate::types::{PhaseHint, ProjectPhase};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const COMPLETION_WEIGHT: f64 = 0.4;
pub const METRICS_WEIGHT: f64 = 0.3;
pub const CRITERIA_WEIGHT: f64 = 0.2;
pub const PHASE_WEIGHT: f64 = 0.1;

/// Average completion (percent) at or above which a project is complete.
pub const DEFAULT_COMPLETE_THRESHOLD: f64 = 90.0;

// ---------------------------------------------------------------------------
// HealthBreakdown
// ---------------------------------------------------------------------------

/// The four normalized sub-fractions that make up the health score, each in
/// `[0, 1]`. Any fraction with a zero denominator is 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthBreakdown {
    pub avg_completion: f64,
    pub metrics_defined: f64,
    pub success_criteria: f64,
    pub phase_progress: f64,
}

impl HealthBreakdown {
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Self {
        let goals = &snapshot.goals;
        if goals.is_empty() {
            return Self::default();
        }
        let n = goals.len() as f64;

        let completion_sum: f64 = goals.iter().map(|g| g.completion_or_zero() as f64).sum();
        let with_metrics = goals.iter().filter(|g| g.has_metrics_section).count() as f64;
        let checked: usize = goals.iter().map(|g| g.success_criteria_checked).sum();
        let total: usize = goals.iter().map(|g| g.success_criteria_total).sum();
        let phase_sum: f64 = goals.iter().map(|g| g.phase_hint.progress()).sum();

        Self {
            avg_completion: completion_sum / n / 100.0,
            metrics_defined: with_metrics / n,
            success_criteria: ratio(checked, total),
            phase_progress: phase_sum / n,
        }
    }

    /// Weighted score in `[0, 100]`, rounded to the nearest integer.
    pub fn score(&self) -> u32 {
        let raw = 100.0
            * (COMPLETION_WEIGHT * self.avg_completion
                + METRICS_WEIGHT * self.metrics_defined
                + CRITERIA_WEIGHT * self.success_criteria
                + PHASE_WEIGHT * self.phase_progress);
        raw.round().clamp(0.0, 100.0) as u32
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

// ---------------------------------------------------------------------------
// Scoring and phase detection
// ---------------------------------------------------------------------------

pub fn health_score(snapshot: &ProjectSnapshot) -> u32 {
    HealthBreakdown::from_snapshot(snapshot).score()
}

/// Mean completion percent across goals, missing markers counted as 0.
pub fn average_completion(snapshot: &ProjectSnapshot) -> f64 {
    if snapshot.goals.is_empty() {
        return 0.0;
    }
    let sum: f64 = snapshot
        .goals
        .iter()
        .map(|g| g.completion_or_zero() as f64)
        .sum();
    sum / snapshot.goals.len() as f64
}

pub fn detect_phase(snapshot: &ProjectSnapshot) -> ProjectPhase {
    detect_phase_with_threshold(snapshot, DEFAULT_COMPLETE_THRESHOLD)
}

/// Priority ladder, first match wins: completion threshold, then any goal in
/// execute/milestones, then any goal in strategies/goal, else setup.
pub fn detect_phase_with_threshold(snapshot: &ProjectSnapshot, threshold: f64) -> ProjectPhase {
    let any_hint = |hints: &[PhaseHint]| {
        snapshot
            .goals
            .iter()
            .any(|g| hints.contains(&g.phase_hint))
    };

    if !snapshot.goals.is_empty() && average_completion(snapshot) >= threshold {
        ProjectPhase::Complete
    } else if any_hint(&[PhaseHint::Execute, PhaseHint::Milestones]) {
        ProjectPhase::Execution
    } else if any_hint(&[PhaseHint::Strategies, PhaseHint::Goal]) {
        ProjectPhase::Active
    } else {
        ProjectPhase::Setup
    }
}

// ---------------------------------------------------------------------------
// AnalysisResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub snapshot: ProjectSnapshot,
    pub health_score: u32,
    pub phase: ProjectPhase,
    /// Mean completion percent, `0.0..=100.0`.
    pub average_completion: f64,
    pub milestone_count: usize,
    pub breakdown: HealthBreakdown,
}

impl AnalysisResult {
    pub fn from_snapshot(snapshot: ProjectSnapshot, config: &Config) -> Self {
        let breakdown = HealthBreakdown::from_snapshot(&snapshot);
        let phase = detect_phase_with_threshold(
            &snapshot,
            config.analysis.complete_threshold as f64,
        );
        Self {
            health_score: breakdown.score(),
            phase,
            average_completion: average_completion(&snapshot),
            milestone_count: snapshot.milestone_count(),
            breakdown,
            snapshot,
        }
    }
}

/// Load the project at `root` and derive its health and phase.
pub fn analyze(root: &Path) -> Result<AnalysisResult> {
    let snapshot = load_project(root)?;
    let config = Config::load(root)?;
    let result = AnalysisResult::from_snapshot(snapshot, &config);
    tracing::debug!(
        project = %result.snapshot.name,
        goals = result.snapshot.goals.len(),
        score = result.health_score,
        phase = %result.phase,
        "analysis complete"
    );
    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
