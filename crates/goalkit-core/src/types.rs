use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// PhaseHint
// ---------------------------------------------------------------------------

/// Lifecycle stage a single goal document has reached.
///
/// Variants are declared in stage order, so `Ord` compares how far along a
/// document is; `Unknown` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseHint {
    Unknown,
    Vision,
    Goal,
    Strategies,
    Milestones,
    Execute,
    Done,
}

impl PhaseHint {
    pub fn all() -> &'static [PhaseHint] {
        &[
            PhaseHint::Unknown,
            PhaseHint::Vision,
            PhaseHint::Goal,
            PhaseHint::Strategies,
            PhaseHint::Milestones,
            PhaseHint::Execute,
            PhaseHint::Done,
        ]
    }

    /// Fixed ordinal progress used by the health score.
    pub fn progress(self) -> f64 {
        match self {
            PhaseHint::Unknown => 0.0,
            PhaseHint::Vision => 0.2,
            PhaseHint::Goal => 0.4,
            PhaseHint::Strategies => 0.6,
            PhaseHint::Milestones => 0.8,
            PhaseHint::Execute | PhaseHint::Done => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseHint::Unknown => "unknown",
            PhaseHint::Vision => "vision",
            PhaseHint::Goal => "goal",
            PhaseHint::Strategies => "strategies",
            PhaseHint::Milestones => "milestones",
            PhaseHint::Execute => "execute",
            PhaseHint::Done => "done",
        }
    }

    /// Map a keyword found in a document to a hint, accepting the
    /// singular/plural and noun/verb spellings authors use.
    pub fn from_keyword(word: &str) -> Option<PhaseHint> {
        match word.to_ascii_lowercase().as_str() {
            "vision" => Some(PhaseHint::Vision),
            "goal" | "goals" => Some(PhaseHint::Goal),
            "strategy" | "strategies" => Some(PhaseHint::Strategies),
            "milestone" | "milestones" => Some(PhaseHint::Milestones),
            "execute" | "execution" => Some(PhaseHint::Execute),
            "done" => Some(PhaseHint::Done),
            _ => None,
        }
    }
}

impl fmt::Display for PhaseHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PhaseHint {
    type Err = crate::error::GoalkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("unknown") {
            return Ok(PhaseHint::Unknown);
        }
        PhaseHint::from_keyword(s)
            .ok_or_else(|| crate::error::GoalkitError::InvalidPhase(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ProjectPhase
// ---------------------------------------------------------------------------

/// Coarse lifecycle classification of a whole project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectPhase {
    Setup,
    Active,
    Execution,
    Complete,
}

impl ProjectPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectPhase::Setup => "setup",
            ProjectPhase::Active => "active",
            ProjectPhase::Execution => "execution",
            ProjectPhase::Complete => "complete",
        }
    }
}

impl fmt::Display for ProjectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
