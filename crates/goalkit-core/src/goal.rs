//! Goal document parsing.
//!
//! A goal document is loosely structured Markdown. Every signal is extracted
//! by an independent rule and a missing marker leaves the field at its
//! default, so parsing never fails.

use crate::paths;
use crate::types::PhaseHint;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// GoalRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredMilestone {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalRecord {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub phase_hint: PhaseHint,
    pub completion_percent: Option<u32>,
    pub success_criteria_total: usize,
    pub success_criteria_checked: usize,
    pub has_metrics_section: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<DeclaredMilestone>,
}

impl GoalRecord {
    /// Completion with a missing marker counted as 0.
    pub fn completion_or_zero(&self) -> u32 {
        self.completion_percent.unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static EXPLICIT_PHASE_RE: OnceLock<Regex> = OnceLock::new();
static STATUS_DONE_RE: OnceLock<Regex> = OnceLock::new();
static PHASE_HEADING_RE: OnceLock<Regex> = OnceLock::new();
static PHASE_COMMAND_RE: OnceLock<Regex> = OnceLock::new();
static COMPLETION_RE: OnceLock<Regex> = OnceLock::new();
static CHECKBOX_RE: OnceLock<Regex> = OnceLock::new();
static METRICS_HEADING_RE: OnceLock<Regex> = OnceLock::new();
static KPI_LINE_RE: OnceLock<Regex> = OnceLock::new();
static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static GOAL_PREFIX_RE: OnceLock<Regex> = OnceLock::new();
static MILESTONE_HEADING_RE: OnceLock<Regex> = OnceLock::new();

fn explicit_phase_re() -> &'static Regex {
    EXPLICIT_PHASE_RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:[-*]\s+)?[*_]*phase[*_]*\s*:[*_\s]*([a-z]+)").unwrap()
    })
}

fn status_done_re() -> &'static Regex {
    STATUS_DONE_RE.get_or_init(|| {
        Regex::new(
            r"(?im)^\s*(?:[-*]\s+)?[*_]*status[*_]*\s*:[*_\s]*(?:done|complete|completed|achieved)\b",
        )
        .unwrap()
    })
}

fn phase_heading_re() -> &'static Regex {
    PHASE_HEADING_RE.get_or_init(|| {
        Regex::new(
            r"(?im)^\s*#{1,6}\s*(?:\d+[.)]\s*)?(vision|goals?|strateg(?:y|ies)|milestones?|execut(?:e|ion))\b",
        )
        .unwrap()
    })
}

fn phase_command_re() -> &'static Regex {
    PHASE_COMMAND_RE.get_or_init(|| {
        Regex::new(r"(?i)/goalkit\.(vision|goal|strategies|milestones|execute)\b").unwrap()
    })
}

fn completion_re() -> &'static Regex {
    COMPLETION_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:completion|progress|completed)\b[*_\s]*:[*_\s]*(\d+)\s*%")
            .unwrap()
    })
}

fn checkbox_re() -> &'static Regex {
    CHECKBOX_RE.get_or_init(|| Regex::new(r"(?m)^\s*[-*]\s+\[([ xX])\]").unwrap())
}

fn metrics_heading_re() -> &'static Regex {
    METRICS_HEADING_RE.get_or_init(|| {
        Regex::new(
            r"(?im)^\s*#{1,6}\s+.*\b(?:metrics?|kpis?|key performance indicators|success measures|measures of success)\b",
        )
        .unwrap()
    })
}

fn kpi_line_re() -> &'static Regex {
    KPI_LINE_RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*(?:[-*]\s+)?[*_]*(?:kpi|metric)\s*[-#]?\s*\d+\b").unwrap()
    })
}

fn title_re() -> &'static Regex {
    TITLE_RE.get_or_init(|| Regex::new(r"(?m)^#\s+(.+?)\s*$").unwrap())
}

fn goal_prefix_re() -> &'static Regex {
    GOAL_PREFIX_RE.get_or_init(|| Regex::new(r"(?i)^goal\s*[:\-]\s*").unwrap())
}

fn milestone_heading_re() -> &'static Regex {
    MILESTONE_HEADING_RE.get_or_init(|| {
        Regex::new(r"(?im)^\s*#{2,6}\s*milestone\b[ \t]*(\d+)?[ \t]*[:.)\-–]?[ \t]*(.*?)[ \t]*$")
            .unwrap()
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse one goal document. Pure: the same text always yields the same record.
pub fn parse_goal(identifier: &str, text: &str) -> GoalRecord {
    let (checked, total) = success_criteria(text);
    GoalRecord {
        identifier: identifier.to_string(),
        title: title(text),
        phase_hint: phase_hint(text),
        completion_percent: completion_percent(text),
        success_criteria_total: total,
        success_criteria_checked: checked,
        has_metrics_section: has_metrics_section(text),
        milestones: declared_milestones(text),
    }
}

/// An explicit `phase:` line wins, then a `status: done` line, then the
/// furthest stage named by a section heading or `/goalkit.<stage>` marker.
pub fn phase_hint(text: &str) -> PhaseHint {
    if let Some(hint) = explicit_phase_re()
        .captures_iter(text)
        .find_map(|c| c[1].parse::<PhaseHint>().ok())
    {
        return hint;
    }
    if status_done_re().is_match(text) {
        return PhaseHint::Done;
    }
    let headings = phase_heading_re().captures_iter(text);
    let commands = phase_command_re().captures_iter(text);
    headings
        .chain(commands)
        .filter_map(|c| PhaseHint::from_keyword(&c[1]))
        .max()
        .unwrap_or(PhaseHint::Unknown)
}

/// First `completion|progress|completed: NN%` marker, clamped to 100.
pub fn completion_percent(text: &str) -> Option<u32> {
    let caps = completion_re().captures(text)?;
    // Only digits are captured, so a parse failure means overflow.
    Some(caps[1].parse::<u64>().map_or(100, |v| v.min(100)) as u32)
}

/// Returns `(checked, total)` checklist counts.
pub fn success_criteria(text: &str) -> (usize, usize) {
    let mut checked = 0;
    let mut total = 0;
    for caps in checkbox_re().captures_iter(text) {
        total += 1;
        if caps[1].eq_ignore_ascii_case("x") {
            checked += 1;
        }
    }
    (checked, total)
}

pub fn has_metrics_section(text: &str) -> bool {
    metrics_heading_re().is_match(text) || kpi_line_re().is_match(text)
}

fn title(text: &str) -> Option<String> {
    let caps = title_re().captures(text)?;
    let raw = goal_prefix_re().replace(caps[1].trim(), "");
    let cleaned = raw.trim_matches(|c: char| c == '*' || c == '_').trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

fn declared_milestones(text: &str) -> Vec<DeclaredMilestone> {
    let mut out: Vec<DeclaredMilestone> = Vec::new();
    for caps in milestone_heading_re().captures_iter(text) {
        let title = caps
            .get(2)
            .map(|m| m.as_str().trim_matches(|c: char| c == '*' || c == '_').trim())
            .unwrap_or("")
            .to_string();
        let (id, title) = match caps.get(1) {
            Some(n) => {
                let n = n.as_str().trim_start_matches('0');
                let n = if n.is_empty() { "0" } else { n };
                let title = if title.is_empty() {
                    format!("Milestone {n}")
                } else {
                    title
                };
                (format!("milestone-{n}"), title)
            }
            None => (paths::slugify(&title), title),
        };
        if id.is_empty() || out.iter().any(|m| m.id == id) {
            continue;
        }
        out.push(DeclaredMilestone { id, title });
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# Goal: Ship the public beta

**Phase**: strategies

## Goal Statement
Get 100 external users onto the beta.

**Progress**: 40%

## Success Criteria
- [x] Signup flow live
- [ ] Onboarding email sequence
- [X] Billing sandbox

## Success Metrics
- KPI 1: weekly active users

## Milestones
### Milestone 1: Private alpha
### Milestone 2: Public beta
";

    #[test]
    fn parses_full_document() {
        let g = parse_goal("ship-beta", SAMPLE);
        assert_eq!(g.identifier, "ship-beta");
        assert_eq!(g.title.as_deref(), Some("Ship the public beta"));
        assert_eq!(g.phase_hint, PhaseHint::Strategies);
        assert_eq!(g.completion_percent, Some(40));
        assert_eq!(g.success_criteria_total, 3);
        assert_eq!(g.success_criteria_checked, 2);
        assert!(g.has_metrics_section);
        assert_eq!(
            g.milestones,
            vec![
                DeclaredMilestone {
                    id: "milestone-1".to_string(),
                    title: "Private alpha".to_string()
                },
                DeclaredMilestone {
                    id: "milestone-2".to_string(),
                    title: "Public beta".to_string()
                },
            ]
        );
    }

    #[test]
    fn parse_is_deterministic() {
        assert_eq!(parse_goal("a", SAMPLE), parse_goal("a", SAMPLE));
    }

    #[test]
    fn empty_document_yields_defaults() {
        let g = parse_goal("empty", "");
        assert_eq!(g.phase_hint, PhaseHint::Unknown);
        assert_eq!(g.completion_percent, None);
        assert_eq!(g.success_criteria_total, 0);
        assert_eq!(g.success_criteria_checked, 0);
        assert!(!g.has_metrics_section);
        assert!(g.title.is_none());
        assert!(g.milestones.is_empty());
    }

    #[test]
    fn garbage_document_does_not_panic() {
        let g = parse_goal("junk", "\u{0}\u{1}%%% : 999 ## [x] - [");
        assert_eq!(g.phase_hint, PhaseHint::Unknown);
        assert_eq!(g.success_criteria_total, 0);
    }

    #[test]
    fn furthest_heading_keyword_wins() {
        let text = "# Vision\n## Strategies\n## Execution\n## Goal\n";
        assert_eq!(phase_hint(text), PhaseHint::Execute);
        assert_eq!(phase_hint("## Vision\nsome text"), PhaseHint::Vision);
        assert_eq!(phase_hint("## 3. Strategy\n"), PhaseHint::Strategies);
    }

    #[test]
    fn command_markers_count_as_keywords() {
        assert_eq!(
            phase_hint("Next step: run /goalkit.milestones"),
            PhaseHint::Milestones
        );
    }

    #[test]
    fn explicit_phase_overrides_keywords() {
        let text = "phase: vision\n## Execution\n";
        assert_eq!(phase_hint(text), PhaseHint::Vision);
    }

    #[test]
    fn invalid_explicit_phase_falls_back_to_keywords() {
        let text = "phase: brainstorm\n## Milestones\n";
        assert_eq!(phase_hint(text), PhaseHint::Milestones);
    }

    #[test]
    fn status_done_marks_done() {
        assert_eq!(phase_hint("## Goal\nStatus: Achieved\n"), PhaseHint::Done);
        assert_eq!(phase_hint("- **Status**: complete"), PhaseHint::Done);
    }

    #[test]
    fn keyword_in_prose_is_not_a_marker() {
        assert_eq!(
            phase_hint("We will execute on our vision soon."),
            PhaseHint::Unknown
        );
    }

    #[test]
    fn completion_clamps_long_and_zero_padded_values() {
        assert_eq!(completion_percent("completion: 1000%"), Some(100));
        assert_eq!(completion_percent("completion: 0050%"), Some(50));
        assert_eq!(
            completion_percent("progress: 99999999999999999999999%"),
            Some(100)
        );
    }

    #[test]
    fn completion_labels_case_insensitive() {
        assert_eq!(completion_percent("COMPLETION: 75%"), Some(75));
        assert_eq!(completion_percent("Completed: 12 %"), Some(12));
        assert_eq!(completion_percent("- **Progress:** 5%"), Some(5));
        assert_eq!(completion_percent("progress is good"), None);
    }

    #[test]
    fn completion_first_match_wins_and_clamps() {
        assert_eq!(completion_percent("progress: 30%\ncompletion: 90%"), Some(30));
        assert_eq!(completion_percent("completion: 250%"), Some(100));
    }

    #[test]
    fn checklist_counts() {
        let text = "- [ ] a\n- [x] b\n  - [X] nested\n* [ ] star\n[x] bare\n";
        assert_eq!(success_criteria(text), (2, 4));
    }

    #[test]
    fn metrics_detection() {
        assert!(has_metrics_section("## Key Performance Indicators\n"));
        assert!(has_metrics_section("### KPIs\n"));
        assert!(has_metrics_section("- KPI #2: churn below 3%"));
        assert!(has_metrics_section("**Metric 1**: latency"));
        assert!(!has_metrics_section("## Success Criteria\n- [ ] thing"));
        assert!(!has_metrics_section("we track metrics informally"));
    }

    #[test]
    fn milestones_without_numbers_use_slug() {
        let text = "## Milestone: Closed Beta!\n## Milestone 03\n## Milestones\n## Milestone: Closed beta\n";
        let g = parse_goal("g", text);
        assert_eq!(
            g.milestones,
            vec![
                DeclaredMilestone {
                    id: "closed-beta".to_string(),
                    title: "Closed Beta!".to_string()
                },
                DeclaredMilestone {
                    id: "milestone-3".to_string(),
                    title: "Milestone 3".to_string()
                },
            ]
        );
    }
}
