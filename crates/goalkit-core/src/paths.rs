use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GOALKIT_DIR: &str = ".goalkit";
pub const GOALS_DIR: &str = ".goalkit/goals";

pub const PROJECT_FILE: &str = ".goalkit/project.yaml";
pub const CONFIG_FILE: &str = ".goalkit/config.yaml";
pub const HISTORY_FILE: &str = ".goalkit/history.yaml";

pub const GOAL_MD: &str = "goal.md";
pub const LOCK_SUFFIX: &str = ".lock";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn goalkit_dir(root: &Path) -> PathBuf {
    root.join(GOALKIT_DIR)
}

pub fn goals_dir(root: &Path) -> PathBuf {
    root.join(GOALS_DIR)
}

pub fn goal_document(root: &Path, goal_id: &str) -> PathBuf {
    goals_dir(root).join(goal_id).join(GOAL_MD)
}

pub fn project_path(root: &Path) -> PathBuf {
    root.join(PROJECT_FILE)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn history_path(root: &Path) -> PathBuf {
    root.join(HISTORY_FILE)
}

/// Lease file guarding writes to `path`.
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(LOCK_SUFFIX);
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

static NON_SLUG_RE: OnceLock<Regex> = OnceLock::new();

fn non_slug_re() -> &'static Regex {
    NON_SLUG_RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").unwrap())
}

/// Lowercase `text` and collapse every run of non-alphanumerics into one `-`.
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    non_slug_re()
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
