use crate::error::{file_access, GoalkitError, Result};
use crate::goal::{parse_goal, GoalRecord};
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ProjectMeta
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ProjectMeta {
    /// Load `.goalkit/project.yaml`, substituting defaults for anything
    /// missing or unreadable. The name falls back to the root directory name.
    pub fn load_or_default(root: &Path) -> Self {
        let path = paths::project_path(root);
        let mut meta = match std::fs::read_to_string(&path) {
            Ok(data) if data.trim().is_empty() => ProjectMeta::default(),
            Ok(data) => match serde_yaml::from_str::<ProjectMeta>(&data) {
                Ok(m) => m,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable project metadata");
                    ProjectMeta::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => ProjectMeta::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable project metadata");
                ProjectMeta::default()
            }
        };
        if meta.name.trim().is_empty() {
            meta.name = default_project_name(root);
        }
        meta
    }
}

fn default_project_name(root: &Path) -> String {
    let resolved = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

// ---------------------------------------------------------------------------
// ProjectSnapshot
// ---------------------------------------------------------------------------

/// All goal records of one project, in discovery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub goals: Vec<GoalRecord>,
}

impl ProjectSnapshot {
    pub fn new(name: impl Into<String>, goals: Vec<GoalRecord>) -> Self {
        Self {
            name: name.into(),
            created_at: None,
            goals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    pub fn goal(&self, identifier: &str) -> Option<&GoalRecord> {
        self.goals.iter().find(|g| g.identifier == identifier)
    }

    /// Number of milestones declared across every goal document.
    pub fn milestone_count(&self) -> usize {
        self.goals.iter().map(|g| g.milestones.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Candidate goal documents under `.goalkit/goals/`, as `(identifier, path)`
/// in directory listing order.
///
/// A subdirectory contributes its `goal.md`; a top-level `*.md` file
/// contributes itself under its file stem. When both forms exist for one
/// identifier the subdirectory wins and the flat file is skipped.
pub fn discover_goal_documents(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let goals_dir = paths::goals_dir(root);
    let entries = match std::fs::read_dir(&goals_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(file_access(&goals_dir)(e)),
    };

    let mut found = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %goals_dir.display(), error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if path.is_dir() {
            let doc = path.join(paths::GOAL_MD);
            if doc.is_file() {
                found.push((name, doc, true));
            }
        } else if path.extension().is_some_and(|ext| ext == "md") {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(name);
            found.push((stem, path, false));
        }
    }

    let dir_ids: HashSet<String> = found
        .iter()
        .filter(|(_, _, dir_form)| *dir_form)
        .map(|(id, _, _)| id.clone())
        .collect();
    Ok(found
        .into_iter()
        .filter_map(|(id, path, dir_form)| {
            if !dir_form && dir_ids.contains(&id) {
                tracing::warn!(goal = %id, path = %path.display(), "skipping flat goal document shadowed by goal directory");
                return None;
            }
            Some((id, path))
        })
        .collect())
}

/// Discover and parse every goal document under `root`.
///
/// A missing project root is an error. A project with no goals yields an empty
/// snapshot. Documents that cannot be read (removed between listing and
/// opening, not UTF-8, permission denied) are skipped with a warning.
pub fn load_project(root: &Path) -> Result<ProjectSnapshot> {
    if !root.is_dir() {
        return Err(GoalkitError::ProjectNotFound(root.to_path_buf()));
    }
    let meta = ProjectMeta::load_or_default(root);

    let mut goals = Vec::new();
    for (identifier, path) in discover_goal_documents(root)? {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let record = parse_goal(&identifier, &text);
                tracing::debug!(
                    goal = %identifier,
                    phase = %record.phase_hint,
                    completion = ?record.completion_percent,
                    "parsed goal document"
                );
                goals.push(record);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable goal document");
            }
        }
    }

    Ok(ProjectSnapshot {
        name: meta.name,
        created_at: meta.created_at,
        goals,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PhaseHint;
    use tempfile::TempDir;

    fn write_goal(dir: &TempDir, id: &str, body: &str) {
        let path = paths::goal_document(dir.path(), id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn missing_root_is_reported() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = load_project(&missing).unwrap_err();
        assert!(matches!(err, GoalkitError::ProjectNotFound(_)));
        assert_eq!(err.path(), Some(missing.as_path()));
    }

    #[test]
    fn empty_project_yields_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let snap = load_project(dir.path()).unwrap();
        assert!(snap.is_empty());
        assert!(!snap.name.is_empty());
        assert!(snap.created_at.is_none());
    }

    #[test]
    fn metadata_is_read_when_present() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".goalkit")).unwrap();
        std::fs::write(
            dir.path().join(".goalkit/project.yaml"),
            "name: rocket\ncreated_at: 2026-01-02T03:04:05Z\n",
        )
        .unwrap();
        let snap = load_project(dir.path()).unwrap();
        assert_eq!(snap.name, "rocket");
        assert_eq!(
            snap.created_at.unwrap().to_rfc3339(),
            "2026-01-02T03:04:05+00:00"
        );
    }

    #[test]
    fn corrupt_metadata_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join(".goalkit")).unwrap();
        std::fs::write(dir.path().join(".goalkit/project.yaml"), "name: [oops").unwrap();
        let snap = load_project(dir.path()).unwrap();
        let expected = dir
            .path()
            .canonicalize()
            .unwrap()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert_eq!(snap.name, expected);
    }

    #[test]
    fn discovers_directory_and_flat_goals() {
        let dir = TempDir::new().unwrap();
        write_goal(&dir, "alpha", "# Goal: Alpha\ncompletion: 10%\n");
        std::fs::write(
            paths::goals_dir(dir.path()).join("beta.md"),
            "# Beta\n## Vision\n",
        )
        .unwrap();
        std::fs::write(paths::goals_dir(dir.path()).join("notes.txt"), "ignored").unwrap();
        std::fs::create_dir_all(paths::goals_dir(dir.path()).join("empty-dir")).unwrap();

        let snap = load_project(dir.path()).unwrap();
        let mut ids: Vec<_> = snap.goals.iter().map(|g| g.identifier.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["alpha", "beta"]);
        assert_eq!(snap.goal("alpha").unwrap().completion_percent, Some(10));
        assert_eq!(snap.goal("beta").unwrap().phase_hint, PhaseHint::Vision);
    }

    #[test]
    fn goal_directory_shadows_flat_file() {
        let dir = TempDir::new().unwrap();
        write_goal(&dir, "beta", "# Beta\ncompletion: 80%\n");
        std::fs::write(
            paths::goals_dir(dir.path()).join("beta.md"),
            "# Stale beta\ncompletion: 10%\n",
        )
        .unwrap();

        let snap = load_project(dir.path()).unwrap();
        let ids: Vec<_> = snap.goals.iter().map(|g| g.identifier.as_str()).collect();
        assert_eq!(ids, vec!["beta"]);
        assert_eq!(snap.goal("beta").unwrap().completion_percent, Some(80));
    }

    #[test]
    fn unreadable_goals_dir_is_reported_with_path() {
        let dir = TempDir::new().unwrap();
        let goals = paths::goals_dir(dir.path());
        std::fs::create_dir_all(goals.parent().unwrap()).unwrap();
        std::fs::write(&goals, "not a directory").unwrap();

        let err = load_project(dir.path()).unwrap_err();
        assert!(matches!(err, GoalkitError::FileAccess { .. }), "{err}");
        assert_eq!(err.path(), Some(goals.as_path()));
    }

    #[test]
    fn discovery_order_matches_listing_order() {
        let dir = TempDir::new().unwrap();
        for id in ["c", "a", "b"] {
            write_goal(&dir, id, "# g\n");
        }
        let listed: Vec<String> = discover_goal_documents(dir.path())
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let snap = load_project(dir.path()).unwrap();
        let loaded: Vec<String> = snap.goals.iter().map(|g| g.identifier.clone()).collect();
        assert_eq!(listed, loaded);
    }

    #[test]
    fn unreadable_document_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_goal(&dir, "good", "completion: 50%\n");
        // Not valid UTF-8: read_to_string fails, the scan continues.
        let bad = paths::goal_document(dir.path(), "bad");
        std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
        std::fs::write(&bad, [0xff, 0xfe, 0xfd]).unwrap();

        let snap = load_project(dir.path()).unwrap();
        assert_eq!(snap.goals.len(), 1);
        assert_eq!(snap.goals[0].identifier, "good");
    }

    #[test]
    fn milestone_count_sums_declared_milestones() {
        let dir = TempDir::new().unwrap();
        write_goal(&dir, "a", "### Milestone 1: x\n### Milestone 2: y\n");
        write_goal(&dir, "b", "### Milestone 1: z\n");
        let snap = load_project(dir.path()).unwrap();
        assert_eq!(snap.milestone_count(), 3);
    }
}
