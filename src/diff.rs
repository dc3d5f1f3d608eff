//! Build-Diff Engine: structural deltas between two extracted snapshots.

use serde::{Deserialize, Serialize};

use crate::snapshot::BuildSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
}

/// One per-key delta. `value` is set for Added entries, `old_value` and
/// `new_value` for Changed; Removed carries only the key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<String>,
}

impl DiffEntry {
    fn added(key: &str, value: &str) -> Self {
        Self {
            kind: DiffKind::Added,
            key: key.to_string(),
            value: Some(value.to_string()),
            old_value: None,
            new_value: None,
        }
    }

    fn removed(key: &str) -> Self {
        Self {
            kind: DiffKind::Removed,
            key: key.to_string(),
            value: None,
            old_value: None,
            new_value: None,
        }
    }

    fn changed(key: &str, old_value: &str, new_value: &str) -> Self {
        Self {
            kind: DiffKind::Changed,
            key: key.to_string(),
            value: None,
            old_value: Some(old_value.to_string()),
            new_value: Some(new_value.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildDiff {
    pub strings: Vec<DiffEntry>,
    pub experiments: Vec<DiffEntry>,
}

/// Compute the structural delta from `previous` to `current`.
///
/// Strings get the full Added/Changed/Removed treatment. Experiments are
/// Added-only: Removed/Changed detection for experiments was never computed
/// upstream, and is preserved here as a documented limitation rather than
/// silently extended.
pub fn diff_builds(previous: &BuildSnapshot, current: &BuildSnapshot) -> BuildDiff {
    let mut strings = Vec::new();

    // Added and Changed, driven by the current table.
    for (key, value) in &current.strings {
        match previous.strings.get(key) {
            None => strings.push(DiffEntry::added(key, value)),
            Some(old) if old != value => strings.push(DiffEntry::changed(key, old, value)),
            Some(_) => {}
        }
    }

    // Removed, driven by the previous table.
    for key in previous.strings.keys() {
        if !current.strings.contains_key(key) {
            strings.push(DiffEntry::removed(key));
        }
    }

    let experiments = current
        .experiments
        .iter()
        .filter(|(key, _)| !previous.experiments.contains_key(*key))
        .map(|(key, exp)| DiffEntry::added(key, &exp.title))
        .collect();

    BuildDiff {
        strings,
        experiments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::{Experiment, ExperimentKind};
    use std::collections::BTreeMap;

    fn snapshot(
        strings: &[(&str, &str)],
        experiment_ids: &[&str],
    ) -> BuildSnapshot {
        BuildSnapshot {
            build_number: 1,
            build_hash: "hash00aa".into(),
            built_at: 0,
            strings: strings
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            experiments: experiment_ids
                .iter()
                .map(|id| {
                    (
                        id.to_string(),
                        Experiment {
                            hash_key: id.to_string(),
                            title: format!("Experiment {id}"),
                            kind: ExperimentKind::User,
                            treatments: Vec::new(),
                            hash: 0,
                        },
                    )
                })
                .collect(),
            scripts: Vec::new(),
        }
    }

    #[test]
    fn reports_added_changed_and_removed_strings() {
        let previous = snapshot(&[("A", "1"), ("GONE", "x")], &[]);
        let current = snapshot(&[("A", "2"), ("B", "3")], &[]);
        let diff = diff_builds(&previous, &current);

        assert_eq!(
            diff.strings,
            vec![
                DiffEntry::changed("A", "1", "2"),
                DiffEntry::added("B", "3"),
                DiffEntry::removed("GONE"),
            ]
        );
    }

    #[test]
    fn no_key_lands_in_more_than_one_bucket() {
        let previous = snapshot(&[("A", "1"), ("B", "2"), ("C", "3")], &[]);
        let current = snapshot(&[("B", "2"), ("C", "changed"), ("D", "4")], &[]);
        let diff = diff_builds(&previous, &current);

        let mut keys: Vec<&str> = diff.strings.iter().map(|e| e.key.as_str()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), diff.strings.len());
    }

    #[test]
    fn experiments_report_added_only() {
        let previous = snapshot(&[], &["old", "shared"]);
        let current = snapshot(&[], &["shared", "fresh"]);
        let diff = diff_builds(&previous, &current);

        assert_eq!(diff.experiments.len(), 1);
        assert_eq!(diff.experiments[0].key, "fresh");
        assert_eq!(diff.experiments[0].kind, DiffKind::Added);
        // "old" disappeared but Removed is intentionally not computed.
        assert!(!diff.experiments.iter().any(|e| e.key == "old"));
    }

    #[test]
    fn diffing_a_snapshot_against_itself_is_empty() {
        let snap = snapshot(&[("A", "1"), ("B", "2")], &["exp1"]);
        let diff = diff_builds(&snap, &snap);
        assert!(diff.strings.is_empty());
        assert!(diff.experiments.is_empty());
    }

    #[test]
    fn diffing_never_mutates_the_snapshots() {
        let previous = snapshot(&[("A", "1")], &["exp1"]);
        let current = snapshot(&[("A", "2")], &["exp2"]);
        let (p2, c2) = (previous.clone(), current.clone());
        let _ = diff_builds(&previous, &current);
        assert_eq!(previous, p2);
        assert_eq!(current, c2);
    }
}
