//! Source → target folder resolution.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::naming;
use crate::scanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// The normalized name exists.
    Canonical,
    /// One of the alternate substitutions exists.
    Alternate,
    /// Base titles overlap. May pick the wrong folder when several targets
    /// share a title fragment; see `TargetMatch::other_candidates`.
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetMatch {
    pub path: PathBuf,
    pub method: MatchMethod,
    /// Further fuzzy candidates that were passed over.
    pub other_candidates: Vec<PathBuf>,
}

impl TargetMatch {
    fn exact(path: PathBuf, method: MatchMethod) -> Self {
        Self {
            path,
            method,
            other_candidates: Vec::new(),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        !self.other_candidates.is_empty()
    }
}

/// Source base title against a full candidate folder name, either way round.
fn title_overlaps_name(source_title: &str, candidate_name: &str) -> bool {
    if source_title.is_empty() || candidate_name.is_empty() {
        return false;
    }
    candidate_name.contains(source_title) || source_title.contains(candidate_name)
}

/// Resolve the extracted folder for `source_name` among the children of
/// `target_root`.
pub fn match_target(source_name: &str, target_root: &Path) -> Option<TargetMatch> {
    let canonical = target_root.join(naming::target_name(source_name));
    if canonical.is_dir() {
        return Some(TargetMatch::exact(canonical, MatchMethod::Canonical));
    }

    for alternate in naming::alternate_target_names(source_name) {
        let path = target_root.join(alternate);
        if path.is_dir() {
            return Some(TargetMatch::exact(path, MatchMethod::Alternate));
        }
    }

    let source_title = naming::base_title(source_name).to_lowercase();
    let mut candidates = scanner::child_dirs(target_root).into_iter().filter(|c| {
        c.file_name().map_or(false, |n| {
            title_overlaps_name(&source_title, &n.to_string_lossy().to_lowercase())
        })
    });

    let first = candidates.next()?;
    let other_candidates: Vec<PathBuf> = candidates.collect();
    if !other_candidates.is_empty() {
        tracing::debug!(
            "Fuzzy match for '{}' picked {} over {} other candidate(s)",
            source_name,
            first.display(),
            other_candidates.len()
        );
    }
    Some(TargetMatch {
        path: first,
        method: MatchMethod::Fuzzy,
        other_candidates,
    })
}

/// Sub-albums of a box set, or `None` when the album is not a box set.
pub fn box_set_members(source_album: &Path) -> Option<Vec<PathBuf>> {
    let members = scanner::find_sub_albums(source_album);
    if members.len() > 1 {
        Some(members)
    } else {
        None
    }
}
