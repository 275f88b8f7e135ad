//! Validation driver: walks the source root, plans every album and hands the
//! actions to a repair backend.
//!
//! Each album produces an `AlbumOutcome` value; the caller folds them into a
//! `Report`. Nothing here panics or aborts on a bad album.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::Config;
use crate::discs;
use crate::error::ConfigError;
use crate::findings::Warning;
use crate::matcher::{self, TargetMatch};
use crate::naming;
use crate::planner::{self, AlbumPlan};
use crate::repair::{RepairAction, RepairBackend};
use crate::report::Report;
use crate::scanner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRepair {
    pub action: RepairAction,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumOutcome {
    pub name: String,
    pub source: PathBuf,
    pub expected_discs: u32,
    /// Native DSD release, nothing to reconcile.
    pub skipped: bool,
    pub matched: Option<TargetMatch>,
    /// Absent for skipped albums and box sets; see `sub_albums`.
    pub plan: Option<AlbumPlan>,
    pub applied: Vec<RepairAction>,
    pub failed: Vec<FailedRepair>,
    pub sub_albums: Vec<AlbumOutcome>,
}

impl AlbumOutcome {
    fn new(source: &Path, expected_discs: u32) -> Self {
        Self {
            name: album_name(source),
            source: source.to_path_buf(),
            expected_discs,
            skipped: false,
            matched: None,
            plan: None,
            applied: Vec::new(),
            failed: Vec::new(),
            sub_albums: Vec::new(),
        }
    }

    pub fn is_box_set(&self) -> bool {
        !self.sub_albums.is_empty()
    }

    /// A box set is OK when every member is.
    pub fn ok(&self) -> bool {
        if self.skipped {
            return false;
        }
        if self.is_box_set() {
            return self.sub_albums.iter().all(AlbumOutcome::ok);
        }
        self.plan.as_ref().map_or(false, |p| p.ok)
    }

    /// This outcome followed by every box-set member.
    pub fn units(&self) -> Vec<&AlbumOutcome> {
        let mut units = vec![self];
        units.extend(self.sub_albums.iter());
        units
    }
}

pub fn album_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub struct Validator<B: RepairBackend> {
    config: Config,
    backend: B,
}

impl<B: RepairBackend> Validator<B> {
    /// Fails when either root is missing; no album is touched in that case.
    pub fn new(config: Config, backend: B) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, backend })
    }

    /// Audit every source album in name order, calling `on_album` as each
    /// one completes.
    pub fn run<F>(&mut self, mut on_album: F) -> Report
    where
        F: FnMut(&AlbumOutcome),
    {
        let mut report = Report::new(
            &self.config.source,
            &self.config.target,
            self.backend.is_dry_run(),
        );

        for source_album in scanner::child_dirs(&self.config.source) {
            if !self.config.matches_filter(&album_name(&source_album)) {
                continue;
            }
            let outcome = self.process_album(&source_album);
            on_album(&outcome);
            report.record(&outcome);
        }

        report
    }

    pub fn process_album(&mut self, source_album: &Path) -> AlbumOutcome {
        let name = album_name(source_album);

        if naming::is_native_dsd(&name) {
            let mut outcome = AlbumOutcome::new(source_album, 1);
            outcome.skipped = true;
            return outcome;
        }

        let expected = discs::expected_disc_count(&name, Some(source_album));
        let mut outcome = AlbumOutcome::new(source_album, expected);

        let Some(matched) = matcher::match_target(&name, &self.config.target) else {
            let expected_target = self.config.target.join(naming::target_name(&name));
            outcome.plan = Some(planner::plan_album(source_album, &expected_target, expected));
            return outcome;
        };

        if let Some(members) = matcher::box_set_members(source_album) {
            let parent = matched.path.clone();
            outcome.matched = Some(matched);
            outcome.sub_albums = members
                .iter()
                .map(|member| self.process_sub_album(member, &parent))
                .collect();
            return outcome;
        }

        let plan = plan_matched(source_album, &matched, expected);
        outcome.matched = Some(matched);
        self.execute(&mut outcome, plan);
        outcome
    }

    fn process_sub_album(&mut self, source_sub: &Path, parent_target: &Path) -> AlbumOutcome {
        let name = album_name(source_sub);
        let expected = discs::expected_disc_count(&name, Some(source_sub));
        let mut outcome = AlbumOutcome::new(source_sub, expected);

        match matcher::match_target(&name, parent_target) {
            Some(matched) => {
                let plan = plan_matched(source_sub, &matched, expected);
                outcome.matched = Some(matched);
                self.execute(&mut outcome, plan);
            }
            None => {
                let expected_target = parent_target.join(naming::target_name(&name));
                outcome.plan = Some(AlbumPlan::unmatched(
                    source_sub,
                    &expected_target,
                    parent_target,
                    expected,
                ));
            }
        }
        outcome
    }

    /// Run the plan's actions in order. A failed action is recorded and the
    /// rest still run.
    fn execute(&mut self, outcome: &mut AlbumOutcome, plan: AlbumPlan) {
        for action in &plan.actions {
            match self.backend.execute(action) {
                Ok(()) => outcome.applied.push(action.clone()),
                Err(e) => {
                    tracing::warn!("{} failed: {}", action.describe(), e);
                    outcome.failed.push(FailedRepair {
                        action: action.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        outcome.plan = Some(plan);
    }
}

fn plan_matched(source: &Path, matched: &TargetMatch, expected: u32) -> AlbumPlan {
    let mut plan = planner::plan_album(source, &matched.path, expected);
    if matched.is_ambiguous() {
        plan.warnings.push(Warning::AmbiguousMatch {
            chosen: matched.path.clone(),
            candidates: matched.other_candidates.clone(),
        });
    }
    plan
}
