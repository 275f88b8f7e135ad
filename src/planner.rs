//! Anomaly detection and repair planning for one source/target pair.
//!
//! Planning only reads the filesystem. The returned `AlbumPlan` lists the
//! findings and the repair actions in the order they must be executed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::findings::{Finding, Warning};
use crate::repair::RepairAction;
use crate::scanner::{self, DiscFolder};

pub const TARGET_COVER_NAME: &str = "cover.jpg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumPlan {
    pub source: PathBuf,
    pub target: PathBuf,
    pub expected_discs: u32,
    pub found_discs: usize,
    /// Intermediate folder the disc folders were found in.
    pub wrapper: Option<PathBuf>,
    pub findings: Vec<Finding>,
    pub warnings: Vec<Warning>,
    pub actions: Vec<RepairAction>,
    pub ok: bool,
}

impl AlbumPlan {
    fn new(source: &Path, target: &Path, expected_discs: u32) -> Self {
        Self {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            expected_discs,
            found_discs: 0,
            wrapper: None,
            findings: Vec::new(),
            warnings: Vec::new(),
            actions: Vec::new(),
            ok: false,
        }
    }

    /// Plan for a box-set member with no counterpart inside `parent`.
    pub fn unmatched(source: &Path, expected_target: &Path, parent: &Path, expected_discs: u32) -> Self {
        let mut plan = Self::new(source, expected_target, expected_discs);
        plan.findings.push(Finding::Unmatched {
            expected_target: expected_target.to_path_buf(),
            parent: parent.to_path_buf(),
        });
        plan
    }

    pub fn target_exists(&self) -> bool {
        !self.findings.iter().any(Finding::is_missing_album)
    }
}

/// ISO name variants tried in order for a missing disc.
fn image_name_variants(disc: u32) -> [String; 3] {
    [
        format!("disc{}", disc),
        format!("disc {}", disc),
        format!("Disc{}", disc),
    ]
}

/// Best-effort source image of a disc, for the operator to re-extract.
pub fn find_source_image(source: &Path, disc: u32) -> Option<PathBuf> {
    let images = scanner::disc_images(source);
    image_name_variants(disc).iter().find_map(|variant| {
        images
            .iter()
            .find(|p| {
                p.file_name()
                    .map_or(false, |n| n.to_string_lossy().contains(variant.as_str()))
            })
            .cloned()
    })
}

/// Reports the nested layout once per album and plans one flatten per disc.
fn plan_flatten(disc: &DiscFolder, plan: &mut AlbumPlan) {
    if let Some(nested) = scanner::find_nested_extraction_folder(&disc.path) {
        if !plan.findings.contains(&Finding::NestedStructure) {
            plan.findings.push(Finding::NestedStructure);
        }
        plan.actions.push(RepairAction::FlattenNested {
            disc: disc.path.clone(),
            nested,
        });
    }
}

fn plan_single_disc(target: &Path, working: &Path, plan: &mut AlbumPlan) -> bool {
    if !scanner::audio_files(target).is_empty() {
        plan.found_discs = 1;
        return true;
    }

    let discs = scanner::find_disc_folders(working);
    if discs.is_empty() {
        plan.warnings.push(Warning::NoAudioFound);
        return false;
    }

    plan.found_discs = discs.len();
    // Several disc folders still count as extracted; only a warning is raised
    // instead of requiring exactly one.
    if discs.len() > 1 {
        plan.warnings.push(Warning::ExtraDiscFolders { found: discs.len() });
    }
    for disc in &discs {
        plan_flatten(disc, plan);
    }
    true
}

fn plan_multi_disc(source: &Path, working: &Path, expected: u32, plan: &mut AlbumPlan) -> bool {
    let discs = scanner::find_disc_folders(working);
    plan.found_discs = discs.len();

    let mut by_number: BTreeMap<u32, Vec<&DiscFolder>> = BTreeMap::new();
    for disc in &discs {
        by_number.entry(disc.number).or_default().push(disc);
    }

    let mut missing = false;
    for number in 1..=expected {
        if !by_number.contains_key(&number) {
            plan.findings.push(Finding::MissingDisc {
                disc: number,
                total: expected,
                source_image: find_source_image(source, number),
            });
            missing = true;
        }
    }

    for (number, folders) in &by_number {
        if folders.len() > 1 {
            plan.findings.push(Finding::DuplicateDisc {
                disc: *number,
                folders: folders.iter().map(|d| d.path.clone()).collect(),
            });
        }
    }

    for disc in &discs {
        plan_flatten(disc, plan);

        let duplicated = by_number.get(&disc.number).map_or(false, |f| f.len() > 1);
        let canonical = scanner::canonical_disc_name(disc.number);
        if disc.name != canonical && !duplicated {
            plan.actions.push(RepairAction::RenameDisc {
                from: disc.path.clone(),
                to: disc.path.with_file_name(canonical),
            });
        }
    }

    !missing && discs.len() >= expected as usize
}

fn plan_cover(source: &Path, target: &Path, plan: &mut AlbumPlan) {
    let target_cover = target.join(TARGET_COVER_NAME);
    // A symlinked cover is removed earlier in the same plan, so it counts as
    // absent.
    let real_cover = fs::symlink_metadata(&target_cover)
        .map_or(false, |m| !m.file_type().is_symlink());
    if real_cover {
        return;
    }
    match scanner::find_cover(source) {
        Some(from) => plan.actions.push(RepairAction::CopyCover {
            from,
            to: target_cover,
        }),
        None => plan.warnings.push(Warning::NoCover),
    }
}

/// Compare an extracted album against what its source promises.
pub fn plan_album(source: &Path, target: &Path, expected_discs: u32) -> AlbumPlan {
    let mut plan = AlbumPlan::new(source, target, expected_discs);

    if !target.is_dir() {
        plan.findings.push(Finding::TargetMissing {
            expected_target: target.to_path_buf(),
        });
        return plan;
    }

    for path in scanner::find_symlinks(target) {
        plan.actions.push(RepairAction::RemoveSymlink { path });
    }

    plan.wrapper = scanner::find_extraction_wrapper_folder(target);
    let working = plan.wrapper.clone().unwrap_or_else(|| target.to_path_buf());

    let content_ok = if expected_discs <= 1 {
        plan_single_disc(target, &working, &mut plan)
    } else {
        plan_multi_disc(source, &working, expected_discs, &mut plan)
    };

    plan_cover(source, target, &mut plan);

    plan.ok = content_ok;
    tracing::debug!(
        "Planned {}: {} finding(s), {} action(s), ok={}",
        target.display(),
        plan.findings.len(),
        plan.actions.len(),
        plan.ok
    );
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_missing_target_stops() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("cover.jpg"));
        let target = tmp.path().join("missing");

        let plan = plan_album(&source, &target, 2);
        assert_eq!(
            plan.findings,
            vec![Finding::TargetMissing {
                expected_target: target.clone()
            }]
        );
        assert!(plan.actions.is_empty());
        assert!(plan.warnings.is_empty());
        assert!(!plan.ok);
        assert!(!plan.target_exists());
    }

    #[test]
    fn test_missing_disc_enumeration() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("Ring disc2.iso"));
        touch(&source.join("cover.jpg"));
        let target = tmp.path().join("tgt");
        touch(&target.join("Disk1").join("01.dsf"));
        touch(&target.join("Disk3").join("01.dsf"));
        touch(&target.join("cover.jpg"));

        let plan = plan_album(&source, &target, 4);
        assert_eq!(
            plan.findings,
            vec![
                Finding::MissingDisc {
                    disc: 2,
                    total: 4,
                    source_image: Some(source.join("Ring disc2.iso")),
                },
                Finding::MissingDisc {
                    disc: 4,
                    total: 4,
                    source_image: None,
                },
            ]
        );
        assert!(plan.actions.is_empty());
        assert_eq!(plan.found_discs, 2);
        assert!(!plan.ok);
    }

    #[test]
    fn test_source_image_variants_in_order() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("Set Disc3.iso"));
        touch(&tmp.path().join("Set disc 3.iso"));
        assert_eq!(
            find_source_image(tmp.path(), 3),
            Some(tmp.path().join("Set disc 3.iso"))
        );
        assert_eq!(find_source_image(tmp.path(), 5), None);
    }

    #[test]
    fn test_multi_disc_flatten_and_rename() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("Artwork").join("front.jpg"));
        let target = tmp.path().join("tgt");
        touch(&target.join("Carmen (Disc 1)").join("Carmen").join("01.dsf"));
        touch(&target.join("Disk2").join("01.dsf"));

        let plan = plan_album(&source, &target, 2);
        assert_eq!(plan.findings, vec![Finding::NestedStructure]);
        assert!(plan.ok);
        assert_eq!(
            plan.actions,
            vec![
                RepairAction::FlattenNested {
                    disc: target.join("Carmen (Disc 1)"),
                    nested: target.join("Carmen (Disc 1)").join("Carmen"),
                },
                RepairAction::RenameDisc {
                    from: target.join("Carmen (Disc 1)"),
                    to: target.join("Disk1"),
                },
                RepairAction::CopyCover {
                    from: source.join("Artwork").join("front.jpg"),
                    to: target.join("cover.jpg"),
                },
            ]
        );
    }

    #[test]
    fn test_duplicate_disc_numbers_not_renamed() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("tgt");
        touch(&target.join("CD1").join("01.dsf"));
        touch(&target.join("disc 1").join("01.dsf"));
        touch(&target.join("Disk2").join("01.dsf"));
        touch(&target.join("cover.jpg"));

        let plan = plan_album(&source, &target, 2);
        assert_eq!(
            plan.findings,
            vec![Finding::DuplicateDisc {
                disc: 1,
                folders: vec![target.join("CD1"), target.join("disc 1")],
            }]
        );
        assert!(plan.actions.is_empty());
        assert!(plan.ok);
    }

    #[test]
    fn test_wrapper_folder_is_working_folder() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("tgt");
        let wrapper = target.join("Wagner_ Das Rheingold");
        touch(&wrapper.join("Disc 1").join("01.dsf"));
        touch(&wrapper.join("Disk2").join("01.dsf"));
        touch(&target.join("cover.jpg"));

        let plan = plan_album(&source, &target, 2);
        assert_eq!(plan.wrapper, Some(wrapper.clone()));
        assert_eq!(plan.found_discs, 2);
        assert_eq!(
            plan.actions,
            vec![RepairAction::RenameDisc {
                from: wrapper.join("Disc 1"),
                to: wrapper.join("Disk1"),
            }]
        );
        assert!(plan.ok);
    }

    #[test]
    fn test_single_disc_loose_audio() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("tgt");
        touch(&target.join("01.dsf"));

        let plan = plan_album(&source, &target, 1);
        assert!(plan.ok);
        assert_eq!(plan.warnings, vec![Warning::NoCover]);
        assert!(plan.actions.is_empty());
    }

    #[test]
    fn test_single_disc_nested_in_disc_folder() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("cover.jpg"));
        let target = tmp.path().join("tgt");
        touch(&target.join("Disc 1").join("Bach").join("01.dsf"));

        let plan = plan_album(&source, &target, 1);
        assert!(plan.ok);
        assert_eq!(plan.findings, vec![Finding::NestedStructure]);
        assert_eq!(
            plan.actions,
            vec![
                RepairAction::FlattenNested {
                    disc: target.join("Disc 1"),
                    nested: target.join("Disc 1").join("Bach"),
                },
                RepairAction::CopyCover {
                    from: source.join("cover.jpg"),
                    to: target.join("cover.jpg"),
                },
            ]
        );
    }

    #[test]
    fn test_single_disc_without_audio_is_not_ok() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("cover.jpg"));
        let target = tmp.path().join("tgt");
        touch(&target.join("notes.txt"));

        let plan = plan_album(&source, &target, 1);
        assert!(!plan.ok);
        assert_eq!(plan.warnings, vec![Warning::NoAudioFound]);
        // Cover is still planned
        assert_eq!(plan.actions.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_planned_first() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("tgt");
        touch(&target.join("01.dsf"));
        touch(&target.join("cover.jpg"));
        std::os::unix::fs::symlink(target.join("01.dsf"), target.join("02.dsf")).unwrap();

        let plan = plan_album(&source, &target, 1);
        assert_eq!(
            plan.actions,
            vec![RepairAction::RemoveSymlink {
                path: target.join("02.dsf")
            }]
        );
        assert!(plan.ok);
    }

    #[test]
    fn test_nested_structure_reported_once() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("cover.jpg"));
        let target = tmp.path().join("tgt");
        touch(&target.join("Disk1").join("Ring").join("01.dsf"));
        touch(&target.join("Disk2").join("Ring").join("01.dsf"));
        touch(&target.join("cover.jpg"));

        let plan = plan_album(&source, &target, 2);
        assert_eq!(plan.findings, vec![Finding::NestedStructure]);
        assert_eq!(plan.actions.len(), 2);
        assert!(plan.ok);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_cover_is_replaced_in_same_plan() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        touch(&source.join("cover.jpg"));
        let target = tmp.path().join("tgt");
        touch(&target.join("01.dsf"));
        std::os::unix::fs::symlink(source.join("cover.jpg"), target.join("cover.jpg")).unwrap();

        let plan = plan_album(&source, &target, 1);
        assert_eq!(
            plan.actions,
            vec![
                RepairAction::RemoveSymlink {
                    path: target.join("cover.jpg")
                },
                RepairAction::CopyCover {
                    from: source.join("cover.jpg"),
                    to: target.join("cover.jpg"),
                },
            ]
        );
    }

    #[test]
    fn test_single_disc_with_extra_disc_folders_warns() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("src");
        fs::create_dir_all(&source).unwrap();
        let target = tmp.path().join("tgt");
        touch(&target.join("Disc 1").join("01.dsf"));
        touch(&target.join("Disc 2").join("01.dsf"));
        touch(&target.join("cover.jpg"));

        let plan = plan_album(&source, &target, 1);
        assert!(plan.ok);
        assert_eq!(plan.found_discs, 2);
        assert_eq!(plan.warnings, vec![Warning::ExtraDiscFolders { found: 2 }]);
        assert!(plan.actions.is_empty());
    }
}
