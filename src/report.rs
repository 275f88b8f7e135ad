//! Run report: accumulated from album outcomes, written as JSON and text.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::findings::{Finding, Warning};
use crate::repair::RepairAction;
use crate::validate::{album_name, AlbumOutcome};

pub const JSON_REPORT_NAME: &str = "esoteric-sync-report.json";
pub const TEXT_REPORT_NAME: &str = "esoteric-sync-report.txt";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct MissingAlbum {
    pub source_folder: PathBuf,
    pub expected_target: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MissingDisc {
    pub album: String,
    pub expected_disc: String,
    pub source_iso: String,
    pub source_folder: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateDisc {
    pub album: String,
    pub disc: u32,
    pub folders: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Fix {
    pub album: String,
    #[serde(flatten)]
    pub action: RepairAction,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedFix {
    pub album: String,
    #[serde(flatten)]
    pub action: RepairAction,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumWarning {
    pub album: String,
    #[serde(flatten)]
    pub warning: Warning,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub albums_scanned: usize,
    pub albums_ok: usize,
    pub albums_skipped: usize,
    pub missing_albums_count: usize,
    pub missing_discs_count: usize,
    pub duplicate_discs_count: usize,
    pub nested_structures_count: usize,
    pub nested_folders_fixed: usize,
    pub disc_renames: usize,
    pub symlinks_removed: usize,
    pub covers_copied: usize,
    pub fixes_failed: usize,
}

impl Summary {
    /// Counters in display order.
    pub fn rows(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("albums_scanned", self.albums_scanned),
            ("albums_ok", self.albums_ok),
            ("albums_skipped", self.albums_skipped),
            ("missing_albums_count", self.missing_albums_count),
            ("missing_discs_count", self.missing_discs_count),
            ("duplicate_discs_count", self.duplicate_discs_count),
            ("nested_structures_count", self.nested_structures_count),
            ("nested_folders_fixed", self.nested_folders_fixed),
            ("disc_renames", self.disc_renames),
            ("symlinks_removed", self.symlinks_removed),
            ("covers_copied", self.covers_copied),
            ("fixes_failed", self.fixes_failed),
        ]
    }

    fn count_fix(&mut self, action: &RepairAction) {
        match action {
            RepairAction::FlattenNested { .. } => self.nested_folders_fixed += 1,
            RepairAction::RenameDisc { .. } => self.disc_renames += 1,
            RepairAction::RemoveSymlink { .. } => self.symlinks_removed += 1,
            RepairAction::CopyCover { .. } => self.covers_copied += 1,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated: String,
    pub source: PathBuf,
    pub target: PathBuf,
    pub dry_run: bool,
    pub missing_albums: Vec<MissingAlbum>,
    pub missing_discs: Vec<MissingDisc>,
    pub duplicate_discs: Vec<DuplicateDisc>,
    /// Targets whose discs sat one level too deep.
    pub nested_structures: Vec<PathBuf>,
    pub fixes_applied: Vec<Fix>,
    pub fixes_failed: Vec<FailedFix>,
    pub warnings: Vec<AlbumWarning>,
    pub skipped: Vec<PathBuf>,
    pub summary: Summary,
}

impl Report {
    pub fn new(source: &Path, target: &Path, dry_run: bool) -> Self {
        Self {
            generated: Local::now().to_rfc3339(),
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            dry_run,
            missing_albums: Vec::new(),
            missing_discs: Vec::new(),
            duplicate_discs: Vec::new(),
            nested_structures: Vec::new(),
            fixes_applied: Vec::new(),
            fixes_failed: Vec::new(),
            warnings: Vec::new(),
            skipped: Vec::new(),
            summary: Summary::default(),
        }
    }

    /// Fold one top-level album (and its box-set members) into the report.
    pub fn record(&mut self, outcome: &AlbumOutcome) {
        self.summary.albums_scanned += 1;

        if outcome.skipped {
            self.summary.albums_skipped += 1;
            self.skipped.push(outcome.source.clone());
            return;
        }
        if outcome.ok() {
            self.summary.albums_ok += 1;
        }

        for unit in outcome.units() {
            self.record_unit(unit);
        }
    }

    fn record_unit(&mut self, unit: &AlbumOutcome) {
        let Some(plan) = &unit.plan else {
            return;
        };
        let album = album_name(&plan.target);

        for finding in &plan.findings {
            match finding {
                Finding::TargetMissing { expected_target } => {
                    self.missing_albums.push(MissingAlbum {
                        source_folder: unit.source.clone(),
                        expected_target: expected_target.clone(),
                        parent: None,
                    });
                    self.summary.missing_albums_count += 1;
                }
                Finding::Unmatched {
                    expected_target,
                    parent,
                } => {
                    self.missing_albums.push(MissingAlbum {
                        source_folder: unit.source.clone(),
                        expected_target: expected_target.clone(),
                        parent: Some(parent.clone()),
                    });
                    self.summary.missing_albums_count += 1;
                }
                Finding::MissingDisc {
                    disc, source_image, ..
                } => {
                    self.missing_discs.push(MissingDisc {
                        album: album.clone(),
                        expected_disc: format!("Disk{}", disc),
                        source_iso: source_image
                            .as_ref()
                            .map(|p| p.display().to_string())
                            .unwrap_or_else(|| "ISO not found".to_string()),
                        source_folder: unit.source.clone(),
                    });
                    self.summary.missing_discs_count += 1;
                }
                Finding::DuplicateDisc { disc, folders } => {
                    self.duplicate_discs.push(DuplicateDisc {
                        album: album.clone(),
                        disc: *disc,
                        folders: folders.clone(),
                    });
                    self.summary.duplicate_discs_count += 1;
                }
                Finding::NestedStructure => {
                    self.nested_structures.push(plan.target.clone());
                    self.summary.nested_structures_count += 1;
                }
                Finding::MissingDiscs { .. } => {}
            }
        }

        for warning in &plan.warnings {
            self.warnings.push(AlbumWarning {
                album: album.clone(),
                warning: warning.clone(),
            });
        }

        for action in &unit.applied {
            self.summary.count_fix(action);
            self.fixes_applied.push(Fix {
                album: album.clone(),
                action: action.clone(),
            });
        }

        for failed in &unit.failed {
            self.summary.fixes_failed += 1;
            self.fixes_failed.push(FailedFix {
                album: album.clone(),
                action: failed.action.clone(),
                error: failed.error.clone(),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

pub fn write_json(report: &Report, output_dir: &Path) -> std::io::Result<PathBuf> {
    let path = output_dir.join(JSON_REPORT_NAME);
    let json = serde_json::to_string_pretty(report)?;
    fs::write(&path, json)?;
    Ok(path)
}

fn fix_detail(action: &RepairAction) -> String {
    let name = |p: &Path| {
        p.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    match action {
        RepairAction::FlattenNested { disc, nested } => {
            format!("{}/{}/ -> {}/", name(disc), name(nested), name(disc))
        }
        RepairAction::RenameDisc { from, to } => format!("{} -> {}", name(from), name(to)),
        RepairAction::RemoveSymlink { path } => format!("Path: {}", path.display()),
        RepairAction::CopyCover { from, .. } => format!("Source: {}", name(from)),
    }
}

pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);

    out.push_str("# Esoteric DSD Library Sync Report\n");
    out.push_str(&format!("# Generated: {}\n", report.generated));
    out.push_str(&format!(
        "# Mode: {}\n",
        if report.dry_run { "DRY-RUN" } else { "APPLIED" }
    ));
    out.push_str(&rule);
    out.push_str("\n\n");

    if !report.missing_albums.is_empty() {
        out.push_str("## MISSING ALBUMS\n\n");
        for item in &report.missing_albums {
            out.push_str(&format!("MISSING_ALBUM: {}\n", item.expected_target.display()));
            out.push_str(&format!("  Source: {}\n", item.source_folder.display()));
            if let Some(parent) = &item.parent {
                out.push_str(&format!("  Box set: {}\n", parent.display()));
            }
            out.push('\n');
        }
    }

    if !report.missing_discs.is_empty() {
        out.push_str("## MISSING DISCS (require SACD extraction)\n\n");
        for item in &report.missing_discs {
            out.push_str(&format!("MISSING_DISC: {}\n", item.album));
            out.push_str(&format!("  Expected: {}\n", item.expected_disc));
            out.push_str(&format!("  Source ISO: {}\n", item.source_iso));
            out.push_str(&format!("  Source folder: {}\n\n", item.source_folder.display()));
        }
    }

    if !report.duplicate_discs.is_empty() {
        out.push_str("## DUPLICATE DISCS (manual review)\n\n");
        for item in &report.duplicate_discs {
            out.push_str(&format!("DUPLICATE_DISC: {} (Disk{})\n", item.album, item.disc));
            for folder in &item.folders {
                out.push_str(&format!("  {}\n", folder.display()));
            }
            out.push('\n');
        }
    }

    if !report.nested_structures.is_empty() {
        out.push_str("## NESTED STRUCTURE\n\n");
        for target in &report.nested_structures {
            out.push_str(&format!("NESTED_STRUCTURE: {}\n", target.display()));
        }
        out.push('\n');
    }

    if !report.fixes_applied.is_empty() {
        out.push_str("## FIXES APPLIED\n\n");
        for fix in &report.fixes_applied {
            out.push_str(&format!("{}: {}\n", fix.action.kind().to_uppercase(), fix.album));
            out.push_str(&format!("  {}\n\n", fix_detail(&fix.action)));
        }
    }

    if !report.fixes_failed.is_empty() {
        out.push_str("## FAILED FIXES\n\n");
        for fix in &report.fixes_failed {
            out.push_str(&format!("{}: {}\n", fix.action.kind().to_uppercase(), fix.album));
            out.push_str(&format!("  {}\n", fix_detail(&fix.action)));
            out.push_str(&format!("  Error: {}\n\n", fix.error));
        }
    }

    out.push_str("## SUMMARY\n\n");
    for (key, value) in report.summary.rows() {
        out.push_str(&format!("{}: {}\n", key, value));
    }
    out
}

pub fn write_text(report: &Report, output_dir: &Path) -> std::io::Result<PathBuf> {
    let path = output_dir.join(TEXT_REPORT_NAME);
    let mut f = fs::File::create(&path)?;
    f.write_all(render_text(report).as_bytes())?;
    Ok(path)
}
