//! Read-only inventory: what each source album promises against what the
//! target tree holds. Shares matching and scanning with the validator but
//! never plans or applies repairs.

use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;

use crate::discs;
use crate::error::ConfigError;
use crate::findings::Finding;
use crate::matcher;
use crate::naming;
use crate::scanner;
use crate::validate::album_name;

/// Marker for audio sitting directly in the album folder.
pub const ROOT_DISC: &str = "(root)";

#[derive(Debug, Clone, Serialize)]
pub struct InventoryAlbum {
    pub name: String,
    pub expected_discs: u32,
    pub target: Option<PathBuf>,
    pub source_isos: Vec<String>,
    pub target_discs: Vec<String>,
    pub sub_albums: Vec<InventoryAlbum>,
    pub issues: Vec<Finding>,
}

impl InventoryAlbum {
    pub fn is_box_set(&self) -> bool {
        !self.sub_albums.is_empty()
    }

    /// This album followed by every box-set member.
    fn units(&self) -> impl Iterator<Item = &InventoryAlbum> {
        std::iter::once(self).chain(self.sub_albums.iter())
    }

    pub fn has_issues(&self) -> bool {
        self.units().any(|u| !u.issues.is_empty())
    }

    /// Discs the source holds: ISOs when there are any, the expected count
    /// otherwise (native DSD sources carry no images).
    pub fn source_disc_count(&self) -> usize {
        if self.source_isos.is_empty() {
            self.expected_discs as usize
        } else {
            self.source_isos.len()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InventorySummary {
    pub total_albums: usize,
    pub total_source_discs: usize,
    pub total_target_discs: usize,
    pub albums_complete: usize,
    pub albums_missing_discs: usize,
    pub albums_missing_entirely: usize,
}

impl InventorySummary {
    pub fn missing_extractions(&self) -> usize {
        self.total_source_discs.saturating_sub(self.total_target_discs)
    }

    fn record(&mut self, album: &InventoryAlbum) {
        self.total_albums += 1;

        // Box sets are counted through their members only
        let counted: Vec<&InventoryAlbum> = if album.is_box_set() {
            album.sub_albums.iter().collect()
        } else {
            vec![album]
        };
        for unit in counted {
            self.total_source_discs += unit.source_disc_count();
            self.total_target_discs += unit.target_discs.len();
        }

        if !album.has_issues() {
            self.albums_complete += 1;
        }
        if album
            .units()
            .any(|u| u.issues.iter().any(|i| matches!(i, Finding::MissingDiscs { .. })))
        {
            self.albums_missing_discs += 1;
        }
        if album
            .issues
            .iter()
            .any(|i| matches!(i, Finding::TargetMissing { .. }))
        {
            self.albums_missing_entirely += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub generated: String,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub albums: Vec<InventoryAlbum>,
    pub summary: InventorySummary,
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

fn names(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| album_name(p)).collect()
}

/// Extracted discs of a target folder: disc folders, else `(root)` for loose
/// audio, else whatever nested layout holds audio (`sub/disc` or `sub`).
pub fn target_discs(target: &Path) -> Vec<String> {
    let discs = scanner::find_disc_folders(target);
    if !discs.is_empty() {
        return discs.into_iter().map(|d| d.name).collect();
    }
    if !scanner::audio_files(target).is_empty() {
        return vec![ROOT_DISC.to_string()];
    }

    let mut found = Vec::new();
    for sub in scanner::child_dirs(target) {
        if !scanner::contains_audio(&sub) {
            continue;
        }
        let sub_name = album_name(&sub);
        let nested = scanner::find_disc_folders(&sub);
        if !nested.is_empty() {
            found.extend(nested.into_iter().map(|d| format!("{}/{}", sub_name, d.name)));
        } else if !scanner::audio_files(&sub).is_empty() {
            found.push(sub_name);
        }
    }
    found
}

/// Analyze one non-box-set album. `missing` is reported when `target` is
/// absent.
fn analyze_single(source: &Path, target: Option<&Path>, missing: Finding) -> InventoryAlbum {
    let name = album_name(source);
    let mut album = InventoryAlbum {
        expected_discs: discs::expected_disc_count(&name, Some(source)),
        name,
        target: target.map(Path::to_path_buf),
        source_isos: names(&scanner::disc_images(source)),
        target_discs: Vec::new(),
        sub_albums: Vec::new(),
        issues: Vec::new(),
    };

    let Some(target) = target.filter(|t| t.is_dir()) else {
        album.issues.push(missing);
        return album;
    };

    album.target_discs = target_discs(target);
    let source_count = album.source_disc_count();
    let target_count = album.target_discs.len();

    if target_count < source_count {
        album.issues.push(Finding::MissingDiscs {
            missing: source_count - target_count,
            total: source_count,
        });
    } else if album.target_discs.iter().any(|d| d.contains('/')) {
        album.issues.push(Finding::NestedStructure);
    }
    album
}

pub fn analyze_album(source: &Path, target_root: &Path) -> InventoryAlbum {
    let name = album_name(source);
    let matched = matcher::match_target(&name, target_root).map(|m| m.path);

    let Some(members) = matcher::box_set_members(source) else {
        let missing = Finding::TargetMissing {
            expected_target: target_root.join(naming::target_name(&name)),
        };
        return analyze_single(source, matched.as_deref(), missing);
    };

    let mut album = InventoryAlbum {
        expected_discs: discs::expected_disc_count(&name, Some(source)),
        name: name.clone(),
        target: matched.clone(),
        source_isos: Vec::new(),
        target_discs: Vec::new(),
        sub_albums: Vec::new(),
        issues: Vec::new(),
    };

    let Some(parent) = matched else {
        album.issues.push(Finding::TargetMissing {
            expected_target: target_root.join(naming::target_name(&name)),
        });
        return album;
    };

    album.sub_albums = members
        .iter()
        .map(|member| {
            let member_name = album_name(member);
            let sub_target = matcher::match_target(&member_name, &parent).map(|m| m.path);
            let missing = Finding::Unmatched {
                expected_target: parent.join(naming::target_name(&member_name)),
                parent: parent.clone(),
            };
            analyze_single(member, sub_target.as_deref(), missing)
        })
        .collect();
    album
}

/// Inventory of every album under `source_root`.
pub fn build(source_root: &Path, target_root: &Path) -> Result<InventoryReport, ConfigError> {
    if !source_root.is_dir() {
        return Err(ConfigError::SourceMissing(source_root.to_path_buf()));
    }
    if !target_root.is_dir() {
        return Err(ConfigError::TargetMissing(target_root.to_path_buf()));
    }

    let mut summary = InventorySummary::default();
    let albums: Vec<InventoryAlbum> = scanner::child_dirs(source_root)
        .iter()
        .map(|source| {
            let album = analyze_album(source, target_root);
            summary.record(&album);
            album
        })
        .collect();

    Ok(InventoryReport {
        generated: Local::now().to_rfc3339(),
        source_path: source_root.to_path_buf(),
        target_path: target_root.to_path_buf(),
        albums,
        summary,
    })
}
