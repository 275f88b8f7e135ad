use std::path::PathBuf;

use serde::Serialize;

/// Something wrong with an album that a repair action cannot fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Finding {
    /// No extracted folder exists for a top-level album.
    TargetMissing { expected_target: PathBuf },
    /// A box-set member has no counterpart inside the matched box-set folder.
    Unmatched {
        expected_target: PathBuf,
        parent: PathBuf,
    },
    /// One disc of a multi-disc album was never extracted. `source_image` is
    /// the ISO to extract, when one could be found.
    MissingDisc {
        disc: u32,
        total: u32,
        source_image: Option<PathBuf>,
    },
    /// Aggregate form used by the inventory.
    MissingDiscs { missing: usize, total: usize },
    /// Extracted discs sit one level deeper than expected.
    NestedStructure,
    /// Several disc folders claim the same disc number.
    DuplicateDisc { disc: u32, folders: Vec<PathBuf> },
}

impl Finding {
    pub fn is_missing_disc(&self) -> bool {
        matches!(self, Finding::MissingDisc { .. } | Finding::MissingDiscs { .. })
    }

    pub fn is_missing_album(&self) -> bool {
        matches!(self, Finding::TargetMissing { .. } | Finding::Unmatched { .. })
    }

    pub fn describe(&self) -> String {
        match self {
            Finding::TargetMissing { expected_target } => {
                format!("TARGET_MISSING: {}", expected_target.display())
            }
            Finding::Unmatched { expected_target, .. } => {
                format!("UNMATCHED: {}", expected_target.display())
            }
            Finding::MissingDisc {
                disc, source_image, ..
            } => format!(
                "MISSING_DISC: Disk{} (source: {})",
                disc,
                source_image
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "ISO not found".to_string())
            ),
            Finding::MissingDiscs { missing, total } => {
                format!("MISSING_DISCS: {} of {}", missing, total)
            }
            Finding::NestedStructure => "NESTED_STRUCTURE".to_string(),
            Finding::DuplicateDisc { disc, folders } => {
                format!("DUPLICATE_DISC: {} ({} folders)", disc, folders.len())
            }
        }
    }
}

/// Non-fatal observations. Only `NoAudioFound` marks an album as not OK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Warning {
    NoAudioFound,
    NoCover,
    /// Single-disc album extracted into several disc folders.
    ExtraDiscFolders { found: usize },
    /// Fuzzy match chosen while other folders matched too.
    AmbiguousMatch {
        chosen: PathBuf,
        candidates: Vec<PathBuf>,
    },
}

impl Warning {
    pub fn describe(&self) -> String {
        match self {
            Warning::NoAudioFound => "No audio files found".to_string(),
            Warning::NoCover => "No cover found in source".to_string(),
            Warning::ExtraDiscFolders { found } => {
                format!("Single-disc album has {} disc folders", found)
            }
            Warning::AmbiguousMatch { chosen, candidates } => format!(
                "Fuzzy match picked {} over {} other candidate(s)",
                chosen.display(),
                candidates.len()
            ),
        }
    }
}
