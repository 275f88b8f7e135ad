//! Read-only inspection of album folder trees.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use walkdir::WalkDir;

pub const AUDIO_EXTENSIONS: &[&str] = &["dsf", "dff"];
pub const DISC_IMAGE_EXTENSIONS: &[&str] = &["iso"];

/// Checked in order in the album root.
const ROOT_COVER_NAMES: &[&str] = &["cover.jpg", "folder.jpg", "Cover.jpg", "Folder.jpg"];
/// Checked in order in `Artwork/` when the root has none.
const ARTWORK_COVER_NAMES: &[&str] = &["cover.jpg", "folder.jpg", "front.jpg"];
const ARTWORK_FOLDER: &str = "Artwork";

/// Folders that ship alongside a release and never hold an album themselves.
const SUPPORTING_FOLDERS: &[&str] = &[
    "artwork",
    "art",
    "scans",
    "art_box&booklet",
    "track list book",
];

// ---------------------------------------------------------------------------
// Disc folder naming
// ---------------------------------------------------------------------------

/// How a disc folder name announced its disc number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "prefix", rename_all = "snake_case")]
pub enum DiscPattern {
    /// `disc 1`, `Disk2`, `CD3` (prefix lowercased)
    Prefix(String),
    /// `Album Name (Disc 1)`, as written by sacd_extract
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscFolder {
    pub path: PathBuf,
    pub name: String,
    pub number: u32,
    pub pattern: DiscPattern,
}

type DiscExtractor = fn(&Captures) -> Option<(u32, DiscPattern)>;

fn prefix_disc(caps: &Captures) -> Option<(u32, DiscPattern)> {
    let number = caps[2].parse().ok()?;
    Some((number, DiscPattern::Prefix(caps[1].to_lowercase())))
}

fn suffix_disc(caps: &Captures) -> Option<(u32, DiscPattern)> {
    let number = caps[1].parse().ok()?;
    Some((number, DiscPattern::Suffix))
}

static DISC_RULES: Lazy<Vec<(Regex, DiscExtractor)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"(?i)^(disc|disk|cd)\s*(\d+)").expect("static disc pattern"),
            prefix_disc as DiscExtractor,
        ),
        (
            Regex::new(r"(?i)\(Disc\s*(\d+)\)$").expect("static disc pattern"),
            suffix_disc as DiscExtractor,
        ),
    ]
});

/// Disc number and naming pattern of a folder name, first matching rule wins.
pub fn classify_disc_name(name: &str) -> Option<(u32, DiscPattern)> {
    DISC_RULES
        .iter()
        .find_map(|(re, extract)| re.captures(name).and_then(|caps| extract(&caps)))
}

pub fn looks_like_disc_folder(name: &str) -> bool {
    classify_disc_name(name).is_some()
}

/// Canonical folder name for a disc in a multi-disc album.
pub fn canonical_disc_name(number: u32) -> String {
    format!("Disk{}", number)
}

// ---------------------------------------------------------------------------
// Listing helpers
// ---------------------------------------------------------------------------

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map_or(false, |e| extensions.contains(&e.as_str()))
}

/// Immediate entries sorted by name. Unreadable directories yield nothing.
fn sorted_entries(dir: &Path) -> Vec<fs::DirEntry> {
    let mut entries: Vec<fs::DirEntry> = match fs::read_dir(dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(e) => {
            tracing::debug!("Cannot list {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    entries.sort_by_key(|e| e.file_name());
    entries
}

/// Real (non-symlink) sub-directories, hidden ones excluded, sorted by name.
pub fn child_dirs(dir: &Path) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|e| e.file_type().map_or(false, |t| t.is_dir()))
        .filter(|e| !is_hidden(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect()
}

fn files_with_extension(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    sorted_entries(dir)
        .into_iter()
        .filter(|e| e.file_type().map_or(false, |t| t.is_file()))
        .map(|e| e.path())
        .filter(|p| has_extension(p, extensions))
        .collect()
}

/// Audio files directly inside `dir`.
pub fn audio_files(dir: &Path) -> Vec<PathBuf> {
    files_with_extension(dir, AUDIO_EXTENSIONS)
}

/// Disc images directly inside `dir`.
pub fn disc_images(dir: &Path) -> Vec<PathBuf> {
    files_with_extension(dir, DISC_IMAGE_EXTENSIONS)
}

/// True when any audio file exists anywhere beneath `dir`.
pub fn contains_audio(dir: &Path) -> bool {
    WalkDir::new(dir)
        .follow_links(false)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file() && has_extension(e.path(), AUDIO_EXTENSIONS))
}

// ---------------------------------------------------------------------------
// Structure detection
// ---------------------------------------------------------------------------

/// Disc folders directly inside `root`, sorted by disc number.
pub fn find_disc_folders(root: &Path) -> Vec<DiscFolder> {
    let mut discs: Vec<DiscFolder> = child_dirs(root)
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            let (number, pattern) = classify_disc_name(&name)?;
            Some(DiscFolder {
                path,
                name,
                number,
                pattern,
            })
        })
        .collect();
    discs.sort_by(|a, b| a.number.cmp(&b.number).then_with(|| a.name.cmp(&b.name)));
    discs
}

/// Extra folder an extraction tool left inside a disc folder.
///
/// Returns nothing when the disc folder already holds audio directly.
pub fn find_nested_extraction_folder(disc: &Path) -> Option<PathBuf> {
    if !audio_files(disc).is_empty() {
        return None;
    }
    child_dirs(disc)
        .into_iter()
        .find(|sub| !audio_files(sub).is_empty())
}

/// Intermediate folder holding all of an album's disc folders, e.g.
/// `Album/Wagner_ Das Rheingold/Disc 1`.
pub fn find_extraction_wrapper_folder(album: &Path) -> Option<PathBuf> {
    let children = child_dirs(album);
    let names_disc = children.iter().any(|c| {
        c.file_name()
            .map_or(false, |n| looks_like_disc_folder(&n.to_string_lossy()))
    });
    if names_disc {
        return None;
    }
    children
        .into_iter()
        .find(|c| !find_disc_folders(c).is_empty())
}

/// Every symlink beneath `path`. Links are reported, never followed.
pub fn find_symlinks(path: &Path) -> Vec<PathBuf> {
    WalkDir::new(path)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path_is_symlink())
        .map(|e| e.into_path())
        .collect()
}

/// First conventional cover image of a source album.
pub fn find_cover(source_album: &Path) -> Option<PathBuf> {
    let artwork = source_album.join(ARTWORK_FOLDER);
    ROOT_COVER_NAMES
        .iter()
        .map(|n| source_album.join(n))
        .chain(ARTWORK_COVER_NAMES.iter().map(|n| artwork.join(n)))
        .find(|p| p.is_file())
}

// ---------------------------------------------------------------------------
// Box set members
// ---------------------------------------------------------------------------

fn is_supporting_folder(name: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTING_FOLDERS.contains(&lower.as_str())
}

/// A sub-folder is an album of its own when it has a disc image, audio
/// anywhere beneath it, or a further non-hidden sub-directory.
pub fn is_real_sub_album(dir: &Path) -> bool {
    !disc_images(dir).is_empty() || contains_audio(dir) || !child_dirs(dir).is_empty()
}

/// Sub-folders of a source album that qualify as sub-albums. Disc folders
/// belong to the album itself and are never sub-albums.
pub fn find_sub_albums(source_album: &Path) -> Vec<PathBuf> {
    child_dirs(source_album)
        .into_iter()
        .filter(|d| {
            d.file_name().map_or(false, |n| {
                let name = n.to_string_lossy();
                !is_supporting_folder(&name) && !looks_like_disc_folder(&name)
            })
        })
        .filter(|d| is_real_sub_album(d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_classify_disc_name() {
        assert_eq!(
            classify_disc_name("disc 1"),
            Some((1, DiscPattern::Prefix("disc".to_string())))
        );
        assert_eq!(
            classify_disc_name("CD12"),
            Some((12, DiscPattern::Prefix("cd".to_string())))
        );
        assert_eq!(
            classify_disc_name("Disk2"),
            Some((2, DiscPattern::Prefix("disk".to_string())))
        );
        assert_eq!(
            classify_disc_name("Carmen (Disc 3)"),
            Some((3, DiscPattern::Suffix))
        );
        assert_eq!(classify_disc_name("Artwork"), None);
        assert_eq!(classify_disc_name("Carmen (Disc 3) extra"), None);
    }

    #[test]
    fn test_find_disc_folders_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        for name in ["Disk3", "Carmen (Disc 1)", "cd 2", "Scans"] {
            fs::create_dir(root.join(name)).unwrap();
        }
        touch(&root.join("disc4.txt"));

        let discs = find_disc_folders(root);
        let numbers: Vec<u32> = discs.iter().map(|d| d.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(discs[0].name, "Carmen (Disc 1)");
        assert_eq!(discs[0].pattern, DiscPattern::Suffix);
    }

    #[test]
    fn test_find_disc_folders_missing_root() {
        let tmp = TempDir::new().unwrap();
        assert!(find_disc_folders(&tmp.path().join("nope")).is_empty());
    }

    #[test]
    fn test_nested_extraction_folder_found() {
        let tmp = TempDir::new().unwrap();
        let disc = tmp.path().join("Disk1");
        touch(&disc.join("Carmen").join("01 - Overture.dsf"));

        assert_eq!(
            find_nested_extraction_folder(&disc),
            Some(disc.join("Carmen"))
        );
    }

    #[test]
    fn test_nested_extraction_folder_already_flat() {
        let tmp = TempDir::new().unwrap();
        let disc = tmp.path().join("Disk1");
        touch(&disc.join("01.dsf"));
        touch(&disc.join("Carmen").join("02.dsf"));

        assert_eq!(find_nested_extraction_folder(&disc), None);
    }

    #[test]
    fn test_wrapper_folder_found() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("Rheingold (Esoteric, DSDe)");
        fs::create_dir_all(album.join("Wagner_ Das Rheingold").join("Disc 1")).unwrap();
        fs::create_dir_all(album.join("Wagner_ Das Rheingold").join("Disc 2")).unwrap();

        assert_eq!(
            find_extraction_wrapper_folder(&album),
            Some(album.join("Wagner_ Das Rheingold"))
        );
    }

    #[test]
    fn test_wrapper_folder_absent_when_discs_at_top() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("Album");
        fs::create_dir_all(album.join("Disk1")).unwrap();
        fs::create_dir_all(album.join("Extras").join("Disc 1")).unwrap();

        assert_eq!(find_extraction_wrapper_folder(&album), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_symlinks_recursive() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("Album");
        touch(&album.join("Disk1").join("01.dsf"));
        std::os::unix::fs::symlink(album.join("Disk1"), album.join("link-dir")).unwrap();
        std::os::unix::fs::symlink("/does/not/exist", album.join("Disk1").join("dangling"))
            .unwrap();

        let links = find_symlinks(&album);
        assert_eq!(links.len(), 2);
        assert!(links.contains(&album.join("link-dir")));
        assert!(links.contains(&album.join("Disk1").join("dangling")));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_dir_is_not_disc_folder() {
        let tmp = TempDir::new().unwrap();
        let album = tmp.path().join("Album");
        fs::create_dir_all(album.join("Disk1")).unwrap();
        std::os::unix::fs::symlink(album.join("Disk1"), album.join("Disk2")).unwrap();

        assert_eq!(find_disc_folders(&album).len(), 1);
    }

    #[test]
    fn test_find_cover_prefers_root() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path();
        touch(&src.join("Artwork").join("front.jpg"));
        assert_eq!(find_cover(src), Some(src.join("Artwork").join("front.jpg")));

        touch(&src.join("folder.jpg"));
        assert_eq!(find_cover(src), Some(src.join("folder.jpg")));
    }

    #[test]
    fn test_find_cover_none() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("back.jpg"));
        assert_eq!(find_cover(tmp.path()), None);
    }

    #[test]
    fn test_sub_albums_skip_supporting_and_empty() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path();
        touch(&src.join("Opera A (Esoteric, 2SACD)").join("a1.iso"));
        touch(&src.join("Opera B (Esoteric, SACD)").join("b.iso"));
        touch(&src.join("Artwork").join("Inner").join("cover.jpg"));
        touch(&src.join("Notes").join("readme.txt"));
        fs::create_dir(src.join(".hidden")).unwrap();

        let subs = find_sub_albums(src);
        assert_eq!(
            subs,
            vec![
                src.join("Opera A (Esoteric, 2SACD)"),
                src.join("Opera B (Esoteric, SACD)"),
            ]
        );
    }

    #[test]
    fn test_disc_folders_are_not_sub_albums() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path();
        touch(&src.join("Disc 1").join("a.iso"));
        touch(&src.join("Disc 2").join("b.iso"));
        assert!(find_sub_albums(src).is_empty());
    }

    #[test]
    fn test_real_sub_album_by_nested_audio() {
        let tmp = TempDir::new().unwrap();
        let sub = tmp.path().join("Native");
        touch(&sub.join("deep").join("deeper").join("01.DSF"));
        assert!(contains_audio(&sub));
        assert!(is_real_sub_album(&sub));
    }
}
