//! Expected disc count of an album.
//!
//! Folder-name metadata reflects the catalog and wins over whatever is on
//! disk, which may be mid-extraction. The filesystem is only consulted when
//! the name says nothing.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::scanner;

/// Largest disc count a name may announce. Anything above is treated as a
/// malformed annotation.
pub const MAX_DISCS: u32 = 999;

type CountExtractor = fn(&regex::Captures) -> Option<u32>;

fn counted(caps: &regex::Captures) -> Option<u32> {
    caps[1]
        .parse()
        .ok()
        .filter(|n: &u32| (1..=MAX_DISCS).contains(n))
}

fn single(_: &regex::Captures) -> Option<u32> {
    Some(1)
}

/// Name rules, tried in order.
static NAME_RULES: Lazy<Vec<(Regex, CountExtractor)>> = Lazy::new(|| {
    vec![
        // (3 SACD), (Esoteric, 2SACD), (Esoteric, 2xSACD), (2 discs)
        (
            Regex::new(r"(?i)\((?:[^,()]+,\s*)?(\d+)\s*x?\s*(?:SACD|DSD|discs?)\)")
                .expect("static count pattern"),
            counted as CountExtractor,
        ),
        // (Esoteric, SACD), (Esoteric, DSDe), (DSD)
        (
            Regex::new(r"(?i)\((?:[^,()]+,\s*)?(?:SACD|DSDe?|disc)\)")
                .expect("static count pattern"),
            single as CountExtractor,
        ),
    ]
});

/// Disc count announced by the folder name, if any.
pub fn count_from_name(name: &str) -> Option<u32> {
    NAME_RULES
        .iter()
        .find_map(|(re, extract)| re.captures(name).and_then(|caps| extract(&caps)))
}

/// Disc count evidenced by a source folder: disc sub-folders first, then disc
/// images directly inside.
pub fn count_from_source(source: &Path) -> Option<u32> {
    if !source.is_dir() {
        return None;
    }
    let folders = scanner::find_disc_folders(source).len();
    let found = if folders > 0 {
        folders
    } else {
        scanner::disc_images(source).len()
    };
    u32::try_from(found).ok().filter(|n| *n > 0)
}

/// Expected number of discs, always at least 1.
pub fn expected_disc_count(name: &str, source: Option<&Path>) -> u32 {
    count_from_name(name)
        .or_else(|| source.and_then(count_from_source))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_count_from_name_variants() {
        assert_eq!(count_from_name("Carmen (Esoteric, 2SACD)"), Some(2));
        assert_eq!(count_from_name("Ring (Esoteric, 14SACD)"), Some(14));
        assert_eq!(count_from_name("Ring (Esoteric, 4xSACD)"), Some(4));
        assert_eq!(count_from_name("Live (2 discs)"), Some(2));
        assert_eq!(count_from_name("Solo (1 disc)"), Some(1));
        assert_eq!(count_from_name("Trio (3 SACD)"), Some(3));
        assert_eq!(count_from_name("Bach (Esoteric, SACD)"), Some(1));
        assert_eq!(count_from_name("Bach (Esoteric, DSDe)"), Some(1));
        assert_eq!(count_from_name("Bach"), None);
        assert_eq!(count_from_name("Bach (remastered)"), None);
    }

    #[test]
    fn test_zero_count_is_ignored() {
        assert_eq!(count_from_name("Odd (Esoteric, 0SACD)"), None);
        assert_eq!(expected_disc_count("Odd (Esoteric, 0SACD)", None), 1);
    }

    #[test]
    fn test_oversized_count_is_ignored() {
        assert_eq!(count_from_name("Odd (Esoteric, 4294967298SACD)"), None);
        assert_eq!(count_from_name("Odd (Esoteric, 1000SACD)"), None);
        assert_eq!(count_from_name("Odd (Esoteric, 999SACD)"), Some(MAX_DISCS));
        assert_eq!(expected_disc_count("Odd (Esoteric, 4294967298SACD)", None), 1);

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("disc1.iso"), b"x").unwrap();
        fs::write(tmp.path().join("disc2.iso"), b"x").unwrap();
        assert_eq!(
            expected_disc_count("Odd (Esoteric, 4294967298SACD)", Some(tmp.path())),
            2
        );
    }

    #[test]
    fn test_name_wins_over_filesystem() {
        let tmp = TempDir::new().unwrap();
        for i in 1..=5 {
            fs::write(tmp.path().join(format!("disc{}.iso", i)), b"x").unwrap();
        }
        assert_eq!(expected_disc_count("Trio (3 SACD)", Some(tmp.path())), 3);
    }

    #[test]
    fn test_falls_back_to_disc_folders_then_images() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("Unlabelled");
        fs::create_dir_all(src.join("Disc 1")).unwrap();
        fs::create_dir_all(src.join("Disc 2")).unwrap();
        fs::write(src.join("a.iso"), b"x").unwrap();
        assert_eq!(expected_disc_count("Unlabelled", Some(&src)), 2);

        let flat = tmp.path().join("Flat");
        fs::create_dir_all(&flat).unwrap();
        for name in ["a.iso", "b.iso", "c.iso", "notes.txt"] {
            fs::write(flat.join(name), b"x").unwrap();
        }
        assert_eq!(expected_disc_count("Flat", Some(&flat)), 3);
    }

    #[test]
    fn test_defaults_to_one() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(expected_disc_count("Empty", Some(tmp.path())), 1);
        assert_eq!(expected_disc_count("Empty", Some(&tmp.path().join("gone"))), 1);
        assert_eq!(expected_disc_count("Empty", None), 1);
    }
}
