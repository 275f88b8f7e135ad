//! Album folder name normalization.
//!
//! Source folders follow `"<Title> (<Publisher>, [<count>[x]]<Format>)"`, e.g.
//! `"Carmen (Esoteric, 2SACD)"`. Extracted folders carry the canonical
//! `DSDe` format instead: `"Carmen (Esoteric, DSDe)"`. Everything here is pure
//! and total: names that match nothing come back unchanged.

use once_cell::sync::Lazy;
use regex::Regex;

// ---------------------------------------------------------------------------
// Substitution tables
// ---------------------------------------------------------------------------

struct Substitution {
    pattern: Regex,
    replacement: &'static str,
}

impl Substitution {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("static naming pattern"),
            replacement,
        }
    }

    fn apply(&self, name: &str) -> Option<String> {
        if self.pattern.is_match(name) {
            Some(self.pattern.replace(name, self.replacement).into_owned())
        } else {
            None
        }
    }
}

/// Primary substitution: an SACD annotation, with or without a count, becomes
/// the extracted annotation.
static PRIMARY: Lazy<Substitution> =
    Lazy::new(|| Substitution::new(r"\(([^,()]+),\s*\d*x?SACD\)", "(${1}, DSDe)"));

/// Tried in order after the primary substitution.
static ALTERNATES: Lazy<Vec<Substitution>> = Lazy::new(|| {
    vec![
        // Count-qualified DSD releases that were extracted anyway
        Substitution::new(r"\(([^,()]+),\s*\d*x?(?:SACD|DSD)\)", "(${1}, DSDe)"),
        // Publisher + plain DSD, as native DSD releases are stored
        Substitution::new(r"\(([^,()]+),\s*\d*x?(?:SACD|DSD)\)", "(${1}, DSD)"),
    ]
});

static TRAILING_ANNOTATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\([^()]*\)\s*$").expect("static naming pattern"));

static NATIVE_DSD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^,()]+,\s*\d*DSD\)").expect("static naming pattern"));

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Expected name of the extracted folder for a source folder name.
pub fn target_name(source_name: &str) -> String {
    PRIMARY
        .apply(source_name)
        .unwrap_or_else(|| source_name.to_string())
}

/// Alternate target names to try when the primary one does not exist.
///
/// The list never contains the primary name and never repeats itself. The
/// unchanged source name comes last when it differs from the primary.
pub fn alternate_target_names(source_name: &str) -> Vec<String> {
    let primary = target_name(source_name);
    let mut names: Vec<String> = Vec::new();

    let candidates = ALTERNATES
        .iter()
        .filter_map(|s| s.apply(source_name))
        .chain(std::iter::once(source_name.to_string()));

    for candidate in candidates {
        if candidate != primary && !names.contains(&candidate) {
            names.push(candidate);
        }
    }
    names
}

/// Title with the trailing annotation stripped, used for fuzzy matching.
/// May be empty when the whole name is an annotation.
pub fn base_title(name: &str) -> String {
    match TRAILING_ANNOTATION.captures(name) {
        Some(caps) => caps[1].trim().to_string(),
        None => name.trim().to_string(),
    }
}

/// Native DSD releases were never SACD images, so there is nothing to
/// reconcile for them.
pub fn is_native_dsd(name: &str) -> bool {
    NATIVE_DSD.is_match(name)
}
