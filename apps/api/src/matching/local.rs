//! Local Matcher — deterministic token-overlap scoring, no network call.
//!
//! This is the scorer used for the `internal` provider and the fallback for
//! every failed provider call.

use serde::{Deserialize, Serialize};

use crate::matching::keywords::SkillSet;

/// Overlap score plus the tokens that drove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalAssessment {
    pub score: u8, // 0 – 100
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

/// `|profile ∩ listing| / |listing| * 100`, rounded to the nearest integer.
///
/// An empty listing scores 0: there is nothing to be compatible with, and a
/// score must never be an error.
pub fn score(profile: &SkillSet, listing: &SkillSet) -> u8 {
    if listing.is_empty() {
        return 0;
    }

    let overlap = profile.intersection(listing).len();
    let ratio = overlap as f64 / listing.len() as f64;

    (ratio * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Computes the score together with the matching and missing listing tokens.
pub fn evaluate(profile: &SkillSet, listing: &SkillSet) -> LocalAssessment {
    LocalAssessment {
        score: score(profile, listing),
        matching_skills: owned(listing.intersection(profile)),
        missing_skills: owned(listing.difference(profile)),
    }
}

fn owned(tokens: Vec<&str>) -> Vec<String> {
    tokens.into_iter().map(str::to_string).collect()
}
