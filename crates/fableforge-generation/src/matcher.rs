//! Fuzzy name matching for model output that almost names an entity.

use strsim::normalized_levenshtein;
use thiserror::Error;

/// Minimum similarity for a fuzzy match to count.
const MATCH_THRESHOLD: f64 = 0.6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("no candidates to match against")]
    EmptyCandidates,
    #[error("no candidate close enough to '{0}'")]
    NoCloseMatch(String),
}

/// Returns the candidate closest to `target`, case-insensitively.
///
/// An exact (case-insensitive) match always wins. Otherwise the candidate
/// with the highest normalized Levenshtein similarity is returned, provided
/// it clears the threshold.
pub fn closest_match<'a>(target: &str, candidates: &'a [String]) -> Result<&'a str, MatchError> {
    if candidates.is_empty() {
        return Err(MatchError::EmptyCandidates);
    }

    let target_lower = target.to_lowercase();
    let mut best: Option<(&str, f64)> = None;
    for candidate in candidates {
        let candidate_lower = candidate.to_lowercase();
        if candidate_lower == target_lower {
            return Ok(candidate);
        }
        let score = normalized_levenshtein(&target_lower, &candidate_lower);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) if score >= MATCH_THRESHOLD => Ok(candidate),
        _ => Err(MatchError::NoCloseMatch(target.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_exact_match_ignores_case() {
        let candidates = names(&["Thorin", "Elara"]);
        assert_eq!(closest_match("thorin", &candidates), Ok("Thorin"));
    }

    #[test]
    fn test_near_match_resolves() {
        let candidates = names(&["Thorin", "Elara"]);
        assert_eq!(closest_match("Thorinn", &candidates), Ok("Thorin"));
    }

    #[test]
    fn test_distant_target_is_rejected() {
        let candidates = names(&["Thorin", "Elara"]);
        assert_eq!(
            closest_match("Xyzzy", &candidates),
            Err(MatchError::NoCloseMatch("Xyzzy".to_owned()))
        );
    }

    #[test]
    fn test_empty_candidates() {
        assert_eq!(closest_match("anyone", &[]), Err(MatchError::EmptyCandidates));
    }
}
