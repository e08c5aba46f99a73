//! Suggestion ranking shared by every editor search box.
//!
//! A candidate matches when its name contains the query, ignoring case.
//! Matches are ordered by where the query first appears in the name
//! (earlier first), then by the lower-cased name. An empty query yields no
//! suggestions at all.

use std::cmp::Ordering;

/// Anything with an id and an optional display name.
pub trait NamedRecord {
    fn record_id(&self) -> &str;

    /// `None` when the stored record has no usable name; such records never match.
    fn display_name(&self) -> Option<&str>;
}

/// Rank `candidates` by their [`NamedRecord::display_name`].
pub fn rank<'a, T: NamedRecord>(candidates: &'a [T], query: &str) -> Vec<&'a T> {
    rank_by(candidates, query, |candidate| candidate.display_name())
}

/// Rank `candidates` using `name_of` to pick the field matched against `query`.
///
/// The input slice is only borrowed; the result is a new ordered view over it.
pub fn rank_by<'a, T, F>(candidates: &'a [T], query: &str, name_of: F) -> Vec<&'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    if query.is_empty() {
        return Vec::new();
    }

    let needle = query.to_lowercase();

    let mut matches: Vec<Match<'a, T>> = candidates
        .iter()
        .filter_map(|candidate| {
            let name_lower = name_of(candidate)?.to_lowercase();
            let position = match_position(&name_lower, &needle)?;
            Some(Match {
                candidate,
                position,
                name_lower,
            })
        })
        .collect();

    // stable: identical keys keep input order
    matches.sort_by(Match::by_rank);

    matches.into_iter().map(|m| m.candidate).collect()
}

/// Character index of the first occurrence of `needle` in `haystack`.
///
/// Both arguments are expected to be lower-cased already.
pub fn match_position(haystack: &str, needle: &str) -> Option<usize> {
    let byte_idx = haystack.find(needle)?;
    Some(haystack[..byte_idx].chars().count())
}

struct Match<'a, T> {
    candidate: &'a T,
    position: usize,
    name_lower: String,
}

impl<T> Match<'_, T> {
    fn by_rank(a: &Self, b: &Self) -> Ordering {
        a.position
            .cmp(&b.position)
            .then_with(|| a.name_lower.cmp(&b.name_lower))
    }
}
